pub mod logging;
pub mod retry;
pub mod text;

pub use logging::truncate_text;
pub use retry::{retry_async, RetryPolicy};
