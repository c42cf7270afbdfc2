//! 基础设施层：持有浏览器、HTTP 客户端、LLM 客户端这些外部资源，只暴露能力
//!
//! 每种能力都是一个 trait，测试里可以换成内存实现

pub mod http_client;
pub mod language_model;
pub mod page_renderer;

pub use http_client::{HttpBody, HttpClient, HttpReply, ReqwestHttpClient};
pub use language_model::{complete_with_retry, LanguageModel, OpenAiModel, Prompt, ResponseShape};
pub use page_renderer::{ChromiumRenderer, PageRenderer};
