pub mod answer;
pub mod artifact;
pub mod outcome;
pub mod quiz;
pub mod submission;

pub use answer::{Answer, EncodingKind};
pub use artifact::{FileArtifact, FileSummary, MediaKind};
pub use outcome::{ChainOutcome, ChainStatus, FailureKind, FailureReason, HopRecord};
pub use quiz::{AnswerKind, Identity, QuizDescriptor, QuizTask, RenderedPage, SubmissionEndpoint};
pub use submission::{SubmissionReply, SubmissionResult};
