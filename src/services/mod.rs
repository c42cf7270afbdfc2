//! 业务能力层：每个服务只描述"我能做什么"，只处理一跳里的单个步骤

pub mod answer_synthesizer;
pub mod failure_log;
pub mod file_analyzer;
pub mod file_fetcher;
pub mod page_extractor;
pub mod page_heuristics;
pub mod submission_client;

pub use answer_synthesizer::AnswerSynthesizer;
pub use failure_log::FailureLog;
pub use file_analyzer::{AnalysisHints, AnalysisLimits};
pub use file_fetcher::{Download, FileFetcher};
pub use page_extractor::PageExtractor;
pub use submission_client::SubmissionClient;
