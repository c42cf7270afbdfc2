//! # Quiz Chain Solver
//!
//! 一个自动求解"题目链"的 Rust 服务：渲染题目页面、抽取题目、下载并分析文件、
//! 生成答案、提交，然后跟随返回的下一个 URL，直到链结束或截止时间到达
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构，外加一个很薄的接入层：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部资源，只暴露能力 trait
//! - `PageRenderer` - 无头浏览器渲染页面
//! - `LanguageModel` - LLM 补全
//! - `HttpClient` - 文件下载与答案提交
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理一跳里的单个步骤
//! - `PageExtractor` - 页面 → 结构化题目
//! - `FileFetcher` / `file_analyzer` - 下载并把文件压缩成摘要
//! - `AnswerSynthesizer` - 题目 + 摘要 → 答案
//! - `SubmissionClient` - 提交答案并解释结果
//! - `FailureLog` - 记录失败的链
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一跳"的完整处理流程
//! - `HopCtx` - 上下文封装（chain_id + depth + 截止时间）
//! - `HopFlow` - 流程编排（render → extract → fetch → analyze → synthesize → submit）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/chain_runner` - 单条链的多跳循环
//! - `orchestrator/dispatcher` - 并发链调度
//! - `orchestrator/app` - 资源装配
//!
//! ### 接入层
//! - `server/` - axum 路由：`POST /` 与 `GET /health`
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod server;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{ChainPolicy, Config};
pub use error::HopError;
pub use models::{ChainOutcome, ChainStatus, QuizTask};
pub use orchestrator::{App, ChainRunner, Dispatcher};
pub use workflow::{Capabilities, HopFlow};
