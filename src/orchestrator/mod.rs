//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责链的调度和资源装配，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用装配
//! - 获取浏览器（启动或连接调试端口）
//! - 创建模型、HTTP 客户端、渲染器
//! - 启动 HTTP 服务或前台求解
//!
//! ### `dispatcher` - 链调度器
//! - 分配链 ID，固定截止时间
//! - 控制并发链数量（Semaphore）
//! - 失败链写入失败记录
//!
//! ### `chain_runner` - 单条链处理器
//! - 循环执行 HopFlow
//! - 决定结束、失败还是跟随下一个 URL
//!
//! ## 层次关系
//!
//! ```text
//! app (资源装配)
//!     ↓
//! dispatcher (处理多条链)
//!     ↓
//! chain_runner (处理一条链的多跳)
//!     ↓
//! workflow::HopFlow (处理单跳)
//!     ↓
//! services (能力层：extract / fetch / analyze / synthesize / submit)
//!     ↓
//! infrastructure (基础设施：renderer / model / http)
//! ```

pub mod app;
pub mod chain_runner;
pub mod dispatcher;

pub use app::{build_dispatcher, App};
pub use chain_runner::ChainRunner;
pub use dispatcher::Dispatcher;
