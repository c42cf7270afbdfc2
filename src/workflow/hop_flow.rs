//! 一跳处理流程 - 流程层
//!
//! 核心职责：定义"一跳"的完整处理流程
//!
//! 流程顺序：
//! 1. 渲染页面 → 抽取题目
//! 2. 下载文件 → 分析文件（单个文件失败只降级）
//! 3. 合成答案 → 提交
//!
//! 每进入一个状态前检查截止时间；提交一旦发出就等它完成，不会被截止时间中途打断

use std::future::Future;
use std::sync::Arc;

use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::ChainPolicy;
use crate::error::{HopError, RenderError};
use crate::infrastructure::{HttpClient, LanguageModel, PageRenderer};
use crate::models::{Answer, QuizDescriptor, QuizTask, SubmissionResult};
use crate::services::file_analyzer::build_artifacts;
use crate::services::{
    AnalysisHints, AnswerSynthesizer, FileFetcher, PageExtractor, SubmissionClient,
};
use crate::utils::{retry_async, truncate_text};
use crate::workflow::{HopCtx, HopState};

/// 流程依赖的外部能力
#[derive(Clone)]
pub struct Capabilities {
    pub renderer: Arc<dyn PageRenderer>,
    /// 抽取题目用的模型
    pub extract_model: Arc<dyn LanguageModel>,
    /// 生成答案用的模型
    pub solve_model: Arc<dyn LanguageModel>,
    pub http: Arc<dyn HttpClient>,
}

/// 一跳的产出
#[derive(Debug, Clone)]
pub struct HopReport {
    pub quiz: QuizDescriptor,
    pub answer: Answer,
    pub submission: SubmissionResult,
    pub degraded_files: usize,
}

/// 一跳处理流程
///
/// - 编排单跳的完整处理顺序
/// - 不持有浏览器、HTTP 客户端以外的资源
/// - 不决定链是否继续
pub struct HopFlow {
    renderer: Arc<dyn PageRenderer>,
    extractor: PageExtractor,
    fetcher: FileFetcher,
    synthesizer: AnswerSynthesizer,
    submitter: SubmissionClient,
    policy: ChainPolicy,
}

impl HopFlow {
    pub fn new(capabilities: &Capabilities, policy: ChainPolicy) -> Self {
        Self {
            renderer: Arc::clone(&capabilities.renderer),
            extractor: PageExtractor::new(Arc::clone(&capabilities.extract_model), policy.model_retry),
            fetcher: FileFetcher::new(Arc::clone(&capabilities.http), policy.fetch_retry),
            synthesizer: AnswerSynthesizer::new(Arc::clone(&capabilities.solve_model), policy.model_retry),
            submitter: SubmissionClient::new(Arc::clone(&capabilities.http), policy.submit_retry),
            policy,
        }
    }

    pub fn policy(&self) -> &ChainPolicy {
        &self.policy
    }

    pub async fn run(&self, task: &QuizTask) -> Result<HopReport, HopError> {
        let ctx = HopCtx::from_task(task);
        info!("{} 🌐 开始处理: {} (剩余 {:?})", ctx, ctx.url, ctx.remaining());

        // ========== 渲染 ==========
        self.enter(&ctx, HopState::Rendering)?;
        let renderer = self.renderer.as_ref();
        let url = ctx.url.as_str();
        let render_timeout = ctx.clamp(self.policy.render_timeout);
        let page = self
            .within_deadline(
                &ctx,
                HopState::Rendering,
                retry_async(
                    self.policy.render_retry,
                    "渲染页面",
                    |e: &RenderError| !matches!(e, RenderError::Browser(_)),
                    move || renderer.render(url, render_timeout),
                ),
            )
            .await??;

        // ========== 抽取 ==========
        self.enter(&ctx, HopState::Extracting)?;
        let quiz = self
            .within_deadline(&ctx, HopState::Extracting, self.extractor.extract(&page))
            .await??;
        drop(page);
        info!("{} 题目: {}", ctx, truncate_text(&quiz.question_text, 80));

        // ========== 下载文件 ==========
        self.enter(&ctx, HopState::FetchingFiles)?;
        let fetch_timeout = ctx.clamp(self.policy.fetch_timeout);
        let downloads = self
            .within_deadline(
                &ctx,
                HopState::FetchingFiles,
                self.fetcher.fetch_all(&quiz.file_references, fetch_timeout),
            )
            .await?;

        // ========== 分析文件 ==========
        self.enter(&ctx, HopState::Analyzing)?;
        let hints = AnalysisHints::from_question(&quiz.question_text);
        let artifacts = self
            .within_deadline(
                &ctx,
                HopState::Analyzing,
                build_artifacts(downloads, &hints, self.policy.analysis),
            )
            .await?;
        let degraded_files = artifacts.iter().filter(|a| a.is_degraded()).count();
        if degraded_files > 0 {
            warn!("{} ⚠️ {} 个文件降级处理", ctx, degraded_files);
        }

        // ========== 合成答案 ==========
        self.enter(&ctx, HopState::Synthesizing)?;
        let answer = self
            .within_deadline(
                &ctx,
                HopState::Synthesizing,
                self.synthesizer.synthesize(&quiz, &artifacts),
            )
            .await??;
        info!("{} 💡 答案: {}", ctx, truncate_text(&answer.value().to_string(), 80));

        // ========== 提交 ==========
        self.enter(&ctx, HopState::Submitting)?;
        let submission = self
            .submitter
            .submit(
                &quiz.submission_endpoint,
                &answer,
                task.identity(),
                task.origin_url(),
                self.policy.submit_timeout,
            )
            .await?;

        Ok(HopReport {
            quiz,
            answer,
            submission,
            degraded_files,
        })
    }

    /// 进入新状态前检查截止时间
    fn enter(&self, ctx: &HopCtx, state: HopState) -> Result<(), HopError> {
        if ctx.is_expired() {
            warn!("{} ⏰ 进入 {} 前已超过截止时间", ctx, state);
            return Err(HopError::DeadlineExceeded { state });
        }
        info!("{} → {}", ctx, state);
        Ok(())
    }

    /// 步骤最多运行到截止时间
    async fn within_deadline<F: Future>(
        &self,
        ctx: &HopCtx,
        state: HopState,
        step: F,
    ) -> Result<F::Output, HopError> {
        timeout(ctx.remaining(), step).await.map_err(|_| {
            warn!("{} ⏰ {} 执行中到达截止时间", ctx, state);
            HopError::DeadlineExceeded { state }
        })
    }
}
