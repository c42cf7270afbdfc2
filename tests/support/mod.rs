//! 集成测试用的假实现：渲染器、脚本化模型、本地题目服务器

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value as JsonValue};

use quiz_chain_solver::config::ChainPolicy;
use quiz_chain_solver::error::{ModelError, RenderError};
use quiz_chain_solver::infrastructure::{
    LanguageModel, PageRenderer, Prompt, ReqwestHttpClient, ResponseShape,
};
use quiz_chain_solver::models::RenderedPage;
use quiz_chain_solver::utils::RetryPolicy;
use quiz_chain_solver::workflow::Capabilities;

pub const EMAIL: &str = "student@example.com";
pub const SECRET: &str = "s3cret";

/// 按 URL 返回预先准备好的页面
#[derive(Default)]
pub struct FakeRenderer {
    pages: HashMap<String, RenderedPage>,
    delay: Duration,
    pub renders: AtomicUsize,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 注册一个只有题目文字的页面
    pub fn page(mut self, url: &str, question: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            RenderedPage {
                html: format!("<html><body><p>{}</p></body></html>", question),
                text: question.to_string(),
                final_url: url.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render(&self, url: &str, _timeout: Duration) -> Result<RenderedPage, RenderError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| RenderError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            })
    }
}

/// 根据 prompt 内容选择回复的模型：第一个出现在 user 消息里的关键字生效
pub struct RoutedModel {
    name: String,
    routes: Vec<(String, String)>,
    pub calls: AtomicUsize,
}

impl RoutedModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            routes: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn route(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.routes.push((needle.into(), reply.into()));
        self
    }
}

#[async_trait]
impl LanguageModel for RoutedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &Prompt, _shape: ResponseShape) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.routes
            .iter()
            .find(|(needle, _)| prompt.user.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .ok_or_else(|| ModelError::Request(format!("no scripted reply for: {}", prompt.user)))
    }
}

/// 抽取模型对某一页的标准回复
pub fn extraction_reply(question: &str, files: &[&str], kind: &str) -> String {
    json!({
        "question": question,
        "submit_url": "/submit",
        "file_urls": files,
        "answer_kind": kind,
    })
    .to_string()
}

/// 一道题的判定规则
#[derive(Clone)]
pub struct Verdict {
    pub expected: JsonValue,
    /// 答对后给出的下一题路径
    pub next: Option<String>,
    /// 答错时也给出下一题
    pub next_on_wrong: bool,
    /// 回复前的等待时间
    pub delay: Duration,
}

impl Verdict {
    pub fn new(expected: JsonValue, next: Option<&str>) -> Self {
        Self {
            expected,
            next: next.map(str::to_string),
            next_on_wrong: false,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone)]
struct QuizServerState {
    base: String,
    verdicts: Arc<HashMap<String, Verdict>>,
    submissions: Arc<Mutex<Vec<JsonValue>>>,
}

/// 本地题目服务器：提供数据文件和 `/submit`
pub struct QuizServer {
    pub base: String,
    submissions: Arc<Mutex<Vec<JsonValue>>>,
}

impl QuizServer {
    /// `verdicts` 的键是题目页路径，例如 `/q1`
    pub async fn start(verdicts: HashMap<String, Verdict>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind quiz server");
        let base = format!("http://{}", listener.local_addr().unwrap());
        let submissions = Arc::new(Mutex::new(Vec::new()));

        let state = QuizServerState {
            base: base.clone(),
            verdicts: Arc::new(verdicts),
            submissions: Arc::clone(&submissions),
        };
        let app = Router::new()
            .route("/data.csv", get(data_csv))
            .route("/submit", post(submit))
            .with_state(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base, submissions }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn submissions(&self) -> Vec<JsonValue> {
        self.submissions.lock().unwrap().clone()
    }
}

async fn data_csv() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/csv")],
        "city,value\nParis,10\nLyon,20\nNice,30\n",
    )
}

async fn submit(State(state): State<QuizServerState>, Json(body): Json<JsonValue>) -> impl IntoResponse {
    state.submissions.lock().unwrap().push(body.clone());

    let quiz_url = body["url"].as_str().unwrap_or_default();
    let path = quiz_url.strip_prefix(&state.base).unwrap_or(quiz_url);
    let Some(verdict) = state.verdicts.get(path) else {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "unknown quiz"})));
    };

    if !verdict.delay.is_zero() {
        tokio::time::sleep(verdict.delay).await;
    }

    let correct = body["answer"] == verdict.expected;
    let next = verdict
        .next
        .as_ref()
        .filter(|_| correct || verdict.next_on_wrong)
        .map(|p| format!("{}{}", state.base, p));
    let reply = if correct {
        json!({"correct": true, "url": next})
    } else {
        json!({"correct": false, "reason": "Wrong answer", "url": next})
    };
    (StatusCode::OK, Json(reply))
}

/// 测试用的链策略：不停顿，重试退避很短
pub fn fast_policy() -> ChainPolicy {
    let retry = RetryPolicy::new(1, Duration::from_millis(10));
    ChainPolicy {
        chain_deadline: Duration::from_secs(20),
        min_hop: Duration::from_millis(200),
        max_chain_depth: 10,
        hop_pause: Duration::ZERO,
        skip_on_rejection: false,
        render_retry: retry,
        fetch_retry: retry,
        model_retry: retry,
        submit_retry: retry,
        render_timeout: Duration::from_secs(5),
        fetch_timeout: Duration::from_secs(5),
        submit_timeout: Duration::from_secs(5),
        ..ChainPolicy::default()
    }
}

pub fn capabilities(
    renderer: FakeRenderer,
    extract_model: RoutedModel,
    solve_model: RoutedModel,
) -> (Capabilities, Arc<FakeRenderer>, Arc<RoutedModel>, Arc<RoutedModel>) {
    let renderer = Arc::new(renderer);
    let extract_model = Arc::new(extract_model);
    let solve_model = Arc::new(solve_model);
    let capabilities = Capabilities {
        renderer: renderer.clone(),
        extract_model: extract_model.clone(),
        solve_model: solve_model.clone(),
        http: Arc::new(ReqwestHttpClient::new().expect("http client")),
    };
    (capabilities, renderer, extract_model, solve_model)
}
