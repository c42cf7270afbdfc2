/// 程序配置
///
/// 来源优先级（低 → 高）：内置默认值、TOML 配置文件、环境变量（先加载 `.env`）
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::services::file_analyzer::AnalysisLimits;
use crate::utils::RetryPolicy;

#[derive(Clone, Debug)]
pub struct Config {
    // --- 身份 ---
    pub student_email: String,
    pub student_secret: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_extract_model: String,
    pub llm_solve_model: String,
    pub max_concurrent_model_calls: usize,
    // --- 服务 ---
    pub host: String,
    pub port: u16,
    // --- 浏览器 ---
    pub chrome_executable: Option<String>,
    /// 设置后连接已运行浏览器的调试端口，而不是启动无头浏览器
    pub browser_debug_port: Option<u16>,
    pub max_concurrent_pages: usize,
    pub render_settle_ms: u64,
    // --- 链策略 ---
    pub chain_deadline_secs: u64,
    pub min_hop_secs: u64,
    pub max_chain_depth: u32,
    pub hop_pause_ms: u64,
    pub skip_on_rejection: bool,
    pub max_concurrent_chains: usize,
    // --- 重试 ---
    pub render_retries: u32,
    pub fetch_retries: u32,
    pub model_retries: u32,
    pub submit_retries: u32,
    pub retry_backoff_ms: u64,
    // --- 超时 ---
    pub render_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub model_timeout_secs: u64,
    pub submit_timeout_secs: u64,
    // --- 文件分析 ---
    pub summary_char_budget: usize,
    pub sample_rows: usize,
    pub distinct_value_cap: usize,
    // --- 日志 ---
    pub rust_log: String,
    pub log_file: Option<String>,
    pub failure_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        let analysis = AnalysisLimits::default();
        Self {
            student_email: String::new(),
            student_secret: String::new(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_extract_model: "gpt-4o-mini".to_string(),
            llm_solve_model: "gpt-4o".to_string(),
            max_concurrent_model_calls: 4,
            host: "0.0.0.0".to_string(),
            port: 8000,
            chrome_executable: None,
            browser_debug_port: None,
            max_concurrent_pages: 2,
            render_settle_ms: 2000,
            chain_deadline_secs: 180,
            min_hop_secs: 20,
            max_chain_depth: 10,
            hop_pause_ms: 1000,
            skip_on_rejection: false,
            max_concurrent_chains: 8,
            render_retries: 2,
            fetch_retries: 2,
            model_retries: 2,
            submit_retries: 2,
            retry_backoff_ms: 500,
            render_timeout_secs: 30,
            fetch_timeout_secs: 30,
            model_timeout_secs: 60,
            submit_timeout_secs: 30,
            summary_char_budget: analysis.summary_char_budget,
            sample_rows: analysis.sample_rows,
            distinct_value_cap: analysis.distinct_value_cap,
            rust_log: "info".to_string(),
            log_file: None,
            failure_log_file: "failed_chains.txt".to_string(),
        }
    }
}

/// TOML 配置文件，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    student_email: Option<String>,
    student_secret: Option<String>,
    llm_api_key: Option<String>,
    llm_api_base_url: Option<String>,
    llm_extract_model: Option<String>,
    llm_solve_model: Option<String>,
    max_concurrent_model_calls: Option<usize>,
    host: Option<String>,
    port: Option<u16>,
    chrome_executable: Option<String>,
    browser_debug_port: Option<u16>,
    max_concurrent_pages: Option<usize>,
    render_settle_ms: Option<u64>,
    chain_deadline_secs: Option<u64>,
    min_hop_secs: Option<u64>,
    max_chain_depth: Option<u32>,
    hop_pause_ms: Option<u64>,
    skip_on_rejection: Option<bool>,
    max_concurrent_chains: Option<usize>,
    render_retries: Option<u32>,
    fetch_retries: Option<u32>,
    model_retries: Option<u32>,
    submit_retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
    render_timeout_secs: Option<u64>,
    fetch_timeout_secs: Option<u64>,
    model_timeout_secs: Option<u64>,
    submit_timeout_secs: Option<u64>,
    summary_char_budget: Option<usize>,
    sample_rows: Option<usize>,
    distinct_value_cap: Option<usize>,
    rust_log: Option<String>,
    log_file: Option<String>,
    failure_log_file: Option<String>,
}

/// 链编排需要的策略子集
#[derive(Clone, Debug)]
pub struct ChainPolicy {
    pub chain_deadline: Duration,
    /// 开始一跳所需的最少剩余时间
    pub min_hop: Duration,
    pub max_chain_depth: u32,
    pub hop_pause: Duration,
    pub skip_on_rejection: bool,
    pub render_retry: RetryPolicy,
    pub fetch_retry: RetryPolicy,
    pub model_retry: RetryPolicy,
    pub submit_retry: RetryPolicy,
    pub render_timeout: Duration,
    pub fetch_timeout: Duration,
    pub submit_timeout: Duration,
    pub analysis: AnalysisLimits,
}

impl Default for ChainPolicy {
    fn default() -> Self {
        Config::default().chain_policy()
    }
}

macro_rules! overlay {
    ($config:ident, $file:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $file.$field {
                $config.$field = value;
            }
        )+
    };
}

impl Config {
    /// 加载配置：默认值 → TOML 文件 → 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        let path = std::env::var("QUIZ_CONFIG_FILE").unwrap_or_else(|_| "quiz_solver.toml".to_string());
        if Path::new(&path).exists() {
            config.apply_file(&path)?;
        }
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// 读取 TOML 文件并覆盖对应字段
    pub fn apply_file(&mut self, path: &str) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        self.apply_toml(&content).map_err(|message| ConfigError::File {
            path: path.to_string(),
            message,
        })
    }

    fn apply_toml(&mut self, content: &str) -> Result<(), String> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| e.to_string())?;
        if file.chrome_executable.is_some() {
            self.chrome_executable = file.chrome_executable;
        }
        if file.browser_debug_port.is_some() {
            self.browser_debug_port = file.browser_debug_port;
        }
        if file.log_file.is_some() {
            self.log_file = file.log_file;
        }
        overlay!(
            self,
            file,
            student_email,
            student_secret,
            llm_api_key,
            llm_api_base_url,
            llm_extract_model,
            llm_solve_model,
            max_concurrent_model_calls,
            host,
            port,
            max_concurrent_pages,
            render_settle_ms,
            chain_deadline_secs,
            min_hop_secs,
            max_chain_depth,
            hop_pause_ms,
            skip_on_rejection,
            max_concurrent_chains,
            render_retries,
            fetch_retries,
            model_retries,
            submit_retries,
            retry_backoff_ms,
            render_timeout_secs,
            fetch_timeout_secs,
            model_timeout_secs,
            submit_timeout_secs,
            summary_char_budget,
            sample_rows,
            distinct_value_cap,
            rust_log,
            failure_log_file,
        );
        Ok(())
    }

    /// 环境变量覆盖
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_string("STUDENT_EMAIL") {
            self.student_email = v;
        }
        if let Some(v) = env_string("STUDENT_SECRET") {
            self.student_secret = v;
        }
        if let Some(v) = env_string("LLM_API_KEY").or_else(|| env_string("OPENAI_API_KEY")) {
            self.llm_api_key = v;
        }
        if let Some(v) = env_string("LLM_API_BASE_URL") {
            self.llm_api_base_url = v;
        }
        if let Some(v) = env_string("LLM_EXTRACT_MODEL") {
            self.llm_extract_model = v;
        }
        if let Some(v) = env_string("LLM_SOLVE_MODEL") {
            self.llm_solve_model = v;
        }
        if let Some(v) = env_string("HOST") {
            self.host = v;
        }
        if let Some(v) = env_string("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(v);
        }
        if let Some(v) = env_string("BROWSER_DEBUG_PORT") {
            let port = v.trim().parse().map_err(|_| ConfigError::InvalidVar {
                name: "BROWSER_DEBUG_PORT".to_string(),
                value: v.clone(),
                expected: "u16",
            })?;
            self.browser_debug_port = Some(port);
        }
        if let Some(v) = env_string("RUST_LOG") {
            self.rust_log = v;
        }
        if let Some(v) = env_string("LOG_FILE") {
            self.log_file = Some(v);
        }
        if let Some(v) = env_string("FAILURE_LOG_FILE") {
            self.failure_log_file = v;
        }

        env_parse("PORT", &mut self.port, "u16")?;
        env_parse("MAX_CONCURRENT_MODEL_CALLS", &mut self.max_concurrent_model_calls, "usize")?;
        env_parse("MAX_CONCURRENT_PAGES", &mut self.max_concurrent_pages, "usize")?;
        env_parse("MAX_CONCURRENT_CHAINS", &mut self.max_concurrent_chains, "usize")?;
        env_parse("RENDER_SETTLE_MS", &mut self.render_settle_ms, "u64")?;
        env_parse("CHAIN_DEADLINE_SECS", &mut self.chain_deadline_secs, "u64")?;
        env_parse("MIN_HOP_SECS", &mut self.min_hop_secs, "u64")?;
        env_parse("MAX_CHAIN_DEPTH", &mut self.max_chain_depth, "u32")?;
        env_parse("HOP_PAUSE_MS", &mut self.hop_pause_ms, "u64")?;
        env_parse("SKIP_ON_REJECTION", &mut self.skip_on_rejection, "bool")?;
        env_parse("RENDER_RETRIES", &mut self.render_retries, "u32")?;
        env_parse("FETCH_RETRIES", &mut self.fetch_retries, "u32")?;
        env_parse("MODEL_RETRIES", &mut self.model_retries, "u32")?;
        env_parse("SUBMIT_RETRIES", &mut self.submit_retries, "u32")?;
        env_parse("RETRY_BACKOFF_MS", &mut self.retry_backoff_ms, "u64")?;
        env_parse("RENDER_TIMEOUT_SECS", &mut self.render_timeout_secs, "u64")?;
        env_parse("FETCH_TIMEOUT_SECS", &mut self.fetch_timeout_secs, "u64")?;
        env_parse("MODEL_TIMEOUT_SECS", &mut self.model_timeout_secs, "u64")?;
        env_parse("SUBMIT_TIMEOUT_SECS", &mut self.submit_timeout_secs, "u64")?;
        env_parse("SUMMARY_CHAR_BUDGET", &mut self.summary_char_budget, "usize")?;
        env_parse("SAMPLE_ROWS", &mut self.sample_rows, "usize")?;
        env_parse("DISTINCT_VALUE_CAP", &mut self.distinct_value_cap, "usize")?;
        Ok(())
    }

    /// 身份和 API key 必须存在
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("STUDENT_EMAIL", &self.student_email),
            ("STUDENT_SECRET", &self.student_secret),
            ("LLM_API_KEY", &self.llm_api_key),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingVar {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// 链策略
    pub fn chain_policy(&self) -> ChainPolicy {
        let backoff = Duration::from_millis(self.retry_backoff_ms);
        ChainPolicy {
            chain_deadline: Duration::from_secs(self.chain_deadline_secs),
            min_hop: Duration::from_secs(self.min_hop_secs),
            max_chain_depth: self.max_chain_depth,
            hop_pause: Duration::from_millis(self.hop_pause_ms),
            skip_on_rejection: self.skip_on_rejection,
            render_retry: RetryPolicy::new(self.render_retries, backoff),
            fetch_retry: RetryPolicy::new(self.fetch_retries, backoff),
            model_retry: RetryPolicy::new(self.model_retries, backoff),
            submit_retry: RetryPolicy::new(self.submit_retries, backoff),
            render_timeout: Duration::from_secs(self.render_timeout_secs),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            submit_timeout: Duration::from_secs(self.submit_timeout_secs),
            analysis: AnalysisLimits {
                summary_char_budget: self.summary_char_budget,
                sample_rows: self.sample_rows,
                distinct_value_cap: self.distinct_value_cap,
            },
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str, target: &mut T, expected: &'static str) -> Result<(), ConfigError> {
    if let Some(value) = env_string(name) {
        *target = value.trim().parse().map_err(|_| ConfigError::InvalidVar {
            name: name.to_string(),
            value,
            expected,
        })?;
    }
    Ok(())
}
