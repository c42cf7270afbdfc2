//! 有界重试与指数退避

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

/// 重试策略：最多重试 `max_retries` 次，第 n 次重试前等待 `base_backoff * 2^n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        base_backoff: Duration::ZERO,
    };

    pub fn new(max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            max_retries,
            base_backoff,
        }
    }

    /// 第 `attempt` 次重试前的等待时间（从 0 开始）
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(1u32 << attempt.min(10))
    }
}

/// 执行 `op`，遇到瞬时错误时按策略重试
///
/// # 参数
/// - `policy`: 重试策略
/// - `label`: 日志里的操作名
/// - `is_transient`: 判断错误是否值得重试
/// - `op`: 每次调用生成一个新的 future
pub async fn retry_async<T, E, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    is_transient: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries && is_transient(&e) => {
                let delay = policy.backoff(attempt);
                warn!(
                    "{} 失败 (尝试 {}/{}): {}, 等待 {:?} 后重试...",
                    label,
                    attempt + 1,
                    policy.max_retries + 1,
                    e,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32, String> = retry_async(
            RetryPolicy::new(3, Duration::from_millis(10)),
            "测试",
            |_| true,
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("boom".to_string())
                } else {
                    Ok(n)
                }
            },
        )
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_definitive_error_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), String> = retry_async(
            RetryPolicy::new(5, Duration::from_millis(10)),
            "测试",
            |e: &String| e != "rejected",
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("rejected".to_string())
            },
        )
        .await;

        tokio_test::assert_err!(result);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_is_bounded() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), String> = retry_async(
            RetryPolicy::new(2, Duration::from_millis(10)),
            "测试",
            |_| true,
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("timeout".to_string())
            },
        )
        .await;

        tokio_test::assert_err!(result);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
