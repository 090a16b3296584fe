//! 外部调用的超时与有限重试
//!
//! 每次尝试都带超时；两次尝试之间指数退避；任意时刻取消令牌触发都会立即返回。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// 最大尝试次数（含首次）
    pub max_attempts: u32,
    /// 单次尝试超时
    pub timeout: Duration,
    /// 首次重试前的退避
    pub initial_backoff: Duration,
    /// 退避上限
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(60),
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, timeout: Duration) -> Self {
        Self {
            max_attempts,
            timeout,
            ..Default::default()
        }
    }

    /// 第 `attempt` 次失败后的退避时长
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return self.initial_backoff;
        }
        let exp = (attempt - 1).min(16);
        let scaled = self.initial_backoff.as_millis().saturating_mul(1u128 << exp);
        Duration::from_millis(scaled.min(self.max_backoff.as_millis()) as u64)
    }
}

/// 重试耗尽或被取消
#[derive(Debug, Clone, PartialEq)]
pub enum RetryError {
    /// 最后一次尝试超时
    Timeout { attempts: u32 },
    /// 最后一次尝试返回错误
    Failed { attempts: u32, message: String },
    Cancelled,
}

impl RetryError {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Timeout { attempts } | RetryError::Failed { attempts, .. } => *attempts,
            RetryError::Cancelled => 0,
        }
    }

    pub fn message(&self) -> String {
        match self {
            RetryError::Timeout { .. } => "request timed out".to_string(),
            RetryError::Failed { message, .. } => message.clone(),
            RetryError::Cancelled => "cancelled".to_string(),
        }
    }
}

/// 带超时、有限次数地执行异步操作
///
/// `operation` 每次尝试都会被重新调用以构造新的 future
pub async fn retry_with_timeout<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    label: &str,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = RetryError::Timeout { attempts: 0 };

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            res = tokio::time::timeout(policy.timeout, operation(attempt)) => res,
        };

        match outcome {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(label, attempt, max_attempts, error = %e, "Attempt failed");
                last_error = RetryError::Failed {
                    attempts: attempt,
                    message: e.to_string(),
                };
            }
            Err(_) => {
                tracing::warn!(
                    label,
                    attempt,
                    max_attempts,
                    timeout_ms = policy.timeout.as_millis() as u64,
                    "Attempt timed out"
                );
                last_error = RetryError::Timeout { attempts: attempt };
            }
        }

        if attempt < max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(policy.backoff(attempt)) => {}
            }
        }
    }

    Err(last_error)
}
