use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// 固定間隔的重試策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最多嘗試次數（含第一次）
    pub max_attempts: u32,
    /// 每次重試前等待的時間
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// 任何錯誤都重試
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_if(op, |_| true).await
    }

    /// 只在 `should_retry` 回傳 true 時重試，最後一次的錯誤原樣回傳
    ///
    /// `op` 收到的參數是目前第幾次嘗試（從 1 開始）。
    pub async fn run_if<T, E, F, Fut, P>(&self, mut op: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && should_retry(&e) => {
                    debug!("第 {}/{} 次嘗試失敗，{:?} 後重試: {}", attempt, max_attempts, self.delay, e);
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
