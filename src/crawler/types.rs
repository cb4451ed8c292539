use crate::retry::RetryPolicy;
use crate::types::{CrawlStatistics, ImageRecord};
use std::collections::HashSet;
use std::time::Duration;

/// 爬蟲配置
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// 最多造訪頁數（抓取失敗的頁面也算）
    pub max_pages: usize,
    /// 請求超時
    pub timeout: Duration,
    /// 頁面抓取的重試策略
    pub page_retry: RetryPolicy,
    /// 圖片下載的重試策略
    pub image_retry: RetryPolicy,
    /// 每頁之間的間隔
    pub politeness_delay: Duration,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            timeout: Duration::from_secs(10),
            page_retry: RetryPolicy::new(3, Duration::from_secs(1)),
            image_retry: RetryPolicy::new(2, Duration::from_millis(500)),
            politeness_delay: Duration::from_secs(1),
        }
    }
}

impl CrawlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_page_retry(mut self, retry: RetryPolicy) -> Self {
        self.page_retry = retry;
        self
    }

    pub fn with_image_retry(mut self, retry: RetryPolicy) -> Self {
        self.image_retry = retry;
        self
    }

    pub fn with_politeness_delay(mut self, delay: Duration) -> Self {
        self.politeness_delay = delay;
        self
    }
}

/// 爬蟲狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    Running,
    Completed,
}

/// 一次爬取的結果
#[derive(Debug)]
pub struct CrawlOutcome {
    /// 成功下載的圖片
    pub images: HashSet<ImageRecord>,
    pub statistics: CrawlStatistics,
    /// 已造訪的網址（含抓取失敗的）
    pub visited: HashSet<String>,
    /// 因頁數上限而沒有造訪的網址
    pub pending: Vec<String>,
}
