use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// 成功下載的單張圖片
///
/// 以來源 URL 作為唯一識別：相等與 hash 只看 `url`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    /// 原始 URL
    pub url: String,
    /// 檔案名稱（由 URL 決定）
    pub filename: String,
    /// 儲存路徑
    pub path: PathBuf,
    /// 寫入的位元組數
    pub size: Option<u64>,
    /// 下載時間
    pub downloaded_at: DateTime<Utc>,
}

impl ImageRecord {
    pub fn new(url: String, filename: String, path: PathBuf, size: Option<u64>) -> Self {
        Self {
            url,
            filename,
            path,
            size,
            downloaded_at: Utc::now(),
        }
    }

    /// 是否來自同一個 URL
    pub fn same_source(&self, other: &ImageRecord) -> bool {
        self.url == other.url
    }

    /// 依檔案大小排序，沒有大小的視為 0
    pub fn cmp_by_size(&self, other: &ImageRecord) -> Ordering {
        self.size.unwrap_or(0).cmp(&other.size.unwrap_or(0))
    }
}

impl PartialEq for ImageRecord {
    fn eq(&self, other: &Self) -> bool {
        self.same_source(other)
    }
}

impl Eq for ImageRecord {}

impl Hash for ImageRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

impl fmt::Display for ImageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Image({}, {})", self.filename, self.url)
    }
}

/// 單次爬取的統計
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlStatistics {
    /// 成功抓取的頁面數
    pub pages_visited: usize,
    /// 嘗試下載的圖片數
    pub images_discovered: usize,
    pub successful_downloads: usize,
    pub failed_downloads: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記錄開始時間
    pub fn start(&mut self) {
        self.started_at = Some(Utc::now());
    }

    /// 記錄結束時間
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn record_page(&mut self) {
        self.pages_visited += 1;
    }

    /// 記錄一次圖片下載結果
    pub fn record_download(&mut self, success: bool) {
        self.images_discovered += 1;
        if success {
            self.successful_downloads += 1;
        } else {
            self.failed_downloads += 1;
        }
    }

    /// 成功率（百分比），沒有圖片時為 0
    pub fn success_rate(&self) -> f64 {
        if self.images_discovered == 0 {
            return 0.0;
        }
        self.successful_downloads as f64 / self.images_discovered as f64 * 100.0
    }

    /// 執行時間（秒），缺少任一時間點時為 0
    pub fn duration(&self) -> f64 {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        }
    }

    /// 合併兩份計數，時間取較早的開始與較晚的結束
    pub fn combine(&self, other: &CrawlStatistics) -> CrawlStatistics {
        CrawlStatistics {
            pages_visited: self.pages_visited + other.pages_visited,
            images_discovered: self.images_discovered + other.images_discovered,
            successful_downloads: self.successful_downloads + other.successful_downloads,
            failed_downloads: self.failed_downloads + other.failed_downloads,
            started_at: pick(self.started_at, other.started_at, std::cmp::min),
            finished_at: pick(self.finished_at, other.finished_at, std::cmp::max),
        }
    }
}

fn pick<T: Ord>(a: Option<T>, b: Option<T>, choose: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(choose(a, b)),
        (a, b) => a.or(b),
    }
}
