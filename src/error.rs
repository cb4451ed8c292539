use thiserror::Error;

/// 爬蟲錯誤分類
///
/// 單一網址的失敗（頁面抓取、圖片下載、解析）都只影響該網址，
/// 由 engine 記錄後繼續爬取。
#[derive(Debug, Error)]
pub enum CrawlError {
    /// 重試用盡後仍無法取得頁面（逾時、連線錯誤、非 2xx）
    #[error("網路錯誤 {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// 無法解析頁面內容
    #[error("解析失敗 {url}: {reason}")]
    Parsing { url: String, reason: String },

    /// 圖片下載失敗
    #[error("下載失敗 {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: DownloadCause,
    },
}

/// 圖片下載失敗的原因
#[derive(Debug, Error)]
pub enum DownloadCause {
    #[error("HTTP 請求失敗: {0}")]
    Http(#[from] reqwest::Error),

    /// 回應成功但 content-type 不是 image/*
    #[error("不是圖片內容: {0:?}")]
    NotImage(String),

    #[error("寫入檔案失敗: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    pub fn parsing(url: &str, reason: impl Into<String>) -> Self {
        Self::Parsing {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub fn download(url: &str, source: impl Into<DownloadCause>) -> Self {
        Self::Download {
            url: url.to_string(),
            source: source.into(),
        }
    }

    /// 是否為可重試的傳輸層錯誤
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Download { source, .. } => matches!(source, DownloadCause::Http(_)),
            Self::Parsing { .. } => false,
        }
    }

    /// 發生錯誤的網址
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. } | Self::Parsing { url, .. } | Self::Download { url, .. } => url,
        }
    }
}
