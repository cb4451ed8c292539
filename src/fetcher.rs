use crate::error::CrawlError;
use crate::retry::RetryPolicy;
use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::debug;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// 建立整次爬取共用的 HTTP 客戶端
///
/// 頁面與圖片都走同一個 client，共用連線池、cookie 與瀏覽器標頭。
/// `timeout` 限制連線與每次讀取，不限制整個傳輸，大檔只要持續有資料就不會中斷。
pub fn build_client(timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
    ));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(
        "ru-RU,ru;q=0.8,en-US;q=0.5,en;q=0.3"
    ));

    Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .default_headers(headers)
        .cookie_store(true)
        .build()
        .context("無法建立 HTTP 客戶端")
}

/// HTTP Fetcher trait
pub trait Fetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, CrawlError>;
}

/// HTTP 實作
pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(client: Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// 單次請求，一律以 UTF-8 解碼（不理會伺服器宣告的 charset）
    async fn fetch_once(&self, url: &str, attempt: u32) -> Result<String, reqwest::Error> {
        if attempt > 1 {
            debug!("重試 {} - {}", attempt - 1, url);
        }

        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, CrawlError> {
        self.retry
            .run(|attempt| self.fetch_once(url, attempt))
            .await
            .map_err(|source| CrawlError::Network {
                url: url.to_string(),
                source,
            })
    }
}
