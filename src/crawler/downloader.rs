use crate::error::{CrawlError, DownloadCause};
use crate::file_manager::FileManager;
use crate::retry::RetryPolicy;
use crate::types::ImageRecord;
use crate::url_filter::{IMAGE_EXTENSIONS, path_of};
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info};

/// 圖片下載器
#[derive(Clone)]
pub struct ImageDownloader {
    client: Client,
    file_manager: FileManager,
    retry: RetryPolicy,
}

impl ImageDownloader {
    pub fn new(client: Client, file_manager: FileManager, retry: RetryPolicy) -> Self {
        Self {
            client,
            file_manager,
            retry,
        }
    }

    /// 下載並儲存單張圖片，只在傳輸錯誤時重試
    pub async fn download(&self, url: &str) -> Result<ImageRecord, CrawlError> {
        self.retry
            .run_if(|attempt| self.download_once(url, attempt), CrawlError::is_retryable)
            .await
    }

    async fn download_once(&self, url: &str, attempt: u32) -> Result<ImageRecord, CrawlError> {
        if attempt > 1 {
            debug!("重試下載 {} - {}", attempt - 1, url);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CrawlError::download(url, e))?;

        // 擋掉以 200 回傳的 HTML 錯誤頁
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(CrawlError::download(url, DownloadCause::NotImage(content_type)));
        }

        let filename = derive_filename(url, &content_type);
        let mut writer = self
            .file_manager
            .create_image(&filename)
            .await
            .map_err(|e| CrawlError::download(url, e))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let result = match chunk {
                Ok(bytes) => writer.write_chunk(&bytes).await.map_err(DownloadCause::from),
                Err(e) => Err(DownloadCause::from(e)),
            };
            if let Err(cause) = result {
                writer.discard().await;
                return Err(CrawlError::download(url, cause));
            }
        }

        let (path, size) = writer.finish().await.map_err(|e| CrawlError::download(url, e))?;
        info!("✅ 已下載: {} ({} bytes)", filename, size);

        Ok(ImageRecord::new(url.to_string(), filename, path, Some(size)))
    }
}

/// 由 URL 決定檔名：`meme_<sha256 前 10 碼><副檔名>`
///
/// 副檔名依序取自 URL path、content-type，最後預設 `.jpg`。
pub fn derive_filename(url: &str, content_type: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    let ext = extension_from_path(url)
        .or_else(|| extension_from_content_type(content_type))
        .unwrap_or(".jpg");

    format!("meme_{}{}", &hash[..10], ext)
}

fn extension_from_path(url: &str) -> Option<&'static str> {
    let ext = Path::new(path_of(url)).extension()?.to_str()?.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .copied()
        .find(|known| known[1..] == ext)
}

fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_lowercase();
    match mime.as_str() {
        "image/jpeg" | "image/jpg" => Some(".jpg"),
        "image/png" => Some(".png"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        _ => None,
    }
}
