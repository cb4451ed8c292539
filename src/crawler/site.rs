use super::downloader::ImageDownloader;
use crate::error::CrawlError;
use crate::parser::{HtmlExtractor, ParserConfig};
use crate::types::ImageRecord;
use anyhow::Result;
use std::collections::HashSet;

/// 網站爬取策略 - 不同網站實作不同的抽取與下載方式
#[async_trait::async_trait]
pub trait SiteCrawler: Send + Sync {
    /// 策略名稱
    fn name(&self) -> &str;

    /// 網站的 base URL（判斷同網域用）
    fn base_url(&self) -> &str;

    /// 同網域且可爬的連結
    fn extract_links(&self, html: &str, page_url: &str) -> Result<HashSet<String>, CrawlError>;

    /// 頁面上的圖片網址
    fn extract_images(&self, html: &str, page_url: &str) -> Result<HashSet<String>, CrawlError>;

    /// 下載單張圖片
    async fn download_image(&self, image_url: &str) -> Result<ImageRecord, CrawlError>;
}

/// mempack.ru 的實作
pub struct MempackSite {
    base_url: String,
    extractor: HtmlExtractor,
    downloader: ImageDownloader,
}

impl MempackSite {
    pub const DEFAULT_BASE_URL: &'static str = "https://mempack.ru/";

    pub fn new(base_url: &str, downloader: ImageDownloader) -> Result<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            extractor: HtmlExtractor::new(ParserConfig::mempack())?,
            downloader,
        })
    }
}

#[async_trait::async_trait]
impl SiteCrawler for MempackSite {
    fn name(&self) -> &str {
        "mempack"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn extract_links(&self, html: &str, page_url: &str) -> Result<HashSet<String>, CrawlError> {
        self.extractor.extract_links(html, page_url, &self.base_url)
    }

    fn extract_images(&self, html: &str, page_url: &str) -> Result<HashSet<String>, CrawlError> {
        self.extractor.extract_images(html, page_url)
    }

    async fn download_image(&self, image_url: &str) -> Result<ImageRecord, CrawlError> {
        self.downloader.download(image_url).await
    }
}

/// 通用的 CSS Selector 實作（可配置）
pub struct GenericSite {
    base_url: String,
    extractor: HtmlExtractor,
    downloader: ImageDownloader,
}

impl GenericSite {
    pub fn new(base_url: &str, config: ParserConfig, downloader: ImageDownloader) -> Result<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            extractor: HtmlExtractor::new(config)?,
            downloader,
        })
    }
}

#[async_trait::async_trait]
impl SiteCrawler for GenericSite {
    fn name(&self) -> &str {
        "generic"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn extract_links(&self, html: &str, page_url: &str) -> Result<HashSet<String>, CrawlError> {
        self.extractor.extract_links(html, page_url, &self.base_url)
    }

    fn extract_images(&self, html: &str, page_url: &str) -> Result<HashSet<String>, CrawlError> {
        self.extractor.extract_images(html, page_url)
    }

    async fn download_image(&self, image_url: &str) -> Result<ImageRecord, CrawlError> {
        self.downloader.download(image_url).await
    }
}
