// 子模組
pub mod types;
pub mod frontier;
pub mod site;
pub mod engine;
pub mod downloader;

// 重新導出
pub use types::{CrawlOutcome, CrawlerConfig};
pub use site::{GenericSite, MempackSite, SiteCrawler};
pub use engine::CrawlerEngine;
pub use downloader::ImageDownloader;
