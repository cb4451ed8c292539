use crate::fetcher::{Fetcher, HttpFetcher};
use crate::types::{CrawlStatistics, ImageRecord};
use super::frontier::Frontier;
use super::site::SiteCrawler;
use super::types::{CrawlOutcome, CrawlState, CrawlerConfig};
use anyhow::{Result, bail};
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 主爬蟲引擎
///
/// 單一任務依序執行：抓頁面、下載圖片、擴充佇列，每頁之間固定等待。
pub struct CrawlerEngine {
    site: Arc<dyn SiteCrawler>,
    fetcher: HttpFetcher,
    config: CrawlerConfig,
    state: CrawlState,
    statistics: CrawlStatistics,
    progress: ProgressBar,
}

impl CrawlerEngine {
    pub fn new(site: Arc<dyn SiteCrawler>, fetcher: HttpFetcher, config: CrawlerConfig) -> Self {
        Self {
            site,
            fetcher,
            config,
            state: CrawlState::Idle,
            statistics: CrawlStatistics::new(),
            progress: ProgressBar::hidden(),
        }
    }

    /// 顯示進度用的進度條（預設隱藏）
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// 從 `start_url` 開始廣度優先爬取
    pub async fn run(&mut self, start_url: &str) -> Result<CrawlOutcome> {
        if self.state != CrawlState::Idle {
            bail!("爬蟲已經執行過 (目前狀態: {:?})", self.state);
        }
        self.state = CrawlState::Running;
        self.statistics.start();

        let max_pages = self.config.max_pages;
        let mut frontier = Frontier::new(start_url);
        let mut downloaded: HashSet<String> = HashSet::new();
        let mut images: HashSet<ImageRecord> = HashSet::new();

        info!(
            "🔄 開始爬取 {} [{} @ {}]，最多 {} 頁",
            start_url,
            self.site.name(),
            self.site.base_url(),
            max_pages
        );
        self.progress.set_length(max_pages as u64);

        while frontier.visited_count() < max_pages {
            let Some(url) = frontier.pop_next() else {
                break;
            };
            if frontier.is_visited(&url) {
                continue;
            }

            info!("📄 處理中 [{}/{}]: {}", frontier.visited_count() + 1, max_pages, url);
            self.progress.set_message(url.clone());

            match self.fetcher.fetch_page(&url).await {
                Ok(html) => {
                    frontier.mark_visited(url.clone());
                    self.statistics.record_page();

                    let page_stats = self.process_images(&html, &url, &mut downloaded, &mut images).await;
                    debug!(
                        "{}: {} 張圖片 ({} 成功 / {} 失敗)",
                        url,
                        page_stats.images_discovered,
                        page_stats.successful_downloads,
                        page_stats.failed_downloads
                    );
                    self.statistics = self.statistics.combine(&page_stats);

                    if frontier.visited_count() < max_pages {
                        match self.site.extract_links(&html, &url) {
                            Ok(links) => {
                                let added = links.into_iter().filter(|link| frontier.enqueue(link.clone())).count();
                                debug!("新增 {} 個連結，佇列剩餘 {}", added, frontier.pending_count());
                            }
                            Err(e) => warn!("❌ 無法解析連結: {}", e),
                        }
                    }
                }
                Err(e) => {
                    // 抓不到的頁面一樣算進頁數上限
                    warn!(url = e.url(), "❌ 頁面失敗: {}", e);
                    frontier.mark_visited(url);
                }
            }

            self.progress.inc(1);

            if !frontier.is_empty() && frontier.visited_count() < max_pages {
                tokio::time::sleep(self.config.politeness_delay).await;
            }
        }

        self.statistics.finish();
        self.state = CrawlState::Completed;
        self.progress.finish_and_clear();

        info!(
            "✨ 爬取完成: {} 頁，{} 張圖片 ({} 成功 / {} 失敗)",
            self.statistics.pages_visited,
            self.statistics.images_discovered,
            self.statistics.successful_downloads,
            self.statistics.failed_downloads,
        );

        let (visited, pending) = frontier.into_parts();
        Ok(CrawlOutcome {
            images,
            statistics: self.statistics.clone(),
            visited,
            pending,
        })
    }

    /// 下載頁面上還沒成功下載過的圖片，回傳本頁的下載計數
    ///
    /// 之前失敗的圖片在其他頁面再出現時會重新嘗試。
    async fn process_images(
        &self,
        html: &str,
        page_url: &str,
        downloaded: &mut HashSet<String>,
        images: &mut HashSet<ImageRecord>,
    ) -> CrawlStatistics {
        let mut page_stats = CrawlStatistics::new();

        let image_urls = match self.site.extract_images(html, page_url) {
            Ok(urls) => urls,
            Err(e) => {
                warn!("❌ 無法解析圖片: {}", e);
                return page_stats;
            }
        };

        for image_url in image_urls {
            if downloaded.contains(&image_url) {
                continue;
            }

            match self.site.download_image(&image_url).await {
                Ok(record) => {
                    page_stats.record_download(true);
                    downloaded.insert(image_url);
                    images.insert(record);
                }
                Err(e) => {
                    warn!("下載失敗: {}", e);
                    page_stats.record_download(false);
                }
            }
        }

        page_stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::downloader::ImageDownloader;
    use crate::crawler::site::MempackSite;
    use crate::fetcher::build_client;
    use crate::file_manager::FileManager;
    use crate::retry::RetryPolicy;
    use std::time::Duration;
    use tempfile::TempDir;

    fn engine(base_url: &str, tmp: &TempDir, max_pages: usize) -> CrawlerEngine {
        let config = CrawlerConfig::default()
            .with_max_pages(max_pages)
            .with_page_retry(RetryPolicy::new(2, Duration::ZERO))
            .with_image_retry(RetryPolicy::new(1, Duration::ZERO))
            .with_politeness_delay(Duration::ZERO);

        let client = build_client(Duration::from_secs(5)).unwrap();
        let file_manager = FileManager::new(tmp.path()).unwrap();
        let downloader = ImageDownloader::new(client.clone(), file_manager, config.image_retry);
        let site = Arc::new(MempackSite::new(base_url, downloader).unwrap());
        let fetcher = HttpFetcher::new(client, config.page_retry);

        CrawlerEngine::new(site, fetcher, config)
    }

    async fn html_page(server: &mut mockito::Server, path: &str, body: &str) -> mockito::Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(body)
            .create_async()
            .await
    }

    async fn image(server: &mut mockito::Server, path: &str, hits: usize) -> mockito::Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(b"\x89PNG\r\n\x1a\n")
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_page_budget_of_one() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();

        let _home = html_page(
            &mut server,
            "/",
            r#"<a href="/a">a</a><a href="/b">b</a><img src="/cat.png">"#,
        )
        .await;
        let cat = image(&mut server, "/cat.png", 1).await;
        let page_a = server.mock("GET", "/a").expect(0).create_async().await;
        let page_b = server.mock("GET", "/b").expect(0).create_async().await;

        let tmp = TempDir::new().unwrap();
        let mut engine = engine(&base, &tmp, 1);
        let outcome = engine.run(&format!("{base}/")).await.unwrap();

        assert_eq!(outcome.visited.len(), 1);
        assert_eq!(outcome.statistics.pages_visited, 1);
        assert_eq!(outcome.statistics.images_discovered, 1);
        assert_eq!(outcome.statistics.successful_downloads, 1);
        assert_eq!(outcome.images.len(), 1);
        // 頁數已滿，不再抽連結
        assert!(outcome.pending.is_empty());
        assert_eq!(engine.state(), CrawlState::Completed);
        cat.assert_async().await;
        page_a.assert_async().await;
        page_b.assert_async().await;
    }

    #[tokio::test]
    async fn test_breadth_first_with_dedup() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();

        let _home = html_page(
            &mut server,
            "/",
            r#"<a href="/a">a</a><a href="/b">b</a><a href="/logout">bye</a>
               <img src="/shared.png">"#,
        )
        .await;
        let _page_a = html_page(
            &mut server,
            "/a",
            r#"<a href="/">home</a><a href="/c">c</a><img src="/shared.png"><img src="/a.png">"#,
        )
        .await;
        let _page_b = html_page(&mut server, "/b", r#"<img data-src="/b.png"><a href="/a">a</a>"#).await;
        let _page_c = html_page(&mut server, "/c", r#"<img src="/missing.jpg">"#).await;
        let shared = image(&mut server, "/shared.png", 1).await;
        let a_png = image(&mut server, "/a.png", 1).await;
        let b_png = image(&mut server, "/b.png", 1).await;
        let missing = server
            .mock("GET", "/missing.jpg")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let logout = server.mock("GET", "/logout").expect(0).create_async().await;

        let tmp = TempDir::new().unwrap();
        let mut engine = engine(&base, &tmp, 50);
        let outcome = engine.run(&format!("{base}/")).await.unwrap();

        let stats = &outcome.statistics;
        assert_eq!(stats.pages_visited, 4);
        assert_eq!(stats.images_discovered, 4);
        assert_eq!(stats.successful_downloads, 3);
        assert_eq!(stats.failed_downloads, 1);
        assert_eq!(stats.successful_downloads + stats.failed_downloads, stats.images_discovered);
        assert_eq!(outcome.images.len(), 3);
        assert!(outcome.pending.is_empty());
        assert!(stats.finished_at.is_some());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 3);

        for mock in [shared, a_png, b_png, missing, logout] {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_failed_image_is_attempted_again_on_later_page() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();

        let _home = html_page(&mut server, "/", r#"<a href="/a">a</a><img src="/flaky.png">"#).await;
        let _page_a = html_page(&mut server, "/a", r#"<img src="/flaky.png"><img src="/ok.png">"#).await;
        let flaky = server
            .mock("GET", "/flaky.png")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;
        let ok = image(&mut server, "/ok.png", 1).await;

        let tmp = TempDir::new().unwrap();
        let mut engine = engine(&base, &tmp, 5);
        let outcome = engine.run(&format!("{base}/")).await.unwrap();

        let stats = &outcome.statistics;
        assert_eq!(stats.pages_visited, 2);
        assert_eq!(stats.images_discovered, 3);
        assert_eq!(stats.failed_downloads, 2);
        assert_eq!(stats.successful_downloads, 1);
        assert_eq!(stats.successful_downloads + stats.failed_downloads, stats.images_discovered);
        assert!(stats.started_at.is_some());
        flaky.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_page_counts_against_budget() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();

        let _home = html_page(&mut server, "/", r#"<a href="/down">down</a><a href="/mid">mid</a>"#).await;
        let _mid = html_page(&mut server, "/mid", r#"<a href="/deep">deep</a>"#).await;
        let down = server
            .mock("GET", "/down")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;
        let deep = server.mock("GET", "/deep").expect(0).create_async().await;

        let tmp = TempDir::new().unwrap();
        let mut engine = engine(&base, &tmp, 3);
        let outcome = engine.run(&format!("{base}/")).await.unwrap();

        assert_eq!(outcome.visited.len(), 3);
        assert!(outcome.visited.contains(&format!("{base}/down")));
        assert_eq!(outcome.statistics.pages_visited, 2);
        down.assert_async().await;
        deep.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_seed() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let _home = server.mock("GET", "/").with_status(503).create_async().await;

        let tmp = TempDir::new().unwrap();
        let mut engine = engine(&base, &tmp, 5);
        let outcome = engine.run(&format!("{base}/")).await.unwrap();

        assert_eq!(outcome.visited.len(), 1);
        assert_eq!(outcome.statistics.pages_visited, 0);
        assert_eq!(outcome.statistics.success_rate(), 0.0);
        assert!(outcome.images.is_empty());
        assert!(outcome.pending.is_empty());
    }

    #[tokio::test]
    async fn test_run_twice_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let _home = html_page(&mut server, "/", "<p>empty</p>").await;

        let tmp = TempDir::new().unwrap();
        let mut engine = engine(&base, &tmp, 1);
        assert_eq!(engine.state(), CrawlState::Idle);

        engine.run(&format!("{base}/")).await.unwrap();
        assert!(engine.run(&format!("{base}/")).await.is_err());
        assert_eq!(engine.state(), CrawlState::Completed);
    }
}
