mod types;
mod error;
mod url_filter;
mod retry;
mod file_manager;
mod fetcher;
mod parser;
mod crawler;

use crawler::{CrawlOutcome, CrawlerConfig, CrawlerEngine, GenericSite, ImageDownloader, MempackSite, SiteCrawler};
use fetcher::{HttpFetcher, build_client};
use file_manager::FileManager;
use parser::ParserConfig;
use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 網站圖片爬蟲：從種子網址廣度優先爬取同網域頁面並下載圖片
#[derive(Parser, Debug)]
#[command(name = "mempack-crawler", version)]
struct Cli {
    /// 最多造訪頁數（正整數）
    #[arg(default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: u32,

    /// 種子網址
    #[arg(long, env = "MEMPACK_BASE_URL", default_value = MempackSite::DEFAULT_BASE_URL)]
    url: String,

    /// 圖片輸出目錄
    #[arg(short, long, env = "MEMPACK_OUTPUT_DIR", default_value = "mempack_memes")]
    output: PathBuf,

    /// 網站爬取策略
    #[arg(long, value_enum, default_value_t = SiteKind::Mempack)]
    site: SiteKind,

    /// 以 JSON 輸出統計
    #[arg(long)]
    json: bool,

    /// 請求超時（秒）
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// 顯示除錯訊息
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SiteKind {
    /// mempack.ru（含 lazy-load 圖片與登入頁過濾）
    Mempack,
    /// 只讀 img src 的通用爬取
    Generic,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "mempack_crawler=debug"
    } else {
        "mempack_crawler=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    validate_seed(&cli.url)?;

    let config = CrawlerConfig::new()
        .with_max_pages(cli.max_pages as usize)
        .with_timeout(Duration::from_secs(cli.timeout));
    let client = build_client(config.timeout)?;
    let file_manager = FileManager::new(&cli.output).context("無法開始爬取")?;
    let downloader = ImageDownloader::new(client.clone(), file_manager, config.image_retry);

    let site: Arc<dyn SiteCrawler> = match cli.site {
        SiteKind::Mempack => Arc::new(MempackSite::new(&cli.url, downloader)?),
        SiteKind::Generic => Arc::new(GenericSite::new(&cli.url, ParserConfig::default(), downloader)?),
    };
    let fetcher = HttpFetcher::new(client, config.page_retry);

    if !cli.json {
        println!("=== MemPack Crawler ===\n");
        println!("🎯 目標網站: {}", cli.url);
        println!("💾 儲存目錄: {}", cli.output.display());
        println!("🔄 開始爬取...\n");
    }

    let mut engine = CrawlerEngine::new(site, fetcher, config).with_progress(progress_bar(cli.json));

    let outcome = tokio::select! {
        outcome = engine.run(&cli.url) => outcome?,
        _ = tokio::signal::ctrl_c() => {
            println!("\n⏹️  使用者中斷爬取，已下載的檔案保留在 {}", cli.output.display());
            return Ok(());
        }
    };
    tracing::debug!("爬蟲狀態: {:?}", engine.state());

    if cli.json {
        print_json(&outcome, &cli.output)?;
    } else {
        print_statistics(&outcome, &cli.output);
    }

    if outcome.statistics.pages_visited == 0 {
        eprintln!("❌ 無法開始爬取: 種子網址 {} 無法連線", cli.url);
        std::process::exit(1);
    }

    Ok(())
}

/// 在任何網路請求前檢查種子網址
fn validate_seed(seed: &str) -> Result<()> {
    let url = url::Url::parse(seed).with_context(|| format!("無效的網址: {seed}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("只支援 http/https 網址: {seed}");
    }
    Ok(())
}

fn progress_bar(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar().template("{spinner} [{pos}/{len}] {wide_msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn print_statistics(outcome: &CrawlOutcome, output: &Path) {
    let stats = &outcome.statistics;

    println!("\n╔══════════════════════════════════╗");
    println!("║       📊 爬取統計               ║");
    println!("╠══════════════════════════════════╣");
    println!("║ 處理頁數: {:>20} ║", stats.pages_visited);
    println!("║ 找到圖片: {:>20} ║", stats.images_discovered);
    println!("║ 下載成功: {:>20} ║", stats.successful_downloads);
    println!("║ 下載失敗: {:>20} ║", stats.failed_downloads);
    println!("║ 成功率:   {:>19.1}% ║", stats.success_rate());
    println!("║ 執行時間: {:>17.2} 秒 ║", stats.duration());
    println!("╚══════════════════════════════════╝");
    println!("📁 圖片目錄: {}", output.display());
    if let Some(largest) = outcome.images.iter().max_by(|a, b| a.cmp_by_size(b)) {
        println!("🏆 最大圖片: {} ({} bytes)", largest, largest.size.unwrap_or(0));
    }
    if !outcome.pending.is_empty() {
        println!("⏭️  達到頁數上限，尚有 {} 個網址未造訪", outcome.pending.len());
    }
}

fn print_json(outcome: &CrawlOutcome, output: &Path) -> Result<()> {
    let stats = &outcome.statistics;
    let report = serde_json::json!({
        "statistics": stats,
        "success_rate": stats.success_rate(),
        "duration_secs": stats.duration(),
        "output_dir": output,
        "pending": outcome.pending.len(),
        "images": outcome.images,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["mempack-crawler"]).unwrap();
        assert_eq!(cli.max_pages, 50);
        assert_eq!(cli.output, PathBuf::from("mempack_memes"));
        assert!(matches!(cli.site, SiteKind::Mempack));
    }

    #[test]
    fn test_cli_rejects_invalid_budget() {
        assert!(Cli::try_parse_from(["mempack-crawler", "0"]).is_err());
        assert!(Cli::try_parse_from(["mempack-crawler", "-5"]).is_err());
        assert!(Cli::try_parse_from(["mempack-crawler", "lots"]).is_err());

        let cli = Cli::try_parse_from(["mempack-crawler", "7", "--site", "generic"]).unwrap();
        assert_eq!(cli.max_pages, 7);
        assert!(matches!(cli.site, SiteKind::Generic));
    }

    #[test]
    fn test_validate_seed() {
        assert!(validate_seed("https://mempack.ru/").is_ok());
        assert!(validate_seed("mempack.ru").is_err());
        assert!(validate_seed("ftp://mempack.ru/").is_err());
    }
}
