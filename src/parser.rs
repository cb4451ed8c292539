use crate::error::CrawlError;
use crate::url_filter::{is_excluded, is_image_url, is_same_domain};
use anyhow::Result;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// Parser 配置
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// 連結選擇器
    pub link_selector: String,
    /// 圖片選擇器
    pub image_selector: String,
    /// 依序嘗試的圖片 URL 屬性，取第一個非空值
    pub image_attrs: Vec<String>,
    /// 是否套用排除清單（logout、login…）
    pub skip_excluded: bool,
}

impl ParserConfig {
    /// 只讀 `src`、不過濾排除清單
    pub fn plain() -> Self {
        Self {
            link_selector: "a[href]".to_string(),
            image_selector: "img".to_string(),
            image_attrs: vec!["src".to_string()],
            skip_excluded: false,
        }
    }

    /// mempack.ru：支援 lazy-load 的 `data-src`，並避開登入相關頁面
    pub fn mempack() -> Self {
        Self {
            image_attrs: vec!["src".to_string(), "data-src".to_string()],
            skip_excluded: true,
            ..Self::plain()
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::plain()
    }
}

/// 從 HTML 抽出同網域連結與圖片網址
pub struct HtmlExtractor {
    config: ParserConfig,
    link_selector: Selector,
    image_selector: Selector,
}

impl HtmlExtractor {
    pub fn new(config: ParserConfig) -> Result<Self> {
        let link_selector = Selector::parse(&config.link_selector)
            .map_err(|e| anyhow::anyhow!("連結選擇器錯誤: {:?}", e))?;
        let image_selector = Selector::parse(&config.image_selector)
            .map_err(|e| anyhow::anyhow!("圖片選擇器錯誤: {:?}", e))?;

        Ok(Self {
            config,
            link_selector,
            image_selector,
        })
    }

    /// 同網域（相對於 `base_url`）的連結，已轉成絕對網址
    pub fn extract_links(
        &self,
        html: &str,
        page_url: &str,
        base_url: &str,
    ) -> Result<HashSet<String>, CrawlError> {
        let base = parse_page_url(page_url)?;
        let document = parse_document(html, page_url);

        let links = document
            .select(&self.link_selector)
            .filter_map(|elem| elem.value().attr("href"))
            .filter_map(|href| base.join(href.trim()).ok())
            .map(String::from)
            .filter(|url| is_same_domain(url, base_url))
            .filter(|url| !(self.config.skip_excluded && is_excluded(url)))
            .collect();

        Ok(links)
    }

    /// 頁面引用的圖片網址（依副檔名判斷）
    pub fn extract_images(&self, html: &str, page_url: &str) -> Result<HashSet<String>, CrawlError> {
        let base = parse_page_url(page_url)?;
        let document = parse_document(html, page_url);

        let images = document
            .select(&self.image_selector)
            .filter_map(|elem| {
                self.config
                    .image_attrs
                    .iter()
                    .filter_map(|attr| elem.value().attr(attr))
                    .map(str::trim)
                    .find(|src| !src.is_empty())
            })
            .filter_map(|src| base.join(src).ok())
            .map(String::from)
            .filter(|url| is_image_url(url))
            .collect();

        Ok(images)
    }
}

fn parse_page_url(page_url: &str) -> Result<Url, CrawlError> {
    Url::parse(page_url).map_err(|e| CrawlError::parsing(page_url, format!("無效的頁面網址: {e}")))
}

/// html5ever 會自行修正壞掉的標記，這裡只記錄錯誤數量
fn parse_document(html: &str, page_url: &str) -> Html {
    let document = Html::parse_document(html);
    if !document.errors.is_empty() {
        debug!("{} 有 {} 個 HTML 語法問題", page_url, document.errors.len());
    }
    document
}
