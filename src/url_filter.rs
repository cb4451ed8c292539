//! 網址分類：同網域判斷、圖片副檔名判斷、排除清單

/// 視為圖片的副檔名
pub const IMAGE_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp"];

/// 會改變登入狀態的路徑，不要爬進去
pub const EXCLUDED_PATTERNS: [&str; 5] = ["logout", "signout", "auth", "login", "register"];

/// 取出網址的 network location（host[:port]，含 userinfo），原樣回傳不做正規化
pub fn netloc(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// 取出網址的 path（不含 query 與 fragment）
pub fn path_of(url: &str) -> &str {
    let after_authority = match url.split_once("://") {
        Some((_, rest)) => match rest.find(['/', '?', '#']) {
            Some(idx) => &rest[idx..],
            None => "",
        },
        None => url,
    };
    let end = after_authority.find(['?', '#']).unwrap_or(after_authority.len());
    &after_authority[..end]
}

/// 兩個網址的 network location 字串是否完全相同
pub fn is_same_domain(url: &str, base_url: &str) -> bool {
    netloc(url) == netloc(base_url)
}

/// 依 path 副檔名判斷是否為圖片（不分大小寫）
pub fn is_image_url(url: &str) -> bool {
    let path = path_of(url).to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// 是否命中排除清單
pub fn is_excluded(url: &str) -> bool {
    let lower = url.to_lowercase();
    EXCLUDED_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}
