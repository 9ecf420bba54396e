//! User-Agent によるロボット判定と記録可否の決定

use regex::Regex;
use std::sync::OnceLock;

/// 常に記録するテキストブラウザ（前方一致）
const TEXT_BROWSERS: &[&str] = &["w3m", "dillo", "links", "elinks", "lynx"];

/// 含まれていればロボット
const ROBOT_MARKERS: &[&str] = &[
    "bot",
    "spider",
    "search",
    "jeeves",
    "crawl",
    "seek",
    "heritrix",
    "slurp",
    "thumbnails",
    "capture",
    "ferret",
    "webinator",
    "scan",
    "retriever",
    "accelerator",
    "upload",
    "digg",
    "extractor",
    "grub",
    "scrub",
];

/// どれも含まなければブラウザではない
const BROWSER_MARKERS: &[&str] = &[
    "mozilla", "browser", "iphone", "lynx", "mobile", "opera", "icab",
];

fn mozilla_version() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"mozilla/\d").ok()).as_ref()
}

/// ロボットらしい User-Agent か
pub fn is_robot(user_agent: &str) -> bool {
    let ua = user_agent.trim().to_lowercase();
    if TEXT_BROWSERS.iter().any(|p| ua.starts_with(p)) {
        return false;
    }
    if ROBOT_MARKERS.iter().any(|m| ua.contains(m)) {
        return true;
    }
    if !BROWSER_MARKERS.iter().any(|m| ua.contains(m)) {
        return true;
    }
    if ua.contains("mozilla") {
        let has_comment = ua.contains('(') && ua.contains(')');
        let has_version = mozilla_version().is_some_and(|re| re.is_match(&ua));
        return !(has_comment && has_version);
    }
    false
}

/// このリクエストを記録するか。
/// 明示指定が最優先。User-Agent が無いリクエストは記録する
pub fn should_track(explicit: Option<bool>, track_robots: bool, user_agent: Option<&str>) -> bool {
    if let Some(v) = explicit {
        return v;
    }
    if track_robots {
        return true;
    }
    match user_agent {
        Some(ua) if !ua.trim().is_empty() => !is_robot(ua),
        _ => true,
    }
}
