//! 診断: 最後にアップロードに成功した時刻を表示する

use chrono::{Local, TimeZone};
use common::ports::outbound::FileSystem;
use std::fmt::Display;
use std::path::Path;

const RULE: &str = "----------------------------------------------------------------------";

/// ウォーターマークファイルの時刻（Unix 秒）。無い・読めなければ None
pub fn last_upload(fs: &dyn FileSystem, watermark: &Path) -> Option<i64> {
    fs.read_to_string(watermark).ok()?.trim().parse().ok()
}

/// 表示用の文字列（ローカルタイムゾーン）
pub fn render(last: Option<i64>) -> String {
    render_in(last, &Local)
}

pub fn render_in<Tz>(last: Option<i64>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let when = last
        .and_then(|secs| tz.timestamp_opt(secs, 0).single())
        .map(|t| t.format("%D %T (%Z)").to_string())
        .unwrap_or_else(|| {
            "You have not uploaded any logs yet (or unable to read time of last upload).".to_string()
        });
    format!("{}\nTIME OF LAST UPLOAD: {}\n{}", RULE, when, RULE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::adapter::StdFileSystem;

    #[test]
    fn test_render_with_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_upload");
        std::fs::write(&path, "1700000000").unwrap();

        let last = last_upload(&StdFileSystem, &path);
        assert_eq!(last, Some(1_700_000_000));
        assert!(render_in(last, &Utc).contains("TIME OF LAST UPLOAD: 11/14/23 22:13:20 (UTC)"));
    }

    #[test]
    fn test_render_without_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let last = last_upload(&StdFileSystem, &dir.path().join("last_upload"));
        assert_eq!(last, None);
        assert!(render(last).contains("not uploaded any logs yet"));
    }
}
