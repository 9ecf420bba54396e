//! ログ行用のパーセントエンコード
//!
//! 英数字と `-_.~` 以外はすべてエンコードする（空白は `%20`）。
//! `|` `&` `=` 改行はエンコード後の値に現れない。

use std::borrow::Cow;

pub fn escape(s: &str) -> Cow<'_, str> {
    urlencoding::encode(s)
}

/// `escape` の逆。不正な UTF-8 になる列は None
pub fn unescape(s: &str) -> Option<String> {
    urlencoding::decode(s).ok().map(Cow::into_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_characters_are_encoded() {
        let e = escape("a b|c&d=e\nf\r.g");
        assert_eq!(e, "a%20b%7Cc%26d%3De%0Af%0D.g");
        for c in ['|', '&', '=', '\n', '\r', ' '] {
            assert!(!e.contains(c));
        }
    }

    #[test]
    fn test_unreserved_pass_through() {
        assert_eq!(escape("Signed-Up_v1.0~x"), "Signed-Up_v1.0~x");
    }

    #[test]
    fn test_unescape_round_trip() {
        let s = "日本語 & more=|";
        assert_eq!(unescape(&escape(s)).unwrap(), s);
        assert_eq!(unescape("%FF"), None);
    }
}
