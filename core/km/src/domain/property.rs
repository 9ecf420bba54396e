//! プロパティ型と値の正規化
//!
//! 宣言された型ごとに値を検証・正規化する。検証に失敗した値は None（ログ行に出さない）。

use std::fmt;
use std::str::FromStr;

/// プロパティの宣言型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    String,
    Integer,
    Float,
    TimeDuration,
    Timestamp,
    Url,
    IpAddress,
    Bool,
    Tags,
}

impl PropertyType {
    pub const ALL: [PropertyType; 9] = [
        Self::String,
        Self::Integer,
        Self::Float,
        Self::TimeDuration,
        Self::Timestamp,
        Self::Url,
        Self::IpAddress,
        Self::Bool,
        Self::Tags,
    ];

    /// ログ行のキーに付ける 1 文字の型サフィックス
    pub fn suffix(self) -> char {
        match self {
            Self::String => 's',
            Self::Integer => 'i',
            Self::Float => 'f',
            Self::TimeDuration => 't',
            Self::Timestamp => 'd',
            Self::Url => 'u',
            Self::IpAddress => 'a',
            Self::Bool => 'b',
            Self::Tags => 'c',
        }
    }

    pub fn from_suffix(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.suffix() == c)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::TimeDuration => "time_duration",
            Self::Timestamp => "timestamp",
            Self::Url => "url",
            Self::IpAddress => "ip_address",
            Self::Bool => "bool",
            Self::Tags => "tags",
        }
    }

    /// 宣言型に従って値を検証・正規化する
    pub fn validate(self, value: &RawValue) -> Option<PropertyValue> {
        if value.is_null() {
            return None;
        }
        match self {
            Self::String | Self::Url | Self::IpAddress => Some(PropertyValue::Text(value.to_text())),
            Self::Integer | Self::TimeDuration | Self::Timestamp => {
                value.as_number().map(|n| PropertyValue::Int(n.trunc() as i64))
            }
            Self::Float => value.as_number().map(normalize_float),
            Self::Tags => Some(PropertyValue::Text(normalize_tags(value))),
            Self::Bool => normalize_bool(value),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown property type '{}'", s))
    }
}

/// アプリから渡される生の値
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// 文字列化（string / url / ip_address 用）
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::List(items) => items.join(","),
        }
    }

    /// 数値として解釈できれば有限の f64 を返す
    fn as_number(&self) -> Option<f64> {
        let n = match self {
            Self::Int(i) => *i as f64,
            Self::Float(f) => *f,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            Self::Null | Self::Bool(_) | Self::List(_) => return None,
        };
        n.is_finite().then_some(n)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for RawValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for RawValue {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for RawValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<String>> for RawValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl From<Vec<&str>> for RawValue {
    fn from(items: Vec<&str>) -> Self {
        Self::List(items.into_iter().map(str::to_string).collect())
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// 正規化済みの値（ログ行にそのまま書ける）
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
        }
    }
}

/// 小数第 3 位に丸め、整数値になれば小数部なしで返す
fn normalize_float(n: f64) -> PropertyValue {
    let rounded = (n * 1000.0).round() / 1000.0;
    if rounded.fract() == 0.0 && rounded.abs() < i64::MAX as f64 {
        PropertyValue::Int(rounded as i64)
    } else {
        PropertyValue::Float(rounded)
    }
}

fn normalize_tags(value: &RawValue) -> String {
    let items: Vec<String> = match value {
        RawValue::List(items) => items.clone(),
        other => other.to_text().split(',').map(str::to_string).collect(),
    };
    items
        .iter()
        .map(|t| t.to_lowercase().replace(',', "").trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

fn normalize_bool(value: &RawValue) -> Option<PropertyValue> {
    let flag = match value {
        RawValue::Null => return None,
        RawValue::Text(s) => match s.to_lowercase().as_str() {
            "null" => return None,
            "false" | "0" | "" => 0,
            _ => 1,
        },
        RawValue::Bool(b) => i64::from(*b),
        RawValue::Int(i) => i64::from(*i != 0),
        RawValue::Float(f) => i64::from(*f != 0.0),
        RawValue::List(_) => 1,
    };
    Some(PropertyValue::Int(flag))
}
