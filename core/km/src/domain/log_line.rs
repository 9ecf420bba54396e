//! ログ行のエンコードとパース
//!
//! 形式: `<unix_ts>|<name>|<person_id>|<key>.<suffix>=<value>&...`
//! name / person_id / key / value はすべて `escape` 済み。

use super::action::PropertyMap;
use super::escape::{escape, unescape};
use super::property::{PropertyType, PropertyValue};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("expected 4 '|'-separated fields, got {0}")]
    FieldCount(usize),
    #[error("invalid timestamp '{0}'")]
    Timestamp(String),
    #[error("invalid escape sequence in '{0}'")]
    Escape(String),
    #[error("property '{0}' has no value")]
    MissingValue(String),
    #[error("property '{0}' has no type suffix")]
    MissingSuffix(String),
    #[error("unknown type suffix '{0}'")]
    UnknownSuffix(String),
    #[error("value '{value}' is not a valid {ty}")]
    Value { ty: PropertyType, value: String },
}

/// 型検証済みのプロパティ 1 件
#[derive(Debug, Clone, PartialEq)]
pub struct LogProperty {
    pub key: String,
    pub ty: PropertyType,
    pub value: PropertyValue,
}

/// ログファイル 1 行分のレコード
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub timestamp: u64,
    pub action: String,
    pub person_id: String,
    pub properties: Vec<LogProperty>,
}

impl LogLine {
    /// アクションのプロパティを検証してレコードを作る。検証に通らない値は捨てる
    pub fn from_properties(
        timestamp: u64,
        action: &str,
        person_id: &str,
        properties: &PropertyMap,
    ) -> Self {
        let properties = properties
            .iter()
            .filter_map(|(key, typed)| {
                typed.ty.validate(&typed.value).map(|value| LogProperty {
                    key: key.clone(),
                    ty: typed.ty,
                    value,
                })
            })
            .collect();
        Self {
            timestamp,
            action: action.to_string(),
            person_id: person_id.to_string(),
            properties,
        }
    }

    pub fn encode(&self) -> String {
        let props = self
            .properties
            .iter()
            .map(|p| {
                format!(
                    "{}.{}={}",
                    escape(&p.key),
                    p.ty.suffix(),
                    escape(&p.value.to_string())
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        format!(
            "{}|{}|{}|{}",
            self.timestamp,
            escape(&self.action),
            escape(&self.person_id),
            props
        )
    }

    pub fn parse(line: &str) -> Result<Self, LineError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.splitn(4, '|').collect();
        let &[ts, action, person_id, props] = fields.as_slice() else {
            return Err(LineError::FieldCount(fields.len()));
        };
        let timestamp = ts
            .parse::<u64>()
            .map_err(|_| LineError::Timestamp(ts.to_string()))?;
        let properties = props
            .split('&')
            .filter(|p| !p.is_empty())
            .map(parse_property)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            timestamp,
            action: decode(action)?,
            person_id: decode(person_id)?,
            properties,
        })
    }
}

fn decode(s: &str) -> Result<String, LineError> {
    unescape(s).ok_or_else(|| LineError::Escape(s.to_string()))
}

fn parse_property(pair: &str) -> Result<LogProperty, LineError> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| LineError::MissingValue(pair.to_string()))?;
    let (key, suffix) = key
        .rsplit_once('.')
        .ok_or_else(|| LineError::MissingSuffix(key.to_string()))?;
    let mut chars = suffix.chars();
    let ty = match (chars.next(), chars.next()) {
        (Some(c), None) => PropertyType::from_suffix(c),
        _ => None,
    }
    .ok_or_else(|| LineError::UnknownSuffix(suffix.to_string()))?;
    let text = decode(raw)?;
    let value = parse_value(ty, &text).ok_or(LineError::Value {
        ty,
        value: text.clone(),
    })?;
    Ok(LogProperty {
        key: decode(key)?,
        ty,
        value,
    })
}

fn parse_value(ty: PropertyType, text: &str) -> Option<PropertyValue> {
    match ty {
        PropertyType::String | PropertyType::Url | PropertyType::IpAddress | PropertyType::Tags => {
            Some(PropertyValue::Text(text.to_string()))
        }
        PropertyType::Integer
        | PropertyType::TimeDuration
        | PropertyType::Timestamp
        | PropertyType::Bool => text.parse().ok().map(PropertyValue::Int),
        PropertyType::Float => match text.parse::<i64>() {
            Ok(i) => Some(PropertyValue::Int(i)),
            Err(_) => text.parse().ok().map(PropertyValue::Float),
        },
    }
}
