//! 記録対象のアクションと型付きプロパティ

use super::property::{PropertyType, RawValue};
use std::collections::BTreeMap;

/// 宣言型付きの生の値
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    pub value: RawValue,
    pub ty: PropertyType,
}

impl TypedValue {
    pub fn new(value: impl Into<RawValue>, ty: PropertyType) -> Self {
        Self {
            value: value.into(),
            ty,
        }
    }
}

/// プロパティ名 → 型付きの値（キー順で安定した出力にする）
pub type PropertyMap = BTreeMap<String, TypedValue>;

/// 1 件の行動イベント
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    pub properties: PropertyMap,
    /// ログに書き出し済みか
    pub logged: bool,
}

impl Action {
    pub fn new(name: impl Into<String>, properties: PropertyMap) -> Self {
        Self {
            name: name.into(),
            properties,
            logged: false,
        }
    }

    /// assign 済みの既定プロパティを合成したプロパティを返す。
    /// 同名キーはアクション側の値が優先
    pub fn merged_properties(&self, assigned: &PropertyMap) -> PropertyMap {
        let mut merged = assigned.clone();
        merged.extend(
            self.properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }
}
