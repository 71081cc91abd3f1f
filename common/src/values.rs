//! 入力値ユーティリティ
//!
//! - 項目型に応じた初期値
//! - 「동-호」略記の展開
//! - 必須項目チェック

use crate::types::{FieldDefinition, FieldType, FormValues};
use regex::Regex;

/// 項目型に応じた初期値を作る
///
/// `today` は `YYYY-MM-DD` 形式（date 型の初期値）
pub fn initial_values(fields: &[FieldDefinition], today: &str) -> FormValues {
    fields
        .iter()
        .map(|field| {
            let value = match field.field_type {
                FieldType::Date => today.to_string(),
                FieldType::Select => field.options.first().cloned().unwrap_or_default(),
                FieldType::Text | FieldType::Number => String::new(),
            };
            (field.name.clone(), value)
        })
        .collect()
}

/// 入力値を正規化
///
/// 項目名に「위치」「호」「동」を含み、値が `101-202` 形式なら `101동-202호` に展開する。
pub fn normalize_value(field_name: &str, value: &str) -> String {
    lazy_static::lazy_static! {
        static ref DONG_HO_RE: Regex = Regex::new(r"^(\d{1,3})-(\d{1,4})$").unwrap();
    }

    let is_address_field = ["위치", "호", "동"].iter().any(|k| field_name.contains(k));
    if !is_address_field {
        return value.to_string();
    }

    match DONG_HO_RE.captures(value) {
        Some(caps) => format!("{}동-{}호", &caps[1], &caps[2]),
        None => value.to_string(),
    }
}

/// 未入力（空白のみを含む）の項目名を返す
pub fn missing_fields(fields: &[FieldDefinition], values: &FormValues) -> Vec<String> {
    fields
        .iter()
        .filter(|f| values.get(&f.name).map_or(true, |v| v.trim().is_empty()))
        .map(|f| f.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_values_by_type() {
        let fields = vec![
            FieldDefinition::new("이름", FieldType::Text),
            FieldDefinition::new("일자", FieldType::Date),
            FieldDefinition::new("수량", FieldType::Number),
            FieldDefinition::select("공종", vec!["철근".into(), "타설".into()]),
            FieldDefinition::select("빈목록", vec![]),
        ];
        let values = initial_values(&fields, "2024-01-01");
        assert_eq!(values["이름"], "");
        assert_eq!(values["일자"], "2024-01-01");
        assert_eq!(values["수량"], "");
        assert_eq!(values["공종"], "철근");
        assert_eq!(values["빈목록"], "");
    }

    #[test]
    fn test_normalize_dong_ho() {
        assert_eq!(normalize_value("동", "101-202"), "101동-202호");
        assert_eq!(normalize_value("동호수", "1-1"), "1동-1호");
        assert_eq!(normalize_value("작업위치", "12-3456"), "12동-3456호");
    }

    #[test]
    fn test_normalize_leaves_other_values() {
        assert_eq!(normalize_value("동", "101동-202호"), "101동-202호");
        assert_eq!(normalize_value("동", "1234-1"), "1234-1");
        assert_eq!(normalize_value("이름", "101-202"), "101-202");
    }

    #[test]
    fn test_missing_fields() {
        let fields = vec![
            FieldDefinition::new("이름", FieldType::Text),
            FieldDefinition::new("일자", FieldType::Date),
            FieldDefinition::new("동", FieldType::Text),
        ];
        let values = FormValues::from([
            ("이름".to_string(), "김철수".to_string()),
            ("일자".to_string(), "   ".to_string()),
        ]);
        assert_eq!(missing_fields(&fields, &values), vec!["일자", "동"]);
    }
}
