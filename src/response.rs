//! Standard response envelope helpers. `meta.fields` echoes the fields that were loaded.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: Meta,
}

#[derive(Serialize, Default, Debug, PartialEq, Eq)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

pub fn success_one<T: Serialize>(data: T, fields: Vec<String>) -> (StatusCode, Json<SuccessOne<T>>) {
    let meta = (!fields.is_empty()).then(|| Meta { count: None, fields });
    (StatusCode::OK, Json(SuccessOne { data, meta }))
}

pub fn success_many<T: Serialize>(data: Vec<T>, fields: Vec<String>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: Meta {
                count: Some(count),
                fields,
            },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_one_omits_empty_meta() {
        let (status, Json(body)) = success_one(serde_json::json!({"id": 1}), Vec::new());
        assert_eq!(status, StatusCode::OK);
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("meta").is_none());
    }

    #[test]
    fn test_success_many_counts_and_echoes_fields() {
        let (_, Json(body)) = success_many(vec![1, 2, 3], vec!["reviews".to_string()]);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["meta"]["count"], 3);
        assert_eq!(json["meta"]["fields"][0], "reviews");
    }
}
