//! Standard response envelope helpers.

use crate::service::Pagination;
use axum::{http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct SuccessOne<T> {
    pub data: T,
}

#[derive(Serialize, ToSchema)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: ListMeta,
}

#[derive(Serialize, ToSchema)]
pub struct ListMeta {
    /// Items in this page.
    pub count: u64,
    /// Matching items across all pages.
    pub total: u64,
    pub pagination: Pagination,
}

/// Serializes as `{}`.
#[derive(Serialize, ToSchema)]
pub struct Empty {}

/// `{success, token}` returned by register and login.
#[derive(Serialize, ToSchema)]
pub struct TokenBody {
    pub success: bool,
    pub token: String,
}

/// `{success, data}` returned by me and logout.
#[derive(Serialize, ToSchema)]
pub struct SuccessData<T> {
    pub success: bool,
    pub data: T,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::CREATED, Json(SuccessOne { data }))
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data }))
}

pub fn success_page<T: Serialize>(
    data: Vec<T>,
    total: u64,
    pagination: Pagination,
) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: ListMeta {
                count,
                total,
                pagination,
            },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::query::PageRef;

    #[test]
    fn page_meta_shape() {
        let (status, Json(body)) = success_page(
            vec![1, 2],
            7,
            Pagination {
                next: Some(PageRef { page: 2, limit: 2 }),
                prev: None,
            },
        );
        assert_eq!(status, StatusCode::OK);
        let v = serde_json::to_value(body).unwrap();
        assert_eq!(v["meta"]["count"], 2);
        assert_eq!(v["meta"]["total"], 7);
        assert_eq!(v["meta"]["pagination"]["next"]["page"], 2);
        assert!(v["meta"]["pagination"].get("prev").is_none());
    }

    #[test]
    fn empty_data_is_an_object() {
        let (_, Json(body)) = success_one_ok(Empty {});
        assert_eq!(serde_json::to_value(body).unwrap(), serde_json::json!({"data": {}}));
    }
}
