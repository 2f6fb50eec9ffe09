//! Success envelope shared by every provisioning and data route.
//!
//! Records come back as `{ "data": ... }`; listings add `"meta": { "count": n }`.
//! Failures use the `{ "error": ... }` body written by `AppError`.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ListMeta>,
}

#[derive(Debug, Serialize)]
pub struct ListMeta {
    pub count: usize,
}

pub type Reply<T> = (StatusCode, Json<Envelope<T>>);

fn single<T: Serialize>(status: StatusCode, data: T) -> Reply<T> {
    (status, Json(Envelope { data, meta: None }))
}

fn listing<T: Serialize>(status: StatusCode, data: Vec<T>) -> Reply<Vec<T>> {
    let count = data.len();
    (status, Json(Envelope { data, meta: Some(ListMeta { count }) }))
}

/// 201 for a newly registered database, provisioned table or inserted row.
pub fn created<T: Serialize>(data: T) -> Reply<T> {
    single(StatusCode::CREATED, data)
}

pub fn ok<T: Serialize>(data: T) -> Reply<T> {
    single(StatusCode::OK, data)
}

pub fn listed<T: Serialize>(data: Vec<T>) -> Reply<Vec<T>> {
    listing(StatusCode::OK, data)
}

/// 201 listing, used when regenerating API descriptors.
pub fn listed_created<T: Serialize>(data: Vec<T>) -> Reply<Vec<T>> {
    listing(StatusCode::CREATED, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_record_has_no_meta() {
        let (status, Json(body)) = created(json!({ "id": 1 }));
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(serde_json::to_value(body).unwrap(), json!({ "data": { "id": 1 } }));
    }

    #[test]
    fn listing_counts_items() {
        let (status, Json(body)) = listed(vec!["a", "b"]);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({ "data": ["a", "b"], "meta": { "count": 2 } })
        );
        let (status, _) = listed_created(Vec::<u8>::new());
        assert_eq!(status, StatusCode::CREATED);
    }
}
