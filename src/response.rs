use axum::{Json, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;

/// Paging info attached to list responses.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
        }
    }

    /// One page holding every item of a list that is never paginated.
    pub fn single_page(len: usize) -> Self {
        let len = i64::try_from(len).unwrap_or(i64::MAX);
        Self::new(1, len, len)
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
        }
    }
}

/// Envelope for every JSON body the API returns.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }

    /// Response for a newly stored resource.
    pub fn created(self) -> (StatusCode, Json<Self>) {
        (StatusCode::CREATED, Json(self))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_keeps_message_data_and_meta() {
        let body = ApiResponse::success("Cart", vec![1, 2], Some(Meta::single_page(2)));
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "message": "Cart",
                "data": [1, 2],
                "meta": { "page": 1, "per_page": 2, "total": 2 }
            })
        );
    }

    #[test]
    fn created_responses_use_201() {
        let (status, Json(body)) = ApiResponse::success("Tag created", "sale", None).created();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.data, Some("sale"));
        assert_eq!(body.meta, None);
    }
}
