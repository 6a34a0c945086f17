use serde::Serialize;
use utoipa::ToSchema;

/// Uniform envelope for every JSON response, success or error:
/// `{ "message": ..., "data": ..., "meta": ... }`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Pagination block carried in the envelope. List endpoints fill all three
/// fields; everything else sends an empty block or omits it.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_is_omitted_when_absent() {
        let body = ApiResponse::<i32> {
            message: "OK".into(),
            data: Some(1),
            meta: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("meta").is_none());
        assert_eq!(json["data"], 1);
    }
}
