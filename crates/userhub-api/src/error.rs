//! 통합 API 에러 응답 타입.
//!
//! 모든 API 엔드포인트에서 일관된 에러 형식을 제공합니다. 에러 본문은
//! 메시지 목록과 발생 시각을 담습니다:
//!
//! ```json
//! {
//!   "errors": ["email: 형식이 올바르지 않습니다"],
//!   "timestamp": "2025-01-31T09:00:00Z"
//! }
//! ```

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 통합 API 에러 응답.
///
/// `errors`는 항상 최소 한 개의 메시지를 담습니다.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 에러 메시지 목록
    pub errors: Vec<String>,
    /// 에러 발생 시각 (RFC 3339)
    pub timestamp: String,
}

impl ApiErrorResponse {
    /// 단일 메시지 에러 생성.
    ///
    /// # Example
    ///
    /// ```
    /// use userhub_api::error::ApiErrorResponse;
    ///
    /// let error = ApiErrorResponse::new("User not found: luna@x.com");
    /// assert_eq!(error.errors.len(), 1);
    /// ```
    pub fn new(message: impl Into<String>) -> Self {
        Self::from_messages(vec![message.into()])
    }

    /// 여러 메시지를 담은 에러 생성.
    ///
    /// 빈 목록이 전달되면 일반 메시지 하나로 대체합니다.
    pub fn from_messages(messages: Vec<String>) -> Self {
        let errors = if messages.is_empty() {
            vec!["Unexpected error".to_string()]
        } else {
            messages
        };

        Self {
            errors,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// 유효성 검사 실패를 에러 응답으로 변환.
    ///
    /// 각 위반 사항은 `field: message` 형식의 항목이 됩니다.
    pub fn from_validation(errors: &validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, field_errors)| {
                field_errors.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{}: {}", field, msg),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();

        // HashMap 순회 순서가 매번 달라지므로 정렬해 고정합니다.
        messages.sort();
        Self::from_messages(messages)
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.errors.join("; "))
    }
}

impl std::error::Error for ApiErrorResponse {}

/// 상태 코드와 에러 본문 쌍을 생성하는 헬퍼.
///
/// # Example
///
/// ```
/// use axum::http::StatusCode;
/// use userhub_api::error::error_response;
///
/// let (status, body) = error_response(StatusCode::NOT_FOUND, "User not found");
/// assert_eq!(status, StatusCode::NOT_FOUND);
/// ```
pub fn error_response(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiErrorResponse>) {
    (status, Json(ApiErrorResponse::new(message)))
}

// ==================== Result Type Alias ====================

/// API 핸들러 Result 타입 별칭.
///
/// # Example
///
/// ```ignore
/// async fn get_user(
///     Path(email): Path<String>,
///     State(state): State<Arc<AppState>>,
/// ) -> ApiResult<Json<UserResponse>> {
///     let user = UserRepository::find_by_email(pool, &email)
///         .await
///         .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
///         .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("User not found: {}", email)))?;
///
///     Ok(Json(user.into()))
/// }
/// ```
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_error_response_new() {
        let error = ApiErrorResponse::new("something failed");

        assert_eq!(error.errors, vec!["something failed".to_string()]);
        assert!(!error.timestamp.is_empty());
    }

    #[test]
    fn test_error_list_never_empty() {
        let error = ApiErrorResponse::from_messages(vec![]);
        assert_eq!(error.errors.len(), 1);
    }

    #[test]
    fn test_json_shape() {
        let error = ApiErrorResponse::new("User not found");
        let json = serde_json::to_value(&error).unwrap();

        assert!(json["errors"].is_array());
        assert!(json["timestamp"].is_string());
        assert_eq!(json["errors"][0], "User not found");
    }

    #[test]
    fn test_timestamp_parses_as_rfc3339() {
        let error = ApiErrorResponse::new("x");
        assert!(chrono::DateTime::parse_from_rfc3339(&error.timestamp).is_ok());
    }

    #[derive(Validate)]
    struct SampleInput {
        #[validate(length(min = 1, message = "must not be empty"))]
        name: String,
        #[validate(email(message = "invalid format"))]
        email: String,
    }

    #[test]
    fn test_from_validation_formats_field_messages() {
        let input = SampleInput {
            name: String::new(),
            email: "not-an-email".to_string(),
        };

        let errors = input.validate().unwrap_err();
        let response = ApiErrorResponse::from_validation(&errors);

        assert_eq!(response.errors.len(), 2);
        assert!(response.errors.iter().any(|e| e == "email: invalid format"));
        assert!(response.errors.iter().any(|e| e == "name: must not be empty"));
    }

    #[test]
    fn test_error_response_helper() {
        let (status, body) = error_response(StatusCode::CONFLICT, "email already registered");

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.errors, vec!["email already registered".to_string()]);
    }
}
