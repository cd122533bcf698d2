use crate::errors::AppError;
use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON body that must pass `validator` rules before the handler runs.
///
/// Malformed JSON keeps axum's rejection status; rule violations become a
/// 400 `VALIDATION_ERROR` with per-field messages in `details`.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await?;
        data.validate()?;
        Ok(ValidatedJson(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, http::StatusCode, routing::post};
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct Login {
        #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
        password: String,
    }

    fn app() -> Router {
        Router::new().route(
            "/login",
            post(|ValidatedJson(body): ValidatedJson<Login>| async move { body.password.len().to_string() }),
        )
    }

    fn json_request(body: &str) -> Request<Body> {
        Request::post("/login")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_rule_violation_lists_field() {
        let response = app().oneshot(json_request(r#"{"password":"abc"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["details"]["password"][0], "Password must be at least 6 characters");
    }

    #[tokio::test]
    async fn test_malformed_json_keeps_rejection_status() {
        let response = app().oneshot(json_request("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let response = app().oneshot(json_request(r#"{"password":"secret1"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
