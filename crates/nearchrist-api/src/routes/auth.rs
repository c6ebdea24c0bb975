//! 인증 라우트.
//!
//! - `POST /auth/login` - 식별자/비밀번호로 액세스 토큰 발급 (공개)
//! - `GET /auth/me` - 현재 주체 조회 (인증 필요)

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use nearchrist_core::{DirectoryError, Identity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{AuthError, CurrentUser};
use crate::error::{api_error, directory_error, ApiErrorResponse, ApiResult};
use crate::state::AppState;

/// 로그인 요청.
///
/// 웹 클라이언트 호환을 위해 `email`/`password` 필드명도 받습니다.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// 로그인 식별자 (이메일)
    #[serde(alias = "email")]
    #[validate(length(min = 1))]
    pub identifier: String,
    /// 비밀번호
    #[serde(alias = "password")]
    #[validate(length(min = 1))]
    pub secret: String,
}

/// 로그인 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    /// 항상 "Bearer"
    pub token_type: String,
    /// 토큰 유효 기간 (초)
    pub expires_in: i64,
    pub identity: Identity,
}

/// 로그인.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "토큰 발급", body = LoginResponse),
        (status = 400, description = "필드 누락", body = ApiErrorResponse),
        (status = 401, description = "자격 증명 불일치", body = ApiErrorResponse),
        (status = 429, description = "로그인 시도 초과", body = ApiErrorResponse)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    request
        .validate()
        .map_err(|e| directory_error(DirectoryError::from(e)))?;

    let outcome = state
        .authenticator
        .login(request.identifier.trim(), &request.secret)
        .await
        .map_err(|err| match err {
            AuthError::InvalidCredentials => api_error(
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid credentials",
            ),
            AuthError::Store(_) => api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
                "Credential store is unavailable",
            ),
            AuthError::Token(_) | AuthError::Internal(_) => {
                tracing::error!(error = %err, "Login failed unexpectedly");
                api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error",
                )
            }
        })?;

    Ok(Json(LoginResponse {
        access_token: outcome.access_token,
        token_type: "Bearer".to_string(),
        expires_in: outcome.expires_in,
        identity: outcome.identity,
    }))
}

/// 현재 주체.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "토큰의 신원", body = Identity),
        (status = 401, description = "인증 필요", body = ApiErrorResponse)
    )
)]
pub async fn me(CurrentUser(identity): CurrentUser) -> Json<Identity> {
    Json(identity.as_ref().clone())
}

/// 로그인 라우터 (rate limit 적용 대상).
pub fn login_router() -> Router<Arc<AppState>> {
    Router::new().route("/login", post(login))
}

/// 인증 라우터.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new().route("/me", get(me))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ExecutionContext, ManualClock, TokenCodec};
    use crate::repository::{InMemoryUserStore, NewUser};
    use axum::{body::Body, http::Request};
    use nearchrist_core::{DeploymentProfile, Role};
    use secrecy::SecretString;
    use tower::ServiceExt;

    fn app() -> Router {
        let store = InMemoryUserStore::with_users([NewUser::with_password(
            "Admin",
            "admin@x.org",
            "admin123",
            [Role::admin()],
        )
        .unwrap()])
        .unwrap();
        let codec = TokenCodec::new(
            &SecretString::from("auth-route-test-secret-0123456789ab".to_string()),
            "nearchrist",
            chrono::Duration::minutes(60),
        );
        let state = Arc::new(AppState::new(
            codec,
            Arc::new(ManualClock::at_timestamp(1_700_000_000)),
            DeploymentProfile::Dev,
            Arc::new(store),
        ));

        Router::new()
            .nest("/auth", login_router().merge(auth_router()))
            .with_state(state)
    }

    fn login_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_login_success() {
        let response = app()
            .oneshot(login_request(
                r#"{"identifier": "admin@x.org", "secret": "admin123"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert!(!body["accessToken"].as_str().unwrap().is_empty());
        assert_eq!(body["tokenType"], "Bearer");
        assert_eq!(body["expiresIn"], 3600);
        assert_eq!(body["identity"]["roles"], serde_json::json!(["ADMIN"]));
    }

    #[tokio::test]
    async fn test_login_accepts_web_client_field_names() {
        let response = app()
            .oneshot(login_request(
                r#"{"email": "admin@x.org", "password": "admin123"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_failures_share_message() {
        let app = app();

        let wrong = app
            .clone()
            .oneshot(login_request(
                r#"{"identifier": "admin@x.org", "secret": "nope"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        let wrong = body_json(wrong).await;

        let unknown = app
            .oneshot(login_request(
                r#"{"identifier": "nobody@x.org", "secret": "admin123"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        let unknown = body_json(unknown).await;

        assert_eq!(wrong["message"], "Invalid credentials");
        assert_eq!(wrong["message"], unknown["message"]);
        assert_eq!(wrong["code"], unknown["code"]);
    }

    #[tokio::test]
    async fn test_login_empty_identifier_is_bad_request() {
        let response = app()
            .oneshot(login_request(r#"{"identifier": "", "secret": "x"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_me_returns_context_identity() {
        let mut request = Request::builder()
            .uri("/auth/me")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ExecutionContext::Authenticated(Arc::new(Identity::new(
                4,
                "Joseph",
                "joseph@x.org",
                [Role::new("STANDARD")],
            ))));

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["email"], "joseph@x.org");
    }

    #[tokio::test]
    async fn test_me_without_context_is_unauthorized() {
        let response = app()
            .oneshot(Request::builder().uri("/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
