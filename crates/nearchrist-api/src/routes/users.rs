//! 사용자 관리 라우트.
//!
//! - `GET /users`, `GET /users/{id}` - 조회 (인증 필요)
//! - `POST /users`, `PUT /users/{id}`, `DELETE /users/{id}` - 변경 (ADMIN)
//! - `GET /roles` - 사용 가능한 역할 목록 (인증 필요)
//!
//! 응답에는 비밀번호 해시가 포함되지 않습니다.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use nearchrist_core::Role;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::{hash_password, validate_password_strength, AdminUser};
use crate::error::{api_error, store_error, ApiError, ApiErrorResponse, ApiResult};
use crate::repository::{NewUser, UserChanges, UserRecord};
use crate::state::AppState;

/// 사용자 생성/수정 요청.
///
/// 수정 시 `password`가 없으면 기존 비밀번호를 유지합니다.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserUpsertRequest {
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub password: Option<String>,
    #[schema(value_type = Option<Vec<String>>)]
    pub roles: Option<Vec<Role>>,
    pub enabled: Option<bool>,
}

fn bad_request(message: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "INVALID_INPUT", message)
}

fn user_not_found(id: i64) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        format!("user {id} not found"),
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_roles(roles: Vec<Role>) -> Result<BTreeSet<Role>, ApiError> {
    if let Some(unknown) = roles.iter().find(|r| !r.is_known()) {
        return Err(bad_request(format!("unknown role: {unknown}")));
    }
    Ok(roles.into_iter().collect())
}

/// Argon2 해싱은 blocking 스레드에서 실행합니다.
async fn hash_new_password(password: String) -> Result<String, ApiError> {
    validate_password_strength(&password).map_err(bad_request)?;

    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing task failed");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
            )
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
            )
        })
}

/// 사용자 목록.
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "사용자 목록", body = Vec<UserRecord>),
        (status = 401, description = "인증 필요", body = ApiErrorResponse)
    )
)]
pub async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<UserRecord>>> {
    state.users.list_users().await.map(Json).map_err(store_error)
}

/// 사용자 조회.
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "사용자 ID")),
    responses(
        (status = 200, description = "사용자", body = UserRecord),
        (status = 404, description = "없음", body = ApiErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserRecord>> {
    state
        .users
        .get_user(id)
        .await
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| user_not_found(id))
}

/// 사용자 생성.
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer" = [])),
    request_body = UserUpsertRequest,
    responses(
        (status = 201, description = "생성됨", body = UserRecord),
        (status = 400, description = "필드 누락 또는 알 수 없는 역할", body = ApiErrorResponse),
        (status = 403, description = "ADMIN 아님", body = ApiErrorResponse),
        (status = 409, description = "이메일 중복", body = ApiErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AdminUser(actor): AdminUser,
    Json(request): Json<UserUpsertRequest>,
) -> ApiResult<(StatusCode, Json<UserRecord>)> {
    let name = non_blank(request.user_name).ok_or_else(|| bad_request("userName is required"))?;
    let email =
        non_blank(request.user_email).ok_or_else(|| bad_request("userEmail is required"))?;
    let password = request
        .password
        .ok_or_else(|| bad_request("password is required"))?;

    let mut roles = parse_roles(request.roles.unwrap_or_default())?;
    if roles.is_empty() {
        roles.insert(Role::new(Role::STANDARD));
    }

    let password_hash = hash_new_password(password).await?;

    let created = state
        .users
        .create_user(NewUser {
            name,
            email,
            password_hash,
            roles,
            enabled: request.enabled.unwrap_or(true),
        })
        .await
        .map_err(store_error)?;

    info!(user_id = created.id, actor = actor.id, "User created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// 사용자 수정.
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "사용자 ID")),
    request_body = UserUpsertRequest,
    responses(
        (status = 200, description = "수정됨", body = UserRecord),
        (status = 404, description = "없음", body = ApiErrorResponse),
        (status = 409, description = "이메일 중복", body = ApiErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AdminUser(actor): AdminUser,
    Path(id): Path<i64>,
    Json(request): Json<UserUpsertRequest>,
) -> ApiResult<Json<UserRecord>> {
    let roles = request.roles.map(parse_roles).transpose()?;
    let password_hash = match request.password {
        Some(password) => Some(hash_new_password(password).await?),
        None => None,
    };

    let changes = UserChanges {
        name: non_blank(request.user_name),
        email: non_blank(request.user_email),
        password_hash,
        roles,
        enabled: request.enabled,
    };

    let updated = state
        .users
        .update_user(id, changes)
        .await
        .map_err(store_error)?
        .ok_or_else(|| user_not_found(id))?;

    info!(user_id = id, actor = actor.id, "User updated");
    Ok(Json(updated))
}

/// 사용자 삭제.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "사용자 ID")),
    responses(
        (status = 204, description = "삭제됨"),
        (status = 404, description = "없음", body = ApiErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(actor): AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.users.delete_user(id).await.map_err(store_error)? {
        return Err(user_not_found(id));
    }

    info!(user_id = id, actor = actor.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// 역할 목록.
#[utoipa::path(
    get,
    path = "/roles",
    tag = "users",
    security(("bearer" = [])),
    responses((status = 200, description = "역할 이름", body = Vec<String>))
)]
pub async fn list_roles() -> Json<Vec<&'static str>> {
    Json(Role::KNOWN.to_vec())
}

/// 사용자 관리 라우터.
pub fn users_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
}

/// 역할 라우터.
pub fn roles_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_roles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ExecutionContext, SystemClock, TokenCodec};
    use crate::repository::InMemoryUserStore;
    use axum::{body::Body, http::Request};
    use nearchrist_core::{DeploymentProfile, Identity};
    use secrecy::SecretString;
    use tower::ServiceExt;

    fn app() -> Router {
        let codec = TokenCodec::new(
            &SecretString::from("users-route-test-secret-0123456789a".to_string()),
            "nearchrist",
            chrono::Duration::minutes(5),
        );
        let state = Arc::new(AppState::new(
            codec,
            Arc::new(SystemClock),
            DeploymentProfile::Dev,
            Arc::new(InMemoryUserStore::new()),
        ));
        Router::new()
            .nest("/users", users_router())
            .nest("/roles", roles_router())
            .with_state(state)
    }

    fn admin_request(method: &str, uri: &str, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let mut request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_default())
            .unwrap();
        request
            .extensions_mut()
            .insert(ExecutionContext::Authenticated(Arc::new(Identity::new(
                1,
                "Admin",
                "admin@x.org",
                [Role::admin()],
            ))));
        request
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const NEW_USER: &str = r#"{
        "userName": "Teresa",
        "userEmail": "teresa@x.org",
        "password": "calcutta1910",
        "roles": ["supervisor"]
    }"#;

    #[tokio::test]
    async fn test_create_user_hides_hash() {
        let response = app()
            .oneshot(admin_request("POST", "/users", Some(NEW_USER)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["userEmail"], "teresa@x.org");
        assert_eq!(body["roles"], serde_json::json!(["SUPERVISOR"]));
        assert!(!body.to_string().contains("argon2"));
        assert!(body.get("password").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let app = app();
        let first = app
            .clone()
            .oneshot(admin_request("POST", "/users", Some(NEW_USER)))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(admin_request("POST", "/users", Some(NEW_USER)))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_role_and_weak_password() {
        let app = app();

        let response = app
            .clone()
            .oneshot(admin_request(
                "POST",
                "/users",
                Some(r#"{"userName": "A", "userEmail": "a@x.org", "password": "calcutta1910", "roles": ["AUDITOR"]}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(admin_request(
                "POST",
                "/users",
                Some(r#"{"userName": "A", "userEmail": "a@x.org", "password": "short"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let app = app();
        app.clone()
            .oneshot(admin_request("POST", "/users", Some(NEW_USER)))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(admin_request(
                "PUT",
                "/users/1",
                Some(r#"{"userName": "Mother Teresa", "enabled": false}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["userName"], "Mother Teresa");
        assert_eq!(body["enabled"], false);
        assert_eq!(body["userEmail"], "teresa@x.org");

        let response = app
            .clone()
            .oneshot(admin_request("DELETE", "/users/1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(admin_request("GET", "/users/1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_admin_write_is_forbidden() {
        let mut request = Request::builder()
            .method("POST")
            .uri("/users")
            .header("content-type", "application/json")
            .body(Body::from(NEW_USER))
            .unwrap();
        request
            .extensions_mut()
            .insert(ExecutionContext::Authenticated(Arc::new(Identity::new(
                2,
                "Standard",
                "user@x.org",
                [Role::new(Role::STANDARD)],
            ))));

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_list_roles() {
        let response = app()
            .oneshot(admin_request("GET", "/roles", None))
            .await
            .unwrap();
        assert_eq!(
            body_json(response).await,
            serde_json::json!(["ADMIN", "SUPERVISOR", "STANDARD"])
        );
    }
}
