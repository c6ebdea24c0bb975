//! OpenAPI 문서화 설정.
//!
//! utoipa로 OpenAPI 3 문서를 생성하고 `/api-docs/openapi.json`에서 제공합니다.
//!
//! 새 엔드포인트를 추가할 때:
//!
//! 1. 요청/응답 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)`에 등록

use axum::{routing::get, Json, Router};
use nearchrist_core::{Adoration, Crusade, Diocese, Identity, Parish, State as StateRecord};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::error::ApiErrorResponse;
use crate::repository::UserRecord;
use crate::routes::{
    auth, health, users, ComponentHealth, ComponentStatus, HealthResponse, LoginRequest,
    LoginResponse, UserUpsertRequest,
};

/// NearChrist 디렉터리 API 문서.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "NearChrist Directory API",
        description = r#"
# NearChrist 디렉터리 REST API

주, 교구, 본당, 성체조배, 묵주기도 십자군 정보를 제공합니다.

## 인증

`POST /auth/login`으로 액세스 토큰을 받은 뒤
`Authorization: Bearer <token>` 헤더를 포함하세요.

- 디렉터리 `GET` 요청은 인증 없이 사용할 수 있습니다.
- 그 외 조회는 인증이 필요합니다.
- 변경 요청은 `ADMIN` 역할이 필요합니다.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "로컬 개발 서버")),
    tags(
        (name = "auth", description = "인증 - 로그인 및 현재 주체"),
        (name = "health", description = "헬스 체크 - 서버 상태 확인"),
        (name = "users", description = "사용자 관리 - 계정 및 역할"),
        (name = "directory", description = "디렉터리 - 주/교구/본당/성체조배/십자군")
    ),
    components(schemas(
        ApiErrorResponse,
        LoginRequest,
        LoginResponse,
        Identity,
        UserRecord,
        UserUpsertRequest,
        HealthResponse,
        ComponentHealth,
        ComponentStatus,
        StateRecord,
        Diocese,
        Parish,
        Adoration,
        Crusade,
    )),
    paths(
        auth::login,
        auth::me,
        health::health_check,
        health::health_ready,
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::list_roles,
    ),
    modifiers(&BearerSecurity)
)]
pub struct ApiDoc;

/// `bearer` 보안 스킴 등록.
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI JSON 라우터 (`/api-docs/openapi.json`).
pub fn openapi_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_valid() {
        let json = serde_json::to_string_pretty(&ApiDoc::openapi()).unwrap();

        assert!(json.contains("NearChrist Directory API"));
        assert!(json.contains("/auth/login"));
        assert!(json.contains("/health/ready"));
        assert!(json.contains("/users/{id}"));
    }

    #[test]
    fn test_openapi_contains_schemas_and_security() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();

        assert!(json.contains("LoginResponse"));
        assert!(json.contains("ApiErrorResponse"));
        assert!(json.contains("Parish"));
        assert!(json.contains(r#""bearer""#));
    }

    #[test]
    fn test_openapi_router_creates() {
        let _router: Router<()> = openapi_router();
    }
}
