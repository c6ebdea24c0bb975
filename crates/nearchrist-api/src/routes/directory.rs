//! 디렉터리 CRUD 라우트.
//!
//! 다섯 종류의 레코드가 같은 엔드포인트 형태를 공유합니다.
//!
//! - `GET /{kind}` - 목록 조회 (공개)
//! - `GET /{kind}/{id}` - 단건 조회 (공개)
//! - `POST /{kind}` - 생성 (ADMIN)
//! - `PUT /{kind}/{id}` - 수정 (ADMIN)
//! - `DELETE /{kind}/{id}` - 삭제 (ADMIN)
//!
//! 접근 제어는 접근 정책 미들웨어가 담당합니다.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use nearchrist_core::{Adoration, Crusade, Diocese, DirectoryRecord, Parish, State as StateRecord};
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::{CurrentUser, MaybeUser};
use crate::error::{directory_error, ApiResult};
use crate::repository::DirectoryRepository;
use crate::state::AppState;

/// 라우터에 노출되는 디렉터리 레코드.
pub trait DirectoryResource: DirectoryRecord {
    /// 라우트 경로 (예: `/states`).
    const PATH: &'static str;

    fn repository(state: &AppState) -> &DirectoryRepository<Self>;
}

impl DirectoryResource for StateRecord {
    const PATH: &'static str = "/states";

    fn repository(state: &AppState) -> &DirectoryRepository<Self> {
        &state.states
    }
}

impl DirectoryResource for Diocese {
    const PATH: &'static str = "/dioceses";

    fn repository(state: &AppState) -> &DirectoryRepository<Self> {
        &state.dioceses
    }
}

impl DirectoryResource for Parish {
    const PATH: &'static str = "/parishes";

    fn repository(state: &AppState) -> &DirectoryRepository<Self> {
        &state.parishes
    }
}

impl DirectoryResource for Adoration {
    const PATH: &'static str = "/adorations";

    fn repository(state: &AppState) -> &DirectoryRepository<Self> {
        &state.adorations
    }
}

impl DirectoryResource for Crusade {
    const PATH: &'static str = "/crusades";

    fn repository(state: &AppState) -> &DirectoryRepository<Self> {
        &state.crusades
    }
}

async fn list_records<T: DirectoryResource>(
    State(state): State<Arc<AppState>>,
    MaybeUser(viewer): MaybeUser,
) -> Json<Vec<T>> {
    let records = T::repository(&state).list().await;
    debug!(
        kind = T::KIND,
        count = records.len(),
        viewer = viewer.as_ref().map(|identity| identity.id),
        "Directory list"
    );
    Json(records)
}

async fn get_record<T: DirectoryResource>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<T>> {
    T::repository(&state)
        .get(id)
        .await
        .map(Json)
        .map_err(directory_error)
}

async fn create_record<T: DirectoryResource>(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Json(record): Json<T>,
) -> ApiResult<(StatusCode, Json<T>)> {
    let created = T::repository(&state)
        .create(record)
        .await
        .map_err(directory_error)?;

    info!(kind = T::KIND, id = created.id(), actor = actor.id, "Directory record created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_record<T: DirectoryResource>(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(record): Json<T>,
) -> ApiResult<Json<T>> {
    let updated = T::repository(&state)
        .update(id, record)
        .await
        .map_err(directory_error)?;

    info!(kind = T::KIND, id, actor = actor.id, "Directory record updated");
    Ok(Json(updated))
}

async fn delete_record<T: DirectoryResource>(
    State(state): State<Arc<AppState>>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    T::repository(&state)
        .delete(id)
        .await
        .map_err(directory_error)?;

    info!(kind = T::KIND, id, actor = actor.id, "Directory record deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// 한 종류의 레코드에 대한 CRUD 라우터.
pub fn resource_router<T: DirectoryResource>() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_records::<T>).post(create_record::<T>))
        .route(
            "/{id}",
            get(get_record::<T>)
                .put(update_record::<T>)
                .delete(delete_record::<T>),
        )
}

/// 모든 디렉터리 라우터.
pub fn directory_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest(StateRecord::PATH, resource_router::<StateRecord>())
        .nest(Diocese::PATH, resource_router::<Diocese>())
        .nest(Parish::PATH, resource_router::<Parish>())
        .nest(Adoration::PATH, resource_router::<Adoration>())
        .nest(Crusade::PATH, resource_router::<Crusade>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ExecutionContext, SystemClock, TokenCodec};
    use crate::repository::InMemoryUserStore;
    use axum::{body::Body, http::Request};
    use nearchrist_core::{DeploymentProfile, Identity, Role};
    use secrecy::SecretString;
    use tower::ServiceExt;

    fn app() -> Router {
        let codec = TokenCodec::new(
            &SecretString::from("directory-test-secret-0123456789abcd".to_string()),
            "nearchrist",
            chrono::Duration::minutes(5),
        );
        let state = Arc::new(AppState::new(
            codec,
            Arc::new(SystemClock),
            DeploymentProfile::Dev,
            Arc::new(InMemoryUserStore::new()),
        ));
        directory_router().with_state(state)
    }

    fn admin_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
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

    #[tokio::test]
    async fn test_create_then_get() {
        let app = app();

        let response = app
            .clone()
            .oneshot(admin_request(
                "POST",
                "/parishes",
                r#"{"parishId": 99, "parishName": "St Mary", "parishSuburb": "Hobart"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["parishId"], 1);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/parishes/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["parishName"], "St Mary");
    }

    #[tokio::test]
    async fn test_missing_required_field_is_bad_request() {
        let response = app()
            .oneshot(admin_request("POST", "/states", r#"{"stateAbbreviation": "TAS"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_record() {
        let app = app();

        let response = app
            .clone()
            .oneshot(admin_request("PUT", "/dioceses/5", r#"{"dioceseName": "Hobart"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(admin_request("DELETE", "/crusades/5", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_returns_no_content() {
        let app = app();

        let response = app
            .clone()
            .oneshot(admin_request("POST", "/crusades", r#"{"comments": "First Saturday"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(admin_request("DELETE", "/crusades/1", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(Request::builder().uri("/crusades").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_mutation_without_context_is_unauthorized() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/states")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"stateName": "Victoria"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
