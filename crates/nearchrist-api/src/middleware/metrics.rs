//! HTTP 요청 메트릭 미들웨어.
//!
//! 라벨은 요청 경로가 아니라 일치한 라우트 템플릿입니다.
//! `Router::layer`로 붙여야 라우팅 후에 실행되어 [`MatchedPath`]를 볼 수 있습니다.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics::{
    record_http_duration, record_http_request, record_http_response, UNMATCHED_ROUTE,
};

/// 메트릭 `route` 라벨.
///
/// 라우트에 일치하지 않은 요청(404 fallback)은 모두 [`UNMATCHED_ROUTE`] 하나로 묶입니다.
pub fn route_label(request: &Request) -> &str {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or(UNMATCHED_ROUTE)
}

/// `http_requests_total`, `http_responses_total`, `http_request_duration_seconds`를 기록합니다.
///
/// 게이트웨이 바깥에 두므로 401/403/429 거부 응답도 집계됩니다.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let route = route_label(&request).to_owned();

    record_http_request(method.as_str(), &route);

    let response = next.run(request).await;

    record_http_response(method.as_str(), &route, response.status().as_u16());
    record_http_duration(method.as_str(), &route, started.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{HeaderValue, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn ok() -> &'static str {
        "OK"
    }

    /// 미들웨어와 같은 위치에서 본 라벨을 응답 헤더로 돌려줍니다.
    async fn echo_route(request: Request, next: Next) -> Response {
        let route = route_label(&request).to_owned();
        let mut response = next.run(request).await;
        response
            .headers_mut()
            .insert("x-route", HeaderValue::from_str(&route).unwrap());
        response
    }

    fn app() -> Router {
        Router::new()
            .nest("/users", Router::new().route("/{id}", get(ok)))
            .route("/parishes/{id}", get(ok))
            .layer(middleware::from_fn(http_metrics_middleware))
            .layer(middleware::from_fn(echo_route))
    }

    async fn label_for(uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        let label = response.headers()["x-route"].to_str().unwrap().to_string();
        (response.status(), label)
    }

    #[tokio::test]
    async fn test_matched_routes_use_template() {
        assert_eq!(
            label_for("/parishes/17").await,
            (StatusCode::OK, "/parishes/{id}".to_string())
        );
        assert_eq!(
            label_for("/parishes/18").await,
            (StatusCode::OK, "/parishes/{id}".to_string())
        );
        assert_eq!(
            label_for("/users/3").await,
            (StatusCode::OK, "/users/{id}".to_string())
        );
    }

    #[tokio::test]
    async fn test_unknown_paths_share_one_label() {
        let first = label_for("/wp-admin/setup.php").await;
        let second = label_for("/no-such/route/42").await;

        assert_eq!(first, (StatusCode::NOT_FOUND, UNMATCHED_ROUTE.to_string()));
        assert_eq!(first, second);
    }
}
