//! 요청 게이트키퍼.
//!
//! 미들웨어 체인의 첫 단계. `Authorization: Bearer` 토큰을 확인해
//! [`ExecutionContext`]를 요청 extensions에 넣고, 항상 다음 단계로 넘깁니다.
//! 이 단계는 HTTP 에러를 만들지 않습니다.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use super::context::{ExecutionContext, TokenRejection};
use crate::metrics::record_token_rejection;
use crate::state::AppState;

/// `Authorization` 헤더에서 Bearer 토큰을 추출합니다.
///
/// 스킴은 대소문자를 구분하지 않으며, 다른 스킴이나 빈 토큰은 `None`입니다.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// 게이트키퍼 미들웨어.
pub async fn gatekeeper_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        request.extensions_mut().insert(ExecutionContext::Anonymous);
        return next.run(request).await;
    }

    let verdict = extract_bearer(request.headers())
        .map(|token| state.codec.verify(token, state.clock.now()));

    let context = match verdict {
        None => ExecutionContext::Anonymous,
        Some(Ok(identity)) => ExecutionContext::Authenticated(Arc::new(identity)),
        Some(Err(err)) => {
            debug!(reason = err.reason(), path = %request.uri().path(), "Bearer token rejected");
            record_token_rejection(err.reason());
            request.extensions_mut().insert(TokenRejection(err));
            ExecutionContext::Anonymous
        }
    };

    request.extensions_mut().insert(context);
    next.run(request).await
}
