//! 경로 접근 정책.
//!
//! 순서가 있는 규칙 목록에서 처음 일치하는 규칙이 적용됩니다.
//! 규칙 목록은 시작 시 한 번 만들어지며 이후 변경되지 않습니다.
//!
//! | 순서 | 메서드 | 경로 | 요구사항 |
//! |---|---|---|---|
//! | 1 | OPTIONS | `/**` | 공개 |
//! | 2 | * | `/auth/login` | 공개 |
//! | 3 | GET | `/states/**`, `/dioceses/**`, `/parishes/**`, `/adorations/**`, `/crusades/**` | 공개 |
//! | 4 | GET | `/health/**` | 공개 |
//! | 5 | GET, HEAD | `/**` | 인증 |
//! | 6 | * | `/**` | ADMIN 역할 |
//!
//! `Prod` 프로필에서는 규칙을 보기 전에 HTTPS 여부를 먼저 확인합니다.
//! `X-Forwarded-Proto`/`Forwarded` 헤더는 신뢰하는 프록시 뒤에 있을 때만 봅니다.

use axum::{
    extract::{Request, State},
    http::{
        header::{HeaderValue, WWW_AUTHENTICATE},
        Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use nearchrist_core::{DeploymentProfile, Role};
use std::sync::Arc;
use tracing::debug;

use super::context::{ExecutionContext, TokenRejection};
use crate::error::ApiErrorResponse;
use crate::metrics::record_access_decision;
use crate::state::AppState;

/// 공개 조회가 허용되는 디렉터리 경로.
pub const PUBLIC_DIRECTORY_PATHS: [&str; 5] = [
    "/states/**",
    "/dioceses/**",
    "/parishes/**",
    "/adorations/**",
    "/crusades/**",
];

/// 메서드 조건.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodMatcher {
    Any,
    OneOf(Vec<Method>),
}

impl MethodMatcher {
    pub fn only(method: Method) -> Self {
        MethodMatcher::OneOf(vec![method])
    }

    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodMatcher::Any => true,
            MethodMatcher::OneOf(methods) => methods.contains(method),
        }
    }
}

/// 경로 패턴.
///
/// - `/**` : 모든 경로
/// - `/states/**` : `/states` 자신과 그 하위 경로 (`/statesX`는 제외)
/// - 그 외 : 정확히 일치 (끝의 `/`는 무시)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Any,
    Subtree(String),
    Exact(String),
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        if pattern == "/**" {
            PathPattern::Any
        } else if let Some(base) = pattern.strip_suffix("/**") {
            PathPattern::Subtree(base.to_string())
        } else {
            PathPattern::Exact(trim_trailing_slash(pattern).to_string())
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let path = trim_trailing_slash(path);
        match self {
            PathPattern::Any => true,
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Subtree(base) => {
                path == base
                    || path
                        .strip_prefix(base.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

/// 규칙이 요구하는 조건.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Authenticated,
    HasRole(Role),
}

/// 접근 규칙.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    pub method: MethodMatcher,
    pub pattern: PathPattern,
    pub requirement: Requirement,
}

impl AccessRule {
    pub fn new(method: MethodMatcher, pattern: &str, requirement: Requirement) -> Self {
        Self {
            method,
            pattern: PathPattern::parse(pattern),
            requirement,
        }
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.matches(method) && self.pattern.matches(path)
    }
}

/// 접근 판단 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    /// 401
    Unauthenticated,
    /// 403
    Forbidden,
    /// 403 (Prod 프로필의 평문 요청)
    InsecureTransport,
}

impl AccessDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessDecision::Allowed => "allowed",
            AccessDecision::Unauthenticated => "unauthenticated",
            AccessDecision::Forbidden => "forbidden",
            AccessDecision::InsecureTransport => "insecure_transport",
        }
    }
}

/// 접근 정책.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    profile: DeploymentProfile,
    rules: Vec<AccessRule>,
    trust_forwarded_headers: bool,
}

impl AccessPolicy {
    pub fn new(profile: DeploymentProfile, rules: Vec<AccessRule>) -> Self {
        Self {
            profile,
            rules,
            trust_forwarded_headers: false,
        }
    }

    /// 프록시가 붙인 전송 헤더를 신뢰할지 설정합니다.
    ///
    /// 클라이언트가 직접 접속할 수 있는 배포에서 켜면 평문 요청이 HTTPS로 위장할 수 있습니다.
    pub fn with_forwarded_headers(mut self, trusted: bool) -> Self {
        self.trust_forwarded_headers = trusted;
        self
    }

    pub fn trusts_forwarded_headers(&self) -> bool {
        self.trust_forwarded_headers
    }

    /// 디렉터리 서비스 규칙으로 정책을 만듭니다. 두 프로필 모두 같은 규칙을 사용합니다.
    pub fn for_profile(profile: DeploymentProfile) -> Self {
        Self::new(profile, Self::directory_rules())
    }

    /// 디렉터리 서비스의 규칙 목록 (순서 중요).
    pub fn directory_rules() -> Vec<AccessRule> {
        let mut rules = vec![
            AccessRule::new(
                MethodMatcher::only(Method::OPTIONS),
                "/**",
                Requirement::Public,
            ),
            AccessRule::new(MethodMatcher::Any, "/auth/login", Requirement::Public),
        ];

        rules.extend(PUBLIC_DIRECTORY_PATHS.iter().map(|pattern| {
            AccessRule::new(MethodMatcher::only(Method::GET), pattern, Requirement::Public)
        }));

        rules.extend([
            AccessRule::new(
                MethodMatcher::only(Method::GET),
                "/health/**",
                Requirement::Public,
            ),
            AccessRule::new(
                MethodMatcher::OneOf(vec![Method::GET, Method::HEAD]),
                "/**",
                Requirement::Authenticated,
            ),
            AccessRule::new(
                MethodMatcher::Any,
                "/**",
                Requirement::HasRole(Role::admin()),
            ),
        ]);

        rules
    }

    pub fn profile(&self) -> DeploymentProfile {
        self.profile
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    /// 처음 일치하는 규칙.
    pub fn rule_for(&self, method: &Method, path: &str) -> Option<&AccessRule> {
        self.rules.iter().find(|rule| rule.matches(method, path))
    }

    /// 요청에 대한 접근 여부를 판단합니다.
    ///
    /// 일치하는 규칙이 없으면 인증을 요구합니다.
    pub fn evaluate(
        &self,
        method: &Method,
        path: &str,
        secure: bool,
        context: &ExecutionContext,
    ) -> AccessDecision {
        if self.profile.requires_secure_transport() && !secure {
            return AccessDecision::InsecureTransport;
        }

        let requirement = self
            .rule_for(method, path)
            .map(|rule| &rule.requirement)
            .unwrap_or(&Requirement::Authenticated);

        match (requirement, context) {
            (Requirement::Public, _) => AccessDecision::Allowed,
            (_, ExecutionContext::Anonymous) => AccessDecision::Unauthenticated,
            (Requirement::Authenticated, ExecutionContext::Authenticated(_)) => {
                AccessDecision::Allowed
            }
            (Requirement::HasRole(role), ExecutionContext::Authenticated(identity)) => {
                if identity.has_role(role) {
                    AccessDecision::Allowed
                } else {
                    AccessDecision::Forbidden
                }
            }
        }
    }
}

/// 요청이 TLS로 들어왔는지 확인합니다.
///
/// `trust_forwarded`가 켜져 있으면 프록시가 붙인 `X-Forwarded-Proto` 또는
/// `Forwarded: proto=`를 봅니다. 꺼져 있으면 두 헤더는 무시됩니다.
pub fn is_secure_transport(request: &Request, trust_forwarded: bool) -> bool {
    if request.uri().scheme_str() == Some("https") {
        return true;
    }
    if !trust_forwarded {
        return false;
    }

    let headers = request.headers();
    let forwarded_proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().eq_ignore_ascii_case("https"));
    if let Some(secure) = forwarded_proto {
        return secure;
    }

    headers
        .get("forwarded")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|first| {
            first.split(';').any(|pair| {
                pair.trim()
                    .split_once('=')
                    .is_some_and(|(k, v)| {
                        k.trim().eq_ignore_ascii_case("proto")
                            && v.trim().trim_matches('"').eq_ignore_ascii_case("https")
                    })
            })
        })
        .unwrap_or(false)
}

/// 거부 응답을 만듭니다.
pub fn rejection_response(
    decision: AccessDecision,
    rejection: Option<&TokenRejection>,
    method: &Method,
    uri: &axum::http::Uri,
) -> Response {
    let (status, code, message) = match decision {
        AccessDecision::Unauthenticated if rejection.is_some_and(TokenRejection::is_expired) => (
            StatusCode::UNAUTHORIZED,
            "TOKEN_EXPIRED",
            "Access token has expired",
        ),
        AccessDecision::Unauthenticated => (
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
            "Authentication required",
        ),
        AccessDecision::Forbidden => (
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "Insufficient role for this operation",
        ),
        AccessDecision::InsecureTransport => (
            StatusCode::FORBIDDEN,
            "HTTPS_REQUIRED",
            "HTTPS is required",
        ),
        AccessDecision::Allowed => (StatusCode::OK, "OK", ""),
    };

    let body = ApiErrorResponse::new(code, message).with_request_info(method, uri);
    let mut response = (status, Json(body)).into_response();

    if status == StatusCode::UNAUTHORIZED {
        let challenge = if rejection.is_some() {
            HeaderValue::from_static(r#"Bearer error="invalid_token""#)
        } else {
            HeaderValue::from_static("Bearer")
        };
        response.headers_mut().insert(WWW_AUTHENTICATE, challenge);
    }

    response
}

/// 접근 정책 미들웨어.
///
/// 게이트키퍼 다음에 실행되어야 합니다. 컨텍스트가 없으면 익명으로 간주합니다.
pub async fn access_policy_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let secure = is_secure_transport(&request, state.policy.trusts_forwarded_headers());
    let context = request
        .extensions()
        .get::<ExecutionContext>()
        .cloned()
        .unwrap_or_default();

    let decision = state
        .policy
        .evaluate(request.method(), request.uri().path(), secure, &context);
    record_access_decision(decision.as_str());

    if decision == AccessDecision::Allowed {
        return next.run(request).await;
    }

    debug!(
        method = %request.method(),
        path = %request.uri().path(),
        decision = decision.as_str(),
        "Access denied"
    );

    rejection_response(
        decision,
        request.extensions().get::<TokenRejection>(),
        request.method(),
        request.uri(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::TokenError;
    use axum::body::Body;
    use nearchrist_core::Identity;

    fn policy() -> AccessPolicy {
        AccessPolicy::for_profile(DeploymentProfile::Dev)
    }

    fn user(roles: &[&str]) -> ExecutionContext {
        ExecutionContext::Authenticated(Arc::new(Identity::new(
            2,
            "User",
            "user@x.org",
            roles.iter().map(|r| Role::new(r)),
        )))
    }

    #[test]
    fn test_path_patterns() {
        let subtree = PathPattern::parse("/states/**");
        assert!(subtree.matches("/states"));
        assert!(subtree.matches("/states/"));
        assert!(subtree.matches("/states/1"));
        assert!(subtree.matches("/states/1/dioceses"));
        assert!(!subtree.matches("/statesman"));
        assert!(!subtree.matches("/users"));

        let exact = PathPattern::parse("/auth/login");
        assert!(exact.matches("/auth/login"));
        assert!(exact.matches("/auth/login/"));
        assert!(!exact.matches("/auth/login/extra"));

        assert!(PathPattern::parse("/**").matches("/anything/at/all"));
    }

    #[test]
    fn test_first_match_wins() {
        let policy = policy();

        let rule = policy.rule_for(&Method::OPTIONS, "/users").unwrap();
        assert_eq!(rule.requirement, Requirement::Public);

        let rule = policy.rule_for(&Method::GET, "/states/3").unwrap();
        assert_eq!(rule.requirement, Requirement::Public);

        let rule = policy.rule_for(&Method::POST, "/states").unwrap();
        assert_eq!(rule.requirement, Requirement::HasRole(Role::admin()));

        let rule = policy.rule_for(&Method::GET, "/users").unwrap();
        assert_eq!(rule.requirement, Requirement::Authenticated);
    }

    #[test]
    fn test_anonymous_decisions() {
        let policy = policy();
        let anon = ExecutionContext::Anonymous;

        for path in ["/states", "/dioceses/1", "/parishes", "/adorations", "/crusades/9"] {
            assert_eq!(
                policy.evaluate(&Method::GET, path, false, &anon),
                AccessDecision::Allowed,
                "GET {path}"
            );
        }
        assert_eq!(
            policy.evaluate(&Method::POST, "/auth/login", false, &anon),
            AccessDecision::Allowed
        );
        assert_eq!(
            policy.evaluate(&Method::OPTIONS, "/states", false, &anon),
            AccessDecision::Allowed
        );
        assert_eq!(
            policy.evaluate(&Method::GET, "/users", false, &anon),
            AccessDecision::Unauthenticated
        );
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
            assert_eq!(
                policy.evaluate(&method, "/states", false, &anon),
                AccessDecision::Unauthenticated
            );
        }
    }

    #[test]
    fn test_authenticated_decisions() {
        let policy = policy();
        let standard = user(&["STANDARD"]);
        let admin = user(&["ADMIN"]);

        assert_eq!(
            policy.evaluate(&Method::GET, "/users", false, &standard),
            AccessDecision::Allowed
        );
        assert_eq!(
            policy.evaluate(&Method::POST, "/states", false, &standard),
            AccessDecision::Forbidden
        );
        assert_eq!(
            policy.evaluate(&Method::DELETE, "/parishes/4", false, &admin),
            AccessDecision::Allowed
        );
    }

    #[test]
    fn test_prod_requires_tls_before_rules() {
        let policy = AccessPolicy::for_profile(DeploymentProfile::Prod);
        let anon = ExecutionContext::Anonymous;

        assert_eq!(
            policy.evaluate(&Method::GET, "/states", false, &anon),
            AccessDecision::InsecureTransport
        );
        assert_eq!(
            policy.evaluate(&Method::POST, "/auth/login", false, &anon),
            AccessDecision::InsecureTransport
        );
        assert_eq!(
            policy.evaluate(&Method::GET, "/states", true, &anon),
            AccessDecision::Allowed
        );
        assert_eq!(
            policy.evaluate(&Method::POST, "/states", true, &anon),
            AccessDecision::Unauthenticated
        );
    }

    #[test]
    fn test_profiles_share_rules() {
        assert_eq!(
            AccessPolicy::for_profile(DeploymentProfile::Dev).rules(),
            AccessPolicy::for_profile(DeploymentProfile::Prod).rules()
        );
    }

    #[test]
    fn test_unmatched_defaults_to_authenticated() {
        let policy = AccessPolicy::new(DeploymentProfile::Dev, Vec::new());
        assert_eq!(
            policy.evaluate(&Method::GET, "/states", false, &ExecutionContext::Anonymous),
            AccessDecision::Unauthenticated
        );
        assert_eq!(
            policy.evaluate(&Method::POST, "/states", false, &user(&["STANDARD"])),
            AccessDecision::Allowed
        );
    }

    #[test]
    fn test_secure_transport_behind_trusted_proxy() {
        let plain = Request::builder().uri("/states").body(Body::empty()).unwrap();
        assert!(!is_secure_transport(&plain, true));

        let direct = Request::builder()
            .uri("https://directory.example.org/states")
            .body(Body::empty())
            .unwrap();
        assert!(is_secure_transport(&direct, true));

        let proxied = Request::builder()
            .uri("/states")
            .header("x-forwarded-proto", "https, http")
            .body(Body::empty())
            .unwrap();
        assert!(is_secure_transport(&proxied, true));

        let forwarded = Request::builder()
            .uri("/states")
            .header("forwarded", "for=192.0.2.60;proto=https;by=203.0.113.43")
            .body(Body::empty())
            .unwrap();
        assert!(is_secure_transport(&forwarded, true));

        let downgraded = Request::builder()
            .uri("/states")
            .header("x-forwarded-proto", "http")
            .header("forwarded", "proto=https")
            .body(Body::empty())
            .unwrap();
        assert!(!is_secure_transport(&downgraded, true));
    }

    #[test]
    fn test_forwarded_headers_ignored_without_trusted_proxy() {
        let spoofed = Request::builder()
            .uri("/states")
            .header("x-forwarded-proto", "https")
            .header("forwarded", "proto=https")
            .body(Body::empty())
            .unwrap();
        assert!(!is_secure_transport(&spoofed, false));

        let direct = Request::builder()
            .uri("https://directory.example.org/states")
            .body(Body::empty())
            .unwrap();
        assert!(is_secure_transport(&direct, false));
    }

    #[test]
    fn test_forwarded_headers_untrusted_by_default() {
        let policy = AccessPolicy::for_profile(DeploymentProfile::Prod);
        assert!(!policy.trusts_forwarded_headers());
        assert!(policy.with_forwarded_headers(true).trusts_forwarded_headers());
    }

    #[test]
    fn test_rejection_responses() {
        let uri: axum::http::Uri = "/states".parse().unwrap();

        let response =
            rejection_response(AccessDecision::Unauthenticated, None, &Method::POST, &uri);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer");

        let expired = TokenRejection(TokenError::Expired);
        let response = rejection_response(
            AccessDecision::Unauthenticated,
            Some(&expired),
            &Method::POST,
            &uri,
        );
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = rejection_response(AccessDecision::Forbidden, None, &Method::POST, &uri);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());

        let response =
            rejection_response(AccessDecision::InsecureTransport, None, &Method::GET, &uri);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
