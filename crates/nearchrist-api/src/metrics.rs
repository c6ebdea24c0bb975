//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭과 인증 메트릭을 수집하고 `/metrics` 엔드포인트로 노출합니다.
//! 레코더가 설치되지 않은 경우 (테스트 등) 기록 함수는 아무 일도 하지 않습니다.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// 레코더가 이미 설치되어 있으면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .install_recorder()
}

// ============================================================================
// HTTP 메트릭 헬퍼 함수
// ============================================================================

/// 라우트 템플릿에 일치하지 않은 요청의 `route` 라벨.
///
/// 임의의 경로가 그대로 라벨이 되면 시계열 수가 제한 없이 늘어납니다.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// HTTP 요청 카운터 증가. `route`는 `/parishes/{id}` 같은 라우트 템플릿입니다.
pub fn record_http_request(method: &str, route: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "route" => route.to_string())
        .increment(1);
}

/// HTTP 응답 카운터 증가.
pub fn record_http_response(method: &str, route: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(method: &str, route: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 인증 메트릭 헬퍼 함수
// ============================================================================

/// 로그인 시도 결과 (`success`, `unknown_identifier`, `bad_secret`, `disabled`).
pub fn record_login(outcome: &str) {
    counter!("auth_login_total", "outcome" => outcome.to_string()).increment(1);
}

/// 거부된 Bearer 토큰 (`bad_signature`, `malformed`, `expired`).
pub fn record_token_rejection(reason: &str) {
    counter!("auth_token_rejections_total", "reason" => reason.to_string()).increment(1);
}

/// 접근 정책 판단 결과.
pub fn record_access_decision(decision: &str) {
    counter!("auth_access_decisions_total", "decision" => decision.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmatched_requests_share_one_series() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        ::metrics::with_local_recorder(&recorder, || {
            record_http_request("GET", UNMATCHED_ROUTE);
            record_http_request("GET", UNMATCHED_ROUTE);
            record_http_request("GET", "/parishes/{id}");
        });

        let rendered = handle.render();
        let series: Vec<&str> = rendered
            .lines()
            .filter(|line| line.starts_with("http_requests_total{"))
            .collect();
        assert_eq!(series.len(), 2, "{rendered}");

        let unmatched = series
            .iter()
            .find(|line| line.contains(r#"route="unmatched""#))
            .unwrap();
        assert!(unmatched.ends_with(" 2"), "{unmatched}");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_login("success");
        record_token_rejection("expired");
        record_access_decision("allowed");
    }
}
