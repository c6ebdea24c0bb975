//! 시간 소스.
//!
//! 토큰 만료 판단은 항상 주입된 [`Clock`]을 통해 이루어지므로
//! 테스트에서 [`ManualClock`]으로 시간을 조작할 수 있습니다.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// 현재 시각 공급자.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// 현재 시각 (UTC).
    fn now(&self) -> DateTime<Utc>;
}

/// 시스템 시계.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 수동으로 조작하는 시계 (초 단위).
#[derive(Debug)]
pub struct ManualClock {
    secs: AtomicI64,
}

impl ManualClock {
    /// 주어진 시각에서 시작하는 시계.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            secs: AtomicI64::new(start.timestamp()),
        }
    }

    /// Unix 초에서 시작하는 시계.
    pub fn at_timestamp(secs: i64) -> Self {
        Self {
            secs: AtomicI64::new(secs),
        }
    }

    /// 시각을 앞으로 이동합니다.
    pub fn advance(&self, by: Duration) {
        self.secs.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }

    /// 시각을 지정합니다.
    pub fn set(&self, to: DateTime<Utc>) {
        self.secs.store(to.timestamp(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.secs.load(Ordering::SeqCst);
        Utc.timestamp_opt(secs, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}
