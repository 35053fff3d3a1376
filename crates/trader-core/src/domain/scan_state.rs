//! 호출자가 소유하는 스캔 상태.
//!
//! 요청 가중치 카운터와 존 테스트 이력은 전역 싱글턴이 아니라 스캔 루프에
//! `&mut`로 주입되는 명시적 상태 객체입니다.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Zone;

// =============================================================================
// RequestBudget
// =============================================================================

/// 고정 윈도우 요청 가중치 예산.
///
/// 윈도우 경계(에폭 기준 `window` 단위)가 바뀌면 사용량이 0으로 초기화됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBudget {
    capacity: u32,
    window_secs: i64,
    used: u32,
    window_index: Option<i64>,
}

impl RequestBudget {
    /// 새 예산을 생성합니다. `window`가 1초 미만이면 1초로 취급합니다.
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity,
            window_secs: window.num_seconds().max(1),
            used: 0,
            window_index: None,
        }
    }

    /// 분당 한도 예산.
    pub fn per_minute(capacity: u32) -> Self {
        Self::new(capacity, Duration::minutes(1))
    }

    fn index_of(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp().div_euclid(self.window_secs)
    }

    fn roll(&mut self, now: DateTime<Utc>) {
        let idx = self.index_of(now);
        if self.window_index != Some(idx) {
            self.window_index = Some(idx);
            self.used = 0;
        }
    }

    /// `weight`만큼 예산을 사용합니다. 남은 예산이 부족하면 `false`.
    pub fn try_acquire(&mut self, weight: u32, now: DateTime<Utc>) -> bool {
        self.roll(now);
        match self.used.checked_add(weight) {
            Some(total) if total <= self.capacity => {
                self.used = total;
                true
            }
            _ => false,
        }
    }

    /// 현재 윈도우의 남은 가중치.
    pub fn remaining(&mut self, now: DateTime<Utc>) -> u32 {
        self.roll(now);
        self.capacity.saturating_sub(self.used)
    }

    /// 다음 윈도우 시작까지 남은 시간.
    pub fn until_next_window(&self, now: DateTime<Utc>) -> Duration {
        let next_start = (self.index_of(now) + 1) * self.window_secs;
        Duration::seconds(next_start - now.timestamp())
    }

    /// 윈도우당 최대 가중치.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

// =============================================================================
// ZoneTestTracker
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrackedZone {
    low: Decimal,
    high: Decimal,
    tests: Vec<DateTime<Utc>>,
}

/// 종목별 존 테스트 이력.
///
/// 존은 스캔마다 다시 계산되어 식별자가 없으므로, 가격 대역이 `tolerance`
/// 이내로 겹치면 같은 존으로 취급합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneTestTracker {
    tolerance_ratio: Decimal,
    zones: HashMap<String, Vec<TrackedZone>>,
}

impl ZoneTestTracker {
    /// 새 추적기를 생성합니다. `tolerance_ratio`는 존 중심가 대비 비율입니다.
    pub fn new(tolerance_ratio: Decimal) -> Self {
        Self {
            tolerance_ratio,
            zones: HashMap::new(),
        }
    }

    fn tolerance_for(&self, zone: &Zone) -> Decimal {
        zone.mid().abs() * self.tolerance_ratio
    }

    fn find(&self, symbol: &str, zone: &Zone) -> Option<&TrackedZone> {
        let tolerance = self.tolerance_for(zone);
        self.zones.get(symbol)?.iter().find(|t| {
            zone.low - tolerance <= t.high && t.low - tolerance <= zone.high
        })
    }

    /// `at` 시점의 존 테스트를 기록합니다.
    pub fn record_test(&mut self, symbol: &str, zone: &Zone, at: DateTime<Utc>) {
        let tolerance = self.tolerance_for(zone);
        let entries = self.zones.entry(symbol.to_string()).or_default();
        let existing = entries
            .iter_mut()
            .find(|t| zone.low - tolerance <= t.high && t.low - tolerance <= zone.high);

        match existing {
            Some(tracked) => {
                tracked.low = tracked.low.min(zone.low);
                tracked.high = tracked.high.max(zone.high);
                tracked.tests.push(at);
            }
            None => entries.push(TrackedZone {
                low: zone.low,
                high: zone.high,
                tests: vec![at],
            }),
        }
    }

    /// `now` 기준 최근 `window` 동안의 테스트 횟수.
    pub fn tests_within(
        &self,
        symbol: &str,
        zone: &Zone,
        window: Duration,
        now: DateTime<Utc>,
    ) -> u32 {
        let since = now - window;
        self.find(symbol, zone)
            .map(|t| t.tests.iter().filter(|at| **at > since && **at <= now).count() as u32)
            .unwrap_or(0)
    }

    /// `cutoff` 이전 기록을 정리합니다.
    pub fn prune(&mut self, cutoff: DateTime<Utc>) {
        for entries in self.zones.values_mut() {
            for tracked in entries.iter_mut() {
                tracked.tests.retain(|at| *at >= cutoff);
            }
            entries.retain(|t| !t.tests.is_empty());
        }
        self.zones.retain(|_, entries| !entries.is_empty());
    }

    /// 추적 중인 존 대역 수.
    pub fn tracked_zones(&self) -> usize {
        self.zones.values().map(Vec::len).sum()
    }
}
