//! 지지/저항 존 탐지.
//!
//! 프랙탈 방식으로 스윙 고점/저점을 찾고, 가격 대비 허용 오차 안에 모이는
//! 스윙 가격들을 하나의 존으로 묶습니다. 존은 스캔마다 다시 계산되며
//! 식별자를 갖지 않습니다.
//!
//! # 사용 예시
//!
//! ```ignore
//! use trader_analytics::zones::ZoneFinder;
//!
//! let finder = ZoneFinder::new(config.zones.clone());
//! let zones = finder.find_multi(&m15, &h1, &h4);
//! let support = zones.h1.backing(Direction::Long, price);
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use trader_core::{
    Candle, MultiTimeframeZones, Price, Timeframe, Zone, ZoneFinderConfig, ZoneKind, ZoneSet,
};

/// 스윙 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwingKind {
    /// 스윙 고점
    High,
    /// 스윙 저점
    Low,
}

/// 스윙 포인트.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwingPoint {
    /// 캔들 인덱스
    pub index: usize,
    /// 고점이면 고가, 저점이면 저가
    pub price: Price,
    /// 종류
    pub kind: SwingKind,
}

/// 존 탐지기.
#[derive(Debug, Clone, Default)]
pub struct ZoneFinder {
    config: ZoneFinderConfig,
}

impl ZoneFinder {
    /// 새 존 탐지기를 생성합니다.
    pub fn new(config: ZoneFinderConfig) -> Self {
        Self { config }
    }

    /// 설정.
    pub fn config(&self) -> &ZoneFinderConfig {
        &self.config
    }

    /// 프랙탈 스윙 포인트를 찾습니다.
    ///
    /// 좌측 `swing_strength`개보다 엄격히 높고 우측 `swing_strength`개 이상인
    /// 고가를 스윙 고점으로 봅니다 (저점은 대칭). 같은 값이 이어지는 경우
    /// 가장 왼쪽 캔들 하나만 스윙이 됩니다.
    pub fn swing_points(&self, candles: &[Candle]) -> Vec<SwingPoint> {
        let n = self.config.swing_strength.max(1);
        let mut points = Vec::new();
        if candles.len() < 2 * n + 1 {
            return points;
        }

        for i in n..candles.len() - n {
            let high = candles[i].high;
            let low = candles[i].low;
            let left = &candles[i - n..i];
            let right = &candles[i + 1..=i + n];

            if left.iter().all(|c| high > c.high) && right.iter().all(|c| high >= c.high) {
                points.push(SwingPoint {
                    index: i,
                    price: high,
                    kind: SwingKind::High,
                });
            }
            if left.iter().all(|c| low < c.low) && right.iter().all(|c| low <= c.low) {
                points.push(SwingPoint {
                    index: i,
                    price: low,
                    kind: SwingKind::Low,
                });
            }
        }

        points
    }

    /// 스윙 가격을 존 대역으로 묶습니다.
    ///
    /// 오름차순 정렬 후, 클러스터 시작 가격 대비 `cluster_tolerance` 이내인
    /// 가격을 같은 클러스터에 넣습니다. 반환값은 (하단, 상단, 터치 수)입니다.
    pub fn cluster(&self, mut prices: Vec<Price>) -> Vec<(Price, Price, u32)> {
        prices.sort();
        let mut clusters: Vec<(Price, Price, u32)> = Vec::new();

        for price in prices {
            match clusters.last_mut() {
                Some((start, high, touches))
                    if price - *start <= start.abs() * self.config.cluster_tolerance =>
                {
                    *high = price;
                    *touches += 1;
                }
                _ => clusters.push((price, price, 1)),
            }
        }

        clusters
    }

    /// 한 타임프레임의 캔들로 존 스냅샷을 계산합니다.
    ///
    /// 최근 `lookback`개 캔들만 사용하며, 유형은 마지막 종가 기준입니다.
    pub fn find(&self, candles: &[Candle], timeframe: Timeframe) -> ZoneSet {
        let start = candles.len().saturating_sub(self.config.lookback.max(1));
        let window = &candles[start..];
        let Some(last) = window.last() else {
            return ZoneSet::empty(timeframe);
        };

        let swings = self.swing_points(window);
        let prices: Vec<Decimal> = swings.iter().map(|s| s.price).collect();

        let zones: Vec<Zone> = self
            .cluster(prices)
            .into_iter()
            .filter(|(_, _, touches)| *touches >= self.config.min_touches)
            .map(|(low, high, touches)| {
                let mut zone = Zone::new(low, high, ZoneKind::Support, timeframe, touches);
                zone.kind = zone.kind_relative_to(last.close);
                zone
            })
            .collect();

        debug!(
            timeframe = %timeframe,
            candles = window.len(),
            swings = swings.len(),
            zones = zones.len(),
            "zones detected"
        );

        ZoneSet::new(timeframe, zones)
    }

    /// 15분/1시간/4시간 캔들로 다중 타임프레임 존을 계산합니다.
    pub fn find_multi(&self, m15: &[Candle], h1: &[Candle], h4: &[Candle]) -> MultiTimeframeZones {
        MultiTimeframeZones::new(
            self.find(m15, Timeframe::M15),
            self.find(h1, Timeframe::H1),
            self.find(h4, Timeframe::H4),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use trader_core::{Direction, ZoneStrength};

    fn bar(i: usize, high: Decimal, low: Decimal) -> Candle {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(i as i64);
        let mid = (high + low) / dec!(2);
        Candle::new(t, mid, high, low, mid, dec!(10), t + Duration::hours(1))
    }

    /// 100~110 사이를 오가는 톱니 파형 (주기 6)
    fn range_bound(len: usize) -> Vec<Candle> {
        let highs = [dec!(104), dec!(107), dec!(110), dec!(107), dec!(104), dec!(102)];
        let lows = [dec!(102), dec!(104), dec!(107), dec!(104), dec!(102), dec!(100)];
        (0..len).map(|i| bar(i, highs[i % 6], lows[i % 6])).collect()
    }

    #[test]
    fn test_swing_points() {
        let finder = ZoneFinder::default();
        assert_eq!(finder.config().swing_strength, 2);
        let swings = finder.swing_points(&range_bound(18));

        let highs: Vec<_> = swings.iter().filter(|s| s.kind == SwingKind::High).collect();
        let lows: Vec<_> = swings.iter().filter(|s| s.kind == SwingKind::Low).collect();
        assert!(highs.iter().all(|s| s.price == dec!(110)));
        assert!(lows.iter().all(|s| s.price == dec!(100)));
        assert_eq!(highs.len(), 3);
        assert_eq!(lows.len(), 2);
    }

    #[test]
    fn test_cluster_tolerance() {
        let finder = ZoneFinder::new(ZoneFinderConfig {
            cluster_tolerance: dec!(0.01),
            ..ZoneFinderConfig::default()
        });
        let clusters = finder.cluster(vec![dec!(100.5), dec!(100), dec!(120), dec!(101), dec!(101.5)]);

        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0], (dec!(100), dec!(101), 3));
        assert_eq!(clusters[1], (dec!(101.5), dec!(101.5), 1));
        assert_eq!(clusters[2], (dec!(120), dec!(120), 1));
    }

    #[test]
    fn test_find_zones_relative_to_last_close() {
        let finder = ZoneFinder::new(ZoneFinderConfig::default());
        let mut candles = range_bound(60);
        // 마지막 종가 105
        candles.push(bar(60, dec!(106), dec!(104)));

        let set = finder.find(&candles, Timeframe::H1);
        assert_eq!(set.timeframe, Timeframe::H1);
        assert_eq!(set.len(), 2);

        let support = &set.zones[0];
        let resistance = &set.zones[1];
        assert_eq!(support.low, dec!(100));
        assert_eq!(support.kind, ZoneKind::Support);
        assert_eq!(resistance.high, dec!(110));
        assert_eq!(resistance.kind, ZoneKind::Resistance);
        assert_eq!(resistance.strength, ZoneStrength::Strong);

        let (backing, distance) = set.backing(Direction::Long, dec!(105)).unwrap();
        assert_eq!(backing.low, dec!(100));
        assert_eq!(distance, dec!(5));
    }

    #[test]
    fn test_find_empty_and_short_series() {
        let finder = ZoneFinder::default();
        assert!(finder.find(&[], Timeframe::M15).is_empty());
        assert!(finder.find(&range_bound(3), Timeframe::M15).is_empty());

        let multi = finder.find_multi(&[], &[], &[]);
        assert!(multi.iter().all(|set| set.is_empty()));
    }
}
