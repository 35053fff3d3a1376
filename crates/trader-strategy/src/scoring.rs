//! 존 게이트와 입장 점수.
//!
//! 기하 판정을 통과한 후보 각각에 독립적으로 적용됩니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trader_core::{
    Candle, DetectorConfig, Direction, Price, ScoreBreakdown, ScoreWeights, TrendAlignment, Zone,
    ZoneKind, ZoneSet,
};

/// 진입가와 존의 관계.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZonePlacement {
    /// 올바른 쪽 존 위 (롱이면 지지)
    AtBacking(Zone),
    /// 근처에 존 없음
    Clear,
    /// 반대편 존이 더 가까움 (하드 거부)
    WrongSide(Zone),
}

/// 진입가 기준 존 위치를 판정합니다.
///
/// `proximity`는 가격 대비 근접 비율입니다. 반대 유형 존이 근접해 있고
/// 받침 존보다 가깝거나 받침 존이 근접하지 않으면 거부입니다.
pub fn zone_placement(
    zones: &ZoneSet,
    direction: Direction,
    price: Price,
    proximity: Decimal,
) -> ZonePlacement {
    let limit = price.abs() * proximity;
    let near = |found: Option<(&Zone, Decimal)>| -> Option<(Zone, Decimal)> {
        found
            .filter(|(_, distance)| *distance <= limit)
            .map(|(zone, distance)| (zone.clone(), distance))
    };

    let backing = near(zones.nearest(ZoneKind::backing(direction), price));
    let opposing = near(zones.nearest(ZoneKind::opposing(direction), price));

    match (backing, opposing) {
        (Some((b, b_dist)), Some((o, o_dist))) => {
            if o_dist < b_dist {
                ZonePlacement::WrongSide(o)
            } else {
                ZonePlacement::AtBacking(b)
            }
        }
        (Some((b, _)), None) => ZonePlacement::AtBacking(b),
        (None, Some((o, _))) => ZonePlacement::WrongSide(o),
        (None, None) => ZonePlacement::Clear,
    }
}

/// EMA 배열로 추세 정렬을 판정합니다.
///
/// 롱은 가격 > 빠른 EMA > 느린 EMA이면 정렬, 가격 < 빠른 < 느린이면 역행입니다.
pub fn trend_alignment(direction: Direction, price: Price, ema_fast: Decimal, ema_slow: Decimal) -> TrendAlignment {
    let up = price > ema_fast && ema_fast > ema_slow;
    let down = price < ema_fast && ema_fast < ema_slow;
    match (direction, up, down) {
        (Direction::Long, true, _) | (Direction::Short, _, true) => TrendAlignment::With,
        (Direction::Long, _, true) | (Direction::Short, true, _) => TrendAlignment::Against,
        _ => TrendAlignment::Neutral,
    }
}

/// 신호 캔들 직전에 같은 방향 급등락이 있었는지.
///
/// 직전 `count`개 캔들이 모두 신호 방향 색이고, 첫 시가에서 마지막 종가까지의
/// 유리한 이동이 `atr_multiple × atr` 이상이면 급등락입니다.
pub fn has_sharp_move(
    candles: &[Candle],
    direction: Direction,
    atr: Decimal,
    count: usize,
    atr_multiple: Decimal,
) -> bool {
    if count == 0 || candles.len() < count + 1 {
        return false;
    }
    let end = candles.len() - 1;
    let run = &candles[end - count..end];

    let same_color = run.iter().all(|c| match direction {
        Direction::Long => c.is_bullish(),
        Direction::Short => c.is_bearish(),
    });
    if !same_color {
        return false;
    }

    let (Some(first), Some(last)) = (run.first(), run.last()) else {
        return false;
    };
    direction.favorable_move(first.open, last.close) >= atr * atr_multiple
}

/// 점수 계산기.
#[derive(Debug, Clone)]
pub struct Scorer {
    weights: ScoreWeights,
    volume_strong: Decimal,
    volume_moderate: Decimal,
    threshold: u32,
}

impl Scorer {
    /// 감지 설정으로 생성합니다.
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            weights: config.weights.clone(),
            volume_strong: config.volume_strong_ratio,
            volume_moderate: config.volume_moderate_ratio,
            threshold: config.admission_threshold,
        }
    }

    /// 입장 임계값.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// 존 점수. 거부 위치면 `None`.
    pub fn zone_points(&self, placement: &ZonePlacement) -> Option<u32> {
        match placement {
            ZonePlacement::AtBacking(_) => Some(self.weights.at_zone),
            ZonePlacement::Clear => Some(self.weights.no_zone),
            ZonePlacement::WrongSide(_) => None,
        }
    }

    /// 추세 점수.
    pub fn trend_points(&self, trend: TrendAlignment) -> u32 {
        match trend {
            TrendAlignment::With => self.weights.trend_with,
            TrendAlignment::Neutral => self.weights.trend_neutral,
            TrendAlignment::Against => 0,
        }
    }

    /// 거래량 점수.
    pub fn volume_points(&self, ratio: Decimal) -> u32 {
        if ratio > self.volume_strong {
            self.weights.volume_strong
        } else if ratio > self.volume_moderate {
            self.weights.volume_moderate
        } else {
            0
        }
    }

    /// 점수 구성을 만듭니다. 존 위치가 거부면 `None`.
    pub fn score(
        &self,
        placement: &ZonePlacement,
        trend: TrendAlignment,
        volume_ratio: Decimal,
        sharp_move: bool,
    ) -> Option<ScoreBreakdown> {
        let zone = self.zone_points(placement)?;
        Some(ScoreBreakdown {
            zone,
            trend: self.trend_points(trend),
            volume: self.volume_points(volume_ratio),
            no_sharp_move: if sharp_move { 0 } else { self.weights.no_sharp_move },
        })
    }

    /// 합계가 임계값 이상이면 입장.
    pub fn admits(&self, breakdown: &ScoreBreakdown) -> bool {
        admits(breakdown.total(), self.threshold)
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::from_config(&DetectorConfig::default())
    }
}

/// 임계값 포함 비교.
pub fn admits(total: u32, threshold: u32) -> bool {
    total >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use trader_core::Timeframe;

    fn zone(low: Decimal, high: Decimal, kind: ZoneKind) -> Zone {
        Zone::new(low, high, kind, Timeframe::M15, 2)
    }

    fn candle(open: Decimal, close: Decimal) -> Candle {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let high = open.max(close) + dec!(0.1);
        let low = open.min(close) - dec!(0.1);
        Candle::new(t, open, high, low, close, dec!(10), t)
    }

    #[test]
    fn test_zone_placement() {
        let set = ZoneSet::new(
            Timeframe::M15,
            vec![
                zone(dec!(99.5), dec!(99.8), ZoneKind::Support),
                zone(dec!(100.2), dec!(100.3), ZoneKind::Resistance),
            ],
        );

        // 지지 0.2, 저항 0.2 → 받침 존
        assert!(matches!(
            zone_placement(&set, Direction::Long, dec!(100), dec!(0.005)),
            ZonePlacement::AtBacking(_)
        ));
        // 저항이 더 가까움
        assert!(matches!(
            zone_placement(&set, Direction::Long, dec!(100.1), dec!(0.005)),
            ZonePlacement::WrongSide(_)
        ));
        // 숏은 저항이 받침
        assert!(matches!(
            zone_placement(&set, Direction::Short, dec!(100.1), dec!(0.005)),
            ZonePlacement::AtBacking(_)
        ));
        // 근처에 없음
        assert_eq!(
            zone_placement(&set, Direction::Long, dec!(120), dec!(0.005)),
            ZonePlacement::Clear
        );
    }

    #[test]
    fn test_trend_alignment() {
        let long = Direction::Long;
        assert_eq!(trend_alignment(long, dec!(110), dec!(105), dec!(100)), TrendAlignment::With);
        assert_eq!(trend_alignment(long, dec!(90), dec!(95), dec!(100)), TrendAlignment::Against);
        assert_eq!(trend_alignment(long, dec!(102), dec!(105), dec!(100)), TrendAlignment::Neutral);
        assert_eq!(
            trend_alignment(Direction::Short, dec!(90), dec!(95), dec!(100)),
            TrendAlignment::With
        );
    }

    #[test]
    fn test_sharp_move() {
        let mut series = vec![
            candle(dec!(100), dec!(101)),
            candle(dec!(101), dec!(102)),
            candle(dec!(102), dec!(103)),
        ];
        series.push(candle(dec!(103), dec!(102)));

        // 누적 3, ATR 2 × 1.5 = 3
        assert!(has_sharp_move(&series, Direction::Long, dec!(2), 3, dec!(1.5)));
        assert!(!has_sharp_move(&series, Direction::Long, dec!(2.1), 3, dec!(1.5)));
        assert!(!has_sharp_move(&series, Direction::Short, dec!(1), 3, dec!(1.5)));
        assert!(!has_sharp_move(&series[..3], Direction::Long, dec!(1), 3, dec!(1.5)));
    }

    #[test]
    fn test_score_components() {
        let scorer = Scorer::default();
        let at_zone = ZonePlacement::AtBacking(zone(dec!(99), dec!(100), ZoneKind::Support));

        let best = scorer
            .score(&at_zone, TrendAlignment::With, dec!(1.6), false)
            .unwrap();
        assert_eq!(best.total(), 180);
        assert_eq!(best.normalized(), 10);

        let clear = scorer
            .score(&ZonePlacement::Clear, TrendAlignment::With, dec!(1.6), false)
            .unwrap();
        assert_eq!(clear.total(), 130);
        assert!(scorer.admits(&clear));

        let wrong = ZonePlacement::WrongSide(zone(dec!(100), dec!(101), ZoneKind::Resistance));
        assert!(scorer.score(&wrong, TrendAlignment::With, dec!(2), false).is_none());
    }

    #[test]
    fn test_volume_points_boundaries() {
        let scorer = Scorer::default();
        assert_eq!(scorer.volume_points(dec!(1.51)), 30);
        assert_eq!(scorer.volume_points(dec!(1.5)), 15);
        assert_eq!(scorer.volume_points(dec!(1.01)), 15);
        assert_eq!(scorer.volume_points(dec!(1.0)), 0);
    }

    #[test]
    fn test_admission_boundary() {
        assert!(!admits(129, 130));
        assert!(admits(130, 130));
    }
}
