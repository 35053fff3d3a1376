//! 손절가 배치.
//!
//! 1. 최근 마감 캔들의 스윙 극값
//! 2. 변동성 국면별 적응형 버퍼
//! 3. 라운드 넘버 회피
//! 4. 받침 존 최소 여유
//!
//! 각 단계는 이전 단계 결과를 입력으로 받으며 순서가 결과에 영향을 줍니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trader_core::{
    round_number_step, Candle, DecimalExt, Direction, Price, RiskProfileConfig, VolatilityRegime,
    Zone,
};

/// 손절 배치 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopPlacement {
    /// 최종 손절가
    pub stop: Price,
    /// 기준 스윙 극값
    pub swing_extreme: Price,
    /// 변동성 국면
    pub regime: VolatilityRegime,
    /// 적용 버퍼
    pub buffer: Decimal,
    /// 라운드 넘버 회피 여부
    pub round_number_adjusted: bool,
    /// 존 여유 확보로 추가 이동한 거리
    pub zone_clearance_push: Decimal,
}

/// 최근 `lookback`개 마감 캔들의 최저 저가 (롱) 또는 최고 고가 (숏).
///
/// 캔들이 없으면 `None`.
pub fn swing_extreme(candles: &[Candle], direction: Direction, lookback: usize) -> Option<Price> {
    let start = candles.len().saturating_sub(lookback.max(1));
    let window = &candles[start..];
    match direction {
        Direction::Long => window.iter().map(|c| c.low).min(),
        Direction::Short => window.iter().map(|c| c.high).max(),
    }
}

/// 변동성 국면별 버퍼 배수.
pub fn buffer_multiplier(regime: VolatilityRegime, config: &RiskProfileConfig) -> Decimal {
    match regime {
        VolatilityRegime::Low => config.buffer_low,
        VolatilityRegime::Normal => config.buffer_normal,
        VolatilityRegime::High => config.buffer_high,
    }
}

/// 가격이 라운드 넘버 근처인지.
pub fn near_round_number(price: Price, proximity: Decimal) -> bool {
    let level = price.nearest_multiple(round_number_step(price));
    (price - level).abs() <= price.abs() * proximity
}

/// 손절가를 계산합니다.
///
/// `active_zone`은 패턴이 발생한 받침 존입니다. 없으면 존 여유 단계는 생략합니다.
pub fn place_stop(
    direction: Direction,
    entry: Price,
    candles: &[Candle],
    atr_m15: Decimal,
    regime: VolatilityRegime,
    active_zone: Option<&Zone>,
    config: &RiskProfileConfig,
) -> StopPlacement {
    let away = direction.opposite();
    let swing = swing_extreme(candles, direction, config.swing_lookback).unwrap_or(entry);
    // 진입가보다 유리한 쪽의 스윙은 진입가로 제한
    let swing = match direction {
        Direction::Long => swing.min(entry),
        Direction::Short => swing.max(entry),
    };

    let buffer = buffer_multiplier(regime, config) * atr_m15;
    let mut stop = away.offset(swing, buffer);

    let round_number_adjusted = near_round_number(stop, config.round_number_proximity);
    if round_number_adjusted {
        stop = away.offset(stop, config.round_number_push_atr * atr_m15);
    }

    let mut zone_clearance_push = Decimal::ZERO;
    if let Some(zone) = active_zone {
        let required = away.offset(zone.edge(direction), config.zone_clearance_atr * atr_m15);
        if direction.is_beyond(stop, required) {
            zone_clearance_push = (stop - required).abs();
            stop = required;
        }
    }

    StopPlacement {
        stop,
        swing_extreme: swing,
        regime,
        buffer,
        round_number_adjusted,
        zone_clearance_push,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use trader_core::{Timeframe, ZoneKind};

    fn bar(low: Decimal, high: Decimal) -> Candle {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Candle::new(t, low, high, low, high, dec!(1), t)
    }

    fn series() -> Vec<Candle> {
        vec![
            bar(dec!(240), dec!(250)),
            bar(dec!(243.7), dec!(246)),
            bar(dec!(244), dec!(247)),
            bar(dec!(244.5), dec!(248)),
            bar(dec!(245), dec!(249)),
            bar(dec!(246), dec!(250)),
        ]
    }

    #[test]
    fn test_swing_extreme_uses_lookback() {
        let candles = series();
        assert_eq!(swing_extreme(&candles, Direction::Long, 5), Some(dec!(243.7)));
        assert_eq!(swing_extreme(&candles, Direction::Short, 5), Some(dec!(250)));
        assert_eq!(swing_extreme(&candles, Direction::Long, 6), Some(dec!(240)));
        assert_eq!(swing_extreme(&[], Direction::Long, 5), None);
    }

    #[test]
    fn test_adaptive_buffer_by_regime() {
        let config = RiskProfileConfig::default();
        assert_eq!(buffer_multiplier(VolatilityRegime::Low, &config), dec!(0.3));
        assert_eq!(buffer_multiplier(VolatilityRegime::Normal, &config), dec!(0.4));
        assert_eq!(buffer_multiplier(VolatilityRegime::High, &config), dec!(0.5));
    }

    #[test]
    fn test_round_number_detection() {
        // 245 근처 10 단위 → 250, 240. 0.5% of 243.3 ≈ 1.2165
        assert!(!near_round_number(dec!(243.3), dec!(0.005)));
        assert!(near_round_number(dec!(241), dec!(0.005)));
        assert!(near_round_number(dec!(64980), dec!(0.005)));
    }

    #[test]
    fn test_place_stop_long_without_zone() {
        // 스윙 243.7, 버퍼 0.4 × 1 → 243.3 (라운드 넘버 아님)
        let placement = place_stop(
            Direction::Long,
            dec!(249.5),
            &series(),
            dec!(1),
            VolatilityRegime::Normal,
            None,
            &RiskProfileConfig::default(),
        );
        assert_eq!(placement.swing_extreme, dec!(243.7));
        assert_eq!(placement.stop, dec!(243.3));
        assert!(!placement.round_number_adjusted);
        assert_eq!(placement.zone_clearance_push, Decimal::ZERO);
    }

    #[test]
    fn test_place_stop_round_number_push() {
        // 스윙 241.5 - 0.4 = 241.1 → 240 근처, 추가 0.1 → 241.0
        let candles = vec![bar(dec!(241.5), dec!(246))];
        let placement = place_stop(
            Direction::Long,
            dec!(245),
            &candles,
            dec!(1),
            VolatilityRegime::Normal,
            None,
            &RiskProfileConfig::default(),
        );
        assert!(placement.round_number_adjusted);
        assert_eq!(placement.stop, dec!(241.0));
    }

    #[test]
    fn test_place_stop_zone_clearance() {
        // 존 하단 243.5 - 0.5 = 243.0 → 243.3에서 0.3 추가 이동
        let zone = Zone::new(dec!(243.5), dec!(244.5), ZoneKind::Support, Timeframe::M15, 2);
        let placement = place_stop(
            Direction::Long,
            dec!(249.5),
            &series(),
            dec!(1),
            VolatilityRegime::Normal,
            Some(&zone),
            &RiskProfileConfig::default(),
        );
        assert_eq!(placement.stop, dec!(243.0));
        assert_eq!(placement.zone_clearance_push, dec!(0.3));
    }

    #[test]
    fn test_place_stop_short_mirrors() {
        let placement = place_stop(
            Direction::Short,
            dec!(246.5),
            &series(),
            dec!(1),
            VolatilityRegime::High,
            None,
            &RiskProfileConfig::default(),
        );
        // 스윙 250 + 0.5 = 250.5 → 250 근처, 추가 0.1
        assert_eq!(placement.swing_extreme, dec!(250));
        assert!(placement.round_number_adjusted);
        assert_eq!(placement.stop, dec!(250.6));
    }
}
