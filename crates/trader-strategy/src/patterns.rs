//! 캔들 형태 인식.
//!
//! 마지막 1~3개 마감 캔들만 보고 네 가지 형태를 판정합니다. 점수나 게이트는
//! 적용하지 않는 순수 기하 판정입니다.
//!
//! 필요한 캔들 수보다 적은 슬라이스로 호출하는 것은 호출자 버그이므로
//! 패닉합니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use trader_core::{Candle, Direction, PatternKind};

/// 형태 판정 기준.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PatternRules {
    /// 핀바 꼬리가 몸통/반대 꼬리보다 커야 하는 최소 배수
    pub pin_bar_wick_ratio: Decimal,
    /// 핀바 몸통/범위 최대 비율
    pub pin_bar_max_body: Decimal,
}

impl Default for PatternRules {
    fn default() -> Self {
        Self {
            pin_bar_wick_ratio: dec!(2),
            pin_bar_max_body: dec!(0.35),
        }
    }
}

/// 기하 판정 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeMatch {
    /// 패턴 종류
    pub kind: PatternKind,
    /// 방향
    pub direction: Direction,
}

fn require(candles: &[Candle], kind: PatternKind) {
    assert!(
        candles.len() >= kind.required_candles(),
        "{} check needs at least {} candles, got {}",
        kind,
        kind.required_candles(),
        candles.len()
    );
}

/// 핀바.
///
/// 한쪽 꼬리가 몸통과 반대 꼬리의 `wick_ratio`배 이상이고, 종가가 범위의
/// 해당 방향 바깥 1/3에 있으며, 몸통이 범위의 `max_body` 이하입니다.
/// 긴 아래꼬리는 롱, 긴 윗꼬리는 숏입니다.
pub fn detect_pin_bar(candles: &[Candle], rules: &PatternRules) -> Option<Direction> {
    require(candles, PatternKind::PinBar);
    let c = candles.last()?;
    let m = c.metrics();
    if m.range <= Decimal::ZERO || m.body > m.range * rules.pin_bar_max_body {
        return None;
    }

    let ratio = rules.pin_bar_wick_ratio;
    let from_low = (c.close - c.low) * dec!(3);
    let from_high = (c.high - c.close) * dec!(3);

    if m.lower_wick >= m.body * ratio
        && m.lower_wick >= m.upper_wick * ratio
        && m.lower_wick > Decimal::ZERO
        && from_low >= m.range * dec!(2)
    {
        return Some(Direction::Long);
    }
    if m.upper_wick >= m.body * ratio
        && m.upper_wick >= m.lower_wick * ratio
        && m.upper_wick > Decimal::ZERO
        && from_high >= m.range * dec!(2)
    {
        return Some(Direction::Short);
    }
    None
}

/// 페이키.
///
/// 두 번째 캔들이 첫 캔들 범위 안에 있는 인사이드바이고, 세 번째 캔들이
/// 인사이드바의 극값을 넘어섰다가 반대편으로 되돌아 마감합니다.
/// 색상은 롱이 양-음-양, 숏이 음-양-음입니다.
pub fn detect_fakey(candles: &[Candle]) -> Option<Direction> {
    require(candles, PatternKind::Fakey);
    let [mother, inside, signal] = &candles[candles.len() - 3..] else {
        return None;
    };

    let is_inside = inside.high <= mother.high && inside.low >= mother.low;
    if !is_inside {
        return None;
    }

    if mother.is_bullish()
        && inside.is_bearish()
        && signal.is_bullish()
        && signal.low < inside.low
        && signal.close > inside.low
    {
        return Some(Direction::Long);
    }
    if mother.is_bearish()
        && inside.is_bullish()
        && signal.is_bearish()
        && signal.high > inside.high
        && signal.close < inside.high
    {
        return Some(Direction::Short);
    }
    None
}

/// PPR (실패한 돌파 후 반전).
///
/// 두 번째 캔들이 색을 바꾸며 첫 캔들의 반대편 극값 너머에서 마감합니다.
pub fn detect_ppr(candles: &[Candle]) -> Option<Direction> {
    require(candles, PatternKind::Ppr);
    let [prev, curr] = &candles[candles.len() - 2..] else {
        return None;
    };

    if prev.is_bearish() && curr.is_bullish() && curr.close > prev.high {
        return Some(Direction::Long);
    }
    if prev.is_bullish() && curr.is_bearish() && curr.close < prev.low {
        return Some(Direction::Short);
    }
    None
}

/// 장악형.
///
/// 마지막 캔들 범위가 직전 캔들 범위를 완전히 포함하고, 색이 반대이며,
/// 몸통이 직전 몸통 이상이고, 종가가 직전 시가를 넘어섭니다.
pub fn detect_engulfing(candles: &[Candle]) -> Option<Direction> {
    require(candles, PatternKind::Engulfing);
    let [prev, curr] = &candles[candles.len() - 2..] else {
        return None;
    };

    let contains = curr.high >= prev.high && curr.low <= prev.low;
    if !contains || curr.body_size() < prev.body_size() {
        return None;
    }

    if prev.is_bearish() && curr.is_bullish() && curr.close > prev.open {
        return Some(Direction::Long);
    }
    if prev.is_bullish() && curr.is_bearish() && curr.close < prev.open {
        return Some(Direction::Short);
    }
    None
}

/// 지정한 패턴 하나를 판정합니다.
pub fn detect_kind(kind: PatternKind, candles: &[Candle], rules: &PatternRules) -> Option<Direction> {
    match kind {
        PatternKind::PinBar => detect_pin_bar(candles, rules),
        PatternKind::Fakey => detect_fakey(candles),
        PatternKind::Ppr => detect_ppr(candles),
        PatternKind::Engulfing => detect_engulfing(candles),
    }
}

/// 판정 순서.
pub const ALL_PATTERNS: [PatternKind; 4] = [
    PatternKind::PinBar,
    PatternKind::Fakey,
    PatternKind::Ppr,
    PatternKind::Engulfing,
];

/// 캔들 수가 허용하는 모든 패턴을 판정합니다.
pub fn detect_shapes(candles: &[Candle], rules: &PatternRules) -> Vec<ShapeMatch> {
    ALL_PATTERNS
        .iter()
        .filter(|kind| candles.len() >= kind.required_candles())
        .filter_map(|kind| {
            detect_kind(*kind, candles, rules).map(|direction| ShapeMatch {
                kind: *kind,
                direction,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn c(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Candle::new(t, open, high, low, close, dec!(100), t)
    }

    #[test]
    fn test_bullish_pin_bar() {
        // 범위 10, 몸통 1, 아래꼬리 8, 윗꼬리 1
        let candle = c(dec!(108), dec!(110), dec!(100), dec!(109));
        assert_eq!(detect_pin_bar(&[candle], &PatternRules::default()), Some(Direction::Long));
    }

    #[test]
    fn test_bearish_pin_bar() {
        let candle = c(dec!(102), dec!(110), dec!(100), dec!(101));
        assert_eq!(detect_pin_bar(&[candle], &PatternRules::default()), Some(Direction::Short));
    }

    #[test]
    fn test_pin_bar_rejects_fat_body_and_mid_close() {
        // 몸통 4 > 범위 10 × 0.35
        let fat = c(dec!(105), dec!(110), dec!(100), dec!(109));
        assert_eq!(detect_pin_bar(&[fat], &PatternRules::default()), None);

        // 종가가 중간 1/3
        let mid = c(dec!(105), dec!(106), dec!(100), dec!(105.5));
        assert_eq!(detect_pin_bar(&[mid], &PatternRules::default()), None);

        let flat = c(dec!(100), dec!(100), dec!(100), dec!(100));
        assert_eq!(detect_pin_bar(&[flat], &PatternRules::default()), None);
    }

    #[test]
    fn test_bullish_fakey() {
        let mother = c(dec!(100), dec!(110), dec!(95), dec!(108));
        let inside = c(dec!(107), dec!(108), dec!(100), dec!(102));
        let signal = c(dec!(101), dec!(106), dec!(98), dec!(105));
        assert_eq!(detect_fakey(&[mother, inside, signal]), Some(Direction::Long));
    }

    #[test]
    fn test_fakey_requires_inside_bar() {
        let mother = c(dec!(100), dec!(110), dec!(95), dec!(108));
        let outside = c(dec!(107), dec!(111), dec!(100), dec!(102));
        let signal = c(dec!(101), dec!(106), dec!(98), dec!(105));
        assert_eq!(detect_fakey(&[mother, outside, signal]), None);
    }

    #[test]
    fn test_bearish_fakey() {
        let mother = c(dec!(108), dec!(110), dec!(95), dec!(97));
        let inside = c(dec!(98), dec!(105), dec!(97), dec!(104));
        let signal = c(dec!(104), dec!(107), dec!(99), dec!(100));
        assert_eq!(detect_fakey(&[mother, inside, signal]), Some(Direction::Short));
    }

    #[test]
    fn test_ppr() {
        let prev = c(dec!(105), dec!(106), dec!(100), dec!(101));
        let curr = c(dec!(101), dec!(108), dec!(100), dec!(107));
        assert_eq!(detect_ppr(&[prev.clone(), curr]), Some(Direction::Long));

        let weak = c(dec!(101), dec!(106), dec!(100), dec!(105));
        assert_eq!(detect_ppr(&[prev, weak]), None);
    }

    #[test]
    fn test_engulfing() {
        let prev = c(dec!(104), dec!(105), dec!(101), dec!(102));
        let curr = c(dec!(101.5), dec!(106), dec!(100), dec!(105));
        assert_eq!(detect_engulfing(&[prev.clone(), curr]), Some(Direction::Long));

        // 범위가 직전 고가를 포함하지 못함
        let short_range = c(dec!(101.5), dec!(104.5), dec!(100), dec!(104.4));
        assert_eq!(detect_engulfing(&[prev, short_range]), None);
    }

    #[test]
    #[should_panic(expected = "ppr check needs at least 2 candles")]
    fn test_ppr_contract_violation_panics() {
        let only = c(dec!(100), dec!(101), dec!(99), dec!(100));
        detect_ppr(&[only]);
    }

    #[test]
    #[should_panic]
    fn test_fakey_contract_violation_panics() {
        let a = c(dec!(100), dec!(101), dec!(99), dec!(100));
        detect_fakey(&[a.clone(), a]);
    }

    #[test]
    fn test_detect_shapes_collects_independent_matches() {
        let prev = c(dec!(104), dec!(105), dec!(101), dec!(102));
        let curr = c(dec!(101.5), dec!(106), dec!(100), dec!(105.5));
        let shapes = detect_shapes(&[prev, curr], &PatternRules::default());

        assert!(shapes.contains(&ShapeMatch {
            kind: PatternKind::Ppr,
            direction: Direction::Long
        }));
        assert!(shapes.contains(&ShapeMatch {
            kind: PatternKind::Engulfing,
            direction: Direction::Long
        }));
        assert!(shapes.iter().all(|s| s.kind != PatternKind::Fakey));
    }
}
