//! 동적 최소 R:R.
//!
//! 기본값에 패턴 품질, 존 신선도, 추세, 다중 타임프레임 정렬, 변동성에 따른
//! 가산 조정을 더한 뒤 [하한, 상한]으로 자릅니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trader_core::{MinRrAdjustments, MinRrConfig, TrendAlignment, VolatilityRegime};

/// 최소 R:R 입력.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinRrInputs {
    /// 0~10 정규화 패턴 점수
    pub score: u8,
    /// 최근 존 테스트 횟수
    pub zone_tests: u32,
    /// 추세 정렬
    pub trend: TrendAlignment,
    /// 다중 타임프레임 존 정렬 여부
    pub mtf_alignment: bool,
    /// 변동성 국면
    pub regime: VolatilityRegime,
}

/// 조정 내역과 최종 최소 R:R을 계산합니다.
pub fn dynamic_min_rr(inputs: &MinRrInputs, config: &MinRrConfig) -> (Decimal, MinRrAdjustments) {
    let score = if inputs.score >= config.high_score {
        config.high_score_adj
    } else if inputs.score <= config.low_score {
        config.low_score_adj
    } else {
        Decimal::ZERO
    };

    let zone_tests = if inputs.zone_tests == 0 {
        config.untested_adj
    } else if inputs.zone_tests >= config.heavily_tested {
        config.heavily_tested_adj
    } else {
        Decimal::ZERO
    };

    let trend = match inputs.trend {
        TrendAlignment::With => config.trend_with_adj,
        TrendAlignment::Neutral => Decimal::ZERO,
        TrendAlignment::Against => config.trend_against_adj,
    };

    let alignment = if inputs.mtf_alignment {
        config.alignment_adj
    } else {
        Decimal::ZERO
    };

    let volatility = if inputs.regime == VolatilityRegime::High {
        config.high_volatility_adj
    } else {
        Decimal::ZERO
    };

    let unclamped = config.base + score + zone_tests + trend + alignment + volatility;
    let adjustments = MinRrAdjustments {
        base: config.base,
        score,
        zone_tests,
        trend,
        alignment,
        volatility,
        unclamped,
    };

    (unclamped.max(config.floor).min(config.cap), adjustments)
}
