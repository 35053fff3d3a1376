//! 동적 리스크 프로파일 계산기.
//!
//! 단계 순서가 결과에 영향을 주므로 항상 다음 순서로 실행합니다.
//!
//! 1. 반대편 존 비토
//! 2. 스윙 극값 → 적응형 버퍼 → 라운드 넘버 회피 → 존 여유 (최종 손절)
//! 3. 반대편 존까지 여유와 가용 R
//! 4. 하이브리드 익절
//! 5. 동적 최소 R:R
//! 6. 검증
//!
//! 같은 입력이면 항상 같은 결과를 돌려줍니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trader_analytics::{AtrParams, IndicatorEngine, IndicatorResult, VolatilityThresholds};
use trader_core::{
    Candle, DecimalExt, Direction, MultiTimeframeZones, PatternCandidate, Price, RiskDecision,
    RiskDiagnostics, RiskProfile, RiskProfileConfig, Scenario, VolatilityRegime, Zone,
};

use crate::min_rr::{dynamic_min_rr, MinRrInputs};
use crate::stop_loss::place_stop;
use crate::take_profit::plan_take_profits;
use crate::veto::check_veto;

/// 세 타임프레임의 현재 ATR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtrSet {
    /// 15분봉 ATR
    pub m15: Decimal,
    /// 1시간봉 ATR
    pub h1: Decimal,
    /// 4시간봉 ATR
    pub h4: Decimal,
}

impl AtrSet {
    /// 새 ATR 묶음을 생성합니다.
    pub fn new(m15: Decimal, h1: Decimal, h4: Decimal) -> Self {
        Self { m15, h1, h4 }
    }

    /// 타임프레임별 캔들로 ATR을 계산합니다.
    pub fn from_candles(
        engine: &IndicatorEngine,
        m15: &[Candle],
        h1: &[Candle],
        h4: &[Candle],
        params: AtrParams,
    ) -> IndicatorResult<Self> {
        Ok(Self {
            m15: engine.current_atr(m15, params)?,
            h1: engine.current_atr(h1, params)?,
            h4: engine.current_atr(h4, params)?,
        })
    }
}

/// 리스크 프로파일 계산기.
#[derive(Debug, Default)]
pub struct RiskProfileCalculator {
    config: RiskProfileConfig,
    engine: IndicatorEngine,
}

impl RiskProfileCalculator {
    /// 새 계산기를 생성합니다.
    pub fn new(config: RiskProfileConfig) -> Self {
        Self {
            config,
            engine: IndicatorEngine::new(),
        }
    }

    /// 설정.
    pub fn config(&self) -> &RiskProfileConfig {
        &self.config
    }

    /// 현재/평균 ATR 비율로 변동성 국면을 판정합니다.
    ///
    /// 이력이 부족하면 보통으로 봅니다.
    pub fn volatility_regime(&self, candles: &[Candle]) -> VolatilityRegime {
        let params = AtrParams {
            period: self.config.atr_period,
        };
        let current = self.engine.current_atr(candles, params);
        let average = self
            .engine
            .average_atr(candles, params, self.config.atr_average_period);

        match (current, average) {
            (Ok(current), Ok(average)) => self.engine.volatility_regime(
                current,
                average,
                VolatilityThresholds {
                    low: self.config.low_volatility_ratio,
                    high: self.config.high_volatility_ratio,
                },
            ),
            _ => VolatilityRegime::Normal,
        }
    }

    /// 받침 존이 상위 타임프레임 받침 존과 겹치는지.
    ///
    /// 기준 존은 패턴의 활성 존이고, 없으면 15분봉의 가장 가까운 받침 존입니다.
    pub fn mtf_alignment(
        &self,
        direction: Direction,
        entry: Price,
        active_zone: Option<&Zone>,
        zones: &MultiTimeframeZones,
        atr_m15: Decimal,
    ) -> bool {
        let base = active_zone.or_else(|| zones.m15.backing(direction, entry).map(|(z, _)| z));
        let Some(base) = base else {
            return false;
        };

        let tolerance = self.config.min_rr.alignment_atr * atr_m15;
        [&zones.h1, &zones.h4]
            .into_iter()
            .filter(|set| set.timeframe != base.timeframe)
            .filter_map(|set| set.backing(direction, entry))
            .any(|(zone, _)| zone.overlaps(base, tolerance))
    }

    /// 리스크 프로파일을 계산합니다.
    ///
    /// `candles`는 패턴 타임프레임의 마감 캔들이며 스윙 극값과 변동성 국면에
    /// 사용됩니다. `zone_test_count`는 활성 존의 최근 테스트 횟수입니다.
    pub fn calculate_risk_profile(
        &self,
        candidate: &PatternCandidate,
        candles: &[Candle],
        zones: &MultiTimeframeZones,
        atrs: &AtrSet,
        zone_test_count: u32,
    ) -> RiskDecision {
        let direction = candidate.direction;
        let entry = candidate.entry_price;
        let config = &self.config;

        if let Some(veto) = check_veto(direction, entry, zones, atrs, config) {
            info!(
                symbol = %candidate.symbol,
                direction = %direction,
                reason = veto.reason.code(),
                distance = %veto.distance,
                required = %veto.required,
                "risk profile vetoed"
            );
            return RiskDecision::Veto(veto);
        }

        let regime = self.volatility_regime(candles);
        let placement = place_stop(
            direction,
            entry,
            candles,
            atrs.m15,
            regime,
            candidate.active_zone.as_ref(),
            config,
        );
        let stop = placement.stop;
        let risk = (entry - stop).abs();

        let clearance_m15 = zones.m15.nearest_opposing(direction, entry).map(|(_, d)| d);
        let clearance_h1 = zones.h1.nearest_opposing(direction, entry).map(|(_, d)| d);
        let r_available = match (clearance_m15, clearance_h1) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
        .and_then(|clearance| (config.room_factor * clearance).checked_ratio(risk))
        .map(|room| room.floor_to_step(config.room_step));

        let opposing = zones.all_opposing(direction, entry);
        let plan = plan_take_profits(direction, entry, risk, &opposing, config);
        let [tp1, tp2, tp3] = plan.targets;
        let rr = |tp: Option<Price>| tp.and_then(|p| direction.favorable_move(entry, p).checked_ratio(risk));

        let mtf_alignment = self.mtf_alignment(
            direction,
            entry,
            candidate.active_zone.as_ref(),
            zones,
            atrs.m15,
        );
        let (min_rr_required, adjustments) = dynamic_min_rr(
            &MinRrInputs {
                score: candidate.score,
                zone_tests: zone_test_count,
                trend: candidate.trend,
                mtf_alignment,
                regime,
            },
            &config.min_rr,
        );

        let rr1 = rr(tp1);
        let is_valid = matches!(rr1, Some(value) if value >= min_rr_required);
        let scenario = Scenario::classify(tp1, tp2, tp3);

        debug!(
            symbol = %candidate.symbol,
            direction = %direction,
            entry = %entry,
            stop = %stop,
            risk = %risk,
            scenario = %scenario,
            min_rr = %min_rr_required,
            is_valid,
            atr_h4 = %atrs.h4,
            "risk profile calculated"
        );

        RiskDecision::Profile(RiskProfile {
            direction,
            entry,
            stop_loss: stop,
            risk,
            tp1,
            tp2,
            tp3,
            rr1,
            rr2: rr(tp2),
            rr3: rr(tp3),
            min_rr_required,
            is_valid,
            scenario,
            diagnostics: RiskDiagnostics {
                swing_extreme: placement.swing_extreme,
                volatility_regime: regime,
                adaptive_buffer: placement.buffer,
                round_number_adjusted: placement.round_number_adjusted,
                zone_clearance_push: placement.zone_clearance_push,
                clearance_m15,
                clearance_h1,
                r_available,
                zone_limited: plan.zone_limited,
                mtf_alignment,
                min_rr: adjustments,
            },
        })
    }
}
