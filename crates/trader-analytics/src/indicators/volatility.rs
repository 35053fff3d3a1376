//! 변동성 지표 (Volatility Indicators).
//!
//! - ATR (Average True Range, Wilder 평활)
//! - 평균 ATR
//! - 변동성 국면 분류

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use trader_core::{Candle, VolatilityRegime};

use super::{IndicatorError, IndicatorResult};

/// ATR 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AtrParams {
    /// ATR 기간.
    pub period: usize,
}

impl Default for AtrParams {
    fn default() -> Self {
        Self { period: 14 }
    }
}

/// 변동성 국면 경계 (현재 ATR / 평균 ATR).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VolatilityThresholds {
    /// 이 비율 미만이면 저변동성
    pub low: Decimal,
    /// 이 비율 초과면 고변동성
    pub high: Decimal,
}

impl Default for VolatilityThresholds {
    fn default() -> Self {
        Self {
            low: dec!(0.8),
            high: dec!(1.5),
        }
    }
}

/// 변동성 지표 계산기.
#[derive(Debug, Default)]
pub struct VolatilityIndicators;

impl VolatilityIndicators {
    /// 새로운 변동성 지표 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// True Range 시계열. 첫 캔들은 고가 - 저가.
    pub fn true_ranges(&self, candles: &[Candle]) -> Vec<Decimal> {
        let mut ranges = Vec::with_capacity(candles.len());
        for (i, candle) in candles.iter().enumerate() {
            let hl = candle.high - candle.low;
            let tr = match i.checked_sub(1).map(|p| candles[p].close) {
                Some(prev_close) => {
                    let hc = (candle.high - prev_close).abs();
                    let lc = (candle.low - prev_close).abs();
                    hl.max(hc).max(lc)
                }
                None => hl,
            };
            ranges.push(tr);
        }
        ranges
    }

    /// ATR 시계열 계산.
    ///
    /// 초기 ATR은 처음 period개 True Range의 단순 평균이고, 이후
    /// ATR = TR × (1/n) + 이전 ATR × (1 - 1/n) 입니다.
    ///
    /// # 반환
    /// 각 시점의 ATR 값 (처음 period-1개는 None)
    pub fn atr(&self, candles: &[Candle], params: AtrParams) -> IndicatorResult<Vec<Option<Decimal>>> {
        let period = params.period;
        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "ATR 기간은 0보다 커야 합니다".to_string(),
            ));
        }
        if candles.len() < period + 1 {
            return Err(IndicatorError::InsufficientData {
                required: period + 1,
                provided: candles.len(),
            });
        }

        let true_ranges = self.true_ranges(candles);
        let alpha = Decimal::ONE / Decimal::from(period);
        let one_minus_alpha = Decimal::ONE - alpha;

        let mut result = Vec::with_capacity(true_ranges.len());
        let mut prev: Option<Decimal> = None;

        for (i, tr) in true_ranges.iter().enumerate() {
            let value = if i + 1 < period {
                None
            } else if let Some(prev_atr) = prev {
                Some(*tr * alpha + prev_atr * one_minus_alpha)
            } else {
                let sum: Decimal = true_ranges[..=i].iter().sum();
                Some(sum / Decimal::from(period))
            };
            prev = value;
            result.push(value);
        }

        Ok(result)
    }

    /// 마지막 ATR 값.
    pub fn current_atr(&self, candles: &[Candle], params: AtrParams) -> IndicatorResult<Decimal> {
        self.atr(candles, params)?
            .last()
            .copied()
            .flatten()
            .ok_or_else(|| IndicatorError::CalculationError("ATR 결과가 비어 있습니다".to_string()))
    }

    /// 최근 `average_period`개 ATR 값의 평균.
    ///
    /// 계산된 ATR 값이 그보다 적으면 있는 값만 평균합니다.
    pub fn average_atr(
        &self,
        candles: &[Candle],
        params: AtrParams,
        average_period: usize,
    ) -> IndicatorResult<Decimal> {
        if average_period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "평균 기간은 0보다 커야 합니다".to_string(),
            ));
        }

        let values: Vec<Decimal> = self
            .atr(candles, params)?
            .into_iter()
            .flatten()
            .collect();
        let take = average_period.min(values.len());
        if take == 0 {
            return Err(IndicatorError::CalculationError(
                "ATR 결과가 비어 있습니다".to_string(),
            ));
        }

        let sum: Decimal = values[values.len() - take..].iter().sum();
        Ok(sum / Decimal::from(take))
    }

    /// 현재/평균 ATR 비율로 변동성 국면을 분류합니다.
    ///
    /// 평균 ATR이 0이면 보통으로 취급합니다.
    pub fn classify(
        &self,
        current_atr: Decimal,
        average_atr: Decimal,
        thresholds: VolatilityThresholds,
    ) -> VolatilityRegime {
        if average_atr <= Decimal::ZERO {
            return VolatilityRegime::Normal;
        }
        let ratio = current_atr / average_atr;
        if ratio < thresholds.low {
            VolatilityRegime::Low
        } else if ratio > thresholds.high {
            VolatilityRegime::High
        } else {
            VolatilityRegime::Normal
        }
    }
}
