//! 거래량 기반 지표 (Volume-Based Indicators).
//!
//! ## 거래량 비율
//!
//! 마지막(현재) 캔들 거래량을 직전 N개 캔들의 평균 거래량으로 나눈 값입니다.
//! 평균에는 현재 캔들을 포함하지 않습니다.
//!
//! - 비율 ≤ 1.0: 관심 부족 (패턴 감지 전체 거부)
//! - 비율 > 1.5: 강한 참여

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trader_core::Candle;

use super::{IndicatorError, IndicatorResult};

/// 거래량 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VolumeParams {
    /// 평균 기간 (현재 캔들 제외).
    pub period: usize,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self { period: 20 }
    }
}

/// 거래량 지표 계산기.
#[derive(Debug, Default)]
pub struct VolumeIndicators;

impl VolumeIndicators {
    /// 새로운 거래량 지표 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// 마지막 캔들 직전 `period`개의 평균 거래량.
    pub fn trailing_average(&self, candles: &[Candle], params: VolumeParams) -> IndicatorResult<Decimal> {
        let period = params.period;
        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "거래량 기간은 0보다 커야 합니다".to_string(),
            ));
        }
        if candles.len() < period + 1 {
            return Err(IndicatorError::InsufficientData {
                required: period + 1,
                provided: candles.len(),
            });
        }

        let end = candles.len() - 1;
        let sum: Decimal = candles[end - period..end].iter().map(|c| c.volume).sum();
        Ok(sum / Decimal::from(period))
    }

    /// 마지막 캔들 거래량 / 직전 평균 거래량.
    ///
    /// 평균 거래량이 0이면 `None`.
    pub fn volume_ratio(&self, candles: &[Candle], params: VolumeParams) -> IndicatorResult<Option<Decimal>> {
        let average = self.trailing_average(candles, params)?;
        let current = candles
            .last()
            .map(|c| c.volume)
            .unwrap_or(Decimal::ZERO);

        if average.is_zero() {
            return Ok(None);
        }
        Ok(Some(current / average))
    }
}
