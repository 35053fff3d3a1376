//! 추세 지표: EMA.
//!
//! 패턴 감지기는 빠른/느린 EMA의 상대 위치로 추세 정렬을 판정합니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{IndicatorError, IndicatorResult};

/// EMA 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EmaParams {
    /// 평활 기간.
    pub period: usize,
}

impl Default for EmaParams {
    fn default() -> Self {
        Self { period: 50 }
    }
}

impl EmaParams {
    /// 평활 계수 k = 2 / (period + 1).
    fn smoothing(&self) -> Decimal {
        Decimal::TWO / Decimal::from(self.period + 1)
    }
}

/// 추세 지표 계산기.
#[derive(Debug, Default)]
pub struct TrendIndicators;

impl TrendIndicators {
    pub fn new() -> Self {
        Self
    }

    /// EMA 시계열.
    ///
    /// 처음 `period`개 종가의 단순 평균으로 시드한 뒤
    /// `ema = prev + k × (price - prev)`로 갱신합니다. 시드 이전 구간은 `None`입니다.
    pub fn ema(&self, prices: &[Decimal], params: EmaParams) -> IndicatorResult<Vec<Option<Decimal>>> {
        let period = params.period;
        if period == 0 {
            return Err(IndicatorError::InvalidParameter("EMA 기간은 0보다 커야 합니다".to_string()));
        }
        let Some(seed_window) = prices.get(..period) else {
            return Err(IndicatorError::InsufficientData {
                required: period,
                provided: prices.len(),
            });
        };

        let k = params.smoothing();
        let seed = seed_window.iter().sum::<Decimal>() / Decimal::from(period);

        let smoothed = prices[period..].iter().scan(seed, |prev, price| {
            *prev += k * (*price - *prev);
            Some(Some(*prev))
        });

        Ok(std::iter::repeat(None)
            .take(period - 1)
            .chain(std::iter::once(Some(seed)))
            .chain(smoothed)
            .collect())
    }

    /// 마지막 캔들 시점의 EMA.
    pub fn latest_ema(&self, prices: &[Decimal], params: EmaParams) -> IndicatorResult<Decimal> {
        self.ema(prices, params)?
            .last()
            .copied()
            .flatten()
            .ok_or_else(|| IndicatorError::CalculationError("EMA 결과가 비어 있습니다".to_string()))
    }
}
