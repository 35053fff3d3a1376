//! 캔들 시퀀스 지표.
//!
//! | 지표 | 사용처 |
//! |------|--------|
//! | EMA (빠름/느림) | 패턴 감지기의 추세 정렬 |
//! | ATR (Wilder) | 스톱 버퍼, 비토, 존 근접 판정 |
//! | 평균 ATR / 변동성 국면 | 최소 R:R 조정 |
//! | 거래량 비율 | 패턴 감지 거래량 필터 |
//!
//! ```ignore
//! let engine = IndicatorEngine::new();
//! let atr = engine.current_atr(&candles, AtrParams { period: 14 })?;
//! ```

pub mod trend;
pub mod volatility;
pub mod volume;

use rust_decimal::Decimal;
use thiserror::Error;
use trader_core::{Candle, VolatilityRegime};

pub use trend::{EmaParams, TrendIndicators};
pub use volatility::{AtrParams, VolatilityIndicators, VolatilityThresholds};
pub use volume::{VolumeIndicators, VolumeParams};

/// 지표 계산 오류.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// 캔들/가격 수가 기간보다 적음
    #[error("데이터가 부족합니다: 필요 {required}개, 제공 {provided}개")]
    InsufficientData { required: usize, provided: usize },

    /// 잘못된 파라미터
    #[error("잘못된 파라미터: {0}")]
    InvalidParameter(String),

    /// 계산 오류
    #[error("계산 오류: {0}")]
    CalculationError(String),
}

/// 지표 계산 결과 타입.
pub type IndicatorResult<T> = Result<T, IndicatorError>;

/// 지표 계산기 묶음.
///
/// 감지기, 리스크 계산기, 스캐너가 각자 하나씩 소유합니다.
#[derive(Debug, Default)]
pub struct IndicatorEngine {
    trend: TrendIndicators,
    volatility: VolatilityIndicators,
    volume: VolumeIndicators,
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// EMA 시계열.
    pub fn ema(&self, prices: &[Decimal], params: EmaParams) -> IndicatorResult<Vec<Option<Decimal>>> {
        self.trend.ema(prices, params)
    }

    /// 마지막 EMA 값.
    pub fn latest_ema(&self, prices: &[Decimal], params: EmaParams) -> IndicatorResult<Decimal> {
        self.trend.latest_ema(prices, params)
    }

    /// 캔들 시퀀스의 ATR 시계열.
    pub fn atr(&self, candles: &[Candle], params: AtrParams) -> IndicatorResult<Vec<Option<Decimal>>> {
        self.volatility.atr(candles, params)
    }

    /// 마지막 ATR 값.
    pub fn current_atr(&self, candles: &[Candle], params: AtrParams) -> IndicatorResult<Decimal> {
        self.volatility.current_atr(candles, params)
    }

    /// 최근 `average_period`개 ATR 값의 평균.
    pub fn average_atr(
        &self,
        candles: &[Candle],
        params: AtrParams,
        average_period: usize,
    ) -> IndicatorResult<Decimal> {
        self.volatility.average_atr(candles, params, average_period)
    }

    /// 현재 ATR과 평균 ATR로 변동성 국면을 분류합니다.
    pub fn volatility_regime(
        &self,
        current_atr: Decimal,
        average_atr: Decimal,
        thresholds: VolatilityThresholds,
    ) -> VolatilityRegime {
        self.volatility
            .classify(current_atr, average_atr, thresholds)
    }

    /// 마지막 캔들 거래량 / 직전 평균 거래량.
    pub fn volume_ratio(&self, candles: &[Candle], params: VolumeParams) -> IndicatorResult<Option<Decimal>> {
        self.volume.volume_ratio(candles, params)
    }
}
