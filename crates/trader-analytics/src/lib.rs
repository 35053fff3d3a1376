//! 캔들 시퀀스 분석.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 기술적 지표 (EMA, ATR, 평균 ATR, 변동성 국면, 거래량 비율)
//! - 지지/저항 존 탐지 (스윙 포인트 클러스터링)
//!
//! # Re-exports
//!
//! - [`indicators`]: 지표 계산 (IndicatorEngine, AtrParams 등)
//! - [`zones`]: 존 탐지 (ZoneFinder, SwingPoint)

pub mod indicators;
pub mod zones;

// Indicators 모듈 re-exports
pub use indicators::{
    AtrParams, EmaParams, IndicatorEngine, IndicatorError, IndicatorResult, TrendIndicators, VolatilityIndicators, VolatilityThresholds, VolumeIndicators, VolumeParams,
};

// Zones 모듈 re-exports
pub use zones::{SwingKind, SwingPoint, ZoneFinder};
