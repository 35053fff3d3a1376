//! 외부 협력자 추상화.
//!
//! 캔들 피드, 존 테스트 빈도 서비스, 시그널 저장소는 이 크레이트 밖에서
//! 구현됩니다. 엔진은 아래 trait만 통해 이들과 통신합니다.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::{Candle, PriceWindow, Signal, SignalUpdate, Zone};
use crate::types::{Price, Timeframe};

// =============================================================================
// 에러 타입
// =============================================================================

/// 협력자 호출 에러.
///
/// 캔들 피드와 저장소 구현체는 자신의 에러를 이 다섯 갈래 중 하나로 변환합니다.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 연결 끊김, 타임아웃
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 거래소/서비스가 요청을 제한함
    #[error("요청 한도 초과: {0}")]
    RateLimited(String),

    /// 응답을 캔들/가격으로 해석하지 못함
    #[error("응답 해석 실패: {0}")]
    Parse(String),

    /// 종목 또는 시그널이 존재하지 않음
    #[error("대상 없음: {0}")]
    NotFound(String),

    /// 시그널 저장/갱신 실패
    #[error("저장소 에러: {0}")]
    Storage(String),
}

impl ProviderError {
    /// 다음 주기에 같은 호출이 성공할 수 있는지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Network(_) | ProviderError::RateLimited(_))
    }
}

// =============================================================================
// CandleSource Trait
// =============================================================================

/// 캔들 피드.
///
/// 반환하는 캔들은 오래된 것부터 정렬된 **마감된** 캔들만이어야 합니다.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// 최근 마감 캔들을 최대 `limit`개 조회합니다.
    async fn closed_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ProviderError>;

    /// 현재 최우선 가격.
    async fn current_price(&self, symbol: &str) -> Result<Price, ProviderError>;

    /// `since` 이후 관측된 고가/저가 극값.
    ///
    /// 관측 데이터가 없으면 `None`.
    async fn price_window(
        &self,
        symbol: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<PriceWindow>, ProviderError>;
}

// =============================================================================
// ZoneTestFrequency Trait
// =============================================================================

/// 존 테스트 빈도 서비스.
#[async_trait]
pub trait ZoneTestFrequency: Send + Sync {
    /// 최근 `window` 동안 `zone`이 테스트된 횟수.
    async fn zone_test_count(
        &self,
        symbol: &str,
        zone: &Zone,
        window: Duration,
    ) -> Result<u32, ProviderError>;
}

// =============================================================================
// SignalRepository Trait
// =============================================================================

/// 시그널 저장소.
#[async_trait]
pub trait SignalRepository: Send + Sync {
    /// 새 시그널을 저장합니다.
    async fn create(&self, signal: &Signal) -> Result<(), ProviderError>;

    /// 종료되지 않은(진행 중 또는 부분 청산) 시그널 목록.
    async fn list_active(&self) -> Result<Vec<Signal>, ProviderError>;

    /// 상태/현재 손절가/부분 청산/손익 필드를 갱신합니다.
    async fn update(&self, id: Uuid, update: &SignalUpdate) -> Result<(), ProviderError>;
}
