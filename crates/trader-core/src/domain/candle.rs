//! 캔들 및 캔들 메트릭.
//!
//! 이 모듈은 시장 데이터 관련 타입을 정의합니다:
//! - `Candle` - 마감된 OHLCV 캔들 (불변)
//! - `CandleMetrics` - 몸통/꼬리/범위 분해 (저장하지 않고 매번 계산)
//! - `PriceWindow` - 마지막 확인 이후 관측된 고가/저가 극값

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Price, Quantity};

/// 캔들 색상(방향).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleDirection {
    /// 양봉 (종가 > 시가)
    Bullish,
    /// 음봉 (종가 < 시가)
    Bearish,
    /// 시가 = 종가
    Flat,
}

/// OHLCV 캔들.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 캔들 시작 시간
    pub open_time: DateTime<Utc>,
    /// 시가
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가
    pub close: Price,
    /// 거래량
    pub volume: Quantity,
    /// 캔들 종료 시간
    pub close_time: DateTime<Utc>,
}

/// 단일 캔들의 형태 분해.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleMetrics {
    /// 몸통 크기 (절대값)
    pub body: Decimal,
    /// 전체 범위 (고가 - 저가)
    pub range: Decimal,
    /// 윗꼬리 길이
    pub upper_wick: Decimal,
    /// 아랫꼬리 길이
    pub lower_wick: Decimal,
    /// 캔들 색상
    pub direction: CandleDirection,
}

impl Candle {
    /// 새 캔들을 생성합니다.
    pub fn new(
        open_time: DateTime<Utc>,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
        close_time: DateTime<Utc>,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            close_time,
        }
    }

    /// 몸통 크기(절대값).
    pub fn body_size(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    /// 캔들 범위(고가 - 저가).
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 윗꼬리 길이.
    pub fn upper_wick(&self) -> Decimal {
        self.high - self.open.max(self.close)
    }

    /// 아랫꼬리 길이.
    pub fn lower_wick(&self) -> Decimal {
        self.open.min(self.close) - self.low
    }

    /// 캔들 색상.
    pub fn direction(&self) -> CandleDirection {
        if self.close > self.open {
            CandleDirection::Bullish
        } else if self.close < self.open {
            CandleDirection::Bearish
        } else {
            CandleDirection::Flat
        }
    }

    /// 양봉인지 확인합니다.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 음봉인지 확인합니다.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// `now` 시점에 완전히 마감된 캔들인지 확인합니다.
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        self.close_time <= now
    }

    /// 범위 내 종가 위치 (0 = 저가, 1 = 고가). 범위가 0이면 `None`.
    pub fn close_location(&self) -> Option<Decimal> {
        let range = self.range();
        if range.is_zero() {
            return None;
        }
        Some((self.close - self.low) / range)
    }

    /// 몸통/꼬리/범위 메트릭을 계산합니다.
    pub fn metrics(&self) -> CandleMetrics {
        CandleMetrics {
            body: self.body_size(),
            range: self.range(),
            upper_wick: self.upper_wick(),
            lower_wick: self.lower_wick(),
            direction: self.direction(),
        }
    }
}

/// 마감되지 않은 후행 캔들을 제외한 슬라이스를 반환합니다.
///
/// 진행 중인 캔들은 절대 마감 데이터로 취급하지 않습니다.
pub fn closed_prefix(candles: &[Candle], now: DateTime<Utc>) -> &[Candle] {
    let end = candles
        .iter()
        .rposition(|c| c.is_closed_at(now))
        .map(|i| i + 1)
        .unwrap_or(0);
    &candles[..end]
}

/// 마지막 확인 이후 관측된 가격 극값.
///
/// 1분봉 여러 개를 하나로 접어 확인 주기 사이의 급변동을 놓치지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceWindow {
    /// 관측 최고가
    pub high: Price,
    /// 관측 최저가
    pub low: Price,
    /// 마지막 관측 가격
    pub last: Price,
}

impl PriceWindow {
    /// 새 가격 윈도우를 생성합니다. `high < low`이면 두 값을 교환합니다.
    pub fn new(high: Price, low: Price, last: Price) -> Self {
        Self {
            high: high.max(low),
            low: high.min(low),
            last,
        }
    }

    /// 단일 체결가로 윈도우를 생성합니다.
    pub fn from_price(price: Price) -> Self {
        Self::new(price, price, price)
    }

    /// 캔들들의 고가/저가 극값으로 윈도우를 생성합니다. 비어 있으면 `None`.
    pub fn from_candles(candles: &[Candle]) -> Option<Self> {
        let first = candles.first()?;
        let last = candles.last()?;
        let (high, low) = candles.iter().fold((first.high, first.low), |(h, l), c| {
            (h.max(c.high), l.min(c.low))
        });
        Some(Self::new(high, low, last.close))
    }
}
