//! 포지션 방향.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 시그널/포지션 방향 (롱 또는 숏).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// 매수 (가격 상승에 베팅)
    Long,
    /// 매도 (가격 하락에 베팅)
    Short,
}

impl Direction {
    /// 반대 방향을 반환합니다.
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// 부호 (+1 롱, -1 숏).
    pub fn sign(&self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => Decimal::NEGATIVE_ONE,
        }
    }

    /// `from`에서 `to`로의 유리한 방향 이동 거리 (불리하면 음수).
    pub fn favorable_move(&self, from: Decimal, to: Decimal) -> Decimal {
        (to - from) * self.sign()
    }

    /// `a`가 `b`보다 진입가에서 더 멀리(유리한 방향으로) 있는지.
    pub fn is_beyond(&self, a: Decimal, b: Decimal) -> bool {
        match self {
            Direction::Long => a > b,
            Direction::Short => a < b,
        }
    }

    /// 두 가격 중 진입 방향으로 덜 나아간 값 (롱은 min, 숏은 max).
    pub fn nearer(&self, a: Decimal, b: Decimal) -> Decimal {
        match self {
            Direction::Long => a.min(b),
            Direction::Short => a.max(b),
        }
    }

    /// 가격에서 진입 방향으로 `distance`만큼 이동한 값.
    pub fn offset(&self, price: Decimal, distance: Decimal) -> Decimal {
        price + distance * self.sign()
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}
