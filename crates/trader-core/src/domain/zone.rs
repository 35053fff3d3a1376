//! 지지/저항 존.
//!
//! 존은 스캔마다 롤링 캔들 윈도우로부터 다시 계산됩니다 (스캔 간 식별자 없음).
//! 존의 유형은 조회 가격에 대해서만 의미가 있습니다. 같은 가격대가 아래 가격에는
//! 저항이고 위 가격에는 지지가 됩니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Direction;
use crate::types::{Price, Timeframe};

/// 존 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    /// 지지
    Support,
    /// 저항
    Resistance,
}

impl ZoneKind {
    /// 주어진 방향의 진입을 "받쳐주는" 존 유형 (롱 → 지지).
    pub fn backing(direction: Direction) -> Self {
        match direction {
            Direction::Long => ZoneKind::Support,
            Direction::Short => ZoneKind::Resistance,
        }
    }

    /// 주어진 방향의 진입을 "가로막는" 존 유형 (롱 → 저항).
    pub fn opposing(direction: Direction) -> Self {
        Self::backing(direction.opposite())
    }
}

/// 터치 횟수에서 파생된 존 강도.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneStrength {
    /// 1회 터치
    Weak,
    /// 2~3회 터치
    Moderate,
    /// 4회 이상 터치
    Strong,
}

impl ZoneStrength {
    /// 터치 횟수로 강도를 결정합니다.
    pub fn from_touches(touches: u32) -> Self {
        match touches {
            0 | 1 => ZoneStrength::Weak,
            2 | 3 => ZoneStrength::Moderate,
            _ => ZoneStrength::Strong,
        }
    }
}

/// 가격대 `[low, high]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// 하단
    pub low: Price,
    /// 상단
    pub high: Price,
    /// 계산 시점 기준가에 대한 유형
    pub kind: ZoneKind,
    /// 원천 타임프레임
    pub timeframe: Timeframe,
    /// 터치 횟수
    pub touches: u32,
    /// 강도
    pub strength: ZoneStrength,
}

impl Zone {
    /// 새 존을 생성합니다. `low > high`이면 교환하여 `low <= high`를 보장합니다.
    pub fn new(low: Price, high: Price, kind: ZoneKind, timeframe: Timeframe, touches: u32) -> Self {
        Self {
            low: low.min(high),
            high: low.max(high),
            kind,
            timeframe,
            touches,
            strength: ZoneStrength::from_touches(touches),
        }
    }

    /// 중심 가격.
    pub fn mid(&self) -> Price {
        (self.low + self.high) / Decimal::TWO
    }

    /// 존 폭.
    pub fn width(&self) -> Decimal {
        self.high - self.low
    }

    /// 가격이 존 내부에 있는지 확인합니다.
    pub fn contains(&self, price: Price) -> bool {
        price >= self.low && price <= self.high
    }

    /// 가격에서 존 가장자리까지의 거리. 내부면 0.
    pub fn distance_to(&self, price: Price) -> Decimal {
        if price < self.low {
            self.low - price
        } else if price > self.high {
            price - self.high
        } else {
            Decimal::ZERO
        }
    }

    /// 조회 가격에 대한 유형. 중심이 가격 이하면 지지, 위면 저항.
    pub fn kind_relative_to(&self, price: Price) -> ZoneKind {
        if self.mid() <= price {
            ZoneKind::Support
        } else {
            ZoneKind::Resistance
        }
    }

    /// 방향별 기준 가장자리. 롱이면 하단, 숏이면 상단.
    ///
    /// 롱 진입 위쪽의 저항 존에서는 진입가를 향한 면이고, 아래쪽 지지 존에서는
    /// 손절이 넘어서야 하는 면입니다.
    pub fn edge(&self, direction: Direction) -> Price {
        match direction {
            Direction::Long => self.low,
            Direction::Short => self.high,
        }
    }

    /// 다른 존과 `tolerance` 이내로 겹치거나 인접하는지 확인합니다.
    pub fn overlaps(&self, other: &Zone, tolerance: Decimal) -> bool {
        self.low - tolerance <= other.high && other.low - tolerance <= self.high
    }
}

/// 한 타임프레임의 존 스냅샷.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSet {
    /// 타임프레임
    pub timeframe: Timeframe,
    /// 존 목록 (가격 오름차순)
    pub zones: Vec<Zone>,
}

impl ZoneSet {
    /// 새 존 스냅샷을 생성합니다. 존은 하단 가격 기준으로 정렬됩니다.
    pub fn new(timeframe: Timeframe, mut zones: Vec<Zone>) -> Self {
        zones.sort_by(|a, b| a.low.cmp(&b.low));
        Self { timeframe, zones }
    }

    /// 빈 스냅샷.
    pub fn empty(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            zones: Vec::new(),
        }
    }

    /// 존 개수.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// 비어 있는지.
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// 존 반복자.
    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    /// 가격 기준으로 해당 유형인 가장 가까운 존과 거리.
    pub fn nearest(&self, kind: ZoneKind, price: Price) -> Option<(&Zone, Decimal)> {
        self.zones
            .iter()
            .filter(|z| z.kind_relative_to(price) == kind)
            .map(|z| (z, z.distance_to(price)))
            .min_by(|a, b| a.1.cmp(&b.1))
    }

    /// 진입을 받쳐주는 가장 가까운 존 (롱이면 지지).
    pub fn backing(&self, direction: Direction, price: Price) -> Option<(&Zone, Decimal)> {
        self.nearest(ZoneKind::backing(direction), price)
    }

    /// 진입 방향을 가로막는 존들 (가까운 순).
    ///
    /// 가격 기준 유형이 반대편(롱이면 저항)인 존입니다. 가격을 품은 존도
    /// 중심이 진입 방향 앞쪽에 있으면 포함되며 거리는 0입니다.
    pub fn opposing(&self, direction: Direction, price: Price) -> Vec<&Zone> {
        let kind = ZoneKind::opposing(direction);
        let mut zones: Vec<&Zone> = self
            .zones
            .iter()
            .filter(|z| z.kind_relative_to(price) == kind)
            .collect();
        zones.sort_by(|a, b| a.distance_to(price).cmp(&b.distance_to(price)));
        zones
    }

    /// 가장 가까운 반대편 존과 거리.
    pub fn nearest_opposing(&self, direction: Direction, price: Price) -> Option<(&Zone, Decimal)> {
        self.opposing(direction, price)
            .into_iter()
            .next()
            .map(|z| (z, z.distance_to(price)))
    }
}

/// 세 타임프레임(15분/1시간/4시간)의 존 스냅샷.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiTimeframeZones {
    /// 15분봉 존
    pub m15: ZoneSet,
    /// 1시간봉 존
    pub h1: ZoneSet,
    /// 4시간봉 존
    pub h4: ZoneSet,
}

impl MultiTimeframeZones {
    /// 새 다중 타임프레임 존을 생성합니다.
    pub fn new(m15: ZoneSet, h1: ZoneSet, h4: ZoneSet) -> Self {
        Self { m15, h1, h4 }
    }

    /// 모든 타임프레임이 비어 있는 스냅샷.
    pub fn empty() -> Self {
        Self::new(
            ZoneSet::empty(Timeframe::M15),
            ZoneSet::empty(Timeframe::H1),
            ZoneSet::empty(Timeframe::H4),
        )
    }

    /// 타임프레임별 존 스냅샷. 존 타임프레임이 아니면 `None`.
    pub fn get(&self, timeframe: Timeframe) -> Option<&ZoneSet> {
        match timeframe {
            Timeframe::M15 => Some(&self.m15),
            Timeframe::H1 => Some(&self.h1),
            Timeframe::H4 => Some(&self.h4),
            _ => None,
        }
    }

    /// 짧은 타임프레임부터 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &ZoneSet> {
        [&self.m15, &self.h1, &self.h4].into_iter()
    }

    /// 모든 타임프레임의 반대편 존을 거리순으로 합칩니다.
    ///
    /// 거리가 같으면 짧은 타임프레임이 먼저 옵니다.
    pub fn all_opposing(&self, direction: Direction, price: Price) -> Vec<&Zone> {
        let mut zones: Vec<&Zone> = self
            .iter()
            .flat_map(|set| set.opposing(direction, price))
            .collect();
        zones.sort_by(|a, b| {
            a.distance_to(price)
                .cmp(&b.distance_to(price))
                .then(a.timeframe.cmp(&b.timeframe))
        });
        zones
    }
}
