//! 패턴 후보.
//!
//! 스캔마다 종목별로 새로 생성되며, 점수가 입장 기준을 넘지 못하면 버려집니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Direction, Zone};
use crate::types::{Price, Timeframe};

/// 내부 점수 최대값 (존 100 + 추세 30 + 거래량 30 + 급등락 부재 20).
pub const MAX_RAW_SCORE: u32 = 180;

/// 지원하는 네 가지 캔들 형태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// 핀바: 한쪽 꼬리가 몸통과 반대 꼬리의 2배 이상
    PinBar,
    /// 페이키: 인사이드바의 거짓 돌파 후 되돌림
    Fakey,
    /// PPR: 직전 캔들의 반대 극값을 넘어 마감하는 반전
    Ppr,
    /// 장악형
    Engulfing,
}

impl PatternKind {
    /// 패턴 인식에 필요한 최소 캔들 수.
    pub fn required_candles(&self) -> usize {
        match self {
            PatternKind::PinBar => 1,
            PatternKind::Ppr | PatternKind::Engulfing => 2,
            PatternKind::Fakey => 3,
        }
    }

    /// 문자열 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::PinBar => "pin_bar",
            PatternKind::Fakey => "fakey",
            PatternKind::Ppr => "ppr",
            PatternKind::Engulfing => "engulfing",
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// EMA50/EMA200 기준 추세 정렬.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendAlignment {
    /// 추세 방향과 일치
    With,
    /// 중립 또는 약한 정렬
    Neutral,
    /// 추세 역행
    Against,
}

/// 입장 점수 구성.
///
/// 각 항목은 가중치가 적용된 점수입니다. 자유 형식 맵 대신 고정 필드를 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// 존 위치 점수 (올바른 쪽 존 100, 주변 존 없음 50)
    pub zone: u32,
    /// 추세 정렬 점수 (30 / 15 / 0)
    pub trend: u32,
    /// 거래량 비율 점수 (30 / 15 / 0)
    pub volume: u32,
    /// 직전 급등락 부재 점수 (20 / 0)
    pub no_sharp_move: u32,
}

impl ScoreBreakdown {
    /// 합계 점수.
    pub fn total(&self) -> u32 {
        self.zone + self.trend + self.volume + self.no_sharp_move
    }

    /// 0~10 정규화 점수 (반올림).
    pub fn normalized(&self) -> u8 {
        let total = self.total().min(MAX_RAW_SCORE);
        ((total * 10 + MAX_RAW_SCORE / 2) / MAX_RAW_SCORE) as u8
    }
}

/// 점수 게이트를 통과한 패턴 후보.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCandidate {
    /// 종목
    pub symbol: String,
    /// 패턴을 감지한 타임프레임
    pub timeframe: Timeframe,
    /// 방향
    pub direction: Direction,
    /// 패턴 종류
    pub kind: PatternKind,
    /// 진입가 (트리거 캔들 종가)
    pub entry_price: Price,
    /// 트리거 캔들 마감 시간
    pub signal_time: DateTime<Utc>,
    /// 점수 구성
    pub breakdown: ScoreBreakdown,
    /// 0~10 정규화 점수
    pub score: u8,
    /// 추세 정렬
    pub trend: TrendAlignment,
    /// 직전 20봉 평균 대비 거래량 비율
    pub volume_ratio: Decimal,
    /// 점수 계산에 사용한 받침 존 (근처에 없으면 `None`)
    pub active_zone: Option<Zone>,
}

impl PatternCandidate {
    /// 내부 점수 합계.
    pub fn raw_score(&self) -> u32 {
        self.breakdown.total()
    }

    /// 존 위에서 발생한 패턴인지.
    pub fn is_at_zone(&self) -> bool {
        self.active_zone.is_some()
    }
}
