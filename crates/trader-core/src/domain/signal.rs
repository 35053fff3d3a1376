//! 추적 중인 가상 포지션(시그널).
//!
//! 시그널은 유효한 리스크 프로파일에서 생성되며 라이프사이클 엔진만이 상태를
//! 변경합니다. 종료 상태는 확정된 사실이므로 삭제하거나 다시 전이하지 않습니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Direction, PatternCandidate, PatternKind, RiskProfile};
use crate::error::{TraderError, TraderResult};
use crate::types::{DecimalExt, Percentage, Price, Timeframe};

/// 가격 동일성 판정 허용 오차 (0.01%).
pub const PRICE_TOLERANCE: Decimal = dec!(0.0001);

/// 현재 손절가가 진입가와 같은지(본전 손절) 확인합니다.
pub fn is_breakeven_sl(current_sl: Price, entry: Price) -> bool {
    current_sl.approx_eq_rel(entry, PRICE_TOLERANCE)
}

/// 판정에 사용할 TP3. TP2와 0.01% 이내로 같으면 없는 것으로 취급합니다.
pub fn effective_tp3(tp2: Option<Price>, tp3: Option<Price>) -> Option<Price> {
    match (tp2, tp3) {
        (Some(tp2), Some(tp3)) if tp3.approx_eq_rel(tp2, PRICE_TOLERANCE) => None,
        (_, tp3) => tp3,
    }
}

/// 시그널 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    /// 진입 후 아무 목표도 도달하지 않음
    Open,
    /// TP1 도달, 손절 본전 이동
    Tp1Hit,
    /// TP2 도달
    Tp2Hit,
    /// TP3 도달 (종료)
    Tp3Hit,
    /// 손절 (종료, 본전 여부는 손절가 비교로 구분)
    SlHit,
}

impl SignalStatus {
    /// 저장용 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStatus::Open => "OPEN",
            SignalStatus::Tp1Hit => "TP1_HIT",
            SignalStatus::Tp2Hit => "TP2_HIT",
            SignalStatus::Tp3Hit => "TP3_HIT",
            SignalStatus::SlHit => "SL_HIT",
        }
    }

    /// 남은 목표가 `has_tp3`일 때 종료 상태인지.
    ///
    /// TP2_HIT는 유효한 TP3가 없을 때만 종료입니다.
    pub fn is_terminal(&self, has_tp3: bool) -> bool {
        match self {
            SignalStatus::Open | SignalStatus::Tp1Hit => false,
            SignalStatus::Tp2Hit => !has_tp3,
            SignalStatus::Tp3Hit | SignalStatus::SlHit => true,
        }
    }
}

impl std::fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SignalStatus {
    type Err = TraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(SignalStatus::Open),
            "TP1_HIT" => Ok(SignalStatus::Tp1Hit),
            "TP2_HIT" => Ok(SignalStatus::Tp2Hit),
            "TP3_HIT" => Ok(SignalStatus::Tp3Hit),
            "SL_HIT" => Ok(SignalStatus::SlHit),
            other => Err(TraderError::InvalidInput(format!(
                "unknown signal status: {}",
                other
            ))),
        }
    }
}

/// TP별 부분 청산 비율 (%). 합계는 100이어야 합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialCloseSplit {
    /// TP1 청산 비율
    pub tp1: Percentage,
    /// TP2 청산 비율
    pub tp2: Percentage,
    /// TP3 청산 비율
    pub tp3: Percentage,
}

impl Default for PartialCloseSplit {
    fn default() -> Self {
        Self {
            tp1: dec!(50),
            tp2: dec!(30),
            tp3: dec!(20),
        }
    }
}

impl PartialCloseSplit {
    /// 검증된 분할 비율을 생성합니다.
    pub fn new(tp1: Percentage, tp2: Percentage, tp3: Percentage) -> TraderResult<Self> {
        let split = Self { tp1, tp2, tp3 };
        split.validate()?;
        Ok(split)
    }

    /// 각 비율이 0 이상이고 합계가 100인지 검증합니다.
    pub fn validate(&self) -> TraderResult<()> {
        if self.tp1 < Decimal::ZERO || self.tp2 < Decimal::ZERO || self.tp3 < Decimal::ZERO {
            return Err(TraderError::Config(format!(
                "partial close percentages must be non-negative: {}/{}/{}",
                self.tp1, self.tp2, self.tp3
            )));
        }
        let sum = self.tp1 + self.tp2 + self.tp3;
        if sum != Decimal::ONE_HUNDRED {
            return Err(TraderError::Config(format!(
                "partial close percentages must sum to 100, got {}",
                sum
            )));
        }
        Ok(())
    }

    /// 분할 비율이 유효한지.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// 비율을 0~1 가중치로 변환합니다.
    pub fn weights(&self) -> (Decimal, Decimal, Decimal) {
        (
            self.tp1 / Decimal::ONE_HUNDRED,
            self.tp2 / Decimal::ONE_HUNDRED,
            self.tp3 / Decimal::ONE_HUNDRED,
        )
    }
}

/// 추적 중인 시그널.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// 시그널 ID
    pub id: Uuid,
    /// 종목
    pub symbol: String,
    /// 패턴 타임프레임
    pub timeframe: Timeframe,
    /// 방향
    pub direction: Direction,
    /// 패턴 종류
    pub pattern: PatternKind,
    /// 0~10 입장 점수
    pub score: u8,
    /// 진입가
    pub entry_price: Price,
    /// 최초 손절가 (불변)
    pub stop_original: Price,
    /// 현재 손절가 (본전 이동 가능)
    pub stop_current: Price,
    /// 1차 익절가
    pub tp1: Price,
    /// 2차 익절가
    pub tp2: Option<Price>,
    /// 3차 익절가
    pub tp3: Option<Price>,
    /// 상태
    pub status: SignalStatus,
    /// 누적 부분 청산 비율 (0~100)
    pub partial_closed: Percentage,
    /// 마지막으로 저장된 손익 (%)
    pub pnl_percent: Percentage,
    /// 사용자 지정 부분 청산 비율
    pub split: Option<PartialCloseSplit>,
    /// 생성 시간
    pub created_at: DateTime<Utc>,
    /// 수정 시간
    pub updated_at: DateTime<Utc>,
    /// 마지막 가격 확인 시간
    pub last_checked_at: DateTime<Utc>,
    /// TP1 도달 시간
    pub tp1_hit_at: Option<DateTime<Utc>>,
    /// TP2 도달 시간
    pub tp2_hit_at: Option<DateTime<Utc>>,
    /// 종료 시간
    pub closed_at: Option<DateTime<Utc>>,
}

impl Signal {
    /// 승인된 후보와 유효한 프로파일에서 시그널을 생성합니다.
    ///
    /// 프로파일에 TP1이 없으면 `None`을 반환합니다.
    pub fn from_profile(
        candidate: &PatternCandidate,
        profile: &RiskProfile,
        split: Option<PartialCloseSplit>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let tp1 = profile.tp1?;
        Some(Self {
            id: Uuid::new_v4(),
            symbol: candidate.symbol.clone(),
            timeframe: candidate.timeframe,
            direction: profile.direction,
            pattern: candidate.kind,
            score: candidate.score,
            entry_price: profile.entry,
            stop_original: profile.stop_loss,
            stop_current: profile.stop_loss,
            tp1,
            tp2: profile.tp2,
            tp3: profile.tp3,
            status: SignalStatus::Open,
            partial_closed: Decimal::ZERO,
            pnl_percent: Decimal::ZERO,
            split,
            created_at: now,
            updated_at: now,
            last_checked_at: now,
            tp1_hit_at: None,
            tp2_hit_at: None,
            closed_at: None,
        })
    }

    /// 적용할 부분 청산 비율.
    pub fn split_or(&self, default: &PartialCloseSplit) -> PartialCloseSplit {
        self.split.unwrap_or(*default)
    }

    /// 판정에 사용할 TP3.
    pub fn effective_tp3(&self) -> Option<Price> {
        effective_tp3(self.tp2, self.tp3)
    }

    /// 종료 상태인지.
    pub fn is_terminal(&self) -> bool {
        self.status
            .is_terminal(self.tp2.is_some() && self.effective_tp3().is_some())
    }

    /// 현재 손절가가 본전인지.
    pub fn is_breakeven(&self) -> bool {
        is_breakeven_sl(self.stop_current, self.entry_price)
    }

    /// 진입가 대비 최초 리스크 (%).
    pub fn risk_percent(&self) -> Option<Percentage> {
        if self.entry_price.is_zero() {
            return None;
        }
        Some((self.entry_price - self.stop_original).abs() / self.entry_price * Decimal::ONE_HUNDRED)
    }

    /// 변경 사항을 적용합니다.
    pub fn apply(&mut self, update: &SignalUpdate) {
        self.status = update.status;
        self.stop_current = update.stop_current;
        self.partial_closed = update.partial_closed;
        self.pnl_percent = update.pnl_percent;
        self.last_checked_at = update.checked_at;
        self.updated_at = update.checked_at;
        if update.tp1_hit_at.is_some() {
            self.tp1_hit_at = update.tp1_hit_at;
        }
        if update.tp2_hit_at.is_some() {
            self.tp2_hit_at = update.tp2_hit_at;
        }
        if update.closed_at.is_some() {
            self.closed_at = update.closed_at;
        }
    }
}

/// 저장소에 기록할 시그널 변경 필드.
///
/// 시간 필드는 새로 설정될 때만 `Some`입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalUpdate {
    /// 새 상태
    pub status: SignalStatus,
    /// 현재 손절가
    pub stop_current: Price,
    /// 누적 부분 청산 비율
    pub partial_closed: Percentage,
    /// 재계산된 손익 (%)
    pub pnl_percent: Percentage,
    /// 확인 시간
    pub checked_at: DateTime<Utc>,
    /// TP1 도달 시간
    pub tp1_hit_at: Option<DateTime<Utc>>,
    /// TP2 도달 시간
    pub tp2_hit_at: Option<DateTime<Utc>>,
    /// 종료 시간
    pub closed_at: Option<DateTime<Utc>>,
}

impl SignalUpdate {
    /// 상태 변경 없이 확인 시간만 갱신하는 변경.
    pub fn touch(signal: &Signal, checked_at: DateTime<Utc>) -> Self {
        Self {
            status: signal.status,
            stop_current: signal.stop_current,
            partial_closed: signal.partial_closed,
            pnl_percent: signal.pnl_percent,
            checked_at,
            tp1_hit_at: None,
            tp2_hit_at: None,
            closed_at: None,
        }
    }
}
