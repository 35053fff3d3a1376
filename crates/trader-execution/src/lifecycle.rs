//! 시그널 라이프사이클 엔진.
//!
//! 마지막 확인 이후 관측된 고가/저가 극값으로 시그널 상태를 전이합니다.
//! 한 관측 구간에서 여러 레벨이 닿았으면 TP3 > TP2 > TP1 > 손절 순으로
//! 하나만 적용합니다. 같은 입력이면 항상 같은 결과를 돌려주는 순수 함수입니다.
//!
//! ```text
//! OPEN ──TP1──▶ TP1_HIT ──TP2──▶ TP2_HIT ──TP3──▶ TP3_HIT
//!   │              │                │
//!   └──SL──▶ SL_HIT ◀──SL(본전)─────┘
//! ```
//!
//! TP2/TP3는 이전 상태와 관계없이 도달할 수 있고, TP1은 OPEN에서만 도달합니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trader_core::{
    compute_pnl, is_breakeven_sl, Direction, PartialCloseSplit, PnlInputs, PnlOutcome, Price,
    PriceWindow, Signal, SignalStatus, SignalUpdate,
};

/// 한 번의 가격 확인 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalAdvance {
    /// 이전 상태
    pub previous_status: SignalStatus,
    /// 새 상태
    pub new_status: SignalStatus,
    /// 손절가가 바뀌었으면 새 손절가
    pub new_stop: Option<Price>,
    /// 누적 부분 청산 비율
    pub partial_closed: Decimal,
    /// 재계산된 손익
    pub outcome: PnlOutcome,
    /// 상태 전이 여부
    pub changed: bool,
}

impl SignalAdvance {
    fn unchanged(signal: &Signal) -> Self {
        Self {
            previous_status: signal.status,
            new_status: signal.status,
            new_stop: None,
            partial_closed: signal.partial_closed,
            outcome: PnlOutcome {
                pnl_percent: signal.pnl_percent,
                is_breakeven: signal.status == SignalStatus::SlHit && signal.is_breakeven(),
            },
            changed: false,
        }
    }

    /// 저장소에 기록할 변경 필드를 만듭니다.
    ///
    /// 건너뛴 단계의 도달 시간도 함께 채웁니다 (OPEN에서 바로 TP2면 TP1 시간도 설정).
    pub fn to_update(&self, signal: &Signal, checked_at: DateTime<Utc>) -> SignalUpdate {
        if !self.changed {
            return SignalUpdate::touch(signal, checked_at);
        }

        let reached = |level: SignalStatus| rank(self.new_status) >= rank(level);
        let first_time = |already: Option<DateTime<Utc>>, hit: bool| {
            if hit && already.is_none() {
                Some(checked_at)
            } else {
                None
            }
        };

        SignalUpdate {
            status: self.new_status,
            stop_current: self.new_stop.unwrap_or(signal.stop_current),
            partial_closed: self.partial_closed,
            pnl_percent: self.outcome.pnl_percent,
            checked_at,
            tp1_hit_at: first_time(signal.tp1_hit_at, reached(SignalStatus::Tp1Hit)),
            tp2_hit_at: first_time(signal.tp2_hit_at, reached(SignalStatus::Tp2Hit)),
            closed_at: first_time(signal.closed_at, self.is_terminal_for(signal)),
        }
    }

    fn is_terminal_for(&self, signal: &Signal) -> bool {
        self.new_status
            .is_terminal(signal.tp2.is_some() && signal.effective_tp3().is_some())
    }
}

fn rank(status: SignalStatus) -> u8 {
    match status {
        SignalStatus::Open | SignalStatus::SlHit => 0,
        SignalStatus::Tp1Hit => 1,
        SignalStatus::Tp2Hit => 2,
        SignalStatus::Tp3Hit => 3,
    }
}

/// 구간 안에서 목표가에 닿았는지.
fn touched_target(direction: Direction, window: &PriceWindow, level: Price) -> bool {
    match direction {
        Direction::Long => window.high >= level,
        Direction::Short => window.low <= level,
    }
}

/// 구간 안에서 손절가에 닿았는지.
fn touched_stop(direction: Direction, window: &PriceWindow, stop: Price) -> bool {
    match direction {
        Direction::Long => window.low <= stop,
        Direction::Short => window.high >= stop,
    }
}

/// 관측 구간으로 시그널을 한 단계 진행합니다.
///
/// `default_split`은 시그널에 사용자 지정 비율이 없을 때 쓰며, 합계가 100이
/// 아니면 호출자 버그이므로 패닉합니다. 종료 상태 시그널은 그대로 돌려줍니다.
pub fn advance_signal(signal: &Signal, window: &PriceWindow, default_split: &PartialCloseSplit) -> SignalAdvance {
    let split = signal.split_or(default_split);
    assert!(
        split.is_valid(),
        "partial close split must sum to 100: {}/{}/{}",
        split.tp1,
        split.tp2,
        split.tp3
    );

    if signal.is_terminal() {
        return SignalAdvance::unchanged(signal);
    }

    let direction = signal.direction;
    let tp3 = signal.tp2.and(signal.effective_tp3());
    let has_tp3 = tp3.is_some();
    let status = signal.status;

    let new_status = if tp3.is_some_and(|p| touched_target(direction, window, p)) {
        SignalStatus::Tp3Hit
    } else if matches!(status, SignalStatus::Open | SignalStatus::Tp1Hit)
        && signal.tp2.is_some_and(|p| touched_target(direction, window, p))
    {
        SignalStatus::Tp2Hit
    } else if status == SignalStatus::Open && touched_target(direction, window, signal.tp1) {
        SignalStatus::Tp1Hit
    } else if touched_stop(direction, window, signal.stop_current) {
        SignalStatus::SlHit
    } else {
        return SignalAdvance::unchanged(signal);
    };

    let new_stop = match new_status {
        SignalStatus::Tp1Hit => Some(signal.entry_price),
        SignalStatus::Tp2Hit if has_tp3 => Some(signal.entry_price),
        _ => None,
    }
    .filter(|stop| *stop != signal.stop_current);

    let partial_closed = match new_status {
        SignalStatus::Tp1Hit => split.tp1,
        SignalStatus::Tp2Hit if has_tp3 => split.tp1 + split.tp2,
        SignalStatus::Open => Decimal::ZERO,
        _ => Decimal::ONE_HUNDRED,
    };

    let inputs = PnlInputs {
        status: new_status,
        stop_current: new_stop.unwrap_or(signal.stop_current),
        tp2_banked: signal.tp2_hit_at.is_some() || status == SignalStatus::Tp2Hit,
        ..PnlInputs::from_signal(signal, default_split)
    };
    let mut outcome = compute_pnl(&inputs);
    outcome.is_breakeven =
        new_status == SignalStatus::SlHit && is_breakeven_sl(inputs.stop_current, signal.entry_price);

    SignalAdvance {
        previous_status: status,
        new_status,
        new_stop,
        partial_closed,
        outcome,
        changed: true,
    }
}
