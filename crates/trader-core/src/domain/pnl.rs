//! 저장된 가격으로부터의 손익 재계산.
//!
//! 손익은 누적하지 않고 매번 저장된 가격과 상태만으로 다시 계산합니다.
//! 공식이 바뀌면 과거 통계도 별도 마이그레이션 없이 함께 바로잡힙니다.
//!
//! 전체 손실은 항상 **최초** 손절가로 계산합니다. 현재(이동된) 손절가는
//! 본전 여부를 판정하는 데에만 사용합니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{effective_tp3, is_breakeven_sl, Direction, PartialCloseSplit, Signal, SignalStatus};
use crate::types::{Percentage, Price};

/// 손익 재계산 입력. 모두 저장된 필드입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnlInputs {
    /// 상태
    pub status: SignalStatus,
    /// 방향
    pub direction: Direction,
    /// 진입가
    pub entry: Price,
    /// 1차 익절가
    pub tp1: Price,
    /// 2차 익절가
    pub tp2: Option<Price>,
    /// 3차 익절가
    pub tp3: Option<Price>,
    /// 최초 손절가
    pub stop_original: Price,
    /// 현재 손절가
    pub stop_current: Price,
    /// 손절 이전에 TP2 물량이 이미 청산되었는지
    pub tp2_banked: bool,
    /// 부분 청산 비율
    pub split: PartialCloseSplit,
}

impl PnlInputs {
    /// 시그널의 저장된 필드로부터 입력을 구성합니다.
    pub fn from_signal(signal: &Signal, default_split: &PartialCloseSplit) -> Self {
        Self {
            status: signal.status,
            direction: signal.direction,
            entry: signal.entry_price,
            tp1: signal.tp1,
            tp2: signal.tp2,
            tp3: signal.tp3,
            stop_original: signal.stop_original,
            stop_current: signal.stop_current,
            tp2_banked: signal.tp2_hit_at.is_some(),
            split: signal.split_or(default_split),
        }
    }
}

/// 재계산 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnlOutcome {
    /// 진입가 대비 손익 (%), 방향 부호 적용
    pub pnl_percent: Percentage,
    /// 본전 손절 여부
    pub is_breakeven: bool,
}

/// 진입가 대비 `exit`까지의 방향 보정 수익률 (%).
fn leg_percent(direction: Direction, entry: Price, exit: Price) -> Percentage {
    if entry.is_zero() {
        return Decimal::ZERO;
    }
    direction.favorable_move(entry, exit) / entry * Decimal::ONE_HUNDRED
}

/// TP1 물량의 확정 수익.
fn tp1_tranche(inputs: &PnlInputs, w1: Decimal) -> Percentage {
    leg_percent(inputs.direction, inputs.entry, inputs.tp1) * w1
}

/// 손익 (%)을 재계산합니다.
///
/// | 상태 | 손익 |
/// |---|---|
/// | OPEN | 0 |
/// | TP1_HIT | TP1 × w1 |
/// | TP2_HIT (종료) | TP1 × w1 + TP2 × (1 - w1) |
/// | TP2_HIT (TP3 대기) | TP1 × w1 + TP2 × w2 |
/// | TP3_HIT | TP1 × w1 + TP2 × w2 + TP3 × w3 |
/// | SL_HIT (손실) | (최초 손절가 - 진입가) / 진입가 × 100 |
/// | SL_HIT (본전) | 이미 청산된 물량의 수익만 |
///
/// TP3가 남아 있는 TP2_HIT는 고정 0.5가 아니라 설정된 w2로 TP2 물량을 계산합니다.
/// 기본 분할(0.5/0.3/0.2)에서 진입 100, TP1 110, TP2 120, TP3 130이면 5 + 6 = 11입니다.
pub fn compute_pnl(inputs: &PnlInputs) -> PnlOutcome {
    let (w1, w2, w3) = inputs.split.weights();
    let direction = inputs.direction;
    let entry = inputs.entry;
    let tp2_leg = |tp2: Option<Price>| {
        tp2.map(|p| leg_percent(direction, entry, p))
            .unwrap_or(Decimal::ZERO)
    };
    let tp3_pending = inputs.tp2.is_some() && effective_tp3(inputs.tp2, inputs.tp3).is_some();

    match inputs.status {
        SignalStatus::Open => PnlOutcome {
            pnl_percent: Decimal::ZERO,
            is_breakeven: false,
        },
        SignalStatus::Tp1Hit => PnlOutcome {
            pnl_percent: tp1_tranche(inputs, w1),
            is_breakeven: false,
        },
        SignalStatus::Tp2Hit => {
            let w_tp2 = if tp3_pending { w2 } else { Decimal::ONE - w1 };
            PnlOutcome {
                pnl_percent: tp1_tranche(inputs, w1) + tp2_leg(inputs.tp2) * w_tp2,
                is_breakeven: false,
            }
        }
        SignalStatus::Tp3Hit => {
            let tp3 = inputs.tp3.map(|p| leg_percent(direction, entry, p));
            PnlOutcome {
                pnl_percent: tp1_tranche(inputs, w1)
                    + tp2_leg(inputs.tp2) * w2
                    + tp3.unwrap_or(Decimal::ZERO) * w3,
                is_breakeven: false,
            }
        }
        SignalStatus::SlHit => {
            if is_breakeven_sl(inputs.stop_current, entry) {
                let banked_tp2 = if inputs.tp2_banked {
                    tp2_leg(inputs.tp2) * w2
                } else {
                    Decimal::ZERO
                };
                PnlOutcome {
                    pnl_percent: tp1_tranche(inputs, w1) + banked_tp2,
                    is_breakeven: true,
                }
            } else {
                PnlOutcome {
                    pnl_percent: leg_percent(direction, entry, inputs.stop_original),
                    is_breakeven: false,
                }
            }
        }
    }
}

/// 손익 (%)만 반환합니다.
pub fn compute_pnl_percent(inputs: &PnlInputs) -> Percentage {
    compute_pnl(inputs).pnl_percent
}
