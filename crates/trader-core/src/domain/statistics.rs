//! 시그널 성과 통계.
//!
//! 저장된 `pnl_percent`는 사용하지 않습니다. 모든 시그널의 손익을 저장된
//! 가격과 상태로부터 다시 계산한 뒤 집계합니다.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{compute_pnl, PartialCloseSplit, PnlInputs, Signal, SignalStatus};
use crate::types::Percentage;

/// 시그널 통계 집계.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalStatistics {
    /// 전체 시그널 수
    pub total_signals: usize,
    /// 종료된 시그널 수
    pub closed_signals: usize,
    /// 상태별 시그널 수
    pub by_status: HashMap<SignalStatus, usize>,
    /// 수익 종료 수 (본전 손절 포함, 손익 > 0)
    pub winning: usize,
    /// 손실 종료 수
    pub losing: usize,
    /// 본전 손절 수
    pub breakeven: usize,
    /// 승률 (%, 종료 시그널 기준)
    pub win_rate_pct: Percentage,
    /// 종료 시그널 손익 합계 (%)
    pub total_pnl_pct: Percentage,
    /// 종료 시그널 평균 손익 (%)
    pub avg_pnl_pct: Percentage,
    /// 평균 수익 (%)
    pub avg_win_pct: Percentage,
    /// 평균 손실 (%, 양수)
    pub avg_loss_pct: Percentage,
    /// Profit Factor (총수익 / 총손실)
    pub profit_factor: Decimal,
    /// 평균 실현 R 배수 (손익 % / 최초 리스크 %)
    pub avg_realized_r: Decimal,
    /// 진행 중 시그널의 미확정 손익 합계 (%)
    pub open_pnl_pct: Percentage,
}

impl Default for SignalStatistics {
    fn default() -> Self {
        Self {
            total_signals: 0,
            closed_signals: 0,
            by_status: HashMap::new(),
            winning: 0,
            losing: 0,
            breakeven: 0,
            win_rate_pct: Decimal::ZERO,
            total_pnl_pct: Decimal::ZERO,
            avg_pnl_pct: Decimal::ZERO,
            avg_win_pct: Decimal::ZERO,
            avg_loss_pct: Decimal::ZERO,
            profit_factor: Decimal::ZERO,
            avg_realized_r: Decimal::ZERO,
            open_pnl_pct: Decimal::ZERO,
        }
    }
}

impl SignalStatistics {
    /// 시그널 목록으로부터 통계를 계산합니다.
    pub fn from_signals(signals: &[Signal], default_split: &PartialCloseSplit) -> Self {
        let mut stats = Self {
            total_signals: signals.len(),
            ..Self::default()
        };

        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;
        let mut realized_r_sum = Decimal::ZERO;
        let mut realized_r_count = 0usize;

        for signal in signals {
            *stats.by_status.entry(signal.status).or_insert(0) += 1;

            let outcome = compute_pnl(&PnlInputs::from_signal(signal, default_split));

            if !signal.is_terminal() {
                stats.open_pnl_pct += outcome.pnl_percent;
                continue;
            }

            stats.closed_signals += 1;
            stats.total_pnl_pct += outcome.pnl_percent;
            if outcome.is_breakeven {
                stats.breakeven += 1;
            }

            if outcome.pnl_percent > Decimal::ZERO {
                stats.winning += 1;
                gross_profit += outcome.pnl_percent;
            } else if outcome.pnl_percent < Decimal::ZERO {
                stats.losing += 1;
                gross_loss += outcome.pnl_percent.abs();
            }

            if let Some(risk) = signal.risk_percent().filter(|r| !r.is_zero()) {
                realized_r_sum += outcome.pnl_percent / risk;
                realized_r_count += 1;
            }
        }

        if stats.closed_signals > 0 {
            let closed = Decimal::from(stats.closed_signals);
            stats.win_rate_pct = Decimal::from(stats.winning) / closed * dec!(100);
            stats.avg_pnl_pct = stats.total_pnl_pct / closed;
        }

        if stats.winning > 0 {
            stats.avg_win_pct = gross_profit / Decimal::from(stats.winning);
        }
        if stats.losing > 0 {
            stats.avg_loss_pct = gross_loss / Decimal::from(stats.losing);
        }

        if gross_loss > Decimal::ZERO {
            stats.profit_factor = gross_profit / gross_loss;
        } else if gross_profit > Decimal::ZERO {
            // 손실 없이 수익만 있으면 큰 값으로 표현
            stats.profit_factor = dec!(999999);
        }

        if realized_r_count > 0 {
            stats.avg_realized_r = realized_r_sum / Decimal::from(realized_r_count);
        }

        stats
    }

    /// 상태별 개수.
    pub fn count(&self, status: SignalStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    /// 진행 중 시그널 수.
    pub fn active_signals(&self) -> usize {
        self.total_signals - self.closed_signals
    }
}
