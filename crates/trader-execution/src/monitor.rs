//! 진행 중 시그널 모니터.
//!
//! 주기마다 진행 중인 시그널을 모두 불러와 마지막 확인 이후의 가격 극값으로
//! 라이프사이클을 진행하고, 변경된 필드를 저장소에 기록합니다.
//! 시그널 하나의 실패는 다른 시그널 확인을 막지 않습니다.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};
use trader_core::{
    CandleSource, DecimalExt, LifecycleConfig, PriceWindow, ProviderError, Signal, SignalRepository, SignalStatus,
};
use uuid::Uuid;

use crate::lifecycle::advance_signal;

/// 모니터 에러.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Failed to list active signals: {0}")]
    ListFailed(#[source] ProviderError),

    #[error("Price lookup failed for {symbol}: {source}")]
    PriceUnavailable {
        symbol: String,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to persist signal {id}: {source}")]
    PersistFailed {
        id: Uuid,
        #[source]
        source: ProviderError,
    },
}

/// 상태 전이 기록.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// 시그널 ID
    pub signal_id: Uuid,
    /// 종목
    pub symbol: String,
    /// 이전 상태
    pub from: SignalStatus,
    /// 새 상태
    pub to: SignalStatus,
    /// 재계산된 손익 (%)
    pub pnl_percent: Decimal,
    /// 본전 손절 여부
    pub is_breakeven: bool,
    /// 이번 전이로 종료되었는지
    pub closed: bool,
}

/// 한 시그널의 확인 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// 상태 전이
    Transitioned(Transition),
    /// 변화 없음 (확인 시간만 갱신)
    Unchanged,
    /// 관측 가격 없음
    NoData,
}

/// 한 번의 모니터링 결과.
#[derive(Debug, Default)]
pub struct MonitorReport {
    /// 확인한 시그널 수
    pub checked: usize,
    /// 상태 전이 목록
    pub transitions: Vec<Transition>,
    /// 변화 없는 시그널 수
    pub unchanged: usize,
    /// 가격 데이터가 없던 시그널 수
    pub no_data: usize,
    /// 실패한 시그널
    pub failures: Vec<(Uuid, MonitorError)>,
}

impl MonitorReport {
    /// 종료된 시그널 수.
    pub fn closed(&self) -> usize {
        self.transitions.iter().filter(|t| t.closed).count()
    }
}

/// 시그널 라이프사이클 모니터.
pub struct LifecycleMonitor {
    source: Arc<dyn CandleSource>,
    repository: Arc<dyn SignalRepository>,
    config: LifecycleConfig,
}

impl LifecycleMonitor {
    /// 새 모니터를 생성합니다.
    ///
    /// 부분 청산 비율이 잘못되었으면 시작 시점에 패닉합니다.
    pub fn new(
        source: Arc<dyn CandleSource>,
        repository: Arc<dyn SignalRepository>,
        config: LifecycleConfig,
    ) -> Self {
        assert!(
            config.split.is_valid(),
            "partial close split must sum to 100: {}/{}/{}",
            config.split.tp1,
            config.split.tp2,
            config.split.tp3
        );
        Self {
            source,
            repository,
            config,
        }
    }

    /// 설정.
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// 진행 중 시그널을 한 번 확인합니다.
    ///
    /// 목록 조회 실패만 에러로 반환하고, 개별 시그널 실패는 보고서에 담습니다.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<MonitorReport, MonitorError> {
        let signals = self
            .repository
            .list_active()
            .await
            .map_err(MonitorError::ListFailed)?;

        let active: Vec<Signal> = signals.into_iter().filter(|s| !s.is_terminal()).collect();
        debug!(count = active.len(), "checking active signals");

        let checks = active.iter().map(|signal| {
            let span = trader_core::scan_span!("signal_check", signal.symbol, signal.timeframe, signal.id);
            async move { (signal.id, self.check_signal(signal, now).await) }.instrument(span)
        });
        let results = join_all(checks).await;

        let mut report = MonitorReport {
            checked: results.len(),
            ..MonitorReport::default()
        };
        for (id, result) in results {
            match result {
                Ok(CheckOutcome::Transitioned(t)) => report.transitions.push(t),
                Ok(CheckOutcome::Unchanged) => report.unchanged += 1,
                Ok(CheckOutcome::NoData) => report.no_data += 1,
                Err(e) => {
                    warn!(signal_id = %id, error = %e, "signal check failed");
                    report.failures.push((id, e));
                }
            }
        }

        info!(
            checked = report.checked,
            transitions = report.transitions.len(),
            unchanged = report.unchanged,
            no_data = report.no_data,
            failures = report.failures.len(),
            "monitor pass complete"
        );
        Ok(report)
    }

    /// 시그널 하나를 확인하고 결과를 저장합니다.
    pub async fn check_signal(&self, signal: &Signal, now: DateTime<Utc>) -> Result<CheckOutcome, MonitorError> {
        let Some(window) = self.observe(signal).await? else {
            debug!("no price data since last check");
            return Ok(CheckOutcome::NoData);
        };

        let advance = advance_signal(signal, &window, &self.config.split);
        let update = advance.to_update(signal, now);
        self.repository
            .update(signal.id, &update)
            .await
            .map_err(|source| MonitorError::PersistFailed { id: signal.id, source })?;

        if !advance.changed {
            return Ok(CheckOutcome::Unchanged);
        }

        info!(
            from = %advance.previous_status,
            to = %advance.new_status,
            high = %window.high,
            low = %window.low,
            pnl = %advance.outcome.pnl_percent.to_signed_percent_string(),
            breakeven = advance.outcome.is_breakeven,
            "signal transitioned"
        );

        Ok(CheckOutcome::Transitioned(Transition {
            signal_id: signal.id,
            symbol: signal.symbol.clone(),
            from: advance.previous_status,
            to: advance.new_status,
            pnl_percent: advance.outcome.pnl_percent,
            is_breakeven: advance.outcome.is_breakeven,
            closed: update.closed_at.is_some(),
        }))
    }

    /// 마지막 확인 이후 가격 극값. 구간 데이터가 없으면 현재가로 대신합니다.
    async fn observe(&self, signal: &Signal) -> Result<Option<PriceWindow>, MonitorError> {
        let unavailable = |source: ProviderError| MonitorError::PriceUnavailable {
            symbol: signal.symbol.clone(),
            source,
        };

        match self
            .source
            .price_window(&signal.symbol, signal.last_checked_at)
            .await
        {
            Ok(Some(window)) => Ok(Some(window)),
            Ok(None) => match self.source.current_price(&signal.symbol).await {
                Ok(price) => Ok(Some(PriceWindow::from_price(price))),
                Err(ProviderError::NotFound(_)) => Ok(None),
                Err(e) => Err(unavailable(e)),
            },
            Err(e) => Err(unavailable(e)),
        }
    }

    /// `check_interval_secs` 주기로 계속 확인합니다.
    ///
    /// 한 번의 실패는 로그만 남기고 다음 주기에 다시 시도합니다.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(StdDuration::from_secs(self.config.check_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once(Utc::now()).await {
                warn!(error = %e, "monitor pass failed");
            }
        }
    }
}
