//! 패턴 스캔 파이프라인.
//!
//! 종목마다 캔들 조회 → 존 탐지 → 패턴 감지 → 리스크 프로파일 → 시그널 생성
//! 순서로 진행합니다. 진행 중 시그널이 있는 종목은 건너뛰고, 종목 하나의 실패는
//! 배치의 다른 종목에 영향을 주지 않습니다.
//!
//! 요청 한도와 존 테스트 기록은 호출자가 소유한 [`ScanState`]에 있으며,
//! 스캔 중에는 `&mut`로 빌려 쓰므로 동시에 두 배치를 돌릴 수 없습니다.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};
use trader_analytics::{AtrParams, IndicatorEngine, ZoneFinder};
use trader_core::{
    AppConfig, Candle, CandleSource, PartialCloseSplit, PatternCandidate,
    ProviderError, RequestBudget, RiskDecision, Scenario, ScannerConfig, Signal, SignalRepository,
    Timeframe, VetoReason, ZoneTestFrequency, ZoneTestTracker,
};
use trader_risk::{AtrSet, RiskProfileCalculator};
use trader_strategy::{PatternDetector, SkipReason};
use uuid::Uuid;

/// 스캔 에러.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to list active signals: {0}")]
    ActiveSignals(#[source] ProviderError),

    #[error("Candle fetch failed for {symbol} {timeframe}: {source}")]
    Candles {
        symbol: String,
        timeframe: Timeframe,
        #[source]
        source: ProviderError,
    },

    #[error("Zone test lookup failed for {symbol}: {source}")]
    ZoneTests {
        symbol: String,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to store signal for {symbol}: {source}")]
    Store {
        symbol: String,
        #[source]
        source: ProviderError,
    },
}

/// 종목 하나의 스캔 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// 진행 중 시그널이 이미 있음
    AlreadyActive,
    /// 요청 한도 소진
    BudgetExhausted,
    /// 감지 건너뜀
    Skipped {
        /// 사유
        reason: SkipReason,
    },
    /// 승인된 패턴 없음
    NoSignal,
    /// 반대편 존이 너무 가까워 비토
    Vetoed {
        /// 사유
        reason: VetoReason,
    },
    /// 리스크 검증 실패
    Rejected {
        /// 시나리오
        scenario: Scenario,
        /// TP1 실제 R:R
        rr1: Option<Decimal>,
        /// 요구 최소 R:R
        min_rr_required: Decimal,
    },
    /// 시그널 생성
    Created {
        /// 새 시그널 ID
        signal_id: Uuid,
    },
    /// 협력자 호출 실패
    Failed {
        /// 에러 메시지
        error: String,
    },
}

/// 종목별 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentScan {
    /// 종목
    pub symbol: String,
    /// 결과
    pub outcome: ScanOutcome,
}

/// 배치 스캔 결과.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// 종목별 결과 (입력 순서)
    pub results: Vec<InstrumentScan>,
}

impl ScanReport {
    /// 생성된 시그널 ID 목록.
    pub fn created(&self) -> Vec<Uuid> {
        self.results
            .iter()
            .filter_map(|r| match r.outcome {
                ScanOutcome::Created { signal_id } => Some(signal_id),
                _ => None,
            })
            .collect()
    }

    /// 조건에 맞는 결과 수.
    pub fn count(&self, predicate: impl Fn(&ScanOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| predicate(&r.outcome)).count()
    }

    /// 종목의 결과.
    pub fn outcome(&self, symbol: &str) -> Option<&ScanOutcome> {
        self.results
            .iter()
            .find(|r| r.symbol == symbol)
            .map(|r| &r.outcome)
    }
}

/// 스캔 사이에 유지되는 가변 상태.
#[derive(Debug, Clone)]
pub struct ScanState {
    /// 요청 한도
    pub budget: RequestBudget,
    /// 존 테스트 기록 (외부 빈도 서비스가 없을 때 사용)
    pub zone_tests: ZoneTestTracker,
}

impl ScanState {
    /// 스캐너 설정으로 상태를 생성합니다.
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            budget: RequestBudget::per_minute(config.request_budget_per_minute),
            zone_tests: ZoneTestTracker::new(config.zone_tracking_tolerance),
        }
    }
}

/// 종목별로 조회한 캔들.
struct InstrumentCandles {
    trading: Vec<Candle>,
    m15: Vec<Candle>,
    h1: Vec<Candle>,
    h4: Vec<Candle>,
}

/// 패턴 스캐너.
pub struct PatternScanner {
    source: Arc<dyn CandleSource>,
    repository: Arc<dyn SignalRepository>,
    zone_frequency: Option<Arc<dyn ZoneTestFrequency>>,
    finder: ZoneFinder,
    detector: PatternDetector,
    calculator: RiskProfileCalculator,
    engine: IndicatorEngine,
    config: ScannerConfig,
    split: PartialCloseSplit,
    zone_test_window: Duration,
}

impl PatternScanner {
    /// 전체 설정으로 스캐너를 생성합니다.
    pub fn new(
        config: &AppConfig,
        source: Arc<dyn CandleSource>,
        repository: Arc<dyn SignalRepository>,
    ) -> Self {
        Self {
            source,
            repository,
            zone_frequency: None,
            finder: ZoneFinder::new(config.zones.clone()),
            detector: PatternDetector::new(config.detector.clone()),
            calculator: RiskProfileCalculator::new(config.risk.clone()),
            engine: IndicatorEngine::default(),
            config: config.scanner.clone(),
            split: config.lifecycle.split,
            zone_test_window: Duration::hours(config.risk.zone_test_window_hours),
        }
    }

    /// 외부 존 테스트 빈도 서비스를 사용합니다.
    pub fn with_zone_frequency(mut self, service: Arc<dyn ZoneTestFrequency>) -> Self {
        self.zone_frequency = Some(service);
        self
    }

    /// 설정의 종목 목록을 스캔합니다.
    pub async fn scan_configured(
        &self,
        state: &mut ScanState,
        now: DateTime<Utc>,
    ) -> Result<ScanReport, ScanError> {
        let symbols = self.config.symbols.clone();
        self.scan_batch(&symbols, state, now).await
    }

    /// 종목 목록을 순서대로 스캔합니다.
    ///
    /// 진행 중 시그널 목록 조회 실패만 에러로 반환합니다.
    pub async fn scan_batch(
        &self,
        symbols: &[String],
        state: &mut ScanState,
        now: DateTime<Utc>,
    ) -> Result<ScanReport, ScanError> {
        let active: HashSet<String> = self
            .repository
            .list_active()
            .await
            .map_err(ScanError::ActiveSignals)?
            .into_iter()
            .filter(|s| !s.is_terminal())
            .map(|s| s.symbol)
            .collect();

        state.zone_tests.prune(now - self.zone_test_window);

        let mut report = ScanReport::default();
        for symbol in symbols {
            let outcome = if active.contains(symbol) {
                debug!(symbol = %symbol, "active signal exists, skipping");
                ScanOutcome::AlreadyActive
            } else if !state.budget.try_acquire(self.config.weight_per_instrument, now) {
                warn!(
                    symbol = %symbol,
                    retry_in_secs = state.budget.until_next_window(now).num_seconds(),
                    "request budget exhausted"
                );
                ScanOutcome::BudgetExhausted
            } else {
                let span = trader_core::scan_span!("scan_instrument", symbol, self.config.timeframe);
                match self.scan_instrument(symbol, state, now).instrument(span).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "instrument scan failed");
                        ScanOutcome::Failed { error: e.to_string() }
                    }
                }
            };
            report.results.push(InstrumentScan {
                symbol: symbol.clone(),
                outcome,
            });
        }

        info!(
            scanned = report.results.len(),
            created = report.created().len(),
            budget_exhausted = report.count(|o| matches!(o, ScanOutcome::BudgetExhausted)),
            failed = report.count(|o| matches!(o, ScanOutcome::Failed { .. })),
            "scan batch complete"
        );
        Ok(report)
    }

    /// 종목 하나를 스캔합니다.
    ///
    /// 후보가 여럿이면 점수가 높은 순으로 평가하고 첫 유효 프로파일로만
    /// 시그널을 만듭니다.
    pub async fn scan_instrument(
        &self,
        symbol: &str,
        state: &mut ScanState,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, ScanError> {
        let candles = self.fetch_candles(symbol).await?;
        let timeframe = self.config.timeframe;

        let trading_zones = self.finder.find(&candles.trading, timeframe);
        let report = self.detector.evaluate(symbol, &candles.trading, &trading_zones, now);
        if let Some(reason) = report.skip {
            return Ok(ScanOutcome::Skipped { reason });
        }

        let mut candidates = report.candidates;
        if candidates.is_empty() {
            return Ok(ScanOutcome::NoSignal);
        }
        candidates.sort_by_key(|c| std::cmp::Reverse(c.raw_score()));

        let zones = self.finder.find_multi(&candles.m15, &candles.h1, &candles.h4);
        let atr_params = AtrParams {
            period: self.calculator.config().atr_period,
        };
        let atrs = match AtrSet::from_candles(&self.engine, &candles.m15, &candles.h1, &candles.h4, atr_params) {
            Ok(atrs) => atrs,
            Err(e) => {
                return Ok(ScanOutcome::Skipped {
                    reason: SkipReason::IndicatorUnavailable(e.to_string()),
                })
            }
        };

        let mut first_outcome = None;
        for candidate in &candidates {
            let zone_tests = self.zone_test_count(candidate, state, now).await?;
            let decision =
                self.calculator
                    .calculate_risk_profile(candidate, &candles.trading, &zones, &atrs, zone_tests);

            let outcome = match decision {
                RiskDecision::Veto(veto) => ScanOutcome::Vetoed { reason: veto.reason },
                RiskDecision::Profile(profile) if !profile.is_valid => ScanOutcome::Rejected {
                    scenario: profile.scenario,
                    rr1: profile.rr1,
                    min_rr_required: profile.min_rr_required,
                },
                RiskDecision::Profile(profile) => {
                    match Signal::from_profile(candidate, &profile, Some(self.split), now) {
                        Some(signal) => return self.store(signal).await,
                        None => ScanOutcome::NoSignal,
                    }
                }
            };
            if first_outcome.is_none() {
                first_outcome = Some(outcome);
            }
        }

        Ok(first_outcome.unwrap_or(ScanOutcome::NoSignal))
    }

    async fn fetch_candles(&self, symbol: &str) -> Result<InstrumentCandles, ScanError> {
        let fetch = |timeframe: Timeframe, limit: usize| async move {
            self.source
                .closed_candles(symbol, timeframe, limit)
                .await
                .map_err(|source| ScanError::Candles {
                    symbol: symbol.to_string(),
                    timeframe,
                    source,
                })
        };

        let timeframe = self.config.timeframe;
        let zone_limit = self.config.zone_candle_limit;
        let trading = fetch(timeframe, self.config.candle_limit).await?;
        let m15 = if timeframe == Timeframe::M15 {
            trading.clone()
        } else {
            fetch(Timeframe::M15, zone_limit).await?
        };
        let h1 = fetch(Timeframe::H1, zone_limit).await?;
        let h4 = fetch(Timeframe::H4, zone_limit).await?;

        Ok(InstrumentCandles { trading, m15, h1, h4 })
    }

    /// 활성 존의 최근 테스트 횟수. 외부 서비스가 없으면 내부 기록을 씁니다.
    async fn zone_test_count(
        &self,
        candidate: &PatternCandidate,
        state: &mut ScanState,
        now: DateTime<Utc>,
    ) -> Result<u32, ScanError> {
        let Some(zone) = candidate.active_zone.as_ref() else {
            return Ok(0);
        };

        if let Some(service) = &self.zone_frequency {
            return service
                .zone_test_count(&candidate.symbol, zone, self.zone_test_window)
                .await
                .map_err(|source| ScanError::ZoneTests {
                    symbol: candidate.symbol.clone(),
                    source,
                });
        }

        let count = state
            .zone_tests
            .tests_within(&candidate.symbol, zone, self.zone_test_window, now);
        state.zone_tests.record_test(&candidate.symbol, zone, now);
        Ok(count)
    }

    async fn store(&self, signal: Signal) -> Result<ScanOutcome, ScanError> {
        self.repository
            .create(&signal)
            .await
            .map_err(|source| ScanError::Store {
                symbol: signal.symbol.clone(),
                source,
            })?;

        info!(
            signal_id = %signal.id,
            direction = %signal.direction,
            pattern = %signal.pattern,
            score = signal.score,
            entry = %signal.entry_price,
            stop = %signal.stop_original,
            tp1 = %signal.tp1,
            "signal created"
        );
        Ok(ScanOutcome::Created { signal_id: signal.id })
    }
}
