//! PatternScanner 통합 테스트
//!
//! 가짜 캔들 피드와 메모리 저장소로 종목별 스캔 결과(생성, 중복, 한도, 실패,
//! 건너뛰기)를 검증합니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use trader_core::{
    AppConfig, Candle, CandleSource, Direction, PatternKind, Price, PriceWindow, ProviderError,
    RequestBudget, Signal, SignalRepository, SignalStatus, SignalUpdate, Timeframe, ZoneTestTracker,
};
use trader_execution::{PatternScanner, ScanOutcome, ScanState};
use trader_strategy::SkipReason;
use uuid::Uuid;

// ============================================================================
// 테스트 헬퍼 함수
// ============================================================================

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn later() -> DateTime<Utc> {
    start_time() + Duration::days(30)
}

fn push(series: &mut Vec<Candle>, open: Decimal, high: Decimal, low: Decimal, close: Decimal, volume: Decimal) {
    let open_time = start_time() + Duration::minutes(15 * series.len() as i64);
    series.push(Candle::new(
        open_time,
        open,
        high,
        low,
        close,
        volume,
        open_time + Duration::minutes(15),
    ));
}

/// 97부터 캔들마다 0.01씩 오르는 추세 (거래량 100)
fn uptrend(count: usize) -> Vec<Candle> {
    let mut series = Vec::with_capacity(count + 1);
    for i in 0..count {
        let open = dec!(97) + dec!(0.01) * Decimal::from(i);
        let close = open + dec!(0.01);
        push(&mut series, open, close + dec!(0.05), open - dec!(0.05), close, dec!(100));
    }
    series
}

/// 상승 추세 끝에 거래량 2배 롱 핀바
fn uptrend_with_pin_bar() -> Vec<Candle> {
    let mut series = uptrend(300);
    push(&mut series, dec!(100.00), dec!(100.05), dec!(99.60), dec!(100.04), dec!(200));
    series
}

#[derive(Default)]
struct FakeFeed {
    candles: HashMap<String, Vec<Candle>>,
    requests: Mutex<usize>,
}

impl FakeFeed {
    fn with(symbol: &str, candles: Vec<Candle>) -> Self {
        let mut feed = Self::default();
        feed.candles.insert(symbol.to_string(), candles);
        feed
    }
}

#[async_trait]
impl CandleSource for FakeFeed {
    async fn closed_candles(&self, symbol: &str, _: Timeframe, _: usize) -> Result<Vec<Candle>, ProviderError> {
        *self.requests.lock().unwrap() += 1;
        self.candles
            .get(symbol)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))
    }

    async fn current_price(&self, symbol: &str) -> Result<Price, ProviderError> {
        Err(ProviderError::NotFound(symbol.to_string()))
    }

    async fn price_window(&self, _: &str, _: DateTime<Utc>) -> Result<Option<PriceWindow>, ProviderError> {
        Ok(None)
    }
}

#[derive(Default)]
struct MemoryRepository {
    signals: Mutex<Vec<Signal>>,
}

impl MemoryRepository {
    fn all(&self) -> Vec<Signal> {
        self.signals.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignalRepository for MemoryRepository {
    async fn create(&self, signal: &Signal) -> Result<(), ProviderError> {
        self.signals.lock().unwrap().push(signal.clone());
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<Signal>, ProviderError> {
        Ok(self.all().into_iter().filter(|s| !s.is_terminal()).collect())
    }

    async fn update(&self, _: Uuid, _: &SignalUpdate) -> Result<(), ProviderError> {
        Ok(())
    }
}

fn scanner(feed: Arc<FakeFeed>, repo: Arc<MemoryRepository>) -> PatternScanner {
    PatternScanner::new(&AppConfig::default(), feed, repo)
}

fn fresh_state() -> ScanState {
    ScanState::from_config(&AppConfig::default().scanner)
}

fn symbols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// 시그널 생성 테스트
// ============================================================================

#[tokio::test]
async fn test_pin_bar_creates_signal_once() {
    let feed = Arc::new(FakeFeed::with("BTCUSDT", uptrend_with_pin_bar()));
    let repo = Arc::new(MemoryRepository::default());
    let scanner = scanner(feed, repo.clone());
    let mut state = fresh_state();

    let report = scanner
        .scan_batch(&symbols(&["BTCUSDT"]), &mut state, later())
        .await
        .unwrap();

    let created = report.created();
    assert_eq!(created.len(), 1);
    let stored = repo.all();
    assert_eq!(stored.len(), 1);

    let signal = &stored[0];
    assert_eq!(signal.id, created[0]);
    assert_eq!(signal.symbol, "BTCUSDT");
    assert_eq!(signal.direction, Direction::Long);
    assert_eq!(signal.pattern, PatternKind::PinBar);
    assert_eq!(signal.status, SignalStatus::Open);
    assert_eq!(signal.entry_price, dec!(100.04));
    assert!(signal.stop_original < dec!(99.60));
    assert!(signal.tp1 > signal.entry_price);
    assert_eq!(signal.stop_current, signal.stop_original);

    // 진행 중 시그널이 있는 종목은 다시 만들지 않음
    let again = scanner
        .scan_batch(&symbols(&["BTCUSDT"]), &mut state, later())
        .await
        .unwrap();
    assert_eq!(again.outcome("BTCUSDT"), Some(&ScanOutcome::AlreadyActive));
    assert_eq!(repo.all().len(), 1);
}

#[tokio::test]
async fn test_quiet_trend_has_no_signal() {
    let feed = Arc::new(FakeFeed::with("ETHUSDT", uptrend(301)));
    let repo = Arc::new(MemoryRepository::default());

    let report = scanner(feed, repo.clone())
        .scan_batch(&symbols(&["ETHUSDT"]), &mut fresh_state(), later())
        .await
        .unwrap();

    assert_eq!(report.outcome("ETHUSDT"), Some(&ScanOutcome::NoSignal));
    assert!(repo.all().is_empty());
}

// ============================================================================
// 건너뛰기 / 실패 격리 테스트
// ============================================================================

#[tokio::test]
async fn test_short_history_is_skipped() {
    let feed = Arc::new(FakeFeed::with("NEWUSDT", uptrend(120)));
    let repo = Arc::new(MemoryRepository::default());

    let report = scanner(feed, repo)
        .scan_batch(&symbols(&["NEWUSDT"]), &mut fresh_state(), later())
        .await
        .unwrap();

    assert_eq!(
        report.outcome("NEWUSDT"),
        Some(&ScanOutcome::Skipped {
            reason: SkipReason::InsufficientHistory {
                required: 300,
                provided: 120,
            }
        })
    );
}

#[tokio::test]
async fn test_fetch_failure_isolated_to_symbol() {
    let feed = Arc::new(FakeFeed::with("BTCUSDT", uptrend_with_pin_bar()));
    let repo = Arc::new(MemoryRepository::default());

    let report = scanner(feed, repo)
        .scan_batch(&symbols(&["MISSING", "BTCUSDT"]), &mut fresh_state(), later())
        .await
        .unwrap();

    assert!(matches!(report.outcome("MISSING"), Some(ScanOutcome::Failed { .. })));
    assert!(matches!(report.outcome("BTCUSDT"), Some(ScanOutcome::Created { .. })));
}

#[tokio::test]
async fn test_budget_exhaustion_stops_fetching() {
    let feed = Arc::new(FakeFeed::with("ETHUSDT", uptrend(301)));
    let repo = Arc::new(MemoryRepository::default());
    let mut state = ScanState {
        budget: RequestBudget::per_minute(4),
        zone_tests: ZoneTestTracker::new(dec!(0.002)),
    };

    let report = scanner(feed.clone(), repo)
        .scan_batch(&symbols(&["ETHUSDT", "ETHUSDT"]), &mut state, later())
        .await
        .unwrap();

    assert_eq!(report.results[0].outcome, ScanOutcome::NoSignal);
    assert_eq!(report.results[1].outcome, ScanOutcome::BudgetExhausted);
    // 두 번째 종목은 캔들을 요청하지 않음 (M15 캔들은 감지용과 공유)
    assert_eq!(*feed.requests.lock().unwrap(), 3);
}
