//! 시그널 라이프사이클 추적 및 패턴 스캔 파이프라인.
//!
//! 이 crate는 다음을 제공합니다:
//! - 가격 극값으로 시그널 상태를 전이하는 라이프사이클 엔진
//! - 진행 중 시그널을 주기적으로 확인하는 모니터
//! - 존 탐지부터 시그널 생성까지 이어지는 스캐너
//!
//! # 예제
//!
//! ```rust,ignore
//! use trader_execution::{LifecycleMonitor, PatternScanner, ScanState};
//!
//! let scanner = PatternScanner::new(&config, source.clone(), repository.clone());
//! let mut state = ScanState::from_config(&config.scanner);
//! let report = scanner.scan_configured(&mut state, Utc::now()).await?;
//!
//! let monitor = LifecycleMonitor::new(source, repository, config.lifecycle.clone());
//! let checks = monitor.run_once(Utc::now()).await?;
//! ```

pub mod lifecycle;
pub mod monitor;
pub mod scanner;

// 주요 타입 재내보내기
pub use lifecycle::{advance_signal, SignalAdvance};
pub use monitor::{CheckOutcome, LifecycleMonitor, MonitorError, MonitorReport, Transition};
pub use scanner::{InstrumentScan, PatternScanner, ScanError, ScanOutcome, ScanReport, ScanState};
