//! 캔들 패턴 감지 엔진.
//!
//! 이 크레이트가 제공하는 기능:
//! - 핀바, 페이키, PPR, 장악형의 기하 판정
//! - 거래량 게이트와 존 위치 게이트
//! - 존/추세/거래량/급등락 부재 기반 입장 점수
//!
//! # 예제
//!
//! ```rust,ignore
//! use trader_analytics::ZoneFinder;
//! use trader_strategy::PatternDetector;
//!
//! let zones = ZoneFinder::new(config.zones.clone()).find(&candles, Timeframe::M15);
//! let detector = PatternDetector::new(config.detector.clone());
//!
//! for candidate in detector.detect_patterns("BTCUSDT", &candles, &zones) {
//!     println!("{} {} score={}", candidate.kind, candidate.direction, candidate.score);
//! }
//! ```

pub mod detector;
pub mod patterns;
pub mod scoring;

// 주요 타입 재내보내기
pub use detector::{DetectionReport, PatternDetector, RejectReason, Rejection, SkipReason};
pub use patterns::{
    detect_engulfing, detect_fakey, detect_kind, detect_pin_bar, detect_ppr, detect_shapes,
    PatternRules, ShapeMatch, ALL_PATTERNS,
};
pub use scoring::{admits, has_sharp_move, trend_alignment, zone_placement, Scorer, ZonePlacement};
