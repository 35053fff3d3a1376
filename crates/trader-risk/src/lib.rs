//! 동적 리스크 프로파일.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 반대편 존 근접 비토
//! - 스윙 극값 + 적응형 버퍼 + 라운드 넘버 회피 + 존 여유 기반 손절
//! - 고정 R 배수와 존 목표를 혼합한 하이브리드 익절
//! - 패턴/존/추세/변동성에 따라 조정되는 최소 R:R과 검증
//!
//! # 예제
//!
//! ```rust,ignore
//! use trader_risk::{AtrSet, RiskProfileCalculator};
//!
//! let calculator = RiskProfileCalculator::new(config.risk.clone());
//! let atrs = AtrSet::new(atr_m15, atr_h1, atr_h4);
//!
//! match calculator.calculate_risk_profile(&candidate, &candles, &zones, &atrs, tests) {
//!     RiskDecision::Profile(p) if p.is_valid => { /* 시그널 생성 */ }
//!     RiskDecision::Profile(p) => { /* 공간 부족 */ }
//!     RiskDecision::Veto(v) => { /* v.reason.code() */ }
//! }
//! ```

pub mod calculator;
pub mod min_rr;
pub mod stop_loss;
pub mod take_profit;
pub mod veto;

// 주요 타입 재내보내기
pub use calculator::{AtrSet, RiskProfileCalculator};
pub use min_rr::{dynamic_min_rr, MinRrInputs};
pub use stop_loss::{buffer_multiplier, near_round_number, place_stop, swing_extreme, StopPlacement};
pub use take_profit::{plan_take_profits, TakeProfitPlan};
pub use veto::check_veto;
