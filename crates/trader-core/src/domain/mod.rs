//! 패턴 시그널 엔진의 도메인 모델.

mod candle;
mod direction;
mod pattern;
mod pnl;
mod provider;
mod risk_profile;
mod scan_state;
mod signal;
mod statistics;
mod zone;

pub use candle::*;
pub use direction::*;
pub use pattern::*;
pub use pnl::*;
pub use provider::*;
pub use risk_profile::*;
pub use scan_state::*;
pub use signal::*;
pub use statistics::*;
pub use zone::*;
