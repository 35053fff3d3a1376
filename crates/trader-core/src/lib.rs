//! # Trader Core
//!
//! 패턴 시그널 엔진의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 캔들 및 캔들 메트릭
//! - 지지/저항 존
//! - 패턴 후보와 리스크 프로파일
//! - 시그널 상태 머신 타입과 PnL 재계산
//! - 외부 협력자(캔들 소스, 저장소) 추상화
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
