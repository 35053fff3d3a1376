//! 시그널 엔진의 에러 타입.
//!
//! 데이터 부족(스킵)과 비토(veto)는 에러가 아닙니다. 여기서는 설정 오류,
//! 잘못된 입력, 협력자 실패처럼 호출자가 직접 처리해야 하는 경우만 다룹니다.

use thiserror::Error;

use crate::domain::ProviderError;

/// 핵심 에러.
#[derive(Debug, Error)]
pub enum TraderError {
    /// 설정 파일 로드 실패 또는 설정 값 검증 실패
    #[error("설정 에러: {0}")]
    Config(String),

    /// 해석할 수 없는 입력 값 (알 수 없는 상태 문자열 등)
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 캔들 소스 또는 시그널 저장소 실패
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// 엔진 작업을 위한 Result 타입.
pub type TraderResult<T> = Result<T, TraderError>;

impl TraderError {
    /// 다음 주기에 다시 시도할 가치가 있는지 확인합니다.
    ///
    /// 설정/입력 에러는 재시도해도 결과가 같으므로 항상 `false`입니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TraderError::Provider(e) if e.is_retryable())
    }
}

impl From<config::ConfigError> for TraderError {
    fn from(err: config::ConfigError) -> Self {
        TraderError::Config(err.to_string())
    }
}
