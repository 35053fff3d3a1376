//! 캔들 타임프레임.
//!
//! 엔진은 15분/1시간/4시간 세 타임프레임만 다룹니다. 15분봉은 패턴 감지와
//! 스톱 버퍼에, 1시간봉은 비토와 최소 R:R에, 4시간봉은 상위 존 정렬에 쓰입니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TraderError;

/// 캔들 타임프레임 (짧은 것이 작음).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
}

impl Timeframe {
    /// 짧은 것부터 나열한 전체 타임프레임.
    pub const ALL: [Timeframe; 3] = [Timeframe::M15, Timeframe::H1, Timeframe::H4];

    /// 캔들 하나의 길이 (분).
    pub const fn minutes(self) -> u64 {
        match self {
            Timeframe::M15 => 15,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
        }
    }

    /// 캔들 하나의 길이 (초).
    pub const fn as_secs(self) -> u64 {
        self.minutes() * 60
    }

    /// 캔들 하나의 길이.
    pub fn span(self) -> chrono::Duration {
        chrono::Duration::minutes(self.minutes() as i64)
    }

    /// 캔들 피드 간격 표기 ("15m", "1h", "4h").
    pub const fn label(self) -> &'static str {
        match self {
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = TraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tf| tf.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TraderError::InvalidInput(format!("지원하지 않는 타임프레임: {s}")))
    }
}
