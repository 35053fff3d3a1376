//! 리스크 프로파일과 비토.
//!
//! 프로파일은 승인된 패턴마다 한 번 생성되며 이후 변경되지 않습니다.
//! 본전 손절 이동은 시그널의 `stop_current` 필드로만 추적합니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::Direction;
use crate::types::Price;

/// 비토 시 최소 R:R 값. 상한과 같은 정책 상수입니다.
pub const VETO_MIN_RR_PENALTY: Decimal = dec!(2.5);

/// 변동성 국면 (현재 ATR / 평균 ATR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRegime {
    /// 비율 < 0.8
    Low,
    /// 0.8 ≤ 비율 ≤ 1.5
    Normal,
    /// 비율 > 1.5
    High,
}

/// 후속 보고용 시나리오 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scenario {
    /// TP1 없음
    #[serde(rename = "skip_no_space")]
    SkipNoSpace,
    /// TP1만 존재
    #[serde(rename = "scalp_1R")]
    Scalp1R,
    /// TP1 + TP2
    #[serde(rename = "swing_2R")]
    Swing2R,
    /// TP1 + TP2 + TP3
    #[serde(rename = "trend_3R")]
    Trend3R,
}

impl Scenario {
    /// 익절가 존재 여부로 시나리오를 결정합니다.
    pub fn classify(tp1: Option<Price>, tp2: Option<Price>, tp3: Option<Price>) -> Self {
        match (tp1, tp2, tp3) {
            (None, _, _) => Scenario::SkipNoSpace,
            (Some(_), None, _) => Scenario::Scalp1R,
            (Some(_), Some(_), None) => Scenario::Swing2R,
            (Some(_), Some(_), Some(_)) => Scenario::Trend3R,
        }
    }

    /// 직렬화 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::SkipNoSpace => "skip_no_space",
            Scenario::Scalp1R => "scalp_1R",
            Scenario::Swing2R => "swing_2R",
            Scenario::Trend3R => "trend_3R",
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 비토 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VetoReason {
    /// 1시간봉 반대 존이 0.7×ATR(1h)보다 가까움
    H1OpposingZoneTooClose,
    /// 15분봉 반대 존이 1.0×ATR(15m)보다 가까움
    M15OpposingZoneTooClose,
}

impl VetoReason {
    /// 기계 판독용 사유 코드.
    pub fn code(&self) -> &'static str {
        match self {
            VetoReason::H1OpposingZoneTooClose => "h1_opposing_zone_too_close",
            VetoReason::M15OpposingZoneTooClose => "m15_opposing_zone_too_close",
        }
    }
}

impl std::fmt::Display for VetoReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// 명시적 비토 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Veto {
    /// 사유
    pub reason: VetoReason,
    /// 반대 존까지 거리
    pub distance: Decimal,
    /// 요구 최소 거리 (배수 × ATR)
    pub required: Decimal,
    /// 페널티 최소 R:R (항상 [`VETO_MIN_RR_PENALTY`])
    pub min_rr_required: Decimal,
}

impl Veto {
    /// 새 비토를 생성합니다.
    pub fn new(reason: VetoReason, distance: Decimal, required: Decimal) -> Self {
        Self {
            reason,
            distance,
            required,
            min_rr_required: VETO_MIN_RR_PENALTY,
        }
    }

    /// 비토 결과의 익절가. 항상 비어 있습니다.
    pub fn take_profits(&self) -> [Option<Price>; 3] {
        [None, None, None]
    }
}

/// 최소 R:R 조정 내역.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MinRrAdjustments {
    /// 기본값
    pub base: Decimal,
    /// 패턴 점수 조정
    pub score: Decimal,
    /// 존 테스트 빈도 조정
    pub zone_tests: Decimal,
    /// 추세 조정
    pub trend: Decimal,
    /// 다중 타임프레임 정렬 조정
    pub alignment: Decimal,
    /// 변동성 조정
    pub volatility: Decimal,
    /// 클램프 전 합계
    pub unclamped: Decimal,
}

/// 리스크 계산 진단 정보.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDiagnostics {
    /// 손절 기준 스윙 극값
    pub swing_extreme: Price,
    /// 변동성 국면
    pub volatility_regime: VolatilityRegime,
    /// 적용한 적응형 버퍼
    pub adaptive_buffer: Decimal,
    /// 라운드 넘버 회피 적용 여부
    pub round_number_adjusted: bool,
    /// 존 여유 확보를 위해 추가로 밀어낸 거리
    pub zone_clearance_push: Decimal,
    /// 15분봉 반대 존까지 거리 (없으면 `None`)
    pub clearance_m15: Option<Decimal>,
    /// 1시간봉 반대 존까지 거리 (없으면 `None`)
    pub clearance_h1: Option<Decimal>,
    /// 사용 가능한 R 배수 (반대 존이 없으면 `None`)
    pub r_available: Option<Decimal>,
    /// TP별 존 제한 여부
    pub zone_limited: [bool; 3],
    /// 다중 타임프레임 존 정렬 여부
    pub mtf_alignment: bool,
    /// 최소 R:R 조정 내역
    pub min_rr: MinRrAdjustments,
}

/// 손절/익절 계획.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskProfile {
    /// 방향
    pub direction: Direction,
    /// 진입가
    pub entry: Price,
    /// 손절가
    pub stop_loss: Price,
    /// 리스크 단위 R = |진입가 - 손절가|
    pub risk: Decimal,
    /// 1차 익절가
    pub tp1: Option<Price>,
    /// 2차 익절가
    pub tp2: Option<Price>,
    /// 3차 익절가
    pub tp3: Option<Price>,
    /// TP1 실제 R:R
    pub rr1: Option<Decimal>,
    /// TP2 실제 R:R
    pub rr2: Option<Decimal>,
    /// TP3 실제 R:R
    pub rr3: Option<Decimal>,
    /// 동적 최소 R:R
    pub min_rr_required: Decimal,
    /// 검증 통과 여부
    pub is_valid: bool,
    /// 시나리오
    pub scenario: Scenario,
    /// 진단 정보
    pub diagnostics: RiskDiagnostics,
}

impl RiskProfile {
    /// 익절가 배열.
    pub fn take_profits(&self) -> [Option<Price>; 3] {
        [self.tp1, self.tp2, self.tp3]
    }

    /// 존재하는 익절가 개수.
    pub fn target_count(&self) -> usize {
        self.take_profits().iter().filter(|tp| tp.is_some()).count()
    }
}

/// 리스크 계산 결과: 프로파일 또는 비토.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RiskDecision {
    /// 계산된 프로파일 (유효성은 `is_valid` 참조)
    Profile(RiskProfile),
    /// 비토
    Veto(Veto),
}

impl RiskDecision {
    /// 유효한 프로파일인 경우 반환합니다.
    pub fn valid_profile(&self) -> Option<&RiskProfile> {
        match self {
            RiskDecision::Profile(p) if p.is_valid => Some(p),
            _ => None,
        }
    }

    /// 비토 여부.
    pub fn is_veto(&self) -> bool {
        matches!(self, RiskDecision::Veto(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_classify() {
        let p = Some(dec!(1));
        assert_eq!(Scenario::classify(None, p, p), Scenario::SkipNoSpace);
        assert_eq!(Scenario::classify(p, None, None), Scenario::Scalp1R);
        assert_eq!(Scenario::classify(p, p, None), Scenario::Swing2R);
        assert_eq!(Scenario::classify(p, p, p), Scenario::Trend3R);
    }

    #[test]
    fn test_scenario_serde_names() {
        let json = serde_json::to_string(&Scenario::Scalp1R).unwrap();
        assert_eq!(json, "\"scalp_1R\"");
        let parsed: Scenario = serde_json::from_str("\"trend_3R\"").unwrap();
        assert_eq!(parsed, Scenario::Trend3R);
    }

    #[test]
    fn test_veto_penalty() {
        let veto = Veto::new(VetoReason::H1OpposingZoneTooClose, dec!(1), dec!(2.1));
        assert_eq!(veto.min_rr_required, dec!(2.5));
        assert_eq!(veto.take_profits(), [None, None, None]);
        assert_eq!(veto.reason.code(), "h1_opposing_zone_too_close");
    }
}
