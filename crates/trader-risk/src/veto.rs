//! 반대편 존 근접 비토.
//!
//! 손절/익절 계산 전에 실행됩니다. 1시간봉을 먼저 보고, 1시간봉이 비토하지
//! 않은 경우에만 15분봉을 봅니다.

use rust_decimal::Decimal;
use trader_core::{Direction, MultiTimeframeZones, Price, RiskProfileConfig, Veto, VetoReason};

use crate::AtrSet;

/// 비토 조건을 검사합니다.
pub fn check_veto(
    direction: Direction,
    entry: Price,
    zones: &MultiTimeframeZones,
    atrs: &AtrSet,
    config: &RiskProfileConfig,
) -> Option<Veto> {
    let checks = [
        (&zones.h1, atrs.h1 * config.veto_h1_atr, VetoReason::H1OpposingZoneTooClose),
        (&zones.m15, atrs.m15 * config.veto_m15_atr, VetoReason::M15OpposingZoneTooClose),
    ];

    checks.into_iter().find_map(|(set, required, reason)| {
        let (_, distance) = set.nearest_opposing(direction, entry)?;
        (required > Decimal::ZERO && distance < required).then(|| Veto::new(reason, distance, required))
    })
}
