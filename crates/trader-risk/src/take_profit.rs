//! 하이브리드 익절가.
//!
//! 고정 R 배수 목표와 반대편 존 목표 중 진입가에 더 가까운 값을 씁니다.
//! 존 목표는 존의 진입가 쪽 가장자리를 진입가 방향으로 조금 당긴 값이라
//! 존 내부 깊숙이 들어가지 않습니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trader_core::{Direction, Price, RiskProfileConfig, Zone};

/// 익절 계획.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TakeProfitPlan {
    /// TP1~TP3 (공간이 없으면 `None`)
    pub targets: [Option<Price>; 3],
    /// 존 목표가 채택되었는지
    pub zone_limited: [bool; 3],
}

/// 반대편 존의 익절 목표. 존이 `max_r × risk`보다 멀면 `None`.
///
/// 진입가를 품은 존은 앞쪽 공간이 없으므로 진입가 자체가 목표가 됩니다.
fn zone_target(
    direction: Direction,
    entry: Price,
    risk: Decimal,
    zone: &Zone,
    config: &RiskProfileConfig,
) -> Option<Price> {
    let distance = direction.favorable_move(entry, zone.edge(direction));
    if distance <= Decimal::ZERO {
        return Some(entry);
    }
    if distance > config.zone_tp_max_r * risk {
        return None;
    }
    Some(direction.offset(entry, distance * (Decimal::ONE - config.zone_tp_pullback)))
}

/// 익절가를 계산합니다.
///
/// `opposing`은 진입 방향 앞쪽 존들을 가까운 순으로 정렬한 목록이며,
/// i번째 익절은 i번째 존과 짝지어집니다.
///
/// TP1 최소 거리(`tp1_min_r × R`)는 끌어올리지 않고 제거로 처리합니다. TP1이
/// 이보다 가까우면 TP1~TP3 모두 `None`이 되어 `skip_no_space`로 분류됩니다.
/// 이전 익절보다 더 나아가지 못한 익절도 그 뒤까지 모두 제거합니다.
pub fn plan_take_profits(
    direction: Direction,
    entry: Price,
    risk: Decimal,
    opposing: &[&Zone],
    config: &RiskProfileConfig,
) -> TakeProfitPlan {
    let mut plan = TakeProfitPlan::default();
    if risk <= Decimal::ZERO {
        return plan;
    }

    let mut previous: Option<Price> = None;
    for (i, multiple) in config.tp_multiples.iter().enumerate() {
        let fixed = direction.offset(entry, *multiple * risk);
        let zone = opposing
            .get(i)
            .and_then(|z| zone_target(direction, entry, risk, z, config));

        let (target, limited) = match zone {
            Some(zt) if direction.is_beyond(fixed, zt) => (zt, true),
            _ => (fixed, false),
        };

        let keep = match (i, previous) {
            (0, _) => direction.favorable_move(entry, target) >= config.tp1_min_r * risk,
            (_, Some(prev)) => direction.is_beyond(target, prev),
            (_, None) => false,
        };
        if !keep {
            break;
        }

        plan.targets[i] = Some(target);
        plan.zone_limited[i] = limited;
        previous = Some(target);
    }

    plan
}
