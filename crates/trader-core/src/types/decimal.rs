//! 정밀한 가격 계산을 위한 Decimal 유틸리티.
//!
//! 손절/익절/PnL 계산은 모두 `Decimal`로 수행합니다. 같은 입력이면 항상
//! 비트 단위로 같은 결과가 나와야 하기 때문에 부동소수점은 쓰지 않습니다.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// 가격 타입.
pub type Price = Decimal;

/// 거래량 타입.
pub type Quantity = Decimal;

/// 퍼센트 타입 (5.25 = 5.25%).
pub type Percentage = Decimal;

/// Decimal 연산을 위한 확장 트레이트.
pub trait DecimalExt {
    /// 퍼센트 문자열로 변환합니다 (예: 2.5 → "+2.50%").
    fn to_signed_percent_string(&self) -> String;

    /// `step` 단위로 내림합니다. `step`이 0 이하이면 원래 값을 반환합니다.
    fn floor_to_step(&self, step: Decimal) -> Decimal;

    /// `step` 단위의 가장 가까운 배수를 반환합니다.
    fn nearest_multiple(&self, step: Decimal) -> Decimal;

    /// `reference` 대비 상대 허용오차 내에서 같은지 확인합니다.
    ///
    /// `|self - reference| < |reference| × tolerance` (엄격한 부등호).
    fn approx_eq_rel(&self, reference: Decimal, tolerance: Decimal) -> bool;

    /// 0으로 나누면 `None`을 반환하는 나눗셈.
    fn checked_ratio(&self, denominator: Decimal) -> Option<Decimal>;
}

impl DecimalExt for Decimal {
    fn to_signed_percent_string(&self) -> String {
        if self.is_sign_negative() && !self.is_zero() {
            format!("{:.2}%", self)
        } else {
            format!("+{:.2}%", self)
        }
    }

    fn floor_to_step(&self, step: Decimal) -> Decimal {
        if step <= Decimal::ZERO {
            return *self;
        }
        (*self / step).floor() * step
    }

    fn nearest_multiple(&self, step: Decimal) -> Decimal {
        if step <= Decimal::ZERO {
            return *self;
        }
        (*self / step).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * step
    }

    fn approx_eq_rel(&self, reference: Decimal, tolerance: Decimal) -> bool {
        (*self - reference).abs() < reference.abs() * tolerance
    }

    fn checked_ratio(&self, denominator: Decimal) -> Option<Decimal> {
        if denominator.is_zero() {
            None
        } else {
            self.checked_div(denominator)
        }
    }
}

/// 가격 크기에 따른 "라운드 넘버" 간격을 반환합니다.
///
/// 세 자리 가격은 10 단위, 다섯 자리 가격은 100 단위입니다.
pub fn round_number_step(price: Price) -> Decimal {
    let p = price.abs();
    if p < dec!(1) {
        dec!(0.01)
    } else if p < dec!(10) {
        dec!(0.1)
    } else if p < dec!(100) {
        dec!(1)
    } else if p < dec!(1000) {
        dec!(10)
    } else if p < dec!(10000) {
        dec!(50)
    } else if p < dec!(100000) {
        dec!(100)
    } else {
        dec!(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_string() {
        assert_eq!(dec!(2.5).to_signed_percent_string(), "+2.50%");
        assert_eq!(dec!(-5).to_signed_percent_string(), "-5.00%");
    }

    #[test]
    fn test_floor_to_step() {
        assert_eq!(dec!(2.79).floor_to_step(dec!(0.1)), dec!(2.7));
        assert_eq!(dec!(3.0).floor_to_step(dec!(0.1)), dec!(3.0));
        assert_eq!(dec!(1.23).floor_to_step(Decimal::ZERO), dec!(1.23));
    }

    #[test]
    fn test_nearest_multiple() {
        assert_eq!(dec!(104.9).nearest_multiple(dec!(10)), dec!(100));
        assert_eq!(dec!(105).nearest_multiple(dec!(10)), dec!(110));
        assert_eq!(dec!(64980).nearest_multiple(dec!(100)), dec!(65000));
    }

    #[test]
    fn test_approx_eq_rel_is_strict() {
        // 허용오차 0.01% → 100 기준 0.01
        assert!(dec!(100.009).approx_eq_rel(dec!(100), dec!(0.0001)));
        assert!(!dec!(100.01).approx_eq_rel(dec!(100), dec!(0.0001)));
    }

    #[test]
    fn test_checked_ratio() {
        assert_eq!(dec!(10).checked_ratio(dec!(4)), Some(dec!(2.5)));
        assert_eq!(dec!(10).checked_ratio(Decimal::ZERO), None);
    }

    #[test]
    fn test_round_number_step() {
        assert_eq!(round_number_step(dec!(0.52)), dec!(0.01));
        assert_eq!(round_number_step(dec!(245)), dec!(10));
        assert_eq!(round_number_step(dec!(2450)), dec!(50));
        assert_eq!(round_number_step(dec!(64000)), dec!(100));
    }
}
