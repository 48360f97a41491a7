//! Price / quantity normalization.
//!
//! Turns arbitrary-precision decimals into wire-safe strings for a venue:
//! tick-derived decimal limit, significant-figure cap, size increment. Every
//! reduction truncates toward zero so an emitted value is never more precise
//! and never more aggressive than the one requested.

use rust_decimal::{Decimal, RoundingStrategy};

/// Venue-wide price limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenuePrecision {
    pub max_price_decimals: u32,
    pub max_significant_figures: u32,
}

impl VenuePrecision {
    pub const fn new(max_price_decimals: u32, max_significant_figures: u32) -> Self {
        Self { max_price_decimals, max_significant_figures }
    }

    /// Decimals a price may carry on an instrument with this tick
    pub fn allowed_decimals(&self, tick_size: Decimal) -> u32 {
        self.max_price_decimals.saturating_sub(tick_size.scale())
    }
}

#[inline]
fn truncate(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::ToZero).normalize()
}

/// Significant digits of a plain decimal string.
///
/// Sign, leading zeros, the decimal point and trailing fractional zeros do not count.
pub fn significant_figures(s: &str) -> usize {
    let s = s.trim_start_matches(['-', '+']);
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (s, ""),
    };
    let mut digits = String::with_capacity(int_part.len() + frac_part.len());
    digits.push_str(int_part);
    digits.push_str(frac_part);
    digits.trim_start_matches('0').len()
}

fn integer_digit_count(s: &str) -> u32 {
    let s = s.trim_start_matches(['-', '+']);
    s.split_once('.').map_or(s, |(i, _)| i).len() as u32
}

/// Format a price for the wire.
pub fn format_price(price: Decimal, tick_size: Decimal, precision: VenuePrecision) -> String {
    let allowed = precision.allowed_decimals(tick_size);

    // Mathematically integral prices skip the significant-figure rule.
    if price.normalize().scale() == 0 {
        return truncate(price, 0).to_string();
    }

    let candidate = truncate(price, allowed).to_string();
    let max_sig = precision.max_significant_figures as usize;
    if significant_figures(&candidate) <= max_sig {
        return candidate;
    }

    let keep = precision
        .max_significant_figures
        .saturating_sub(integer_digit_count(&candidate));
    if keep < allowed {
        truncate(price, keep).to_string()
    } else {
        candidate
    }
}

/// Format a size for the wire.
///
/// The increment is normalized first: "1.0" and "1" are the same increment.
/// Increments of 10, 100, ... truncate to whole multiples of the increment.
pub fn format_quantity(size: Decimal, size_increment: Decimal) -> String {
    let increment = size_increment.normalize();
    if increment.scale() > 0 {
        return truncate(size, increment.scale()).to_string();
    }

    let zeros = integer_trailing_zeros(increment);
    if zeros == 0 {
        return truncate(size, 0).to_string();
    }
    // integer / 10^k is exact, so trunc never rounds up
    let step = Decimal::from_i128_with_scale(10i128.pow(zeros), 0);
    ((size.trunc() / step).trunc() * step).normalize().to_string()
}

fn integer_trailing_zeros(increment: Decimal) -> u32 {
    let mut mantissa = increment.mantissa().abs();
    let mut zeros = 0;
    while mantissa != 0 && mantissa % 10 == 0 {
        mantissa /= 10;
        zeros += 1;
    }
    zeros
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    const HL: VenuePrecision = VenuePrecision::new(6, 5);

    // tick scale chosen so that allowed decimals = 6 - scale
    fn tick_for(allowed: u32) -> Decimal {
        Decimal::new(1, 6 - allowed)
    }

    fn px(value: &str, allowed: u32) -> String {
        format_price(Decimal::from_str(value).unwrap(), tick_for(allowed), HL)
    }

    #[test]
    fn test_allowed_decimals() {
        assert_eq!(HL.allowed_decimals(dec!(0.01)), 4);
        assert_eq!(HL.allowed_decimals(dec!(1)), 6);
        assert_eq!(HL.allowed_decimals(dec!(0.00000001)), 0);
    }

    #[test]
    fn test_truncates_to_allowed_decimals() {
        assert_eq!(px("1.23456789", 0), "1");
        assert_eq!(px("1.23456789", 2), "1.23");
        assert_eq!(px("1.23456789", 4), "1.2345");
    }

    #[test]
    fn test_sig_fig_rule_never_adds_precision() {
        // keep saturates to 0, which is not below allowed = 0
        assert_eq!(px("1234567.89", 0), "1234567");
        assert_eq!(px("9876543.21", 0), "9876543");
    }

    #[test]
    fn test_large_prices() {
        assert_eq!(px("100000.999", 2), "100000");
        assert_eq!(px("99999.999", 4), "99999");
        assert_eq!(px("100000", 2), "100000");
    }

    #[test]
    fn test_small_and_mid_prices() {
        assert_eq!(px("0.123456789", 2), "0.12");
        assert_eq!(px("12.3456789", 2), "12.34");
        assert_eq!(px("12.3456789", 6), "12.345");
        assert_eq!(px("0.000123456789", 6), "0.000123");
    }

    #[test]
    fn test_sig_fig_rule_trims_below_allowed() {
        // candidate 123.4567 has 7 sig figs, keep 5 - 3 = 2 decimals
        assert_eq!(px("123.456789", 4), "123.45");
        assert_eq!(px("-123.456789", 4), "-123.45");
    }

    #[test]
    fn test_sig_fig_cap_is_per_venue() {
        let p = VenuePrecision::new(6, 2);
        assert_eq!(format_price(dec!(1.23456), tick_for(2), VenuePrecision::new(6, 5)), "1.23");
        assert_eq!(format_price(dec!(1.23456), tick_for(2), p), "1.2");
    }

    #[test]
    fn test_trailing_zeros_sign_and_zero() {
        assert_eq!(px("1.200000", 2), "1.2");
        assert_eq!(px("0", 2), "0");
        assert_eq!(px("0.000", 2), "0");
        assert_eq!(px("-1.234", 4), "-1.234");
        assert_eq!(px("-0.001", 2), "0");
        assert_eq!(px("5.000", 2), "5");
    }

    #[test]
    fn test_significant_figures() {
        assert_eq!(significant_figures("0"), 0);
        assert_eq!(significant_figures("0.00120"), 2);
        assert_eq!(significant_figures("-12.34"), 4);
        assert_eq!(significant_figures("100000"), 6);
        assert_eq!(significant_figures("100.010"), 5);
    }

    #[test]
    fn test_quantity_increment_scale_is_stripped() {
        assert_eq!(format_quantity(dec!(500.0), dec!(1)), "500");
        assert_eq!(format_quantity(dec!(500.0), dec!(1.0)), "500");
        assert_eq!(format_quantity(dec!(500.0), dec!(1.000)), "500");
    }

    #[test]
    fn test_quantity_truncates() {
        assert_eq!(format_quantity(dec!(0.123456), dec!(0.001)), "0.123");
        assert_eq!(format_quantity(dec!(0.1239), dec!(0.0010)), "0.123");
        assert_eq!(format_quantity(dec!(2.50), dec!(0.01)), "2.5");
        assert_eq!(format_quantity(dec!(0.0009), dec!(0.001)), "0");
    }

    #[test]
    fn test_quantity_tens_increment() {
        assert_eq!(format_quantity(dec!(1234), dec!(10)), "1230");
        assert_eq!(format_quantity(dec!(1234), dec!(10.0)), "1230");
        assert_eq!(format_quantity(dec!(1234.99), dec!(100)), "1200");
        assert_eq!(format_quantity(dec!(99), dec!(100)), "0");
        assert_eq!(format_quantity(dec!(7), dec!(10)), "0");
        assert_eq!(format_quantity(dec!(-1234), dec!(1000)), "-1000");
        assert_eq!(format_quantity(dec!(-999), dec!(1000)), "0");
    }

    fn arb_decimal() -> impl Strategy<Value = Decimal> {
        (any::<i64>(), 0u32..=12).prop_map(|(m, s)| Decimal::new(m, s))
    }

    proptest! {
        #[test]
        fn prop_price_never_more_aggressive(price in arb_decimal(), allowed in 0u32..=6) {
            let out = format_price(price, tick_for(allowed), HL);
            let parsed = Decimal::from_str(&out).unwrap();
            prop_assert!(parsed.abs() <= price.abs());
            prop_assert!(parsed.is_zero() || parsed.is_sign_negative() == price.is_sign_negative());
            prop_assert!(!out.contains('e') && !out.contains('E'));
            if out.contains('.') {
                prop_assert!(!out.ends_with('0'));
                prop_assert!(parsed.scale() <= allowed);
            }
        }

        #[test]
        fn prop_quantity_respects_increment(size in arb_decimal(), inc_scale in 0u32..=8, pad in 0u32..=3) {
            // increment with nominal trailing zeros
            let increment = Decimal::new(10i64.pow(pad), inc_scale + pad);
            let out = format_quantity(size, increment);
            let parsed = Decimal::from_str(&out).unwrap();
            prop_assert!(parsed.abs() <= size.abs());
            prop_assert!(parsed.scale() <= inc_scale);
            prop_assert!(!out.contains('.') || !out.ends_with('0'));
        }

        #[test]
        fn prop_quantity_whole_multiple_of_large_increment(size in arb_decimal(), zeros in 0u32..=6, pad in 0u32..=3) {
            let step = Decimal::new(10i64.pow(zeros), 0);
            let increment = Decimal::new(10i64.pow(zeros + pad), pad);
            let out = format_quantity(size, increment);
            let parsed = Decimal::from_str(&out).unwrap();
            prop_assert!(parsed.abs() <= size.abs());
            prop_assert_eq!(parsed.scale(), 0);
            prop_assert!((parsed % step).is_zero());
            prop_assert!(!out.contains('.'));
        }
    }
}
