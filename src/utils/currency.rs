use bigdecimal::{BigDecimal, RoundingMode};

/// Rounds to `decimals` places, halves away from zero.
pub fn round_half_up(value: &BigDecimal, decimals: i64) -> BigDecimal {
    value.with_scale_round(decimals, RoundingMode::HalfUp)
}

/// `amount * percent / 100`, unrounded.
pub fn percent_of(amount: &BigDecimal, percent: &BigDecimal) -> BigDecimal {
    amount * percent / BigDecimal::from(100)
}

pub fn format_amount(amount: &BigDecimal, currency: &str, decimals: i64) -> String {
    format!("{} {}", round_half_up(amount, decimals), currency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_round_half_up_whole_units() {
        assert_eq!(round_half_up(&dec("1100.49"), 0), dec("1100"));
        assert_eq!(round_half_up(&dec("1100.5"), 0), dec("1101"));
        assert_eq!(round_half_up(&dec("0.5"), 0), dec("1"));
        assert_eq!(round_half_up(&dec("1100"), 0), dec("1100"));
    }

    #[test]
    fn test_round_half_up_negative() {
        assert_eq!(round_half_up(&dec("-2.5"), 0), dec("-3"));
        assert_eq!(round_half_up(&dec("-2.4"), 0), dec("-2"));
    }

    #[test]
    fn test_round_half_up_with_cents() {
        assert_eq!(round_half_up(&dec("12.345"), 2), dec("12.35"));
        assert_eq!(round_half_up(&dec("12.344"), 2), dec("12.34"));
        assert_eq!(round_half_up(&dec("7"), 2), dec("7.00"));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(&dec("10000"), &dec("11")), dec("1100"));
        assert_eq!(percent_of(&dec("3333"), &dec("11")), dec("366.63"));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(&dec("1099.6"), "XOF", 0), "1100 XOF");
    }
}
