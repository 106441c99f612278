//! Fixed-width numeric fields in the C `printf` style the output tables use.

/// `%W.Pe`: mantissa with `precision` decimals and a signed exponent of at
/// least two digits, right-aligned to `width`.
pub fn sci(value: f64, precision: usize, width: usize) -> String {
    let rust = format!("{:.*e}", precision, value);
    let text = match rust.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", mantissa, sign, exp.abs())
            }
            Err(_) => rust.clone(),
        },
        None => rust.clone(),
    };
    format!("{:>width$}", text, width = width)
}

/// `%15.8e`, the width used for every bias and batch-sum column.
pub fn sci15(value: f64) -> String {
    sci(value, 8, 15)
}

/// `%W.Pf`.
pub fn fixed(value: f64, precision: usize, width: usize) -> String {
    format!("{:>width$.precision$}", value, width = width, precision = precision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponent_has_sign_and_two_digits() {
        assert_eq!(sci15(1.5e-5), " 1.50000000e-05");
        assert_eq!(sci15(-2.0), "-2.00000000e+00");
        assert_eq!(sci15(0.0), " 0.00000000e+00");
        assert_eq!(sci(6.02e123, 2, 10), " 6.02e+123");
    }

    #[test]
    fn fixed_matches_printf() {
        assert_eq!(fixed(0.5, 9, 12), " 0.500000000");
        assert_eq!(fixed(-0.123456789, 8, 12), " -0.12345679");
        assert_eq!(fixed(10.0, 6, 15), "      10.000000");
    }
}
