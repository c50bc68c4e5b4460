//! Lenient number parsing for level attributes.
//!
//! Map files are hand-edited and tool-generated, so attribute values are read the forgiving
//! way: leading whitespace is skipped, the longest numeric prefix is used, and anything that
//! does not start with a number reads as zero.

/// Parse the leading base-10 integer of `s`, saturating at the `i64` range.
pub fn leading_int(s: &str) -> i64 {
    let bytes = s.trim_start().as_bytes();
    let mut pos = 0;
    let negative = match bytes.first() {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    while let Some(digit) = bytes.get(pos).filter(|b| b.is_ascii_digit()) {
        let d = i64::from(digit - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(d)
        } else {
            value.saturating_mul(10).saturating_add(d)
        };
        pos += 1;
    }
    value
}

/// Parse the leading decimal floating-point number of `s` (optional sign, fraction and
/// exponent).
pub fn leading_float(s: &str) -> f32 {
    let trimmed = s.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'-' | b'+')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    trimmed[..end].parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_int_plain_and_signed() {
        assert_eq!(leading_int("42"), 42);
        assert_eq!(leading_int("-17"), -17);
        assert_eq!(leading_int("+8"), 8);
        assert_eq!(leading_int("  12"), 12);
    }

    #[test]
    fn leading_int_stops_at_first_non_digit() {
        assert_eq!(leading_int("5abc"), 5);
        assert_eq!(leading_int("3.9"), 3);
    }

    #[test]
    fn leading_int_garbage_is_zero() {
        assert_eq!(leading_int(""), 0);
        assert_eq!(leading_int("abc"), 0);
        assert_eq!(leading_int("-"), 0);
    }

    #[test]
    fn leading_int_saturates() {
        assert_eq!(leading_int("99999999999999999999999"), i64::MAX);
        assert_eq!(leading_int("-99999999999999999999999"), i64::MIN);
    }

    #[test]
    fn leading_float_forms() {
        assert_eq!(leading_float("1.5"), 1.5);
        assert_eq!(leading_float("-2"), -2.0);
        assert_eq!(leading_float(".25"), 0.25);
        assert_eq!(leading_float("3."), 3.0);
        assert_eq!(leading_float("1e2"), 100.0);
        assert_eq!(leading_float(" 7.5px"), 7.5);
    }

    #[test]
    fn leading_float_ignores_dangling_exponent() {
        assert_eq!(leading_float("4e"), 4.0);
        assert_eq!(leading_float("4e+"), 4.0);
    }

    #[test]
    fn leading_float_garbage_is_zero() {
        assert_eq!(leading_float(""), 0.0);
        assert_eq!(leading_float("."), 0.0);
        assert_eq!(leading_float("-x"), 0.0);
    }
}
