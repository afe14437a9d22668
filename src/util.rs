/// Parses a leading decimal integer the way C `atoi` does: optional
/// whitespace, an optional sign, then digits up to the first non-digit.
/// Input without leading digits yields `0`; out-of-range values saturate.
pub fn parse_int(input: &str) -> i32 {
    let bytes = input.trim_start().as_bytes();

    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };

    let mut value: i64 = 0;
    for byte in digits.iter().take_while(|byte| byte.is_ascii_digit()) {
        value = value * 10 + i64::from(byte - b'0');
        if value > i64::from(i32::MAX) + 1 {
            break;
        }
    }

    let value = if negative { -value } else { value };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::parse_int;

    #[test]
    fn plain_numbers() {
        assert_eq!(parse_int("500"), 500);
        assert_eq!(parse_int("-100"), -100);
        assert_eq!(parse_int("+42"), 42);
        assert_eq!(parse_int("0"), 0);
    }

    #[test]
    fn stops_at_first_non_digit() {
        assert_eq!(parse_int("500;"), 500);
        assert_eq!(parse_int("12abc"), 12);
        assert_eq!(parse_int("  -7 steps"), -7);
    }

    #[test]
    fn garbage_is_zero() {
        assert_eq!(parse_int(""), 0);
        assert_eq!(parse_int("abc"), 0);
        assert_eq!(parse_int("-"), 0);
        assert_eq!(parse_int(";500"), 0);
    }

    #[test]
    fn saturates() {
        assert_eq!(parse_int("99999999999"), i32::MAX);
        assert_eq!(parse_int("-99999999999"), i32::MIN);
        assert_eq!(parse_int("-2147483648"), i32::MIN);
    }
}
