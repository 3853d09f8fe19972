//! Integer literals as read by C's `strtoul(s, &end, 0)`.

/// Result of reading one literal from the front of a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Literal {
    /// A value was read, consuming `len` bytes (including leading whitespace and sign).
    Value { value: u64, len: usize },
    /// No digits at this position.
    Empty,
    /// Digits were present, but the value does not fit in 64 bits.
    Overflow,
}

/// Whitespace as defined by C's `isspace` in the "C" locale.
pub(crate) fn is_c_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Read an unsigned integer literal with automatic radix detection:
/// `0x`/`0X` is hexadecimal, a leading `0` octal, anything else decimal.
///
/// Leading whitespace and a single `+` or `-` are accepted; a negative value
/// wraps around, as it does in C.
pub(crate) fn parse_literal(s: &[u8]) -> Literal {
    let mut pos = s.iter().take_while(|b| is_c_space(**b)).count();
    let negative = match s.get(pos) {
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

    // A bare "0x" with no hex digit after it is the literal 0 followed by junk
    let radix = match s.get(pos..pos + 3) {
        Some([b'0', b'x' | b'X', d]) if d.is_ascii_hexdigit() => {
            pos += 2;
            16
        }
        _ if s.get(pos) == Some(&b'0') => 8,
        _ => 10,
    };

    let digits = &s[pos..];
    let len = digits
        .iter()
        .take_while(|b| char::from(**b).is_digit(radix))
        .count();
    if len == 0 {
        return Literal::Empty;
    }

    let mut value: u64 = 0;
    for b in &digits[..len] {
        let Some(d) = char::from(*b).to_digit(radix) else {
            return Literal::Empty;
        };
        match value
            .checked_mul(u64::from(radix))
            .and_then(|v| v.checked_add(u64::from(d)))
        {
            Some(v) => value = v,
            None => return Literal::Overflow,
        }
    }

    if negative {
        value = value.wrapping_neg();
    }
    Literal::Value {
        value,
        len: pos + len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(s: &[u8]) -> Option<(u64, usize)> {
        match parse_literal(s) {
            Literal::Value { value, len } => Some((value, len)),
            _ => None,
        }
    }

    #[test]
    fn radix_detection() {
        assert_eq!(value(b"0x0F,"), Some((15, 4)));
        assert_eq!(value(b"0XfF"), Some((255, 4)));
        assert_eq!(value(b"017,"), Some((15, 3)));
        assert_eq!(value(b"15,"), Some((15, 2)));
        assert_eq!(value(b"0"), Some((0, 1)));
    }

    #[test]
    fn octal_stops_at_non_octal_digit() {
        // "08" is the octal literal 0 followed by a separate "8"
        assert_eq!(value(b"08"), Some((0, 1)));
        assert_eq!(value(b"8"), Some((8, 1)));
    }

    #[test]
    fn hex_prefix_without_digits() {
        assert_eq!(value(b"0x,"), Some((0, 1)));
        assert_eq!(value(b"0xg"), Some((0, 1)));
    }

    #[test]
    fn whitespace_and_sign() {
        assert_eq!(value(b" \t\r0x10"), Some((16, 7)));
        assert_eq!(value(b"+7"), Some((7, 2)));
        assert_eq!(value(b"-1"), Some((u64::MAX, 2)));
    }

    #[test]
    fn no_digits() {
        assert_eq!(parse_literal(b""), Literal::Empty);
        assert_eq!(parse_literal(b"};"), Literal::Empty);
        assert_eq!(parse_literal(b"  ,"), Literal::Empty);
        assert_eq!(parse_literal(b"-x"), Literal::Empty);
    }

    #[test]
    fn overflow() {
        assert_eq!(parse_literal(b"0xFFFFFFFFFFFFFFFF"), Literal::Value {
            value: u64::MAX,
            len: 18
        });
        assert_eq!(parse_literal(b"0x10000000000000000"), Literal::Overflow);
        assert_eq!(parse_literal(b"99999999999999999999"), Literal::Overflow);
    }
}
