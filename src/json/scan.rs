//! Purpose: Single-pass structural scan used by the compatibility profile.
//! Exports: `ScanReport`, `scan`.
//! Role: Detects payload features where simd-json and serde_json disagree.
//! Invariants: Never allocates and never fails; malformed input is left to the engines.
//! Notes: Only byte-level features are visible here; destination-dependent
//! differences (e.g. non-string map keys) are out of reach.

/// Nesting depth at which serde_json reports "recursion limit exceeded".
pub(crate) const REFERENCE_RECURSION_LIMIT: usize = 128;

/// Decimal literals with at most this many significant digits and a power of
/// ten within `EXACT_POW10` convert with a single rounding in both engines.
const EXACT_SIGNIFICANT_DIGITS: usize = 15;
const EXACT_POW10: i64 = 22;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct ScanReport {
    pub max_depth: usize,
    pub oversized_integer: bool,
    pub inexact_number: bool,
    pub surrogate_escape: bool,
}

impl ScanReport {
    /// True when the reference engine must decide the outcome.
    pub fn needs_reference_semantics(&self) -> bool {
        self.oversized_integer
            || self.inexact_number
            || self.surrogate_escape
            || self.max_depth >= REFERENCE_RECURSION_LIMIT
    }
}

pub(crate) fn scan(input: &[u8]) -> ScanReport {
    let mut report = ScanReport::default();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < input.len() {
        let byte = input[i];
        if in_string {
            if escaped {
                escaped = false;
                if byte == b'u' && is_surrogate_escape(&input[i + 1..]) {
                    report.surrogate_escape = true;
                }
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                report.max_depth = report.max_depth.max(depth);
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            b'-' | b'0'..=b'9' => {
                let end = number_end(input, i);
                match classify_number(&input[i..end]) {
                    NumberClass::OversizedInteger => report.oversized_integer = true,
                    NumberClass::Inexact => report.inexact_number = true,
                    NumberClass::Plain => {}
                }
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    report
}

fn is_surrogate_escape(rest: &[u8]) -> bool {
    let Some(hex) = rest.get(..4) else {
        return false;
    };
    let Ok(text) = std::str::from_utf8(hex) else {
        return false;
    };
    u16::from_str_radix(text, 16).is_ok_and(|unit| (0xD800..=0xDFFF).contains(&unit))
}

fn number_end(input: &[u8], start: usize) -> usize {
    let mut end = start + 1;
    while end < input.len() && matches!(input[end], b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-')
    {
        end += 1;
    }
    end
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum NumberClass {
    Plain,
    OversizedInteger,
    Inexact,
}

fn classify_number(token: &[u8]) -> NumberClass {
    let (negative, unsigned) = match token.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, token),
    };
    let mantissa_len = unsigned
        .iter()
        .position(|b| matches!(b, b'e' | b'E'))
        .unwrap_or(unsigned.len());
    let (mantissa, exponent) = unsigned.split_at(mantissa_len);
    let (int_part, frac_part) = match mantissa.iter().position(|b| *b == b'.') {
        Some(dot) => (&mantissa[..dot], &mantissa[dot + 1..]),
        None => (mantissa, &[][..]),
    };
    if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
        return NumberClass::Plain;
    }

    let is_float = mantissa.len() != int_part.len() || !exponent.is_empty();
    if !is_float {
        if negative && int_part.iter().all(|b| *b == b'0') {
            return NumberClass::Inexact;
        }
        return if integer_overflows(negative, int_part) {
            NumberClass::OversizedInteger
        } else {
            NumberClass::Plain
        };
    }

    let Some(mut pow10) = parse_exponent(exponent) else {
        return NumberClass::Plain;
    };
    pow10 = pow10.saturating_sub(frac_part.len() as i64);
    let significant = int_part
        .iter()
        .chain(frac_part)
        .skip_while(|b| **b == b'0')
        .count();

    if significant == 0 {
        return if negative {
            NumberClass::Inexact
        } else {
            NumberClass::Plain
        };
    }
    if significant > EXACT_SIGNIFICANT_DIGITS || !(-EXACT_POW10..=EXACT_POW10).contains(&pow10) {
        NumberClass::Inexact
    } else {
        NumberClass::Plain
    }
}

fn all_digits(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_digit)
}

/// Parses `e[+-]digits` (or nothing) into a saturating power of ten.
fn parse_exponent(exponent: &[u8]) -> Option<i64> {
    let Some((_, rest)) = exponent.split_first() else {
        return Some(0);
    };
    let (negative, digits) = match rest.split_first() {
        Some((b'-', digits)) => (true, digits),
        Some((b'+', digits)) => (false, digits),
        _ => (false, rest),
    };
    if digits.is_empty() || !all_digits(digits) {
        return None;
    }
    let magnitude = digits.iter().fold(0i64, |acc, b| {
        acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}

fn integer_overflows(negative: bool, digits: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(digits) else {
        return false;
    };
    if negative {
        format!("-{text}").parse::<i64>().is_err()
    } else {
        text.parse::<u64>().is_err()
    }
}
