//! Scalar text in every radix.

use l5x_core::{BaseKind, Radix, Value};

use super::CodecError;

/// Exponential text with a three-digit exponent, as stored in L5K data.
///
/// REAL values are written from their `f32` value with 8 decimals, LREAL
/// values with 16.
///
/// ```
/// # use l5x::codec::format_exponential;
/// # use l5x_core::BaseKind;
/// assert_eq!(format_exponential(0.0, BaseKind::Real), "0.00000000e+000");
/// assert_eq!(format_exponential(41.94, BaseKind::Real), "4.19399986e+001");
/// ```
pub fn format_exponential(value: f64, kind: BaseKind) -> String {
    let text = match kind {
        BaseKind::Lreal => format!("{value:.16e}"),
        _ => format!("{:.8e}", value as f32),
    };
    let (mantissa, exponent) = text.split_once('e').unwrap_or((&text, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:03}", exponent.unsigned_abs())
}

/// Plain decimal text of a real, always with a fractional part.
fn format_float(value: f64, kind: BaseKind) -> String {
    let text = match kind {
        BaseKind::Lreal => value.to_string(),
        _ => (value as f32).to_string(),
    };
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

/// Text of a scalar in L5K data.
pub(super) fn compact_text(kind: BaseKind, value: &Value, path: &str) -> Result<String, CodecError> {
    match kind {
        BaseKind::Bool => Ok(bool_text(check_bool(value, path)?)),
        kind if kind.is_real() => Ok(format_exponential(check_real(kind, value, path)?, kind)),
        kind => Ok(check_integer(kind, value, path)?.to_string()),
    }
}

/// Text of a scalar in a Decorated `Value` attribute.
pub(super) fn radix_text(
    kind: BaseKind,
    radix: Radix,
    value: &Value,
    path: &str,
) -> Result<String, CodecError> {
    match kind {
        BaseKind::Bool => Ok(bool_text(check_bool(value, path)?)),
        kind if kind.is_real() => {
            let real = check_real(kind, value, path)?;
            Ok(match radix {
                Radix::Exponential => format_exponential(real, kind),
                _ => format_float(real, kind),
            })
        }
        kind => {
            let integer = check_integer(kind, value, path)?;
            let raw = to_bits(integer, kind);
            let bits = kind.bits() as usize;
            Ok(match radix {
                Radix::Hex => format!("16#{}", grouped(&format!("{raw:0w$x}", w = bits / 4), 4)),
                Radix::Binary => format!("2#{}", grouped(&format!("{raw:0bits$b}"), 4)),
                Radix::Octal => format!("8#{}", grouped(&format!("{raw:0w$o}", w = bits.div_ceil(3)), 3)),
                Radix::Ascii => {
                    let bytes: Vec<u8> = (0..bits / 8)
                        .rev()
                        .map(|i| ((raw >> (i * 8)) & 0xff) as u8)
                        .collect();
                    format!("'{}'", escape_bytes(&bytes))
                }
                _ => integer.to_string(),
            })
        }
    }
}

/// Parse scalar text of any accepted form.
pub(super) fn parse(kind: BaseKind, text: &str) -> Result<Value, CodecError> {
    let text = text.trim();
    match kind {
        BaseKind::Bool => match text {
            "0" => Ok(Value::Bool(false)),
            "1" => Ok(Value::Bool(true)),
            _ => Err(malformed(text)),
        },
        BaseKind::Real => {
            let value: f32 = text.parse().map_err(|_| malformed(text))?;
            finite(f64::from(value), text)
        }
        BaseKind::Lreal => {
            let value: f64 = text.parse().map_err(|_| malformed(text))?;
            finite(value, text)
        }
        kind => parse_integer(kind, text).map(Value::Integer),
    }
}

fn finite(value: f64, text: &str) -> Result<Value, CodecError> {
    if value.is_finite() {
        Ok(Value::Real(value))
    } else {
        Err(malformed(text))
    }
}

fn parse_integer(kind: BaseKind, text: &str) -> Result<i64, CodecError> {
    let radix = [("16#", 16), ("8#", 8), ("2#", 2)]
        .into_iter()
        .find_map(|(prefix, radix)| text.strip_prefix(prefix).map(|rest| (rest, radix)));

    if let Some((digits, radix)) = radix {
        let digits: String = digits.chars().filter(|&c| c != '_').collect();
        let raw = u64::from_str_radix(&digits, radix).map_err(|_| malformed(text))?;
        return from_bits(raw, kind).ok_or_else(|| out_of_range(kind, text));
    }
    if let Some(quoted) = text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        let bytes = unescape_bytes(quoted).ok_or_else(|| malformed(text))?;
        if bytes.len() > (kind.bits() / 8) as usize {
            return Err(out_of_range(kind, text));
        }
        let raw = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        return from_bits(raw, kind).ok_or_else(|| out_of_range(kind, text));
    }

    let digits: String = text.chars().filter(|&c| c != '_').collect();
    let value: i64 = digits.parse().map_err(|_| malformed(text))?;
    let (min, max) = kind.range();
    if value < min || value > max {
        return Err(out_of_range(kind, text));
    }
    Ok(value)
}

/// Two's complement bits of `value` in the width of `kind`.
pub(super) fn to_bits(value: i64, kind: BaseKind) -> u64 {
    let bits = kind.bits();
    if bits >= 64 {
        value as u64
    } else {
        (value as u64) & ((1u64 << bits) - 1)
    }
}

/// Value of `kind` whose bits are `raw`. `None` if `raw` is too wide.
pub(super) fn from_bits(raw: u64, kind: BaseKind) -> Option<i64> {
    let bits = kind.bits();
    if bits >= 64 {
        return Some(raw as i64);
    }
    if raw >> bits != 0 {
        return None;
    }
    let sign = 1u64 << (bits - 1);
    if !kind.is_unsigned() && raw & sign != 0 {
        Some(raw as i64 - (1i64 << bits))
    } else {
        Some(raw as i64)
    }
}

fn grouped(digits: &str, size: usize) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let first = match chars.len() % size {
        0 => size,
        n => n,
    };
    let mut out = String::with_capacity(chars.len() + chars.len() / size);
    for (i, c) in chars.iter().enumerate() {
        if i >= first && (i - first) % size == 0 {
            out.push('_');
        }
        out.push(*c);
    }
    out
}

fn bool_text(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

pub(super) fn check_bool(value: &Value, path: &str) -> Result<bool, CodecError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Integer(0) => Ok(false),
        Value::Integer(1) => Ok(true),
        other => Err(mismatch(path, "BOOL", other)),
    }
}

fn check_real(kind: BaseKind, value: &Value, path: &str) -> Result<f64, CodecError> {
    let real = match value {
        Value::Real(r) => *r,
        Value::Integer(i) => *i as f64,
        other => return Err(mismatch(path, kind.name(), other)),
    };
    let in_range = match kind {
        BaseKind::Real => (real as f32).is_finite(),
        _ => real.is_finite(),
    };
    if !in_range {
        return Err(out_of_range(kind, &real.to_string()));
    }
    Ok(real)
}

pub(super) fn check_integer(kind: BaseKind, value: &Value, path: &str) -> Result<i64, CodecError> {
    let integer = match value {
        Value::Integer(i) => *i,
        Value::Bool(b) => i64::from(*b),
        other => return Err(mismatch(path, kind.name(), other)),
    };
    let (min, max) = kind.range();
    if integer < min || integer > max {
        return Err(out_of_range(kind, &integer.to_string()));
    }
    Ok(integer)
}

/// `$`-escaped text of raw bytes. Printable ASCII stays as is.
pub(super) fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &byte in bytes {
        match byte {
            b'$' => out.push_str("$$"),
            b'\'' => out.push_str("$'"),
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("${byte:02X}")),
        }
    }
    out
}

/// Bytes of `$`-escaped text. `None` for a broken escape.
pub(super) fn unescape_bytes(text: &str) -> Option<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let next = *bytes.get(i + 1)?;
        let (byte, width) = match next {
            b'$' => (b'$', 2),
            b'\'' => (b'\'', 2),
            b'L' | b'l' | b'N' | b'n' => (b'\n', 2),
            b'R' | b'r' => (b'\r', 2),
            b'T' | b't' => (b'\t', 2),
            b'P' | b'p' => (0x0c, 2),
            _ => {
                let hex = text.get(i + 1..i + 3)?;
                (u8::from_str_radix(hex, 16).ok()?, 3)
            }
        };
        out.push(byte);
        i += width;
    }
    Some(out)
}

pub(super) fn malformed(text: &str) -> CodecError {
    CodecError::Malformed {
        text: text.to_string(),
    }
}

pub(super) fn out_of_range(kind: BaseKind, value: &str) -> CodecError {
    CodecError::OutOfRangeValue {
        data_type: kind.name().to_string(),
        value: value.to_string(),
    }
}

pub(super) fn mismatch(path: &str, expected: &str, found: &Value) -> CodecError {
    CodecError::ShapeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        found: found.kind_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_exponential_text() {
        assert_eq!(format_exponential(0.0, BaseKind::Real), "0.00000000e+000");
        assert_eq!(format_exponential(41.94, BaseKind::Real), "4.19399986e+001");
        assert_eq!(format_exponential(-0.5, BaseKind::Real), "-5.00000000e-001");
        assert_eq!(
            format_exponential(1.0, BaseKind::Lreal),
            "1.0000000000000000e+000"
        );
    }

    #[test]
    fn test_real_text_round_trips_through_f32() {
        let text = format_exponential(f64::from(41.94f32), BaseKind::Real);
        assert_eq!(parse(BaseKind::Real, &text).unwrap(), Value::Real(f64::from(41.94f32)));
    }

    #[test]
    fn test_radix_text() {
        let v = Value::Integer(255);
        assert_eq!(radix_text(BaseKind::Dint, Radix::Hex, &v, "").unwrap(), "16#0000_00ff");
        assert_eq!(radix_text(BaseKind::Sint, Radix::Hex, &Value::Integer(-1), "").unwrap(), "16#ff");
        assert_eq!(radix_text(BaseKind::Int, Radix::Binary, &v, "").unwrap(), "2#0000_0000_1111_1111");
        assert_eq!(radix_text(BaseKind::Sint, Radix::Octal, &Value::Integer(8), "").unwrap(), "8#010");
        assert_eq!(radix_text(BaseKind::Int, Radix::Ascii, &Value::Integer(0x4142), "").unwrap(), "'AB'");
        assert_eq!(radix_text(BaseKind::Dint, Radix::Decimal, &Value::Integer(-7), "").unwrap(), "-7");
        assert_eq!(radix_text(BaseKind::Real, Radix::Float, &Value::Real(5.0), "").unwrap(), "5.0");
        assert_eq!(radix_text(BaseKind::Real, Radix::Float, &Value::Real(1.5), "").unwrap(), "1.5");
    }

    #[test]
    fn test_every_radix_parses_back() {
        for radix in [Radix::Decimal, Radix::Hex, Radix::Binary, Radix::Octal, Radix::Ascii] {
            for value in [0i64, 1, -1, 127, -128, 4242, i32::MIN.into(), i32::MAX.into()] {
                let text = radix_text(BaseKind::Dint, radix, &Value::Integer(value), "").unwrap();
                assert_eq!(
                    parse(BaseKind::Dint, &text).unwrap(),
                    Value::Integer(value),
                    "{radix} text `{text}`"
                );
            }
        }
    }

    #[test]
    fn test_range_checks() {
        assert!(matches!(
            check_integer(BaseKind::Sint, &Value::Integer(128), "x"),
            Err(CodecError::OutOfRangeValue { .. })
        ));
        assert!(matches!(
            parse(BaseKind::Usint, "-1"),
            Err(CodecError::OutOfRangeValue { .. })
        ));
        assert!(matches!(
            parse(BaseKind::Sint, "16#1FF"),
            Err(CodecError::OutOfRangeValue { .. })
        ));
        assert!(matches!(
            compact_text(BaseKind::Real, &Value::Real(f64::NAN), "x"),
            Err(CodecError::OutOfRangeValue { .. })
        ));
        assert!(matches!(
            compact_text(BaseKind::Real, &Value::Real(1e300), "x"),
            Err(CodecError::OutOfRangeValue { .. })
        ));
    }

    #[test]
    fn test_radix_prefixed_values_wrap_to_signed() {
        assert_eq!(parse(BaseKind::Dint, "16#FFFF_FFFF").unwrap(), Value::Integer(-1));
        assert_eq!(parse(BaseKind::Udint, "16#FFFF_FFFF").unwrap(), Value::Integer(4_294_967_295));
        assert_eq!(parse(BaseKind::Int, "1_000").unwrap(), Value::Integer(1000));
    }

    #[test]
    fn test_byte_escapes() {
        let bytes = b"a$b'c\x00\x7f";
        let text = escape_bytes(bytes);
        assert_eq!(text, "a$$b$'c$00$7F");
        assert_eq!(unescape_bytes(&text).unwrap(), bytes);
        assert_eq!(unescape_bytes("x$Ly").unwrap(), b"x\ny");
        assert_eq!(unescape_bytes("bad$"), None);
    }
}
