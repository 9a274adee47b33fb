/*!
 * Interpreter for `%`-style format strings with a mapping argument.
 *
 * Repository browser URLs and commit message templates are stored as
 * `%(name)s` style format strings. This module expands them against a set of
 * named values and reports the same class of errors the format operator
 * would: unknown keys, bad conversion characters, incomplete specifiers and
 * type mismatches between conversions and values.
 */

use std::fmt;

use thiserror::Error;

/// Largest accepted width or precision
const MAX_FIELD: usize = i32::MAX as usize;

/// A value that can be substituted into a format string
#[derive(Debug, Clone, PartialEq)]
pub enum FormatValue {
    /// Text value
    Str(String),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
}

impl FormatValue {
    fn type_name(&self) -> &'static str {
        match self {
            FormatValue::Str(_) => "str",
            FormatValue::Int(_) => "int",
            FormatValue::Float(_) => "float",
        }
    }
}

impl fmt::Display for FormatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatValue::Str(s) => write!(f, "{}", s),
            FormatValue::Int(i) => write!(f, "{}", i),
            FormatValue::Float(v) => write!(f, "{}", float_repr(*v)),
        }
    }
}

impl From<&str> for FormatValue {
    fn from(value: &str) -> Self {
        FormatValue::Str(value.to_string())
    }
}

impl From<String> for FormatValue {
    fn from(value: String) -> Self {
        FormatValue::Str(value)
    }
}

impl From<i64> for FormatValue {
    fn from(value: i64) -> Self {
        FormatValue::Int(value)
    }
}

impl From<f64> for FormatValue {
    fn from(value: f64) -> Self {
        FormatValue::Float(value)
    }
}

/// Errors raised while expanding a format string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatStringError {
    /// A `%(key)` referenced a name that is not in the mapping
    #[error("'{0}'")]
    MissingKey(String),

    /// Unknown conversion character
    #[error("unsupported format character '{ch}' (0x{code:x}) at index {index}")]
    UnsupportedCharacter {
        /// The offending character
        ch: char,
        /// Its code point
        code: u32,
        /// Character index in the format string
        index: usize,
    },

    /// The string ends inside a specifier
    #[error("incomplete format")]
    Incomplete,

    /// A `%(` without the closing parenthesis
    #[error("incomplete format key")]
    IncompleteKey,

    /// More positional specifiers than arguments
    #[error("not enough arguments for format string")]
    NotEnoughArguments,

    /// `*` width or precision cannot be taken from a mapping
    #[error("* wants int")]
    StarWidth,

    /// Width does not fit a C int
    #[error("width too big")]
    WidthTooBig,

    /// Precision does not fit a C int
    #[error("precision too big")]
    PrecisionTooBig,

    /// A conversion received a value of the wrong type
    #[error("{0}")]
    TypeMismatch(String),
}

/// Parsed conversion specifier
#[derive(Debug, Default)]
struct Spec {
    left_align: bool,
    zero_pad: bool,
    plus_sign: bool,
    space_sign: bool,
    alternate: bool,
    width: usize,
    precision: Option<usize>,
}

/// Expand `format` using the named `values`.
pub fn format_mapping(
    format: &str,
    values: &[(&str, FormatValue)],
) -> Result<String, FormatStringError> {
    let chars: Vec<char> = format.chars().collect();
    let mut out = String::with_capacity(format.len());
    let mut unnamed_used = false;
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '%' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        i += 1;
        if i >= chars.len() {
            return Err(FormatStringError::Incomplete);
        }

        // Mapping key
        let mut key = None;
        if chars[i] == '(' {
            let mut depth = 1;
            let start = i + 1;
            i += 1;
            while i < chars.len() && depth > 0 {
                match chars[i] {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    _ => {}
                }
                i += 1;
            }
            if depth > 0 {
                return Err(FormatStringError::IncompleteKey);
            }
            key = Some(chars[start..i - 1].iter().collect::<String>());
        }

        let mut spec = Spec::default();

        // Flags
        while i < chars.len() {
            match chars[i] {
                '-' => spec.left_align = true,
                '0' => spec.zero_pad = true,
                '+' => spec.plus_sign = true,
                ' ' => spec.space_sign = true,
                '#' => spec.alternate = true,
                _ => break,
            }
            i += 1;
        }

        // Width
        if i < chars.len() && chars[i] == '*' {
            return Err(FormatStringError::StarWidth);
        }
        spec.width = read_number(&chars, &mut i).ok_or(FormatStringError::WidthTooBig)?;

        // Precision
        if i < chars.len() && chars[i] == '.' {
            i += 1;
            if i < chars.len() && chars[i] == '*' {
                return Err(FormatStringError::StarWidth);
            }
            spec.precision =
                Some(read_number(&chars, &mut i).ok_or(FormatStringError::PrecisionTooBig)?);
        }

        // Length modifier is accepted and ignored
        while i < chars.len() && matches!(chars[i], 'h' | 'l' | 'L') {
            i += 1;
        }

        if i >= chars.len() {
            return Err(FormatStringError::Incomplete);
        }
        let conversion = chars[i];
        let conversion_index = i;
        i += 1;

        if conversion == '%' {
            out.push('%');
            continue;
        }

        if !"diouxXeEfFgGcrsa".contains(conversion) {
            return Err(FormatStringError::UnsupportedCharacter {
                ch: conversion,
                code: conversion as u32,
                index: conversion_index,
            });
        }

        let value = match key {
            Some(name) => values
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.clone())
                .ok_or(FormatStringError::MissingKey(name))?,
            None => {
                // Without a key the whole mapping is the single argument
                if unnamed_used {
                    return Err(FormatStringError::NotEnoughArguments);
                }
                unnamed_used = true;
                let rendered = render_mapping(values);
                match conversion {
                    's' | 'r' | 'a' => FormatValue::Str(rendered),
                    _ => {
                        return Err(FormatStringError::TypeMismatch(format!(
                            "%{} format: a real number is required, not dict",
                            conversion
                        )));
                    }
                }
            }
        };

        let rendered = convert(conversion, &value, &spec)?;
        out.push_str(&pad(rendered, &spec, is_numeric(conversion)));
    }

    Ok(out)
}

/// Digits at `i`, `None` when the value exceeds `MAX_FIELD`
fn read_number(chars: &[char], i: &mut usize) -> Option<usize> {
    let mut n = 0usize;
    let mut overflow = false;
    while *i < chars.len() {
        match chars[*i].to_digit(10) {
            Some(d) => {
                match n.checked_mul(10).and_then(|n| n.checked_add(d as usize)) {
                    Some(next) if next <= MAX_FIELD => n = next,
                    _ => overflow = true,
                }
                *i += 1;
            }
            None => break,
        }
    }
    if overflow { None } else { Some(n) }
}

fn is_numeric(conversion: char) -> bool {
    "diouxXeEfFgG".contains(conversion)
}

fn render_mapping(values: &[(&str, FormatValue)]) -> String {
    let items: Vec<String> = values
        .iter()
        .map(|(k, v)| match v {
            FormatValue::Str(s) => format!("'{}': '{}'", k, s),
            other => format!("'{}': {}", k, other),
        })
        .collect();
    format!("{{{}}}", items.join(", "))
}

fn convert(conversion: char, value: &FormatValue, spec: &Spec) -> Result<String, FormatStringError> {
    let text = match conversion {
        's' | 'a' => {
            let s = value.to_string();
            truncate(s, spec.precision)
        }
        'r' => {
            let s = match value {
                FormatValue::Str(s) => format!("'{}'", s),
                other => other.to_string(),
            };
            truncate(s, spec.precision)
        }
        'd' | 'i' | 'u' => {
            let n = match value {
                FormatValue::Int(n) => *n,
                FormatValue::Float(v) => v.trunc() as i64,
                FormatValue::Str(_) => {
                    return Err(type_error(conversion, "a real number", value));
                }
            };
            signed(n.unsigned_abs().to_string(), n < 0, spec)
        }
        'o' | 'x' | 'X' => {
            let n = match value {
                FormatValue::Int(n) => *n,
                _ => return Err(type_error(conversion, "an integer", value)),
            };
            let magnitude = n.unsigned_abs();
            let digits = match (conversion, spec.alternate) {
                ('o', false) => format!("{:o}", magnitude),
                ('o', true) => format!("0o{:o}", magnitude),
                ('x', false) => format!("{:x}", magnitude),
                ('x', true) => format!("0x{:x}", magnitude),
                (_, false) => format!("{:X}", magnitude),
                (_, true) => format!("0X{:X}", magnitude),
            };
            signed(digits, n < 0, spec)
        }
        'e' | 'E' | 'f' | 'F' | 'g' | 'G' => {
            let v = match value {
                FormatValue::Int(n) => *n as f64,
                FormatValue::Float(v) => *v,
                FormatValue::Str(_) => {
                    return Err(FormatStringError::TypeMismatch(format!(
                        "must be real number, not {}",
                        value.type_name()
                    )));
                }
            };
            let precision = spec.precision.unwrap_or(6);
            let body = match conversion {
                'f' | 'F' => format!("{:.*}", precision, v.abs()),
                'e' => exponent_repr(v.abs(), precision, false),
                'E' => exponent_repr(v.abs(), precision, true),
                _ => general_repr(v.abs(), precision, conversion == 'G', spec.alternate),
            };
            signed(body, v.is_sign_negative() && v != 0.0, spec)
        }
        'c' => match value {
            FormatValue::Int(n) => u32::try_from(*n)
                .ok()
                .and_then(char::from_u32)
                .map(|c| c.to_string())
                .ok_or_else(|| {
                    FormatStringError::TypeMismatch("%c arg not in range(0x110000)".to_string())
                })?,
            FormatValue::Str(s) if s.chars().count() == 1 => s.clone(),
            _ => {
                return Err(FormatStringError::TypeMismatch(
                    "%c requires int or char".to_string(),
                ));
            }
        },
        _ => unreachable!("conversion characters are checked before conversion"),
    };
    Ok(text)
}

fn type_error(conversion: char, expected: &str, value: &FormatValue) -> FormatStringError {
    FormatStringError::TypeMismatch(format!(
        "%{} format: {} is required, not {}",
        conversion,
        expected,
        value.type_name()
    ))
}

fn truncate(s: String, precision: Option<usize>) -> String {
    match precision {
        Some(p) => s.chars().take(p).collect(),
        None => s,
    }
}

fn signed(body: String, negative: bool, spec: &Spec) -> String {
    if negative {
        format!("-{}", body)
    } else if spec.plus_sign {
        format!("+{}", body)
    } else if spec.space_sign {
        format!(" {}", body)
    } else {
        body
    }
}

fn pad(text: String, spec: &Spec, numeric: bool) -> String {
    let len = text.chars().count();
    if len >= spec.width {
        return text;
    }
    let fill = spec.width - len;
    if spec.left_align {
        format!("{}{}", text, " ".repeat(fill))
    } else if spec.zero_pad && numeric {
        // Zeros go between the sign and the digits
        let (sign, digits) = match text.chars().next() {
            Some(c @ ('-' | '+' | ' ')) => (c.to_string(), text[1..].to_string()),
            _ => (String::new(), text),
        };
        format!("{}{}{}", sign, "0".repeat(fill), digits)
    } else {
        format!("{}{}", " ".repeat(fill), text)
    }
}

fn float_repr(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

fn exponent_repr(v: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{:.*e}", precision, v);
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exp: i32 = exponent.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    let marker = if upper { 'E' } else { 'e' };
    format!("{}{}{}{:02}", mantissa, marker, sign, exp.abs())
}

fn general_repr(v: f64, precision: usize, upper: bool, keep_zeros: bool) -> String {
    let precision = precision.max(1);
    if v == 0.0 {
        return "0".to_string();
    }
    let exp = v.log10().floor() as i32;
    let mut text = if exp < -4 || exp >= precision as i32 {
        exponent_repr(v, precision - 1, upper)
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        format!("{:.*}", decimals, v)
    };
    if !keep_zeros {
        text = strip_trailing_zeros(&text);
    }
    text
}

fn strip_trailing_zeros(text: &str) -> String {
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(pos) => (&text[..pos], &text[pos..]),
        None => (text, ""),
    };
    if !mantissa.contains('.') {
        return text.to_string();
    }
    let trimmed = mantissa.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", trimmed, exponent)
}
