//! printf-style formatting for a single float.
//!
//! Parameter fields and value modes are configured with C-style format
//! strings such as `"%.2f"` or `"%02.0f V"`. A [`FloatFormat`] is parsed once
//! and then renders values into a growable `String`. Output is bounded by
//! [`MAX_FORMATTED_LEN`].

use std::fmt;

use thiserror::Error;

/// Longest string a format may produce.
pub const MAX_FORMATTED_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("format string {0:?} has no conversion")]
    MissingConversion(String),

    #[error("format string {0:?} has more than one conversion")]
    MultipleConversions(String),

    #[error("unsupported conversion '%{conversion}' in {format:?}")]
    UnsupportedConversion { format: String, conversion: char },

    #[error("format string {0:?} ends inside a conversion")]
    Truncated(String),

    #[error("width or precision {value} in {format:?} exceeds {}", MAX_FORMATTED_LEN)]
    FieldTooWide { format: String, value: usize },

    #[error("formatted output is {len} chars, limit is {}", MAX_FORMATTED_LEN)]
    Overflow { len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Fixed,
    Exp { upper: bool },
    General { upper: bool },
    Integer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Spec {
    flags: Flags,
    width: usize,
    precision: Option<usize>,
    conversion: Conversion,
}

/// A parsed format string with exactly one float conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatFormat {
    source: String,
    prefix: String,
    spec: Spec,
    suffix: String,
}

impl FloatFormat {
    /// Parse a printf-style format string.
    ///
    /// Supports `%f %F %e %E %g %G %d %i`, the flags `- + space 0 #`, a
    /// width, a precision and `%%` literals.
    pub fn parse(format: &str) -> Result<Self, FormatError> {
        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut spec = None;
        let mut chars = format.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                if spec.is_some() {
                    suffix.push(c);
                } else {
                    prefix.push(c);
                }
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                if spec.is_some() {
                    suffix.push('%');
                } else {
                    prefix.push('%');
                }
                continue;
            }
            if spec.is_some() {
                return Err(FormatError::MultipleConversions(format.to_string()));
            }

            let mut flags = Flags::default();
            while let Some(&f) = chars.peek() {
                match f {
                    '-' => flags.left = true,
                    '+' => flags.plus = true,
                    ' ' => flags.space = true,
                    '0' => flags.zero = true,
                    '#' => flags.alt = true,
                    _ => break,
                }
                chars.next();
            }
            let width = take_number(&mut chars).unwrap_or(0);
            let precision = if chars.peek() == Some(&'.') {
                chars.next();
                Some(take_number(&mut chars).unwrap_or(0))
            } else {
                None
            };
            if let Some(value) = [Some(width), precision]
                .into_iter()
                .flatten()
                .find(|&n| n > MAX_FORMATTED_LEN)
            {
                return Err(FormatError::FieldTooWide {
                    format: format.to_string(),
                    value,
                });
            }
            // Length modifiers are meaningless for a float argument.
            while matches!(chars.peek(), Some('l' | 'L' | 'h')) {
                chars.next();
            }
            let conversion = match chars.next() {
                Some('f' | 'F') => Conversion::Fixed,
                Some('e') => Conversion::Exp { upper: false },
                Some('E') => Conversion::Exp { upper: true },
                Some('g') => Conversion::General { upper: false },
                Some('G') => Conversion::General { upper: true },
                Some('d' | 'i') => Conversion::Integer,
                Some(other) => {
                    return Err(FormatError::UnsupportedConversion {
                        format: format.to_string(),
                        conversion: other,
                    });
                }
                None => return Err(FormatError::Truncated(format.to_string())),
            };
            spec = Some(Spec {
                flags,
                width,
                precision,
                conversion,
            });
        }

        let spec = spec.ok_or_else(|| FormatError::MissingConversion(format.to_string()))?;
        Ok(Self {
            source: format.to_string(),
            prefix,
            spec,
            suffix,
        })
    }

    /// The format string as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Format `value`, failing if the result exceeds [`MAX_FORMATTED_LEN`].
    pub fn format(&self, value: f32) -> Result<String, FormatError> {
        let mut out = String::with_capacity(self.prefix.len() + self.suffix.len() + 16);
        out.push_str(&self.prefix);
        out.push_str(&self.spec.render(value as f64));
        out.push_str(&self.suffix);
        let len = out.chars().count();
        if len > MAX_FORMATTED_LEN {
            return Err(FormatError::Overflow { len });
        }
        Ok(out)
    }

    /// Format `value`, cutting the output at [`MAX_FORMATTED_LEN`] chars.
    pub fn format_bounded(&self, value: f32) -> String {
        match self.format(value) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("{e} (format {:?}, value {value}); truncating", self.source);
                let mut s = format!("{}{}{}", self.prefix, self.spec.render(value as f64), self.suffix);
                if let Some((ix, _)) = s.char_indices().nth(MAX_FORMATTED_LEN) {
                    s.truncate(ix);
                }
                s
            }
        }
    }
}

impl Default for FloatFormat {
    fn default() -> Self {
        Self {
            source: "%f".to_string(),
            prefix: String::new(),
            spec: Spec {
                flags: Flags::default(),
                width: 0,
                precision: None,
                conversion: Conversion::Fixed,
            },
            suffix: String::new(),
        }
    }
}

impl fmt::Display for FloatFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for FloatFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut n: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        n = Some(n.unwrap_or(0).saturating_mul(10).saturating_add(d as usize));
        chars.next();
    }
    n
}

impl Spec {
    fn render(&self, value: f64) -> String {
        if !value.is_finite() {
            let body = if value.is_nan() {
                "nan"
            } else {
                "inf"
            };
            let body = match self.conversion {
                Conversion::Exp { upper: true } | Conversion::General { upper: true } => {
                    body.to_uppercase()
                }
                _ => body.to_string(),
            };
            let sign = self.sign(value.is_sign_negative() && !value.is_nan());
            return self.pad(sign, &body, false);
        }

        let negative = value.is_sign_negative() && value != 0.0;
        let magnitude = value.abs();
        let body = match self.conversion {
            Conversion::Fixed => fixed(magnitude, self.precision.unwrap_or(6), self.flags.alt),
            Conversion::Exp { upper } => exp(magnitude, self.precision.unwrap_or(6), upper, self.flags.alt),
            Conversion::General { upper } => general(magnitude, self.precision.unwrap_or(6), upper, self.flags.alt),
            Conversion::Integer => {
                let digits = format!("{}", magnitude.trunc() as u64);
                match self.precision {
                    Some(p) if digits.len() < p => format!("{digits:0>p$}"),
                    Some(0) if magnitude.trunc() == 0.0 => String::new(),
                    _ => digits,
                }
            }
        };
        // A value that prints as zero keeps its sign only for float conversions.
        let negative = negative
            && !(self.conversion == Conversion::Integer && magnitude.trunc() == 0.0);
        let zero_pad = self.flags.zero
            && !self.flags.left
            && !(self.conversion == Conversion::Integer && self.precision.is_some());
        self.pad(self.sign(negative), &body, zero_pad)
    }

    fn sign(&self, negative: bool) -> &'static str {
        if negative {
            "-"
        } else if self.flags.plus {
            "+"
        } else if self.flags.space {
            " "
        } else {
            ""
        }
    }

    fn pad(&self, sign: &str, body: &str, zero_pad: bool) -> String {
        let len = sign.len() + body.chars().count();
        if len >= self.width {
            return format!("{sign}{body}");
        }
        let fill = self.width - len;
        if self.flags.left {
            format!("{sign}{body}{}", " ".repeat(fill))
        } else if zero_pad {
            format!("{sign}{}{body}", "0".repeat(fill))
        } else {
            format!("{}{sign}{body}", " ".repeat(fill))
        }
    }
}

fn fixed(v: f64, precision: usize, alt: bool) -> String {
    let mut s = format!("{v:.precision$}");
    if alt && precision == 0 {
        s.push('.');
    }
    s
}

fn exp(v: f64, precision: usize, upper: bool, alt: bool) -> String {
    // Rust renders "1.5e0"; C wants "1.5e+00".
    let raw = format!("{v:.precision$e}");
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let mut mantissa = mantissa.to_string();
    if alt && precision == 0 {
        mantissa.push('.');
    }
    let e = if upper { 'E' } else { 'e' };
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}{e}{sign}{:02}", exponent.unsigned_abs())
}

fn general(v: f64, precision: usize, upper: bool, alt: bool) -> String {
    let p = precision.max(1);
    let exponent = if v == 0.0 {
        0
    } else {
        // Exponent after rounding to `p` significant digits.
        let raw = format!("{v:.prec$e}", prec = p - 1);
        raw.split_once('e')
            .and_then(|(_, e)| e.parse::<i32>().ok())
            .unwrap_or(0)
    };
    let mut s = if exponent < -4 || exponent >= p as i32 {
        exp(v, p - 1, upper, alt)
    } else {
        fixed(v, (p as i32 - 1 - exponent) as usize, alt)
    };
    if !alt {
        s = strip_trailing_zeros(&s);
    }
    s
}

fn strip_trailing_zeros(s: &str) -> String {
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(ix) => s.split_at(ix),
        None => (s, ""),
    };
    if !mantissa.contains('.') {
        return s.to_string();
    }
    let trimmed = mantissa.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed}{exponent}")
}
