//! Go `fmt` style printing of values: `Sprint`, `Sprintln` and `Sprintf`.
//!
//! Formatting mistakes never fail; like Go they are reported inline, e.g.
//! `%!d(string=hi)` for a bad verb or `%!s(MISSING)` for a missing operand.
use std::iter::Peekable;
use std::str::Chars;
use serde_json::Number;
use crate::value::{format_float, format_number, Value, ValueExt};


pub(crate) fn sprint(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        let is_string = matches!(arg, Value::String(_));
        if i > 0 && !is_string && !matches!(args[i - 1], Value::String(_)) {
            out.push(' ');
        }
        out.push_str(&arg.to_display());
    }
    out
}

pub(crate) fn sprintln(args: &[Value]) -> String {
    let mut out = args.iter()
        .map(|arg| arg.to_display())
        .collect::<Vec<_>>()
        .join(" ");
    out.push('\n');
    out
}

pub(crate) fn sprintf(format: &str, args: &[Value]) -> String {
    let mut out = String::new();
    let mut chars = format.chars().peekable();
    let mut next_arg = 0;
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut directive = Directive::parse(&mut chars);
        if directive.width_from_arg {
            match args.get(next_arg).and_then(|arg| arg.as_i64()) {
                Some(width) => {
                    next_arg += 1;
                    if width < 0 {
                        directive.minus = true;
                    }
                    directive.width = Some(width.unsigned_abs() as usize);
                },
                None => {
                    out.push_str("%!(BADWIDTH)");
                    next_arg += 1;
                }
            }
        }
        let verb = match chars.next() {
            Some(verb) => verb,
            None => {
                out.push_str("%!(NOVERB)");
                break;
            }
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        match args.get(next_arg) {
            Some(arg) => {
                next_arg += 1;
                out.push_str(&directive.format(verb, arg));
            },
            None => out.push_str(&format!("%!{}(MISSING)", verb))
        }
    }
    if next_arg < args.len() {
        let extra = args[next_arg..].iter()
            .map(|arg| match arg {
                Value::Null => "<nil>".to_owned(),
                arg => format!("{}={}", arg.type_name(), arg.to_display())
            })
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("%!(EXTRA {})", extra));
    }
    out
}


/// Quotes like Go's `strconv.Quote`.
pub(crate) fn go_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{b}' => out.push_str("\\v"),
            c if c == ' ' || !(c.is_control() || c.is_whitespace()) => out.push(c),
            c if (c as u32) < 0x80 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c if (c as u32) < 0x10000 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\U{:08x}", c as u32)),
        }
    }
    out.push('"');
    out
}


#[derive(Debug, Default)]
struct Directive {
    minus: bool,
    plus: bool,
    sharp: bool,
    space: bool,
    zero: bool,
    width: Option<usize>,
    width_from_arg: bool,
    precision: Option<usize>
}

impl Directive {
    fn parse(chars: &mut Peekable<Chars>) -> Self {
        let mut directive = Directive::default();
        while let Some(c) = chars.peek() {
            match c {
                '-' => directive.minus = true,
                '+' => directive.plus = true,
                '#' => directive.sharp = true,
                ' ' => directive.space = true,
                '0' => directive.zero = true,
                _ => break
            }
            chars.next();
        }
        if chars.peek() == Some(&'*') {
            chars.next();
            directive.width_from_arg = true;
        } else {
            directive.width = number(chars);
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            directive.precision = Some(number(chars).unwrap_or(0));
        }
        directive
    }

    fn format(&self, verb: char, arg: &Value) -> String {
        match (verb, arg) {
            ('v', Value::String(s)) => self.pad(s.clone(), false),
            ('v', Value::Number(n)) => self.format_number_v(n),
            ('v', arg) => self.pad(arg.to_display(), false),
            ('T', Value::Null) => self.pad("<nil>".to_owned(), false),
            ('T', arg) => self.pad(arg.type_name().to_owned(), false),
            (verb, Value::Null) => format!("%!{}(<nil>)", verb),
            ('t', Value::Bool(b)) => self.pad(b.to_string(), false),
            ('s', Value::String(s)) => self.pad(self.truncate(s), false),
            ('q', Value::String(s)) => self.pad(go_quote(&self.truncate(s)), false),
            ('x', Value::String(s)) => self.pad(hex::encode(s.as_bytes()), false),
            ('X', Value::String(s)) => self.pad(hex::encode_upper(s.as_bytes()), false),
            (_, Value::Array(seq)) => {
                let items = seq.iter()
                    .map(|item| self.inner().format(verb, item))
                    .collect::<Vec<_>>()
                    .join(" ");
                self.pad(format!("[{}]", items), false)
            },
            ('s', Value::Object(_)) => self.pad(arg.to_display(), false),
            ('d' | 'b' | 'o' | 'x' | 'X' | 'c' | 'q' | 'U', Value::Number(n)) => {
                match n.as_i64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)) {
                    Some(i) => self.format_int(verb, i),
                    None => bad_verb(verb, arg)
                }
            },
            ('e' | 'E' | 'f' | 'F' | 'g' | 'G', Value::Number(n)) => {
                self.format_float(verb, n.as_f64().unwrap_or_default())
            },
            _ => bad_verb(verb, arg)
        }
    }

    // elements of a list are formatted without the outer width
    fn inner(&self) -> Directive {
        Directive {
            width: None,
            width_from_arg: false,
            ..*self
        }
    }

    fn truncate(&self, s: &str) -> String {
        match self.precision {
            Some(p) => s.chars().take(p).collect(),
            None => s.to_owned()
        }
    }

    fn format_number_v(&self, n: &Number) -> String {
        if let Some(i) = n.as_i64() {
            self.format_int('d', i)
        } else if n.is_f64() {
            self.format_float('g', n.as_f64().unwrap_or_default())
        } else {
            self.pad(format_number(n), true)
        }
    }

    fn format_int(&self, verb: char, i: i64) -> String {
        let magnitude = i.unsigned_abs();
        let mut digits = match verb {
            'd' => magnitude.to_string(),
            'b' => format!("{:b}", magnitude),
            'o' => format!("{:o}", magnitude),
            'x' => format!("{:x}", magnitude),
            'X' => format!("{:X}", magnitude),
            'c' => {
                let c = u32::try_from(i).ok().and_then(char::from_u32).unwrap_or('\u{fffd}');
                return self.pad(c.to_string(), false);
            },
            'q' => {
                let c = u32::try_from(i).ok().and_then(char::from_u32).unwrap_or('\u{fffd}');
                let inner = match c {
                    '\'' => "\\'".to_owned(),
                    '"' => "\"".to_owned(),
                    c => {
                        let quoted = go_quote(&c.to_string());
                        quoted[1..quoted.len() - 1].to_owned()
                    }
                };
                return self.pad(format!("'{}'", inner), false);
            },
            _ => return self.pad(format!("U+{:04X}", magnitude), false)
        };
        if let Some(precision) = self.precision {
            while digits.len() < precision {
                digits.insert(0, '0');
            }
        }
        if self.sharp {
            match verb {
                'x' => digits.insert_str(0, "0x"),
                'X' => digits.insert_str(0, "0X"),
                'o' => digits.insert(0, '0'),
                'b' => digits.insert_str(0, "0b"),
                _ => {}
            }
        }
        self.pad(self.signed(digits, i < 0), self.precision.is_none())
    }

    fn format_float(&self, verb: char, f: f64) -> String {
        if !f.is_finite() {
            let text = if f.is_nan() {
                "NaN"
            } else if f > 0.0 {
                "+Inf"
            } else {
                "-Inf"
            };
            return self.pad(text.to_owned(), false);
        }
        let magnitude = f.abs();
        let mut text = match verb {
            'f' | 'F' => format!("{:.*}", self.precision.unwrap_or(6), magnitude),
            'e' | 'E' => exponent_form(magnitude, self.precision.unwrap_or(6)),
            _ => match self.precision {
                None => format_float(magnitude),
                Some(p) => general_form(magnitude, p.max(1), self.sharp)
            }
        };
        if verb == 'E' || verb == 'G' {
            text = text.to_uppercase();
        }
        self.pad(self.signed(text, f.is_sign_negative() && f != 0.0), true)
    }

    fn signed(&self, digits: String, negative: bool) -> String {
        if negative {
            format!("-{}", digits)
        } else if self.plus {
            format!("+{}", digits)
        } else if self.space {
            format!(" {}", digits)
        } else {
            digits
        }
    }

    fn pad(&self, text: String, numeric: bool) -> String {
        let width = match self.width {
            Some(width) => width,
            None => return text
        };
        let len = text.chars().count();
        if len >= width {
            return text;
        }
        let fill = width - len;
        if self.minus {
            format!("{}{}", text, " ".repeat(fill))
        } else if self.zero && numeric {
            let sign_len = text.starts_with(['-', '+', ' ']) as usize;
            format!("{}{}{}", &text[..sign_len], "0".repeat(fill), &text[sign_len..])
        } else {
            format!("{}{}", " ".repeat(fill), text)
        }
    }
}

fn number(chars: &mut Peekable<Chars>) -> Option<usize> {
    let mut value = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        chars.next();
        value = Some(value.unwrap_or(0) * 10 + digit as usize);
    }
    value
}

fn bad_verb(verb: char, arg: &Value) -> String {
    format!("%!{}({}={})", verb, arg.type_name(), arg.to_display())
}

// Go prints at least two exponent digits
fn exponent_form(f: f64, precision: usize) -> String {
    let text = format!("{:.*e}", precision, f);
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent = exponent.parse::<i32>().unwrap_or_default();
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        },
        None => text
    }
}

fn general_form(f: f64, precision: usize, keep_zeros: bool) -> String {
    let exponent = if f == 0.0 {
        0
    } else {
        let text = format!("{:.*e}", precision - 1, f);
        text.split_once('e')
            .and_then(|(_, e)| e.parse::<i32>().ok())
            .unwrap_or_default()
    };
    let text = if exponent < -4 || exponent >= precision as i32 {
        exponent_form(f, precision - 1)
    } else {
        format!("{:.*}", (precision as i32 - 1 - exponent).max(0) as usize, f)
    };
    if keep_zeros {
        return text;
    }
    match text.split_once('e') {
        Some((mantissa, exponent)) => format!("{}e{}", strip_zeros(mantissa), exponent),
        None => strip_zeros(&text).to_owned()
    }
}

fn strip_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
