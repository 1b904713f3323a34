//! The function library every template is compiled against.
//!
//! A [`Library`] maps function names to callables taking the evaluated
//! arguments of a command. It holds the Go built-ins, a sprig style utility
//! pack, datetime normalization and the lenient format converters. The host
//! environment is never reachable from it: `env` and `expandenv` are absent.
use std::collections::HashMap;
use std::fmt;
use log::{debug, warn};
use once_cell::sync::Lazy;
use crate::config::Config;
use crate::error::{ConfigError, FuncError};
use crate::value::{Value, ValueExt};

mod builtin;
mod collections;
mod convert;
pub(crate) mod datetime;
mod encoding;
mod math;
mod strings;

use self::datetime::Zone;


pub type Func = Box<dyn Fn(&[Value]) -> Result<Value, FuncError> + Send + Sync>;


pub struct Library {
    funcs: HashMap<&'static str, Func>
}

static GLOBAL: Lazy<Library> = Lazy::new(|| {
    let config = Config::from_env();
    let zone = config.default_zone().unwrap_or_else(|err| {
        warn!("{}; falling back to the default timezone", err);
        Config::default().default_zone().unwrap_or(Zone::UTC)
    });
    Library::build(zone)
});

impl Library {
    /// Builds a library whose datetime functions default to the configured
    /// timezone.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Library::build(config.default_zone()?))
    }

    /// The process-wide library, configured from the environment on first use.
    pub fn global() -> &'static Library {
        &GLOBAL
    }

    fn build(zone: Zone) -> Self {
        let mut library = Library { funcs: HashMap::new() };
        builtin::register(&mut library);
        strings::register(&mut library);
        collections::register(&mut library);
        math::register(&mut library);
        encoding::register(&mut library);
        convert::register(&mut library);
        datetime::register(&mut library, zone);
        debug!("function library built with {} functions", library.funcs.len());
        library
    }

    /// Adds or replaces a function.
    pub fn with_function<F>(mut self, name: &'static str, function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, FuncError> + Send + Sync + 'static
    {
        self.add(name, function);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Func> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Function names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = self.funcs.keys().copied().collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    pub(crate) fn add<F>(&mut self, name: &'static str, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, FuncError> + Send + Sync + 'static
    {
        self.funcs.insert(name, Box::new(function));
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("functions", &self.funcs.len())
            .finish()
    }
}


pub(crate) fn arity(name: &'static str, args: &[Value], want: usize) -> Result<(), FuncError> {
    if args.len() == want {
        Ok(())
    } else {
        Err(FuncError::Arity { name, want: want.to_string(), got: args.len() })
    }
}

pub(crate) fn arity_range(
    name: &'static str, args: &[Value], min: usize, max: usize
) -> Result<(), FuncError> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(FuncError::Arity { name, want: format!("{} to {}", min, max), got: args.len() })
    }
}

pub(crate) fn at_least(name: &'static str, args: &[Value], min: usize) -> Result<(), FuncError> {
    if args.len() >= min {
        Ok(())
    } else {
        Err(FuncError::Arity { name, want: format!("at least {}", min), got: args.len() })
    }
}


/// A `string` parameter; other types are rejected the way Go rejects them.
pub(crate) fn string_arg(value: &Value) -> Result<&str, FuncError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(FuncError::Type { expected: "string", got: other.type_name() })
    }
}

/// An `int` parameter; floats are accepted when they hold an integer.
pub(crate) fn int_arg(value: &Value) -> Result<i64, FuncError> {
    match value {
        Value::Number(n) => n.as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or(FuncError::Type { expected: "int", got: value.type_name() }),
        other => Err(FuncError::Type { expected: "int", got: other.type_name() })
    }
}

pub(crate) fn bool_arg(value: &Value) -> Result<bool, FuncError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(FuncError::Type { expected: "bool", got: other.type_name() })
    }
}

pub(crate) fn list_arg<'v>(name: &str, value: &'v Value) -> Result<&'v [Value], FuncError> {
    match value {
        Value::Array(seq) => Ok(seq),
        Value::Null => Ok(&[]),
        other => Err(FuncError::message(
            format!("cannot {} on type {}", name, other.type_name())
        ))
    }
}

pub(crate) fn map_arg(value: &Value) -> Result<&crate::value::Mapping, FuncError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(FuncError::Type { expected: "map[string]interface {}", got: other.type_name() })
    }
}


/// Sprig's string conversion: strings as is, everything else as `%v`.
pub(crate) fn to_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_display()
    }
}

/// Lenient 64-bit integer conversion; anything unparseable becomes 0.
pub(crate) fn to_i64(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64()
            .or_else(|| n.as_u64().map(|u| u as i64))
            .unwrap_or_else(|| n.as_f64().unwrap_or_default() as i64),
        Value::String(s) => parse_int(s.trim()).unwrap_or(0),
        Value::Bool(b) => i64::from(*b),
        _ => 0
    }
}

/// Lenient float conversion; anything unparseable becomes 0.
pub(crate) fn to_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(b) => if *b { 1.0 } else { 0.0 },
        _ => 0.0
    }
}

// base prefixes as accepted by Go's ParseInt with base 0, plus ".0" tails
fn parse_int(text: &str) -> Option<i64> {
    let text = text.strip_suffix(".0").unwrap_or(text);
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let digits = digits.replace('_', "");
    let lower = digits.to_ascii_lowercase();
    let parsed = if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(octal) = lower.strip_prefix("0o") {
        i64::from_str_radix(octal, 8).ok()?
    } else if let Some(binary) = lower.strip_prefix("0b") {
        i64::from_str_radix(binary, 2).ok()?
    } else if lower.len() > 1 && lower.starts_with('0') {
        i64::from_str_radix(&lower[1..], 8).ok()?
    } else {
        lower.parse::<i64>().ok()?
    };
    Some(if negative { -parsed } else { parsed })
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn environment_is_not_reachable() {
        let library = Library::new(&Config::default()).unwrap();
        assert!(!library.contains("env"));
        assert!(!library.contains("expandenv"));
        assert!(library.contains("toUTCDateTime"));
        assert!(library.contains("fromYamlArray"));
    }

    #[test]
    fn custom_functions() {
        let library = Library::new(&Config::default()).unwrap()
            .with_function("shout", |args| {
                arity("shout", args, 1)?;
                Ok(Value::from(format!("{}!", string_arg(&args[0])?)))
            });
        let shout = library.get("shout").unwrap();
        assert_eq!(shout(&[json!("hey")]).unwrap(), json!("hey!"));
        assert!(shout(&[]).is_err());
    }

    #[test]
    fn lenient_conversions() {
        assert_eq!(to_i64(&json!("42")), 42);
        assert_eq!(to_i64(&json!("0x1f")), 31);
        assert_eq!(to_i64(&json!("nope")), 0);
        assert_eq!(to_i64(&json!(3.9)), 3);
        assert_eq!(to_i64(&json!(true)), 1);
        assert_eq!(to_f64(&json!("2.5")), 2.5);
        assert_eq!(to_f64(&json!(null)), 0.0);
    }

    #[test]
    fn strict_parameters() {
        assert_eq!(
            string_arg(&json!(3)).unwrap_err().to_string(),
            "wrong type for value; expected string; got int"
        );
        assert_eq!(int_arg(&json!(4.0)).unwrap(), 4);
        assert!(int_arg(&json!(4.5)).is_err());
        assert!(bool_arg(&json!("true")).is_err());
    }

    #[test]
    fn names_are_sorted() {
        let library = Library::new(&Config::default()).unwrap();
        let names = library.names();
        assert!(names.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
