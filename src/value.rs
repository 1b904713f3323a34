//! The canonical value tree every data format converges to.
//!
//! `serde_json::Value` already is the tagged variant the engine needs;
//! [`ValueExt`] adds the Go flavoured views of it (truthiness, type names,
//! `%v` printing) used by the evaluator and the function library.
use serde_json::Number;
pub use serde_json::Value;
pub use serde_yaml::Value as YamlValue;

pub type Mapping = serde_json::Map<String, Value>;


pub trait ValueExt {
    /// Go template truth: false, 0, null and empty string, sequence or
    /// mapping are false.
    fn is_truthy(&self) -> bool;

    /// Sprig's notion of an empty value; the complement of truthiness.
    fn is_empty_value(&self) -> bool {
        !self.is_truthy()
    }

    /// Go type name used in diagnostics.
    fn type_name(&self) -> &'static str;

    /// Go `%v` rendering.
    fn to_display(&self) -> String;
}

impl ValueExt for Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(seq) => !seq.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "nil",
            Value::Bool(_) => "bool",
            Value::Number(n) if n.is_f64() => "float64",
            Value::Number(_) => "int",
            Value::String(_) => "string",
            Value::Array(_) => "[]interface {}",
            Value::Object(_) => "map[string]interface {}",
        }
    }

    fn to_display(&self) -> String {
        let mut out = String::new();
        write_display(self, &mut out);
        out
    }
}

fn write_display(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("<nil>"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&format_number(n)),
        Value::String(s) => out.push_str(s),
        Value::Array(seq) => {
            out.push('[');
            for (i, item) in seq.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_display(item, out);
            }
            out.push(']');
        },
        Value::Object(map) => {
            out.push_str("map[");
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(key);
                out.push(':');
                write_display(item, out);
            }
            out.push(']');
        }
    }
}


pub(crate) fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        format_float(n.as_f64().unwrap_or_default())
    }
}

/// Shortest representation switching to exponent form like Go's `%v`.
pub(crate) fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_owned();
    }
    if f.is_infinite() {
        return if f > 0.0 { "+Inf" } else { "-Inf" }.to_owned();
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0" } else { "0" }.to_owned();
    }
    let scientific = format!("{:e}", f);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or_default()),
        None => return f.to_string(),
    };
    if exponent < -4 || exponent >= 6 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        f.to_string()
    }
}


/// Builds a number value, keeping integral results integral.
pub(crate) fn number(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}


pub(crate) fn from_yaml(value: YamlValue) -> Value {
    match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                match n.as_f64().and_then(Number::from_f64) {
                    Some(f) => Value::Number(f),
                    None => Value::String(n.to_string()),
                }
            }
        },
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(seq) => Value::Array(
            seq.into_iter().map(from_yaml).collect::<Vec<_>>()
        ),
        YamlValue::Mapping(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (yaml_key(key), from_yaml(value)))
                .collect::<Mapping>()
        ),
        YamlValue::Tagged(tagged) => from_yaml(tagged.value),
    }
}

fn yaml_key(key: YamlValue) -> String {
    match key {
        YamlValue::String(s) => s,
        YamlValue::Null => "null".to_owned(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        other => from_yaml(other).to_display(),
    }
}

fn yaml_kind(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "boolean",
        YamlValue::Number(_) => "number",
        YamlValue::String(_) => "string",
        YamlValue::Sequence(_) => "sequence",
        YamlValue::Mapping(_) => "mapping",
        YamlValue::Tagged(tagged) => yaml_kind(&tagged.value),
    }
}

/// Parses YAML that must hold a mapping; a document without content is an
/// empty mapping.
pub(crate) fn yaml_mapping(text: &str) -> Result<Mapping, String> {
    let yaml = serde_yaml::from_str::<YamlValue>(text).map_err(|err| err.to_string())?;
    match from_yaml(yaml.clone()) {
        Value::Null => Ok(Mapping::new()),
        Value::Object(map) => Ok(map),
        _ => Err(format!("cannot unmarshal {} into a mapping", yaml_kind(&yaml))),
    }
}

/// Parses YAML that must hold a sequence; a document without content is an
/// empty sequence.
pub(crate) fn yaml_sequence(text: &str) -> Result<Vec<Value>, String> {
    let yaml = serde_yaml::from_str::<YamlValue>(text).map_err(|err| err.to_string())?;
    match from_yaml(yaml.clone()) {
        Value::Null => Ok(Vec::new()),
        Value::Array(seq) => Ok(seq),
        _ => Err(format!("cannot unmarshal {} into a sequence", yaml_kind(&yaml))),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness() {
        assert!(!json!(null).is_truthy());
        assert!(!json!(0).is_truthy());
        assert!(!json!(0.0).is_truthy());
        assert!(!json!("").is_truthy());
        assert!(!json!([]).is_truthy());
        assert!(!json!({}).is_truthy());
        assert!(json!(" ").is_truthy());
        assert!(json!([0]).is_truthy());
        assert!(json!(-1).is_truthy());
    }

    #[test]
    fn display_like_go() {
        let value = json!(["one", 2, {"name": "helm"}, null, true]);
        assert_eq!(value.to_display(), "[one 2 map[name:helm] <nil> true]");
        let value = json!({"b": {"c": 1}, "a": []});
        assert_eq!(value.to_display(), "map[a:[] b:map[c:1]]");
    }

    #[test]
    fn float_formatting() {
        assert_eq!(format_float(2.0), "2");
        assert_eq!(format_float(1.5), "1.5");
        assert_eq!(format_float(123456.0), "123456");
        assert_eq!(format_float(1234567.0), "1.234567e+06");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(0.00001), "1e-05");
        assert_eq!(format_float(-2.5e21), "-2.5e+21");
    }

    #[test]
    fn yaml_keys_become_strings() {
        let map = yaml_mapping("1: one\ntrue: yes\nname: !tag value\n").unwrap();
        assert_eq!(map.get("1"), Some(&json!("one")));
        assert_eq!(map.get("true"), Some(&json!("yes")));
        assert_eq!(map.get("name"), Some(&json!("value")));
    }

    #[test]
    fn yaml_without_content_is_empty_mapping() {
        assert_eq!(yaml_mapping("# nothing here").unwrap(), Mapping::new());
        assert_eq!(yaml_sequence("").unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn yaml_shape_is_checked() {
        assert!(yaml_mapping("- a\n- b\n").is_err());
        assert!(yaml_sequence("hello: world").is_err());
    }
}
