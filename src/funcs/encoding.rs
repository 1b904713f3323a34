//! JSON, base64, hashing and random string functions.
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use sha2::{Digest, Sha256};
use crate::error::FuncError;
use crate::funcs::{arity, int_arg, string_arg, to_str, Library};
use crate::value::Value;

const ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMERIC: &[u8] = b"0123456789";
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";


pub(crate) fn register(library: &mut Library) {
    library.add("toJson", |args| {
        arity("toJson", args, 1)?;
        Ok(Value::from(escape_json_html(&to_json(&args[0], false))))
    });
    library.add("toRawJson", |args| {
        arity("toRawJson", args, 1)?;
        Ok(Value::from(to_json(&args[0], false)))
    });
    library.add("toPrettyJson", |args| {
        arity("toPrettyJson", args, 1)?;
        Ok(Value::from(escape_json_html(&to_json(&args[0], true))))
    });
    library.add("fromJson", |args| {
        arity("fromJson", args, 1)?;
        Ok(serde_json::from_str::<Value>(string_arg(&args[0])?).unwrap_or(Value::Null))
    });

    library.add("b64enc", |args| {
        arity("b64enc", args, 1)?;
        Ok(Value::from(STANDARD.encode(to_str(&args[0]))))
    });
    library.add("b64dec", |args| {
        arity("b64dec", args, 1)?;
        Ok(Value::from(match STANDARD.decode(to_str(&args[0])) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => err.to_string()
        }))
    });
    library.add("sha256sum", |args| {
        arity("sha256sum", args, 1)?;
        Ok(Value::from(hex::encode(Sha256::digest(string_arg(&args[0])?.as_bytes()))))
    });
    library.add("uuidv4", |args| {
        arity("uuidv4", args, 0)?;
        Ok(Value::from(uuid::Uuid::new_v4().to_string()))
    });

    library.add("randAlpha", |args| random_string("randAlpha", args, ALPHA));
    library.add("randNumeric", |args| random_string("randNumeric", args, NUMERIC));
    library.add("randAlphaNum", |args| random_string("randAlphaNum", args, ALPHANUMERIC));
}


// integral floats print without a fraction, as Go's encoder does
fn go_numbers(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => Value::from(f as i64),
            _ => value.clone()
        },
        Value::Array(seq) => Value::Array(seq.iter().map(go_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.iter().map(|(key, item)| (key.clone(), go_numbers(item))).collect()
        ),
        other => other.clone()
    }
}

fn to_json(value: &Value, pretty: bool) -> String {
    let value = go_numbers(value);
    let encoded = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    encoded.unwrap_or_default()
}

fn escape_json_html(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

fn random_string(name: &'static str, args: &[Value], charset: &[u8]) -> Result<Value, FuncError> {
    arity(name, args, 1)?;
    let count = int_arg(&args[0])?.max(0) as usize;
    let mut rng = rand::rng();
    let text = (0..count)
        .map(|_| char::from(charset[rng.random_range(0..charset.len())]))
        .collect::<String>();
    Ok(Value::from(text))
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::config::Config;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, FuncError> {
        let library = Library::new(&Config::default()).unwrap();
        library.get(name).unwrap()(&args[..])
    }

    #[test]
    fn json_encoding() {
        let data = json!({"b": [1, 2.0], "a": "<x&y>"});
        assert_eq!(
            call("toJson", vec![data.clone()]).unwrap(),
            json!(r#"{"a":"\u003cx\u0026y\u003e","b":[1,2]}"#)
        );
        assert_eq!(call("toRawJson", vec![data]).unwrap(), json!(r#"{"a":"<x&y>","b":[1,2]}"#));
        assert_eq!(
            call("toPrettyJson", vec![json!({"a": [1]})]).unwrap(),
            json!("{\n  \"a\": [\n    1\n  ]\n}")
        );
    }

    #[test]
    fn json_decoding() {
        assert_eq!(call("fromJson", vec![json!(r#"{"a": [1, "b"]}"#)]).unwrap(), json!({"a": [1, "b"]}));
        assert_eq!(call("fromJson", vec![json!("{oops")]).unwrap(), json!(null));
    }

    #[test]
    fn base64() {
        assert_eq!(call("b64enc", vec![json!("hello")]).unwrap(), json!("aGVsbG8="));
        assert_eq!(call("b64dec", vec![json!("aGVsbG8=")]).unwrap(), json!("hello"));
        assert_ne!(call("b64dec", vec![json!("!!")]).unwrap(), json!(""));
    }

    #[test]
    fn hashing() {
        assert_eq!(
            call("sha256sum", vec![json!("abc")]).unwrap(),
            json!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn random_values() {
        let id = call("uuidv4", vec![]).unwrap();
        assert_eq!(id.as_str().map(str::len), Some(36));
        let text = call("randNumeric", vec![json!(12)]).unwrap();
        let text = text.as_str().unwrap();
        assert_eq!(text.len(), 12);
        assert!(text.chars().all(|c| c.is_ascii_digit()));
        let text = call("randAlpha", vec![json!(5)]).unwrap();
        assert!(text.as_str().unwrap().chars().all(|c| c.is_ascii_alphabetic()));
        assert_eq!(call("randAlphaNum", vec![json!(0)]).unwrap(), json!(""));
    }
}
