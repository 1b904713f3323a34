//! Functions every Go template has.
use std::cmp::Ordering;
use crate::error::FuncError;
use crate::funcs::{arity, at_least, string_arg, Library};
use crate::printf::{sprint, sprintf, sprintln};
use crate::value::{Value, ValueExt};


pub(crate) fn register(library: &mut Library) {
    // evaluated lazily by the pipeline; these bodies serve direct calls
    library.add("and", |args| {
        at_least("and", args, 1)?;
        Ok(args.iter().find(|arg| !arg.is_truthy()).unwrap_or(&args[args.len() - 1]).clone())
    });
    library.add("or", |args| {
        at_least("or", args, 1)?;
        Ok(args.iter().find(|arg| arg.is_truthy()).unwrap_or(&args[args.len() - 1]).clone())
    });
    library.add("not", |args| {
        arity("not", args, 1)?;
        Ok(Value::Bool(!args[0].is_truthy()))
    });
    library.add("len", |args| {
        arity("len", args, 1)?;
        length(&args[0]).map(Value::from)
    });
    library.add("index", |args| {
        at_least("index", args, 1)?;
        args[1..].iter().try_fold(args[0].clone(), |item, key| index(&item, key))
    });
    library.add("print", |args| Ok(Value::from(sprint(args))));
    library.add("println", |args| Ok(Value::from(sprintln(args))));
    library.add("printf", |args| {
        at_least("printf", args, 1)?;
        Ok(Value::from(sprintf(string_arg(&args[0])?, &args[1..])))
    });
    library.add("html", |args| Ok(Value::from(escape_html(&joined(args)))));
    library.add("js", |args| Ok(Value::from(escape_js(&joined(args)))));
    library.add("urlquery", |args| Ok(Value::from(escape_query(&joined(args)))));

    library.add("eq", |args| {
        at_least("eq", args, 2)?;
        for other in &args[1..] {
            if equal(&args[0], other)? {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    });
    library.add("ne", |args| {
        arity("ne", args, 2)?;
        Ok(Value::Bool(!equal(&args[0], &args[1])?))
    });
    library.add("lt", |args| ordered("lt", args, |o| o == Ordering::Less));
    library.add("le", |args| ordered("le", args, |o| o != Ordering::Greater));
    library.add("gt", |args| ordered("gt", args, |o| o == Ordering::Greater));
    library.add("ge", |args| ordered("ge", args, |o| o != Ordering::Less));
}


fn length(value: &Value) -> Result<usize, FuncError> {
    match value {
        Value::String(s) => Ok(s.len()),
        Value::Array(seq) => Ok(seq.len()),
        Value::Object(map) => Ok(map.len()),
        Value::Null => Err(FuncError::message("len of nil pointer")),
        other => Err(FuncError::message(format!("len of type {}", other.type_name())))
    }
}

fn index(item: &Value, key: &Value) -> Result<Value, FuncError> {
    match item {
        Value::Array(seq) => {
            let i = position(key, seq.len())?;
            Ok(seq[i].clone())
        },
        Value::String(s) => {
            let i = position(key, s.len())?;
            Ok(Value::from(s.as_bytes()[i]))
        },
        Value::Object(map) => match key {
            Value::String(key) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
            other => Err(FuncError::message(
                format!("value has type {}; should be string", other.type_name())
            ))
        },
        Value::Null => Err(FuncError::message("index of untyped nil")),
        other => Err(FuncError::message(
            format!("can't index item of type {}", other.type_name())
        ))
    }
}

fn position(key: &Value, len: usize) -> Result<usize, FuncError> {
    let i = match key {
        Value::Number(n) if n.is_i64() || n.is_u64() => n.as_i64().unwrap_or(i64::MAX),
        other => return Err(FuncError::message(
            format!("cannot index slice/array with type {}", other.type_name())
        ))
    };
    if i < 0 || i as usize >= len {
        return Err(FuncError::message(format!("index out of range: {}", i)));
    }
    Ok(i as usize)
}


/// Equality of basic values; numbers compare by value across int and float.
pub(crate) fn equal(a: &Value, b: &Value) -> Result<bool, FuncError> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => Ok(a.is_null() && b.is_null()),
        (Value::Array(_), _) | (Value::Object(_), _) => Err(FuncError::message(
            format!("non-comparable type {}", a.type_name())
        )),
        (_, Value::Array(_)) | (_, Value::Object(_)) => Err(FuncError::message(
            format!("non-comparable type {}", b.type_name())
        )),
        (Value::Number(_), Value::Number(_)) => Ok(compare_numbers(a, b) == Some(Ordering::Equal)),
        (Value::String(x), Value::String(y)) => Ok(x == y),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        _ => Err(FuncError::message("incompatible types for comparison"))
    }
}

fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?)
    }
}

fn ordered(
    name: &'static str, args: &[Value], accept: fn(Ordering) -> bool
) -> Result<Value, FuncError> {
    arity(name, args, 2)?;
    let ordering = match (&args[0], &args[1]) {
        (Value::Number(_), Value::Number(_)) => compare_numbers(&args[0], &args[1]),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            return Err(FuncError::message("incompatible types for comparison"));
        },
        _ => return Err(FuncError::message("invalid type for comparison"))
    };
    Ok(Value::Bool(ordering.is_some_and(accept)))
}


// a single string argument is used as is, anything else is printed
fn joined(args: &[Value]) -> String {
    match args {
        [Value::String(s)] => s.clone(),
        args => sprint(args)
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&#34;"),
            '\0' => out.push('\u{fffd}'),
            c => out.push(c)
        }
    }
    out
}

fn escape_js(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '&' => out.push_str("\\u0026"),
            '=' => out.push_str("\\u003D"),
            c if (c as u32) < 0x20 || c.is_control() => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            },
            c => out.push(c)
        }
    }
    out
}

fn escape_query(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes())
        .collect::<String>()
        .replace('*', "%2A")
        .replace("%7E", "~")
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
    fn lengths() {
        assert_eq!(call("len", vec![json!("héllo")]).unwrap(), json!(6));
        assert_eq!(call("len", vec![json!([1, 2, 3])]).unwrap(), json!(3));
        assert_eq!(call("len", vec![json!({"a": 1})]).unwrap(), json!(1));
        assert_eq!(call("len", vec![json!(3)]).unwrap_err().to_string(), "len of type int");
    }

    #[test]
    fn indexing() {
        let data = json!({"a": [10, {"b": "x"}]});
        assert_eq!(call("index", vec![data.clone(), json!("a"), json!(1), json!("b")]).unwrap(), json!("x"));
        assert_eq!(call("index", vec![data.clone(), json!("missing")]).unwrap(), json!(null));
        assert_eq!(
            call("index", vec![data, json!("a"), json!(5)]).unwrap_err().to_string(),
            "index out of range: 5"
        );
        assert_eq!(call("index", vec![json!("abc"), json!(1)]).unwrap(), json!(98));
    }

    #[test]
    fn comparisons() {
        assert_eq!(call("eq", vec![json!(1), json!(2), json!(1.0)]).unwrap(), json!(true));
        assert_eq!(call("eq", vec![json!("a"), json!("b")]).unwrap(), json!(false));
        assert_eq!(call("eq", vec![json!(null), json!("b")]).unwrap(), json!(false));
        assert_eq!(call("ne", vec![json!(true), json!(false)]).unwrap(), json!(true));
        assert_eq!(call("lt", vec![json!(1), json!(1.5)]).unwrap(), json!(true));
        assert_eq!(call("ge", vec![json!("b"), json!("a")]).unwrap(), json!(true));
        assert!(call("eq", vec![json!("1"), json!(1)]).is_err());
        assert!(call("eq", vec![json!([1]), json!([1])]).is_err());
        assert!(call("lt", vec![json!(true), json!(false)]).is_err());
    }

    #[test]
    fn logic_without_short_circuit() {
        assert_eq!(call("and", vec![json!(1), json!(""), json!(2)]).unwrap(), json!(""));
        assert_eq!(call("or", vec![json!(0), json!(""), json!("x")]).unwrap(), json!("x"));
        assert_eq!(call("or", vec![json!(0), json!("")]).unwrap(), json!(""));
        assert_eq!(call("not", vec![json!([])]).unwrap(), json!(true));
    }

    #[test]
    fn escaping() {
        assert_eq!(
            call("html", vec![json!("<a href=\"x\">'&'</a>")]).unwrap(),
            json!("&lt;a href=&#34;x&#34;&gt;&#39;&amp;&#39;&lt;/a&gt;")
        );
        assert_eq!(call("js", vec![json!("it's <b>\n")]).unwrap(), json!("it\\'s \\u003Cb\\u003E\\u000A"));
        assert_eq!(call("urlquery", vec![json!("a b&c=d~*")]).unwrap(), json!("a+b%26c%3Dd~%2A"));
        assert_eq!(call("html", vec![json!(1), json!(2)]).unwrap(), json!("1 2"));
    }

    #[test]
    fn printing() {
        assert_eq!(call("print", vec![json!("a"), json!(1)]).unwrap(), json!("a1"));
        assert_eq!(call("println", vec![json!("a"), json!(1)]).unwrap(), json!("a 1\n"));
        assert_eq!(call("printf", vec![json!("%03d"), json!(7)]).unwrap(), json!("007"));
        assert!(call("printf", vec![json!(7)]).is_err());
    }
}
