//! Format converters that report failures in their result instead of
//! aborting the render.
use crate::funcs::{arity, string_arg, Library};
use crate::value::{yaml_mapping, yaml_sequence, Mapping, Value};


pub(crate) fn register(library: &mut Library) {
    library.add("toYaml", |args| {
        arity("toYaml", args, 1)?;
        Ok(Value::from(to_yaml(&args[0])))
    });
    library.add("fromYaml", |args| {
        arity("fromYaml", args, 1)?;
        let map = yaml_mapping(string_arg(&args[0])?).unwrap_or_else(|err| {
            let mut map = Mapping::new();
            map.insert("Error".to_owned(), Value::from(err));
            map
        });
        Ok(Value::Object(map))
    });
    library.add("fromYamlArray", |args| {
        arity("fromYamlArray", args, 1)?;
        let seq = yaml_sequence(string_arg(&args[0])?).unwrap_or_else(|err| vec![Value::from(err)]);
        Ok(Value::Array(seq))
    });
    library.add("fromJsonArray", |args| {
        arity("fromJsonArray", args, 1)?;
        let seq = serde_json::from_str::<Vec<Value>>(string_arg(&args[0])?)
            .unwrap_or_else(|err| vec![Value::from(err.to_string())]);
        Ok(Value::Array(seq))
    });
    library.add("toToml", |args| {
        arity("toToml", args, 1)?;
        Ok(Value::from(to_toml(&args[0])))
    });
}


fn to_toml(value: &Value) -> String {
    match toml::to_string(&without_nulls(value)) {
        Ok(text) => indent_tables(&text),
        Err(err) => err.to_string()
    }
}

// TOML has no null; null entries of a mapping are left out
fn without_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, item)| !item.is_null())
                .map(|(key, item)| (key.clone(), without_nulls(item)))
                .collect::<Mapping>()
        ),
        Value::Array(seq) => Value::Array(seq.iter().map(without_nulls).collect()),
        other => other.clone()
    }
}

/// Indents the body of each table two spaces per nesting level, and each
/// nested table header one level less than its body.
fn indent_tables(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0;
    let mut in_multiline = false;
    for line in text.lines() {
        if !in_multiline && !line.is_empty() {
            match header(line) {
                Some(name) => {
                    depth = dotted_len(name);
                    out.push_str(&"  ".repeat(depth.saturating_sub(1)));
                },
                None => out.push_str(&"  ".repeat(depth))
            }
        }
        out.push_str(line);
        out.push('\n');
        if line.matches("\"\"\"").count() % 2 == 1 || line.matches("'''").count() % 2 == 1 {
            in_multiline = !in_multiline;
        }
    }
    out
}

fn header(line: &str) -> Option<&str> {
    line.strip_prefix("[[")
        .and_then(|rest| rest.strip_suffix("]]"))
        .or_else(|| line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')))
}

// number of dot separated keys, ignoring dots inside quoted keys
fn dotted_len(name: &str) -> usize {
    let mut quote = None;
    let mut count = 1;
    for c in name.chars() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), c) if c == open => quote = None,
            (None, '.') => count += 1,
            _ => {}
        }
    }
    count
}


fn to_yaml(value: &Value) -> String {
    match serde_yaml::to_string(value) {
        Ok(text) => text.strip_suffix('\n').unwrap_or(&text).to_owned(),
        Err(_) => String::new()
    }
}
