//! Sprig's list, dict, default and type functions.
//!
//! `set`, `unset`, `merge` and `mergeOverwrite` return the updated mapping;
//! the executor writes it back when their first argument is a variable or
//! a field, so the usual `{{ $_ := set $d "k" v }}` works.
use crate::error::FuncError;
use crate::funcs::{arity, arity_range, at_least, bool_arg, int_arg, list_arg, map_arg, string_arg, to_i64, to_str, Library};
use crate::value::{Mapping, Value, ValueExt};


pub(crate) fn register(library: &mut Library) {
    register_defaults(library);
    register_lists(library);
    register_dicts(library);
    register_types(library);
}


fn register_defaults(library: &mut Library) {
    library.add("default", |args| {
        at_least("default", args, 1)?;
        match args.get(1) {
            Some(given) if !given.is_empty_value() => Ok(given.clone()),
            _ => Ok(args[0].clone())
        }
    });
    library.add("empty", |args| {
        arity("empty", args, 1)?;
        Ok(Value::Bool(args[0].is_empty_value()))
    });
    library.add("coalesce", |args| {
        Ok(args.iter().find(|arg| !arg.is_empty_value()).cloned().unwrap_or(Value::Null))
    });
    library.add("all", |args| Ok(Value::Bool(args.iter().all(|arg| !arg.is_empty_value()))));
    library.add("any", |args| Ok(Value::Bool(args.iter().any(|arg| !arg.is_empty_value()))));
    library.add("ternary", |args| {
        arity("ternary", args, 3)?;
        let condition = bool_arg(&args[2])?;
        Ok(args[if condition { 0 } else { 1 }].clone())
    });
    library.add("fail", |args| {
        arity("fail", args, 1)?;
        Err(FuncError::message(string_arg(&args[0])?))
    });
}


fn register_lists(library: &mut Library) {
    library.add("list", |args| Ok(Value::Array(args.to_vec())));
    library.add("tuple", |args| Ok(Value::Array(args.to_vec())));
    library.add("first", |args| {
        arity("first", args, 1)?;
        Ok(list_arg("find first", &args[0])?.first().cloned().unwrap_or(Value::Null))
    });
    library.add("last", |args| {
        arity("last", args, 1)?;
        Ok(list_arg("find last", &args[0])?.last().cloned().unwrap_or(Value::Null))
    });
    library.add("rest", |args| {
        arity("rest", args, 1)?;
        match list_arg("find rest", &args[0])? {
            [] => Ok(Value::Null),
            [_, rest @ ..] => Ok(Value::Array(rest.to_vec()))
        }
    });
    library.add("initial", |args| {
        arity("initial", args, 1)?;
        match list_arg("find initial", &args[0])? {
            [] => Ok(Value::Null),
            [initial @ .., _] => Ok(Value::Array(initial.to_vec()))
        }
    });
    library.add("append", |args| append("append", args));
    library.add("push", |args| append("push", args));
    library.add("prepend", |args| {
        arity("prepend", args, 2)?;
        let mut list = vec![args[1].clone()];
        list.extend_from_slice(list_arg("prepend", &args[0])?);
        Ok(Value::Array(list))
    });
    library.add("concat", |args| {
        let mut list = Vec::new();
        for arg in args {
            list.extend_from_slice(list_arg("concat", arg)?);
        }
        Ok(Value::Array(list))
    });
    library.add("reverse", |args| {
        arity("reverse", args, 1)?;
        Ok(Value::Array(list_arg("find reverse", &args[0])?.iter().rev().cloned().collect()))
    });
    library.add("uniq", |args| {
        arity("uniq", args, 1)?;
        let mut unique = Vec::<Value>::new();
        for item in list_arg("find uniq", &args[0])? {
            if !unique.contains(item) {
                unique.push(item.clone());
            }
        }
        Ok(Value::Array(unique))
    });
    library.add("without", |args| {
        at_least("without", args, 1)?;
        let omit = &args[1..];
        let kept = list_arg("find without", &args[0])?.iter()
            .filter(|item| !omit.contains(item))
            .cloned()
            .collect();
        Ok(Value::Array(kept))
    });
    library.add("has", |args| {
        arity("has", args, 2)?;
        match &args[1] {
            Value::Null => Ok(Value::Bool(false)),
            haystack => Ok(Value::Bool(list_arg("find has", haystack)?.contains(&args[0])))
        }
    });
    library.add("compact", |args| {
        arity("compact", args, 1)?;
        let kept = list_arg("compact", &args[0])?.iter()
            .filter(|item| !item.is_empty_value())
            .cloned()
            .collect();
        Ok(Value::Array(kept))
    });
    library.add("slice", |args| {
        arity_range("slice", args, 1, 3)?;
        slice(&args[0], &args[1..])
    });
    library.add("chunk", |args| {
        arity("chunk", args, 2)?;
        let size = int_arg(&args[0])?;
        if size < 1 {
            return Err(FuncError::message(format!("invalid chunk size {}", size)));
        }
        let chunks = list_arg("chunk", &args[1])?
            .chunks(size as usize)
            .map(|chunk| Value::Array(chunk.to_vec()))
            .collect();
        Ok(Value::Array(chunks))
    });
    library.add("until", |args| {
        arity("until", args, 1)?;
        let count = int_arg(&args[0])?;
        let step = if count < 0 { -1 } else { 1 };
        Ok(Value::from(until_step(0, count, step)))
    });
    library.add("untilStep", |args| {
        arity("untilStep", args, 3)?;
        let (start, stop, step) = (int_arg(&args[0])?, int_arg(&args[1])?, int_arg(&args[2])?);
        Ok(Value::from(until_step(start, stop, step)))
    });
    library.add("seq", |args| {
        let params = args.iter().map(int_arg).collect::<Result<Vec<_>, _>>()?;
        Ok(Value::from(seq(&params)))
    });
}

fn append(name: &'static str, args: &[Value]) -> Result<Value, FuncError> {
    arity(name, args, 2)?;
    let mut list = list_arg(name, &args[0])?.to_vec();
    list.push(args[1].clone());
    Ok(Value::Array(list))
}

fn slice(item: &Value, indices: &[Value]) -> Result<Value, FuncError> {
    let len = match item {
        Value::Array(seq) => seq.len(),
        Value::String(s) => s.len(),
        other => return Err(FuncError::message(
            format!("can't slice item of type {}", other.type_name())
        ))
    };
    let bounds = indices.iter().map(to_i64).collect::<Vec<_>>();
    let (from, to) = match bounds.as_slice() {
        [] => (0, len as i64),
        [from] => (*from, len as i64),
        [from, to, ..] => (*from, *to)
    };
    if from < 0 || to < from || to > len as i64 {
        return Err(FuncError::message(
            format!("slice bounds out of range [{}:{}] with length {}", from, to, len)
        ));
    }
    let (from, to) = (from as usize, to as usize);
    match item {
        Value::Array(seq) => Ok(Value::Array(seq[from..to].to_vec())),
        Value::String(s) => s.get(from..to)
            .map(Value::from)
            .ok_or_else(|| FuncError::message("slice splits a character")),
        _ => Ok(Value::Null)
    }
}

fn until_step(start: i64, stop: i64, step: i64) -> Vec<i64> {
    let mut values = Vec::new();
    if stop < start {
        if step >= 0 {
            return values;
        }
        let mut i = start;
        while i > stop {
            values.push(i);
            i += step;
        }
        return values;
    }
    if step <= 0 {
        return values;
    }
    let mut i = start;
    while i < stop {
        values.push(i);
        i += step;
    }
    values
}

fn seq(params: &[i64]) -> String {
    let (start, step, end) = match params {
        [end] => (1, None, *end),
        [start, end] => (*start, None, *end),
        [start, step, end] => (*start, Some(*step), *end),
        _ => return String::new()
    };
    let increment = if end < start { -1 } else { 1 };
    if let Some(step) = step {
        if increment < 0 && step > 0 {
            return String::new();
        }
    }
    until_step(start, end + increment, step.unwrap_or(increment))
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}


fn register_dicts(library: &mut Library) {
    library.add("dict", |args| {
        let mut map = Mapping::new();
        for pair in args.chunks(2) {
            let value = pair.get(1).cloned().unwrap_or_else(|| Value::from(""));
            map.insert(to_str(&pair[0]), value);
        }
        Ok(Value::Object(map))
    });
    library.add("get", |args| {
        arity("get", args, 2)?;
        let map = map_arg(&args[0])?;
        Ok(map.get(string_arg(&args[1])?).cloned().unwrap_or_else(|| Value::from("")))
    });
    library.add("set", |args| {
        arity("set", args, 3)?;
        let mut map = map_arg(&args[0])?.clone();
        map.insert(string_arg(&args[1])?.to_owned(), args[2].clone());
        Ok(Value::Object(map))
    });
    library.add("unset", |args| {
        arity("unset", args, 2)?;
        let mut map = map_arg(&args[0])?.clone();
        map.remove(string_arg(&args[1])?);
        Ok(Value::Object(map))
    });
    library.add("hasKey", |args| {
        arity("hasKey", args, 2)?;
        Ok(Value::Bool(map_arg(&args[0])?.contains_key(string_arg(&args[1])?)))
    });
    library.add("keys", |args| {
        let mut keys = Vec::new();
        for arg in args {
            keys.extend(map_arg(arg)?.keys().cloned().map(Value::String));
        }
        Ok(Value::Array(keys))
    });
    library.add("values", |args| {
        arity("values", args, 1)?;
        Ok(Value::Array(map_arg(&args[0])?.values().cloned().collect()))
    });
    library.add("pluck", |args| {
        at_least("pluck", args, 1)?;
        let key = string_arg(&args[0])?;
        let mut found = Vec::new();
        for arg in &args[1..] {
            if let Some(value) = map_arg(arg)?.get(key) {
                found.push(value.clone());
            }
        }
        Ok(Value::Array(found))
    });
    library.add("pick", |args| {
        at_least("pick", args, 1)?;
        let map = map_arg(&args[0])?;
        let mut picked = Mapping::new();
        for key in &args[1..] {
            let key = string_arg(key)?;
            if let Some(value) = map.get(key) {
                picked.insert(key.to_owned(), value.clone());
            }
        }
        Ok(Value::Object(picked))
    });
    library.add("omit", |args| {
        at_least("omit", args, 1)?;
        let mut map = map_arg(&args[0])?.clone();
        for key in &args[1..] {
            map.remove(string_arg(key)?);
        }
        Ok(Value::Object(map))
    });
    library.add("dig", |args| {
        at_least("dig", args, 3)?;
        let (dict, rest) = args.split_last().ok_or(FuncError::message("dig needs a dict"))?;
        let (default, keys) = rest.split_last().ok_or(FuncError::message("dig needs a default"))?;
        let mut current = Value::Object(map_arg(dict)?.clone());
        for key in keys {
            let key = string_arg(key)?;
            current = match current.get(key) {
                Some(value) => value.clone(),
                None => return Ok(default.clone())
            };
        }
        Ok(current)
    });
    library.add("deepCopy", |args| {
        arity("deepCopy", args, 1)?;
        Ok(args[0].clone())
    });
    library.add("merge", |args| merge_all("merge", args, false));
    library.add("mergeOverwrite", |args| merge_all("mergeOverwrite", args, true));
}

fn merge_all(name: &'static str, args: &[Value], overwrite: bool) -> Result<Value, FuncError> {
    at_least(name, args, 1)?;
    let mut merged = map_arg(&args[0])?.clone();
    for source in &args[1..] {
        merge_into(&mut merged, map_arg(source)?, overwrite);
    }
    Ok(Value::Object(merged))
}

/// Deep merges `source` into `target`. Nested mappings merge key by key and
/// sequences are never concatenated. Without `overwrite` the target keeps
/// every value that is not empty; with it the source wins unless its value
/// is empty.
pub(crate) fn merge_into(target: &mut Mapping, source: &Mapping, overwrite: bool) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(inner)), Value::Object(source_inner)) => {
                merge_into(inner, source_inner, overwrite);
            },
            (Some(existing), value) => {
                let replace = if overwrite {
                    !value.is_empty_value()
                } else {
                    existing.is_empty_value()
                };
                if replace {
                    *existing = value.clone();
                }
            },
            (None, value) => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}


fn register_types(library: &mut Library) {
    library.add("typeOf", |args| {
        arity("typeOf", args, 1)?;
        Ok(Value::from(match &args[0] {
            Value::Null => "<nil>",
            other => other.type_name()
        }))
    });
    library.add("kindOf", |args| {
        arity("kindOf", args, 1)?;
        Ok(Value::from(kind_of(&args[0])))
    });
    library.add("kindIs", |args| {
        arity("kindIs", args, 2)?;
        Ok(Value::Bool(string_arg(&args[0])? == kind_of(&args[1])))
    });
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "invalid",
        Value::Array(_) => "slice",
        Value::Object(_) => "map",
        other => other.type_name()
    }
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
    fn defaults() {
        assert_eq!(call("default", vec![json!("foo"), json!("")]).unwrap(), json!("foo"));
        assert_eq!(call("default", vec![json!("foo"), json!("bar")]).unwrap(), json!("bar"));
        assert_eq!(call("default", vec![json!("foo")]).unwrap(), json!("foo"));
        assert_eq!(call("coalesce", vec![json!(0), json!(null), json!("x")]).unwrap(), json!("x"));
        assert_eq!(call("ternary", vec![json!("y"), json!("n"), json!(false)]).unwrap(), json!("n"));
        assert_eq!(call("all", vec![json!(1), json!("")]).unwrap(), json!(false));
        assert_eq!(call("any", vec![json!(0), json!("a")]).unwrap(), json!(true));
        assert_eq!(call("fail", vec![json!("boom")]).unwrap_err(), FuncError::message("boom"));
    }

    #[test]
    fn list_access() {
        let list = json!([1, 2, 3]);
        assert_eq!(call("first", vec![list.clone()]).unwrap(), json!(1));
        assert_eq!(call("last", vec![list.clone()]).unwrap(), json!(3));
        assert_eq!(call("rest", vec![list.clone()]).unwrap(), json!([2, 3]));
        assert_eq!(call("initial", vec![list.clone()]).unwrap(), json!([1, 2]));
        assert_eq!(call("first", vec![json!([])]).unwrap(), json!(null));
        assert!(call("first", vec![json!("abc")]).is_err());
    }

    #[test]
    fn list_building() {
        let list = json!([1, 2]);
        assert_eq!(call("append", vec![list.clone(), json!(3)]).unwrap(), json!([1, 2, 3]));
        assert_eq!(call("prepend", vec![list.clone(), json!(0)]).unwrap(), json!([0, 1, 2]));
        assert_eq!(call("concat", vec![list.clone(), json!([3]), json!(null)]).unwrap(), json!([1, 2, 3]));
        assert_eq!(call("reverse", vec![list]).unwrap(), json!([2, 1]));
        assert_eq!(call("uniq", vec![json!([1, 1, "a", "a"])]).unwrap(), json!([1, "a"]));
        assert_eq!(call("without", vec![json!([1, 2, 3]), json!(2)]).unwrap(), json!([1, 3]));
        assert_eq!(call("has", vec![json!(2), json!([1, 2])]).unwrap(), json!(true));
        assert_eq!(call("compact", vec![json!([1, "", null, "a"])]).unwrap(), json!([1, "a"]));
        assert_eq!(call("chunk", vec![json!(2), json!([1, 2, 3])]).unwrap(), json!([[1, 2], [3]]));
    }

    #[test]
    fn slicing() {
        assert_eq!(call("slice", vec![json!([1, 2, 3, 4]), json!(1), json!(3)]).unwrap(), json!([2, 3]));
        assert_eq!(call("slice", vec![json!([1, 2, 3]), json!(1)]).unwrap(), json!([2, 3]));
        assert_eq!(call("slice", vec![json!("hello"), json!(1), json!(3)]).unwrap(), json!("el"));
        assert!(call("slice", vec![json!([1]), json!(0), json!(5)]).is_err());
    }

    #[test]
    fn ranges() {
        assert_eq!(until_step(0, 5, 1), vec![0, 1, 2, 3, 4]);
        assert_eq!(until_step(0, -3, -1), vec![0, -1, -2]);
        assert_eq!(until_step(0, 10, 4), vec![0, 4, 8]);
        assert_eq!(until_step(0, 5, -1), Vec::<i64>::new());
        assert_eq!(seq(&[3]), "1 2 3");
        assert_eq!(seq(&[2, -2]), "2 1 0 -1 -2");
        assert_eq!(seq(&[0, 2, 10]), "0 2 4 6 8 10");
        assert_eq!(seq(&[10, 2, 0]), "");
        assert_eq!(seq(&[]), "");
    }

    #[test]
    fn dicts() {
        let d = call("dict", vec![json!("a"), json!(1), json!("b")]).unwrap();
        assert_eq!(d, json!({"a": 1, "b": ""}));
        assert_eq!(call("get", vec![d.clone(), json!("a")]).unwrap(), json!(1));
        assert_eq!(call("get", vec![d.clone(), json!("z")]).unwrap(), json!(""));
        assert_eq!(call("set", vec![d.clone(), json!("c"), json!(3)]).unwrap(), json!({"a": 1, "b": "", "c": 3}));
        assert_eq!(call("unset", vec![d.clone(), json!("a")]).unwrap(), json!({"b": ""}));
        assert_eq!(call("hasKey", vec![d.clone(), json!("b")]).unwrap(), json!(true));
        assert_eq!(call("keys", vec![d.clone()]).unwrap(), json!(["a", "b"]));
        assert_eq!(call("values", vec![d.clone()]).unwrap(), json!([1, ""]));
        assert_eq!(call("pick", vec![d.clone(), json!("a")]).unwrap(), json!({"a": 1}));
        assert_eq!(call("omit", vec![d, json!("a")]).unwrap(), json!({"b": ""}));
        assert_eq!(
            call("pluck", vec![json!("n"), json!({"n": 1}), json!({"m": 2}), json!({"n": 3})]).unwrap(),
            json!([1, 3])
        );
    }

    #[test]
    fn digging() {
        let data = json!({"user": {"role": {"name": "admin"}}});
        assert_eq!(
            call("dig", vec![json!("user"), json!("role"), json!("name"), json!("guest"), data.clone()]).unwrap(),
            json!("admin")
        );
        assert_eq!(
            call("dig", vec![json!("user"), json!("nope"), json!("guest"), data]).unwrap(),
            json!("guest")
        );
    }

    #[test]
    fn merging_keeps_non_empty_target_values() {
        let merged = call("merge", vec![
            json!({"a": "one", "c": 3, "d": {"f": 5}, "g": [8, 9], "k": {"l": true}, "e": ""}),
            json!({"a": 1, "b": 2, "d": {"e": "four"}, "g": [6, 7], "k": {"l": false}, "e": "filled"}),
        ]).unwrap();
        assert_eq!(merged, json!({
            "a": "one", "b": 2, "c": 3, "d": {"e": "four", "f": 5},
            "e": "filled", "g": [8, 9], "k": {"l": true}
        }));
    }

    #[test]
    fn merge_overwrite_prefers_later_values() {
        let merged = call("mergeOverwrite", vec![
            json!({"a": 1, "b": {"c": 2, "d": 3}, "e": "keep"}),
            json!({"a": 10, "b": {"c": 20}, "e": ""}),
        ]).unwrap();
        assert_eq!(merged, json!({"a": 10, "b": {"c": 20, "d": 3}, "e": "keep"}));
    }

    #[test]
    fn types() {
        assert_eq!(call("typeOf", vec![json!(1.5)]).unwrap(), json!("float64"));
        assert_eq!(call("typeOf", vec![json!(null)]).unwrap(), json!("<nil>"));
        assert_eq!(call("kindOf", vec![json!([1])]).unwrap(), json!("slice"));
        assert_eq!(call("kindIs", vec![json!("map"), json!({})]).unwrap(), json!(true));
    }
}
