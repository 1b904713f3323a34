//! Sprig's string functions.
//!
//! Parameter order follows sprig, with the subject last so the functions
//! read naturally at the end of a pipeline: `{{ .name | trunc 5 }}`.
use regex::{NoExpand, Regex};
use crate::error::FuncError;
use crate::funcs::{arity, int_arg, string_arg, to_str, Library};
use crate::printf::go_quote;
use crate::value::{Mapping, Value};


fn unary(library: &mut Library, name: &'static str, function: fn(&str) -> String) {
    library.add(name, move |args| {
        arity(name, args, 1)?;
        Ok(Value::from(function(string_arg(&args[0])?)))
    });
}

pub(crate) fn register(library: &mut Library) {
    unary(library, "upper", str::to_uppercase);
    unary(library, "lower", str::to_lowercase);
    unary(library, "title", title);
    unary(library, "untitle", untitle);
    unary(library, "trim", |s| s.trim().to_owned());
    unary(library, "nospace", |s| s.chars().filter(|c| !c.is_whitespace()).collect());
    unary(library, "snakecase", |s| words(s).join("_"));
    unary(library, "kebabcase", |s| words(s).join("-"));
    unary(library, "camelcase", camelcase);

    library.add("trimAll", |args| {
        arity("trimAll", args, 2)?;
        let cutset = string_arg(&args[0])?.chars().collect::<Vec<_>>();
        Ok(Value::from(string_arg(&args[1])?.trim_matches(cutset.as_slice())))
    });
    library.add("trimPrefix", |args| {
        arity("trimPrefix", args, 2)?;
        let (prefix, s) = (string_arg(&args[0])?, string_arg(&args[1])?);
        Ok(Value::from(s.strip_prefix(prefix).unwrap_or(s)))
    });
    library.add("trimSuffix", |args| {
        arity("trimSuffix", args, 2)?;
        let (suffix, s) = (string_arg(&args[0])?, string_arg(&args[1])?);
        Ok(Value::from(s.strip_suffix(suffix).unwrap_or(s)))
    });
    library.add("trunc", |args| {
        arity("trunc", args, 2)?;
        Ok(Value::from(trunc(int_arg(&args[0])?, string_arg(&args[1])?)))
    });
    library.add("abbrev", |args| {
        arity("abbrev", args, 2)?;
        let (width, s) = (int_arg(&args[0])?, string_arg(&args[1])?);
        let chars = s.chars().collect::<Vec<_>>();
        if width < 4 || chars.len() as i64 <= width {
            return Ok(Value::from(s));
        }
        let kept = chars[..width as usize - 3].iter().collect::<String>();
        Ok(Value::from(format!("{}...", kept)))
    });
    library.add("substr", |args| {
        arity("substr", args, 3)?;
        let (start, end) = (int_arg(&args[0])?, int_arg(&args[1])?);
        substr(start, end, string_arg(&args[2])?).map(Value::from)
    });
    library.add("repeat", |args| {
        arity("repeat", args, 2)?;
        let count = int_arg(&args[0])?;
        if count < 0 {
            return Err(FuncError::message("strings: negative Repeat count"));
        }
        Ok(Value::from(string_arg(&args[1])?.repeat(count as usize)))
    });
    library.add("replace", |args| {
        arity("replace", args, 3)?;
        let (old, new, s) = (string_arg(&args[0])?, string_arg(&args[1])?, string_arg(&args[2])?);
        Ok(Value::from(s.replace(old, new)))
    });
    library.add("contains", |args| {
        arity("contains", args, 2)?;
        Ok(Value::Bool(string_arg(&args[1])?.contains(string_arg(&args[0])?)))
    });
    library.add("hasPrefix", |args| {
        arity("hasPrefix", args, 2)?;
        Ok(Value::Bool(string_arg(&args[1])?.starts_with(string_arg(&args[0])?)))
    });
    library.add("hasSuffix", |args| {
        arity("hasSuffix", args, 2)?;
        Ok(Value::Bool(string_arg(&args[1])?.ends_with(string_arg(&args[0])?)))
    });
    library.add("quote", |args| {
        Ok(Value::from(present(args).map(|s| go_quote(&s)).collect::<Vec<_>>().join(" ")))
    });
    library.add("squote", |args| {
        Ok(Value::from(present(args).map(|s| format!("'{}'", s)).collect::<Vec<_>>().join(" ")))
    });
    library.add("cat", |args| {
        Ok(Value::from(present(args).collect::<Vec<_>>().join(" ")))
    });
    library.add("indent", |args| {
        arity("indent", args, 2)?;
        Ok(Value::from(indent(int_arg(&args[0])?, string_arg(&args[1])?)))
    });
    library.add("nindent", |args| {
        arity("nindent", args, 2)?;
        Ok(Value::from(format!("\n{}", indent(int_arg(&args[0])?, string_arg(&args[1])?))))
    });
    library.add("plural", |args| {
        arity("plural", args, 3)?;
        let count = int_arg(&args[2])?;
        Ok(args[if count == 1 { 0 } else { 1 }].clone())
    });

    library.add("split", |args| {
        arity("split", args, 2)?;
        let parts = split(string_arg(&args[0])?, string_arg(&args[1])?);
        let map = parts.into_iter()
            .enumerate()
            .map(|(i, part)| (format!("_{}", i), Value::from(part)))
            .collect::<Mapping>();
        Ok(Value::Object(map))
    });
    library.add("splitList", |args| {
        arity("splitList", args, 2)?;
        let parts = split(string_arg(&args[0])?, string_arg(&args[1])?);
        Ok(Value::from(parts))
    });
    library.add("join", |args| {
        arity("join", args, 2)?;
        Ok(Value::from(strings_of(&args[1]).join(string_arg(&args[0])?)))
    });
    library.add("sortAlpha", |args| {
        arity("sortAlpha", args, 1)?;
        let mut strings = strings_of(&args[0]);
        strings.sort();
        Ok(Value::from(strings))
    });
    library.add("toString", |args| {
        arity("toString", args, 1)?;
        Ok(Value::from(to_str(&args[0])))
    });
    library.add("toStrings", |args| {
        arity("toStrings", args, 1)?;
        Ok(Value::from(strings_of(&args[0])))
    });

    library.add("regexMatch", |args| {
        arity("regexMatch", args, 2)?;
        let s = string_arg(&args[1])?;
        let matched = Regex::new(string_arg(&args[0])?)
            .map(|re| re.is_match(s))
            .unwrap_or(false);
        Ok(Value::Bool(matched))
    });
    library.add("regexFind", |args| {
        arity("regexFind", args, 2)?;
        let re = regex(&args[0])?;
        let found = re.find(string_arg(&args[1])?).map(|m| m.as_str()).unwrap_or("");
        Ok(Value::from(found))
    });
    library.add("regexFindAll", |args| {
        arity("regexFindAll", args, 3)?;
        let re = regex(&args[0])?;
        let limit = limit(int_arg(&args[2])?);
        let found = re.find_iter(string_arg(&args[1])?)
            .take(limit)
            .map(|m| Value::from(m.as_str()))
            .collect::<Vec<_>>();
        Ok(Value::Array(found))
    });
    library.add("regexReplaceAll", |args| {
        arity("regexReplaceAll", args, 3)?;
        let re = regex(&args[0])?;
        let (s, replacement) = (string_arg(&args[1])?, string_arg(&args[2])?);
        Ok(Value::from(re.replace_all(s, replacement).into_owned()))
    });
    library.add("regexReplaceAllLiteral", |args| {
        arity("regexReplaceAllLiteral", args, 3)?;
        let re = regex(&args[0])?;
        let (s, replacement) = (string_arg(&args[1])?, string_arg(&args[2])?);
        Ok(Value::from(re.replace_all(s, NoExpand(replacement)).into_owned()))
    });
    library.add("regexSplit", |args| {
        arity("regexSplit", args, 3)?;
        let re = regex(&args[0])?;
        let s = string_arg(&args[1])?;
        let parts = match int_arg(&args[2])? {
            0 => Vec::new(),
            n if n < 0 => re.split(s).map(Value::from).collect::<Vec<_>>(),
            n => re.splitn(s, n as usize).map(Value::from).collect::<Vec<_>>()
        };
        Ok(Value::Array(parts))
    });
}


fn regex(pattern: &Value) -> Result<Regex, FuncError> {
    Regex::new(string_arg(pattern)?).map_err(|err| FuncError::message(err.to_string()))
}

fn limit(n: i64) -> usize {
    if n < 0 { usize::MAX } else { n as usize }
}

// arguments other than null, as strings
fn present(args: &[Value]) -> impl Iterator<Item = String> + '_ {
    args.iter().filter(|arg| !arg.is_null()).map(to_str)
}

/// Sprig's `strslice`: a list becomes its non-null items as strings, null
/// an empty list and anything else a single string.
pub(crate) fn strings_of(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(seq) => seq.iter()
            .filter(|item| !item.is_null())
            .map(to_str)
            .collect(),
        other => vec![to_str(other)]
    }
}

fn split(separator: &str, s: &str) -> Vec<String> {
    if separator.is_empty() {
        return s.chars().map(String::from).collect();
    }
    s.split(separator).map(str::to_owned).collect()
}

fn trunc(count: i64, s: &str) -> String {
    let chars = s.chars().collect::<Vec<_>>();
    let len = chars.len() as i64;
    if count >= 0 && len > count {
        chars[..count as usize].iter().collect()
    } else if count < 0 && len + count > 0 {
        chars[(len + count) as usize..].iter().collect()
    } else {
        s.to_owned()
    }
}

fn substr(start: i64, end: i64, s: &str) -> Result<String, FuncError> {
    let chars = s.chars().collect::<Vec<_>>();
    let len = chars.len() as i64;
    let (from, to) = if start < 0 {
        (0, end)
    } else if end < 0 || end > len {
        (start, len)
    } else {
        (start, end)
    };
    if from > to || to > len {
        return Err(FuncError::message(
            format!("slice bounds out of range [{}:{}] with length {}", from, to, len)
        ));
    }
    Ok(chars[from as usize..to as usize].iter().collect())
}

fn indent(spaces: i64, s: &str) -> String {
    let pad = " ".repeat(spaces.max(0) as usize);
    format!("{}{}", pad, s.replace('\n', &format!("\n{}", pad)))
}

fn is_separator(c: char) -> bool {
    if c.is_ascii() {
        return !(c.is_ascii_alphanumeric() || c == '_');
    }
    !c.is_alphanumeric() && c.is_whitespace()
}

fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut previous = ' ';
    for c in s.chars() {
        if is_separator(previous) {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        previous = c;
    }
    out
}

fn untitle(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_whitespace() {
            in_word = false;
            out.push(c);
        } else if !in_word {
            in_word = true;
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

// lower cased words, split at separators and at case changes; an acronym
// stays one word (`HTTPServer` is `http` and `server`)
fn words(s: &str) -> Vec<String> {
    let chars = s.chars().collect::<Vec<_>>();
    let mut words = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let previous = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if previous.is_lowercase() || previous.is_numeric() || (previous.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn camelcase(s: &str) -> String {
    s.split(['_', '-', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new()
            }
        })
        .collect()
}
