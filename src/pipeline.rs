//! Pipelines, commands and operands, and how they evaluate.
use std::fmt;
use crate::context::{Dot, ExecError, Place, State};
use crate::error::FuncError;
use crate::value::{Value, ValueExt};


#[derive(Debug)]
pub(crate) struct Pipeline {
    pub(crate) declarations: Vec<String>,
    pub(crate) is_assign: bool,
    pub(crate) commands: Vec<Command>,
}

#[derive(Debug)]
pub(crate) struct Command {
    pub(crate) args: Vec<Operand>,
}

#[derive(Debug)]
pub(crate) enum Operand {
    Dot,
    Field(Vec<String>),
    Variable(String, Vec<String>),
    Function(String),
    Pipeline(Box<Pipeline>, Vec<String>),
    Literal(Value),
    Nil,
}


impl Pipeline {
    pub(crate) fn evaluate(&self, state: &mut State, dot: &Dot) -> Result<Value, ExecError> {
        let mut value = None;
        for command in &self.commands {
            let result = command.evaluate(state, dot, value.take())
                .map_err(|err| err.at_node(command))?;
            value = Some(result);
        }
        let value = value.unwrap_or(Value::Null);
        for name in &self.declarations {
            if self.is_assign {
                if !state.vars.set(name, value.clone()) {
                    return Err(ExecError::new(format!("undefined variable: {}", name)));
                }
            } else {
                state.vars.push(name, value.clone());
            }
        }
        Ok(value)
    }

    /// Where the value of a pipeline made of a lone field or variable lives.
    pub(crate) fn place(&self, state: &State, dot: &Dot) -> Option<Place> {
        match self.commands.as_slice() {
            [command] => match command.args.as_slice() {
                [operand] => operand.place(state, dot),
                _ => None
            },
            _ => None
        }
    }
}


impl Command {
    fn evaluate(
        &self, state: &mut State, dot: &Dot, final_value: Option<Value>
    ) -> Result<Value, ExecError> {
        let (first, rest) = match self.args.split_first() {
            Some(split) => split,
            None => return Err(ExecError::new("missing value for command")),
        };
        match first {
            Operand::Function(name) => call(state, name, rest, dot, final_value),
            Operand::Nil => Err(ExecError::new("nil is not a command")),
            operand => {
                if !rest.is_empty() || final_value.is_some() {
                    return Err(ExecError::new(
                        format!("can't give argument to non-function {}", operand)
                    ));
                }
                operand.evaluate(state, dot)
            }
        }
    }
}


impl Operand {
    fn evaluate(&self, state: &mut State, dot: &Dot) -> Result<Value, ExecError> {
        match self {
            Operand::Dot => Ok(state.resolve(dot).clone()),
            Operand::Field(chain) => walk(state.resolve(dot), chain),
            Operand::Variable(name, chain) => {
                let value = state.vars.get(name).ok_or_else(
                    || ExecError::new(format!("undefined variable: {}", name))
                )?;
                walk(value, chain)
            },
            Operand::Function(name) => call(state, name, &[], dot, None),
            Operand::Pipeline(pipeline, chain) => {
                let value = pipeline.evaluate(state, dot)?;
                walk(&value, chain)
            },
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Nil => Ok(Value::Null),
        }
    }

    fn place(&self, state: &State, dot: &Dot) -> Option<Place> {
        match (self, dot) {
            (Operand::Dot, Dot::Place(place)) => Some(place.clone()),
            (Operand::Field(chain), Dot::Place(place)) => Some(place.keys(chain)),
            (Operand::Variable(name, chain), _) => {
                state.vars.position(name).map(|frame| Place::new(frame).keys(chain))
            },
            _ => None
        }
    }
}


/// Follows a chain of field names; a missing key is always an error.
fn walk(base: &Value, chain: &[String]) -> Result<Value, ExecError> {
    let mut current = base;
    for name in chain {
        current = match current {
            Value::Object(map) => map.get(name).ok_or_else(
                || ExecError::new(format!("map has no entry for key {:?}", name))
            )?,
            Value::Null => {
                return Err(ExecError::new(
                    format!("nil pointer evaluating interface {{}}.{}", name)
                ));
            },
            other => {
                return Err(ExecError::new(
                    format!("can't evaluate field {} in type {}", name, other.type_name())
                ));
            }
        };
    }
    Ok(current.clone())
}


const UPDATERS: [&str; 4] = ["set", "unset", "merge", "mergeOverwrite"];

fn call(
    state: &mut State, name: &str, args: &[Operand], dot: &Dot, final_value: Option<Value>
) -> Result<Value, ExecError> {
    match name {
        "and" | "or" => return short_circuit(state, name, args, dot, final_value),
        _ => {}
    }
    let mut values = Vec::with_capacity(args.len() + 1);
    for arg in args {
        values.push(arg.evaluate(state, dot)?);
    }
    values.extend(final_value);
    let function = state.library.get(name).ok_or_else(
        || ExecError::new(format!("function {:?} not defined", name))
    )?;
    let result = function(values.as_slice()).map_err(|err| match err {
        FuncError::Message(message) => ExecError::new(
            format!("error calling {}: {}", name, message)
        ),
        other => ExecError::new(other.to_string()),
    })?;
    // these update their first argument in place
    if UPDATERS.contains(&name) {
        if let Some(place) = args.first().and_then(|arg| arg.place(state, dot)) {
            if let Some(slot) = state.vars.locate_mut(&place) {
                *slot = result.clone();
            }
        }
    }
    Ok(result)
}

// `and` and `or` stop evaluating at the first argument that decides them.
fn short_circuit(
    state: &mut State, name: &str, args: &[Operand], dot: &Dot, final_value: Option<Value>
) -> Result<Value, ExecError> {
    let count = args.len() + usize::from(final_value.is_some());
    if count == 0 {
        return Err(ExecError::new(
            format!("wrong number of args for {}: want at least 1 got 0", name)
        ));
    }
    let stop_when = name == "or";
    let mut last = Value::Null;
    for arg in args {
        last = arg.evaluate(state, dot)?;
        if last.is_truthy() == stop_when {
            return Ok(last);
        }
    }
    Ok(final_value.unwrap_or(last))
}


impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.declarations.is_empty() {
            write!(
                f, "{} {} ",
                self.declarations.join(", "),
                if self.is_assign { "=" } else { ":=" }
            )?;
        }
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", command)?;
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", arg)?;
        }
        Ok(())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Dot => write!(f, "."),
            Operand::Field(chain) => write_chain(f, chain),
            Operand::Variable(name, chain) => {
                write!(f, "{}", name)?;
                write_chain(f, chain)
            },
            Operand::Function(name) => write!(f, "{}", name),
            Operand::Pipeline(pipeline, chain) => {
                write!(f, "({})", pipeline)?;
                write_chain(f, chain)
            },
            Operand::Literal(Value::String(s)) => write!(f, "{:?}", s),
            Operand::Literal(value) => write!(f, "{}", value.to_display()),
            Operand::Nil => write!(f, "nil"),
        }
    }
}

fn write_chain(f: &mut fmt::Formatter<'_>, chain: &[String]) -> fmt::Result {
    for name in chain {
        write!(f, ".{}", name)?;
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn walk_nested() {
        let data = json!({"a": {"b": [1, 2]}});
        let chain = vec!["a".to_owned(), "b".to_owned()];
        assert_eq!(walk(&data, &chain).unwrap(), json!([1, 2]));
    }

    #[test]
    fn walk_missing_key() {
        let data = json!({"a": {}});
        let chain = vec!["a".to_owned(), "b".to_owned()];
        assert_eq!(
            walk(&data, &chain).unwrap_err(),
            ExecError::new("map has no entry for key \"b\"")
        );
    }

    #[test]
    fn walk_through_nil_and_scalars() {
        let data = json!({"a": null, "s": "text"});
        let error = walk(&data, &["a".to_owned(), "b".to_owned()]).unwrap_err();
        assert_eq!(error, ExecError::new("nil pointer evaluating interface {}.b"));
        let error = walk(&data, &["s".to_owned(), "b".to_owned()]).unwrap_err();
        assert_eq!(error, ExecError::new("can't evaluate field b in type string"));
    }

    #[test]
    fn display_round_trips_shape() {
        let pipeline = Pipeline {
            declarations: vec!["$x".to_owned()],
            is_assign: false,
            commands: vec![
                Command {
                    args: vec![
                        Operand::Function("index".to_owned()),
                        Operand::Field(vec!["a".to_owned()]),
                        Operand::Literal(json!("k")),
                    ]
                },
                Command {
                    args: vec![Operand::Function("upper".to_owned())]
                },
            ],
        };
        assert_eq!(pipeline.to_string(), "$x := index .a \"k\" | upper");
    }
}
