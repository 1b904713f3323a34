use std::collections::HashMap;
use std::fmt;
use crate::funcs::Library;
use crate::template::Segments;
use crate::value::Value;


/// Variables visible to the executing template, innermost last.
///
/// Control structures record `len()` on entry and `truncate` back to it on
/// exit, which ends the scope of everything they declared.
#[derive(Debug)]
pub(crate) struct Stack {
    frames: Vec<(String, Value)>
}

impl Stack {
    pub(crate) fn new(root: Value) -> Self {
        Stack {
            frames: vec![("$".to_owned(), root)]
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.frames.truncate(len);
    }

    pub(crate) fn push(&mut self, name: &str, value: Value) {
        self.frames.push((name.to_owned(), value));
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Value> {
        self.frames.iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub(crate) fn set(&mut self, name: &str, value: Value) -> bool {
        match self.frames.iter_mut().rev().find(|(n, _)| n == name) {
            Some(frame) => {
                frame.1 = value;
                true
            },
            None => false
        }
    }

    /// Index of the frame `name` currently resolves to.
    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.frames.iter().rposition(|(n, _)| n == name)
    }

    pub(crate) fn locate(&self, place: &Place) -> Option<&Value> {
        let mut current = &self.frames.get(place.frame)?.1;
        for step in &place.steps {
            current = match (step, current) {
                (Step::Key(key), Value::Object(map)) => map.get(key)?,
                (Step::Index(i), Value::Array(seq)) => seq.get(*i)?,
                _ => return None
            };
        }
        Some(current)
    }

    pub(crate) fn locate_mut(&mut self, place: &Place) -> Option<&mut Value> {
        let mut current = &mut self.frames.get_mut(place.frame)?.1;
        for step in &place.steps {
            current = match (step, current) {
                (Step::Key(key), Value::Object(map)) => map.get_mut(key)?,
                (Step::Index(i), Value::Array(seq)) => seq.get_mut(*i)?,
                _ => return None
            };
        }
        Some(current)
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    Key(String),
    Index(usize)
}

/// A location inside a variable of the [Stack]: the frame it starts from
/// and the keys and indexes leading down from there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Place {
    frame: usize,
    steps: Vec<Step>
}

impl Place {
    pub(crate) fn new(frame: usize) -> Self {
        Place {
            frame,
            steps: Vec::new()
        }
    }

    pub(crate) fn join(&self, step: Step) -> Self {
        let mut place = self.clone();
        place.steps.push(step);
        place
    }

    pub(crate) fn keys(&self, chain: &[String]) -> Self {
        let mut place = self.clone();
        place.steps.extend(chain.iter().cloned().map(Step::Key));
        place
    }
}


/// The value of `.`: either a place in the data, so that updates made
/// through `set` or `merge` stay visible, or a computed value.
#[derive(Debug, Clone)]
pub(crate) enum Dot {
    Place(Place),
    Value(Value)
}

impl Dot {
    /// The root of the data, held by `$`.
    pub(crate) fn root() -> Self {
        Dot::Place(Place::new(0))
    }
}

static NULL: Value = Value::Null;


/// What a segment asks of the enclosing `range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Next,
    Break,
    Continue
}


pub(crate) struct State<'a> {
    pub(crate) library: &'a Library,
    pub(crate) templates: &'a HashMap<String, Segments>,
    pub(crate) vars: Stack,
    pub(crate) name: String,
    pub(crate) depth: usize
}

impl<'a> State<'a> {
    pub(crate) fn new(
        library: &'a Library, templates: &'a HashMap<String, Segments>, name: &str, root: Value
    ) -> Self {
        State {
            library,
            templates,
            vars: Stack::new(root),
            name: name.to_owned(),
            depth: 0
        }
    }

    /// The current value of `dot`; a place removed from under it reads as null.
    pub(crate) fn resolve<'s>(&'s self, dot: &'s Dot) -> &'s Value {
        match dot {
            Dot::Value(value) => value,
            Dot::Place(place) => self.vars.locate(place).unwrap_or(&NULL)
        }
    }
}


/// A fault raised while executing; node and line are filled in by the
/// innermost command and segment that see it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExecError {
    message: String,
    node: Option<String>,
    location: Option<(usize, String)>
}

impl ExecError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        ExecError {
            message: message.into(),
            node: None,
            location: None
        }
    }

    pub(crate) fn at_node(mut self, node: &impl fmt::Display) -> Self {
        if self.node.is_none() {
            self.node = Some(node.to_string());
        }
        self
    }

    pub(crate) fn at_line(mut self, line: usize, template: &str) -> Self {
        if self.location.is_none() {
            self.location = Some((line, template.to_owned()));
        }
        self
    }

    pub(crate) fn describe(&self, file: &str) -> String {
        let mut text = format!("template: {}", file);
        if let Some((line, template)) = &self.location {
            text.push_str(&format!(":{}: executing {:?}", line, template));
        }
        if let Some(node) = &self.node {
            text.push_str(&format!(" at <{}>", node));
        }
        text.push_str(": ");
        text.push_str(&self.message);
        text
    }
}
