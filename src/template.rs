use std::collections::HashMap;
use std::fmt::Debug;
use std::mem;
use log::debug;
use crate::context::{Dot, ExecError, Flow, Stack, State, Step};
use crate::error::Error;
use crate::funcs::Library;
use crate::lexer;
use crate::parser::Items;
use crate::pipeline::Pipeline;
use crate::reader::{Reader, Token};
use crate::value::{Value, ValueExt};

/// Nested `template` invocations allowed before execution gives up.
const MAX_TEMPLATE_DEPTH: usize = 256;


/// A compiled template together with the templates it defines.
pub struct Template {
    name: String,
    templates: HashMap<String, Segments>
}

impl Template {
    pub fn parse(name: &str, input: &str, library: &Library) -> Result<Self, Error> {
        let mut reader = Reader::new(input);
        let mut parser = Parser::new(library);
        let segments = parser.parse_root(&mut reader).map_err(
            |message| Error::TemplateCompile(
                format!("template: {}:{}: {}", name, parser.line, message)
            )
        )?;
        let mut templates = parser.templates;
        if templates.contains_key(name) {
            return Err(Error::TemplateCompile(
                format!("template: {}: multiple definition of template {:?}", name, name)
            ));
        }
        templates.insert(name.to_owned(), segments);
        debug!("compiled template {:?} ({} named templates)", name, templates.len());
        Ok(Template { name: name.to_owned(), templates })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executes against `data`, returning the full output only on success.
    pub fn execute(&self, data: &Value, library: &Library) -> Result<String, Error> {
        let mut output = String::new();
        if let Some(segments) = self.templates.get(&self.name) {
            let mut state = State::new(library, &self.templates, &self.name, data.clone());
            segments.render(&mut state, &Dot::root(), &mut output).map_err(
                |err| Error::TemplateExecution(err.describe(&self.name))
            )?;
        }
        Ok(output)
    }
}


enum Close {
    Eof,
    End,
    Else(Items)
}

struct Parser<'l> {
    library: &'l Library,
    vars: Vec<String>,
    templates: HashMap<String, Segments>,
    line: usize,
    depth: usize,
    range_depth: usize
}

impl<'l> Parser<'l> {
    fn new(library: &'l Library) -> Self {
        Parser {
            library,
            vars: vec!["$".to_owned()],
            templates: HashMap::new(),
            line: 1,
            depth: 0,
            range_depth: 0
        }
    }

    fn parse_root(&mut self, reader: &mut Reader) -> Result<Segments, String> {
        match self.parse(reader)? {
            (segments, Close::Eof) => Ok(segments),
            (_, Close::End) => Err("unexpected {{end}}".to_owned()),
            (_, Close::Else(_)) => Err("unexpected {{else}}".to_owned())
        }
    }

    fn parse(&mut self, reader: &mut Reader) -> Result<(Segments, Close), String> {
        let mut segments = Segments::new();
        while let Some(token) = reader.pop_front() {
            match token {
                Token::Text(text, _) => {
                    segments.push(Box::new(TextSegment::new(text)))
                },
                Token::Comment(line) => {
                    self.line = line;
                },
                Token::Error(message, line) => {
                    self.line = line;
                    return Err(message);
                },
                Token::Action(text, line) => {
                    self.line = line;
                    let mut items = Items::new(lexer::lex(text)?);
                    match items.keyword() {
                        Some("end") => {
                            items.expect_done("end")?;
                            return Ok((segments, Close::End));
                        },
                        Some("else") => {
                            return Ok((segments, Close::Else(items)));
                        },
                        Some("if") => segments.push(self.parse_if(reader, items)?),
                        Some("with") => segments.push(self.parse_with(reader, items)?),
                        Some("range") => segments.push(self.parse_range(reader, items)?),
                        Some("define") => self.parse_define(reader, items)?,
                        Some("block") => segments.push(self.parse_block(reader, items)?),
                        Some("template") => segments.push(self.parse_template(items)?),
                        Some(keyword @ ("break" | "continue")) => {
                            if self.range_depth == 0 {
                                return Err(format!("{{{{{}}}}} outside {{{{range}}}}", keyword));
                            }
                            items.expect_done(keyword)?;
                            let flow = if keyword == "break" { Flow::Break } else { Flow::Continue };
                            segments.push(Box::new(LoopControlSegment { flow }));
                        },
                        _ => {
                            let pipeline = items.pipeline(self.library, &mut self.vars, "command", 1)?;
                            items.expect_done("command")?;
                            segments.push(Box::new(ActionSegment { pipeline, line }));
                        }
                    }
                }
            }
        }
        Ok((segments, Close::Eof))
    }

    // parse a body up to its {{end}}, with an optional {{else}} part; an
    // {{else <keyword> ...}} chains another branch sharing the same {{end}}
    fn parse_branches(
        &mut self, reader: &mut Reader, keyword: &str
    ) -> Result<(Segments, Option<Segments>), String> {
        self.depth += 1;
        if keyword == "range" {
            self.range_depth += 1;
        }
        let parsed = self.parse(reader);
        if keyword == "range" {
            self.range_depth -= 1;
        }
        let (body, close) = parsed?;
        let otherwise = match close {
            Close::End => None,
            Close::Eof => return Err("unexpected EOF".to_owned()),
            Close::Else(mut items) => {
                if items.is_done() {
                    match self.parse(reader)? {
                        (segments, Close::End) => Some(segments),
                        (_, Close::Else(_)) => return Err(format!("expected end; found {{{{else}}}} in {}", keyword)),
                        (_, Close::Eof) => return Err("unexpected EOF".to_owned())
                    }
                } else {
                    match items.keyword() {
                        Some("if") if keyword == "if" => Some(vec![self.parse_if(reader, items)?]),
                        Some("with") if keyword == "with" => Some(vec![self.parse_with(reader, items)?]),
                        _ => return Err(format!("unexpected tokens after {{{{else}}}} in {}", keyword))
                    }
                }
            }
        };
        self.depth -= 1;
        Ok((body, otherwise))
    }

    fn parse_if(&mut self, reader: &mut Reader, mut items: Items) -> Result<Box<dyn Segment>, String> {
        let line = self.line;
        let scope = self.vars.len();
        let pipeline = items.pipeline(self.library, &mut self.vars, "if", 1)?;
        items.expect_done("if")?;
        let (body, otherwise) = self.parse_branches(reader, "if")?;
        self.vars.truncate(scope);
        Ok(Box::new(IfSegment { pipeline, body, otherwise, line }))
    }

    fn parse_with(&mut self, reader: &mut Reader, mut items: Items) -> Result<Box<dyn Segment>, String> {
        let line = self.line;
        let scope = self.vars.len();
        let pipeline = items.pipeline(self.library, &mut self.vars, "with", 1)?;
        items.expect_done("with")?;
        let (body, otherwise) = self.parse_branches(reader, "with")?;
        self.vars.truncate(scope);
        Ok(Box::new(WithSegment { pipeline, body, otherwise, line }))
    }

    fn parse_range(&mut self, reader: &mut Reader, mut items: Items) -> Result<Box<dyn Segment>, String> {
        let line = self.line;
        let scope = self.vars.len();
        let mut pipeline = items.pipeline(self.library, &mut self.vars, "range", 2)?;
        items.expect_done("range")?;
        if pipeline.is_assign {
            return Err("range can only initialize variables".to_owned());
        }
        let declarations = mem::take(&mut pipeline.declarations);
        let (body, otherwise) = self.parse_branches(reader, "range")?;
        self.vars.truncate(scope);
        Ok(Box::new(RangeSegment { declarations, pipeline, body, otherwise, line }))
    }

    fn parse_define(&mut self, reader: &mut Reader, mut items: Items) -> Result<(), String> {
        if self.depth > 0 {
            return Err("unexpected <define> in command".to_owned());
        }
        let name = items.string("define clause")?;
        items.expect_done("define clause")?;
        let body = self.parse_named(reader)?;
        self.add_template(name, body)
    }

    fn parse_block(&mut self, reader: &mut Reader, mut items: Items) -> Result<Box<dyn Segment>, String> {
        let line = self.line;
        let name = items.string("block clause")?;
        let pipeline = self.optional_pipeline(items, "block clause")?;
        let body = self.parse_named(reader)?;
        self.add_template(name.clone(), body)?;
        Ok(Box::new(TemplateSegment { name, pipeline, line }))
    }

    fn parse_template(&mut self, mut items: Items) -> Result<Box<dyn Segment>, String> {
        let line = self.line;
        let name = items.string("template clause")?;
        let pipeline = self.optional_pipeline(items, "template clause")?;
        Ok(Box::new(TemplateSegment { name, pipeline, line }))
    }

    fn optional_pipeline(&mut self, mut items: Items, context: &str) -> Result<Option<Pipeline>, String> {
        if items.is_done() {
            return Ok(None);
        }
        let pipeline = items.pipeline(self.library, &mut self.vars, context, 0)?;
        items.expect_done(context)?;
        Ok(Some(pipeline))
    }

    // a named template body sees only `$`
    fn parse_named(&mut self, reader: &mut Reader) -> Result<Segments, String> {
        let vars = mem::replace(&mut self.vars, vec!["$".to_owned()]);
        let range_depth = mem::replace(&mut self.range_depth, 0);
        self.depth += 1;
        let parsed = self.parse(reader);
        self.depth -= 1;
        self.vars = vars;
        self.range_depth = range_depth;
        match parsed? {
            (body, Close::End) => Ok(body),
            (_, Close::Else(_)) => Err("unexpected {{else}}".to_owned()),
            (_, Close::Eof) => Err("unexpected EOF".to_owned())
        }
    }

    fn add_template(&mut self, name: String, body: Segments) -> Result<(), String> {
        if self.templates.contains_key(&name) {
            return Err(format!("multiple definition of template {:?}", name));
        }
        self.templates.insert(name, body);
        Ok(())
    }
}


pub(crate) trait Segment: Debug {
    fn render(
        &self, state: &mut State, dot: &Dot, out: &mut String
    ) -> Result<Flow, ExecError>;
}

pub(crate) type Segments = Vec<Box<dyn Segment>>;

impl Segment for Segments {
    fn render(
        &self, state: &mut State, dot: &Dot, out: &mut String
    ) -> Result<Flow, ExecError> {
        for child in self.iter() {
            match child.render(state, dot, out)? {
                Flow::Next => {},
                flow => return Ok(flow)
            }
        }
        Ok(Flow::Next)
    }
}


#[derive(Debug)]
struct TextSegment {
    text: String
}

impl TextSegment {
    fn new(text: &str) -> Self {
        TextSegment {
            text: text.to_owned()
        }
    }
}

impl Segment for TextSegment {
    fn render(
        &self, _state: &mut State, _dot: &Dot, out: &mut String
    ) -> Result<Flow, ExecError> {
        out.push_str(&self.text);
        Ok(Flow::Next)
    }
}


#[derive(Debug)]
struct ActionSegment {
    pipeline: Pipeline,
    line: usize
}

impl Segment for ActionSegment {
    fn render(
        &self, state: &mut State, dot: &Dot, out: &mut String
    ) -> Result<Flow, ExecError> {
        let value = self.pipeline.evaluate(state, dot)
            .map_err(|err| err.at_line(self.line, &state.name))?;
        if self.pipeline.declarations.is_empty() {
            match value {
                Value::Null => out.push_str("<no value>"),
                value => out.push_str(&value.to_display())
            }
        }
        Ok(Flow::Next)
    }
}


#[derive(Debug)]
struct IfSegment {
    pipeline: Pipeline,
    body: Segments,
    otherwise: Option<Segments>,
    line: usize
}

impl Segment for IfSegment {
    fn render(
        &self, state: &mut State, dot: &Dot, out: &mut String
    ) -> Result<Flow, ExecError> {
        let len = state.vars.len();
        let value = self.pipeline.evaluate(state, dot)
            .map_err(|err| err.at_line(self.line, &state.name))?;
        let flow = if value.is_truthy() {
            self.body.render(state, dot, out)?
        } else if let Some(otherwise) = &self.otherwise {
            otherwise.render(state, dot, out)?
        } else {
            Flow::Next
        };
        state.vars.truncate(len);
        Ok(flow)
    }
}


#[derive(Debug)]
struct WithSegment {
    pipeline: Pipeline,
    body: Segments,
    otherwise: Option<Segments>,
    line: usize
}

impl Segment for WithSegment {
    fn render(
        &self, state: &mut State, dot: &Dot, out: &mut String
    ) -> Result<Flow, ExecError> {
        let len = state.vars.len();
        let value = self.pipeline.evaluate(state, dot)
            .map_err(|err| err.at_line(self.line, &state.name))?;
        let flow = if value.is_truthy() {
            let inner = match self.pipeline.place(state, dot) {
                Some(place) => Dot::Place(place),
                None => Dot::Value(value)
            };
            self.body.render(state, &inner, out)?
        } else if let Some(otherwise) = &self.otherwise {
            otherwise.render(state, dot, out)?
        } else {
            Flow::Next
        };
        state.vars.truncate(len);
        Ok(flow)
    }
}


#[derive(Debug)]
struct RangeSegment {
    declarations: Vec<String>,
    pipeline: Pipeline,
    body: Segments,
    otherwise: Option<Segments>,
    line: usize
}

impl RangeSegment {
    // key, element and where the element sits in the ranged value
    fn entries(&self, value: Value) -> Result<Vec<(Value, Value, Option<Step>)>, ExecError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(seq) => Ok(
                seq.into_iter()
                    .enumerate()
                    .map(|(i, item)| (Value::from(i), item, Some(Step::Index(i))))
                    .collect::<Vec<_>>()
            ),
            Value::Object(map) => Ok(
                map.into_iter()
                    .map(|(key, item)| (Value::String(key.clone()), item, Some(Step::Key(key))))
                    .collect::<Vec<_>>()
            ),
            Value::Number(n) if n.is_i64() || n.is_u64() => {
                if self.declarations.len() > 1 {
                    return Err(ExecError::new(
                        "can't use two iteration variables when ranging over an integer"
                    ));
                }
                let count = n.as_i64().unwrap_or(i64::MAX).max(0);
                Ok((0..count).map(|i| (Value::from(i), Value::from(i), None)).collect::<Vec<_>>())
            },
            other => Err(ExecError::new(
                format!("range can't iterate over {}", other.to_display())
            ))
        }
    }
}

impl Segment for RangeSegment {
    fn render(
        &self, state: &mut State, dot: &Dot, out: &mut String
    ) -> Result<Flow, ExecError> {
        let len = state.vars.len();
        let value = self.pipeline.evaluate(state, dot)
            .and_then(|value| self.entries(value))
            .map_err(|err| err.at_line(self.line, &state.name))?;
        let place = self.pipeline.place(state, dot);
        if value.is_empty() {
            if let Some(otherwise) = &self.otherwise {
                otherwise.render(state, dot, out)?;
            }
        }
        for (key, item, step) in value {
            let inner = match (&place, step) {
                (Some(place), Some(step)) => Dot::Place(place.join(step)),
                _ => Dot::Value(item.clone())
            };
            match self.declarations.as_slice() {
                [element] => state.vars.push(element, item.clone()),
                [index, element] => {
                    state.vars.push(index, key);
                    state.vars.push(element, item.clone());
                },
                _ => {}
            }
            let flow = self.body.render(state, &inner, out)?;
            state.vars.truncate(len);
            if flow == Flow::Break {
                break;
            }
        }
        state.vars.truncate(len);
        Ok(Flow::Next)
    }
}


#[derive(Debug)]
struct LoopControlSegment {
    flow: Flow
}

impl Segment for LoopControlSegment {
    fn render(
        &self, _state: &mut State, _dot: &Dot, _out: &mut String
    ) -> Result<Flow, ExecError> {
        Ok(self.flow)
    }
}


#[derive(Debug)]
struct TemplateSegment {
    name: String,
    pipeline: Option<Pipeline>,
    line: usize
}

impl Segment for TemplateSegment {
    fn render(
        &self, state: &mut State, dot: &Dot, out: &mut String
    ) -> Result<Flow, ExecError> {
        let templates = state.templates;
        let target = templates.get(&self.name).ok_or_else(
            || ExecError::new(format!("no such template {:?}", self.name))
                .at_line(self.line, &state.name)
        )?;
        if state.depth >= MAX_TEMPLATE_DEPTH {
            return Err(
                ExecError::new(format!("exceeded maximum template depth ({})", MAX_TEMPLATE_DEPTH))
                    .at_line(self.line, &state.name)
            );
        }
        let dot = match &self.pipeline {
            Some(pipeline) => pipeline.evaluate(state, dot)
                .map_err(|err| err.at_line(self.line, &state.name))?,
            None => Value::Null
        };
        let vars = mem::replace(&mut state.vars, Stack::new(dot));
        let name = mem::replace(&mut state.name, self.name.clone());
        state.depth += 1;
        let result = target.render(state, &Dot::root(), out);
        state.depth -= 1;
        state.vars = vars;
        state.name = name;
        result?;
        Ok(Flow::Next)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::config::Config;

    fn render(text: &str, data: Value) -> Result<String, Error> {
        let library = Library::new(&Config::default()).unwrap();
        Template::parse("test", text, &library)?.execute(&data, &library)
    }

    #[test]
    fn text_and_values() {
        let result = render("hello, {{ .you }}!", json!({"you": "world"})).unwrap();
        assert_eq!(result, "hello, world!");
    }

    #[test]
    fn missing_key_is_fatal() {
        let error = render("a{{ .missing }}b", json!({})).unwrap_err();
        assert_eq!(
            error.to_string(),
            "template: test:1: executing \"test\" at <.missing>: map has no entry for key \"missing\""
        );
    }

    #[test]
    fn null_prints_no_value() {
        assert_eq!(render("{{ .a }}", json!({"a": null})).unwrap(), "<no value>");
    }

    #[test]
    fn if_else_chain() {
        let text = "{{ if eq .n 1 }}one{{ else if eq .n 2 }}two{{ else }}many{{ end }}";
        assert_eq!(render(text, json!({"n": 1})).unwrap(), "one");
        assert_eq!(render(text, json!({"n": 2})).unwrap(), "two");
        assert_eq!(render(text, json!({"n": 7})).unwrap(), "many");
    }

    #[test]
    fn with_changes_dot() {
        let text = "{{ with .a }}{{ .b }}{{ else }}none{{ end }}";
        assert_eq!(render(text, json!({"a": {"b": "x"}})).unwrap(), "x");
        assert_eq!(render(text, json!({"a": {}})).unwrap(), "none");
    }

    #[test]
    fn range_with_variables() {
        let text = "{{ range $i, $e := .list }}{{ $i }}={{ $e }};{{ end }}";
        assert_eq!(render(text, json!({"list": ["a", "b"]})).unwrap(), "0=a;1=b;");
        let text = "{{ range $k, $v := . }}{{ $k }}:{{ $v }} {{ end }}";
        assert_eq!(render(text, json!({"b": 2, "a": 1})).unwrap(), "a:1 b:2 ");
    }

    #[test]
    fn range_else_break_continue() {
        let text = "{{ range .list }}{{ if eq . 2 }}{{ continue }}{{ end }}{{ if eq . 4 }}{{ break }}{{ end }}{{ . }}{{ else }}empty{{ end }}";
        assert_eq!(render(text, json!({"list": [1, 2, 3, 4, 5]})).unwrap(), "13");
        assert_eq!(render(text, json!({"list": []})).unwrap(), "empty");
    }

    #[test]
    fn range_over_integer() {
        assert_eq!(render("{{ range 3 }}{{ . }}{{ end }}", json!({})).unwrap(), "012");
    }

    #[test]
    fn range_over_string_fails() {
        let error = render("{{ range .s }}{{ end }}", json!({"s": "abc"})).unwrap_err();
        assert!(error.message().ends_with("range can't iterate over abc"), "{}", error);
    }

    #[test]
    fn variables_scope_and_assign() {
        let text = "{{ $x := 1 }}{{ if true }}{{ $x = 2 }}{{ $y := 3 }}{{ end }}{{ $x }}";
        assert_eq!(render(text, json!({})).unwrap(), "2");
        let error = render("{{ if true }}{{ $y := 3 }}{{ end }}{{ $y }}", json!({})).unwrap_err();
        assert_eq!(error.message(), "template: test:1: undefined variable \"$y\"");
    }

    #[test]
    fn define_and_template() {
        let text = r#"{{ define "item" }}<{{ .name }}>{{ end }}{{ range .items }}{{ template "item" . }}{{ end }}"#;
        let data = json!({"items": [{"name": "a"}, {"name": "b"}]});
        assert_eq!(render(text, data).unwrap(), "<a><b>");
    }

    #[test]
    fn block_defines_and_calls() {
        let text = r#"{{ block "greeting" .who }}hi {{ . }}{{ end }}"#;
        assert_eq!(render(text, json!({"who": "you"})).unwrap(), "hi you");
    }

    #[test]
    fn missing_named_template() {
        let error = render(r#"{{ template "nope" }}"#, json!({})).unwrap_err();
        assert!(error.message().ends_with("no such template \"nope\""), "{}", error);
    }

    #[test]
    fn unbounded_recursion_is_an_error() {
        let text = r#"{{ define "loop" }}{{ template "loop" . }}{{ end }}{{ template "loop" . }}"#;
        let error = render(text, json!({})).unwrap_err();
        assert!(error.message().contains("exceeded maximum template depth"), "{}", error);
    }

    #[test]
    fn compile_errors() {
        for text in [
            "{{ end }}",
            "{{ else }}",
            "{{ if .a }}unterminated",
            "{{ break }}",
            "{{ if .a }}{{ define \"x\" }}{{ end }}{{ end }}",
            "{{ range .a }}{{ else }}{{ break }}{{ end }}",
            "{{ with .a }}{{ else if .b }}{{ end }}",
        ] {
            let error = render(text, json!({"a": 1})).unwrap_err();
            assert!(matches!(error, Error::TemplateCompile(_)), "{}: {}", text, error);
        }
    }

    #[test]
    fn compile_error_reports_line() {
        let error = render("line one\n{{ .a | }}", json!({})).unwrap_err();
        assert_eq!(error.message(), "template: test:2: missing value for command");
    }

    #[test]
    fn updates_write_back_to_variables() {
        let text = r#"{{ $d := dict }}{{ $_ := set $d "a" 1 }}{{ $d.a }}"#;
        assert_eq!(render(text, json!({})).unwrap(), "1");
        let text = r#"{{ $d := dict "a" 1 "b" 2 }}{{ $_ := unset $d "a" }}{{ $d }}"#;
        assert_eq!(render(text, json!({})).unwrap(), "map[b:2]");
    }

    #[test]
    fn updates_write_back_to_fields() {
        let text = "{{ $_ := merge .dst .src }}{{ .dst }}";
        let data = json!({"dst": {"a": 1}, "src": {"b": 2}});
        assert_eq!(render(text, data).unwrap(), "map[a:1 b:2]");
        let text = r#"{{ $_ := set . "k" "v" }}{{ .k }}"#;
        assert_eq!(render(text, json!({})).unwrap(), "v");
    }

    #[test]
    fn updates_through_with_and_range_dot() {
        let text = r#"{{ with .a }}{{ $_ := unset . "x" }}{{ .y }}{{ end }} {{ .a }}"#;
        assert_eq!(render(text, json!({"a": {"x": 1, "y": 2}})).unwrap(), "2 map[y:2]");
        let text = r#"{{ range $k, $v := .m }}{{ $_ := set . "k" $k }}{{ end }}{{ .m }}"#;
        let data = json!({"m": {"p": {}, "q": {}}});
        assert_eq!(render(text, data).unwrap(), "map[p:map[k:p] q:map[k:q]]");
    }

    #[test]
    fn updates_leave_caller_data_untouched() {
        let library = Library::new(&Config::default()).unwrap();
        let data = json!({"d": {}});
        let template = Template::parse("test", r#"{{ $_ := set .d "a" 1 }}{{ .d.a }}"#, &library).unwrap();
        assert_eq!(template.execute(&data, &library).unwrap(), "1");
        assert_eq!(template.execute(&data, &library).unwrap(), "1");
        assert_eq!(data, json!({"d": {}}));
    }

    #[test]
    fn trim_markers_remove_whitespace() {
        let text = "{{- range .list }}\n  {{ . }}\n{{- end }}";
        assert_eq!(render(text, json!({"list": [1, 2]})).unwrap(), "\n  1\n  2");
    }
}
