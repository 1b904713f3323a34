//! Turns the items of one action into a [`Pipeline`].
use crate::funcs::Library;
use crate::lexer::Item;
use crate::pipeline::{Command, Operand, Pipeline};
use crate::value::{Value, ValueExt};


pub(crate) const KEYWORDS: [&str; 10] = [
    "if", "else", "end", "range", "with", "define", "template", "block", "break", "continue"
];


pub(crate) struct Items {
    items: Vec<Item>,
    pos: usize
}

impl Items {
    pub(crate) fn new(items: Vec<Item>) -> Self {
        Items { items, pos: 0 }
    }

    fn skip_space(&mut self) {
        while let Some(Item::Space) = self.items.get(self.pos) {
            self.pos += 1;
        }
    }

    fn peek_raw(&self) -> Option<&Item> {
        self.items.get(self.pos)
    }

    fn peek(&mut self) -> Option<&Item> {
        self.skip_space();
        self.items.get(self.pos)
    }

    fn next(&mut self) -> Option<Item> {
        self.skip_space();
        let item = self.items.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    /// Consumes a leading control keyword.
    pub(crate) fn keyword(&mut self) -> Option<&'static str> {
        let keyword = match self.peek() {
            Some(Item::Identifier(name)) => KEYWORDS.iter().copied().find(|k| *k == name.as_str()),
            _ => None
        };
        if keyword.is_some() {
            self.pos += 1;
        }
        keyword
    }

    pub(crate) fn is_done(&mut self) -> bool {
        self.peek().is_none()
    }

    pub(crate) fn expect_done(&mut self, context: &str) -> Result<(), String> {
        match self.peek() {
            None => Ok(()),
            Some(item) => Err(format!("unexpected {} in {}", describe(item), context))
        }
    }

    pub(crate) fn string(&mut self, context: &str) -> Result<String, String> {
        match self.next() {
            Some(Item::Str(s)) => Ok(s),
            Some(item) => Err(format!("unexpected {} in {}", describe(&item), context)),
            None => Err(format!("missing name in {}", context))
        }
    }

    /// Parses a pipeline running to the end of the action, or to the right
    /// paren closing it.
    pub(crate) fn pipeline(
        &mut self, library: &Library, vars: &mut Vec<String>, context: &str, max_declarations: usize
    ) -> Result<Pipeline, String> {
        let (declarations, is_assign) = self.declarations(vars, context, max_declarations)?;
        let mut commands = Vec::new();
        loop {
            commands.push(self.command(library, vars, context)?);
            match self.peek() {
                Some(Item::Pipe) => self.pos += 1,
                _ => break
            }
        }
        Ok(Pipeline { declarations, is_assign, commands })
    }

    fn declarations(
        &mut self, vars: &mut Vec<String>, context: &str, max: usize
    ) -> Result<(Vec<String>, bool), String> {
        let start = self.pos;
        let mut names = Vec::new();
        loop {
            match self.next() {
                Some(Item::Variable(name)) => names.push(name),
                _ => break
            }
            match self.next() {
                Some(Item::Comma) => continue,
                Some(Item::Declare) => {
                    if names.len() > max {
                        return Err(format!("too many declarations in {}", context));
                    }
                    vars.extend(names.iter().cloned());
                    return Ok((names, false));
                },
                Some(Item::Assign) => {
                    if names.len() > max {
                        return Err(format!("too many declarations in {}", context));
                    }
                    if let Some(name) = names.iter().find(|name| !vars.contains(name)) {
                        return Err(format!("undefined variable {:?}", name));
                    }
                    return Ok((names, true));
                },
                _ => break
            }
        }
        self.pos = start;
        Ok((Vec::new(), false))
    }

    fn command(
        &mut self, library: &Library, vars: &mut Vec<String>, context: &str
    ) -> Result<Command, String> {
        let mut args = Vec::new();
        loop {
            self.skip_space();
            match self.peek_raw() {
                None | Some(Item::Pipe) | Some(Item::RightParen) => break,
                _ => {}
            }
            args.push(self.operand(library, vars, context)?);
            match self.peek_raw() {
                None | Some(Item::Space) | Some(Item::Pipe) | Some(Item::RightParen) => {},
                Some(item) => return Err(format!("unexpected {} in operand", describe(item)))
            }
        }
        match args.first() {
            None => Err(format!("missing value for {}", context)),
            Some(Operand::Nil) => Err("nil is not a command".to_owned()),
            Some(_) => Ok(Command { args })
        }
    }

    fn operand(
        &mut self, library: &Library, vars: &mut Vec<String>, context: &str
    ) -> Result<Operand, String> {
        let item = match self.next() {
            Some(item) => item,
            None => return Err(format!("missing value for {}", context))
        };
        let operand = match item {
            Item::Dot => Operand::Dot,
            Item::Field(name) => {
                let mut chain = vec![name];
                chain.extend(self.chain());
                return Ok(Operand::Field(chain));
            },
            Item::Variable(name) => {
                if !vars.contains(&name) {
                    return Err(format!("undefined variable {:?}", name));
                }
                let chain = self.chain();
                return Ok(Operand::Variable(name, chain));
            },
            Item::LeftParen => {
                let pipeline = self.pipeline(library, vars, "parenthesized pipeline", 1)?;
                match self.next() {
                    Some(Item::RightParen) => {},
                    _ => return Err("unclosed left paren".to_owned())
                }
                let chain = self.chain();
                return Ok(Operand::Pipeline(Box::new(pipeline), chain));
            },
            Item::Identifier(name) => {
                if KEYWORDS.contains(&name.as_str()) {
                    return Err(format!("unexpected <{}> in {}", name, context));
                }
                if !library.contains(&name) {
                    return Err(format!("function {:?} not defined", name));
                }
                Operand::Function(name)
            },
            Item::Str(s) => Operand::Literal(Value::String(s)),
            Item::Number(n) => Operand::Literal(n),
            Item::Bool(b) => Operand::Literal(Value::Bool(b)),
            Item::Nil => Operand::Nil,
            other => return Err(format!("unexpected {} in {}", describe(&other), context))
        };
        if let Some(Item::Field(name)) = self.peek_raw() {
            return Err(format!("unexpected .{} after term {}", name, operand));
        }
        Ok(operand)
    }

    fn chain(&mut self) -> Vec<String> {
        let mut chain = Vec::new();
        while let Some(Item::Field(name)) = self.peek_raw() {
            chain.push(name.clone());
            self.pos += 1;
        }
        chain
    }
}


fn describe(item: &Item) -> String {
    match item {
        Item::Space => "space".to_owned(),
        Item::Dot => "<.>".to_owned(),
        Item::Field(name) => format!("<.{}>", name),
        Item::Variable(name) => format!("<{}>", name),
        Item::Identifier(name) => format!("<{}>", name),
        Item::Str(s) => format!("{:?}", s),
        Item::Number(n) => format!("<{}>", n.to_display()),
        Item::Bool(b) => format!("<{}>", b),
        Item::Nil => "<nil>".to_owned(),
        Item::LeftParen => "\"(\"".to_owned(),
        Item::RightParen => "\")\"".to_owned(),
        Item::Pipe => "\"|\"".to_owned(),
        Item::Declare => "\":=\"".to_owned(),
        Item::Assign => "\"=\"".to_owned(),
        Item::Comma => "\",\"".to_owned(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::lexer::lex;

    fn parse(text: &str, vars: &mut Vec<String>) -> Result<Pipeline, String> {
        let library = Library::new(&Config::default()).unwrap();
        let mut items = Items::new(lex(text)?);
        let pipeline = items.pipeline(&library, vars, "command", 1)?;
        items.expect_done("command")?;
        Ok(pipeline)
    }

    #[test]
    fn commands_and_pipes() {
        let pipeline = parse(r#"index .a "b" | upper | printf "%s!""#, &mut vec!["$".to_owned()]).unwrap();
        assert_eq!(pipeline.commands.len(), 3);
        assert_eq!(pipeline.to_string(), r#"index .a "b" | upper | printf "%s!""#);
    }

    #[test]
    fn declaration_enters_scope() {
        let mut vars = vec!["$".to_owned()];
        let pipeline = parse("$x := .a", &mut vars).unwrap();
        assert_eq!(pipeline.declarations, vec!["$x".to_owned()]);
        assert!(!pipeline.is_assign);
        assert_eq!(vars, vec!["$".to_owned(), "$x".to_owned()]);
    }

    #[test]
    fn assignment_needs_declared_variable() {
        let mut vars = vec!["$".to_owned()];
        assert_eq!(parse("$x = 1", &mut vars).unwrap_err(), "undefined variable \"$x\"");
        vars.push("$x".to_owned());
        assert!(parse("$x = 1", &mut vars).unwrap().is_assign);
    }

    #[test]
    fn parenthesized_with_chain() {
        let pipeline = parse("(fromYaml .text).name", &mut vec!["$".to_owned()]).unwrap();
        assert_eq!(pipeline.to_string(), "(fromYaml .text).name");
    }

    #[test]
    fn variable_used_as_operand() {
        let pipeline = parse("$.a", &mut vec!["$".to_owned()]).unwrap();
        assert!(pipeline.declarations.is_empty());
        assert_eq!(pipeline.to_string(), "$.a");
    }

    #[test]
    fn errors() {
        let mut vars = vec!["$".to_owned()];
        assert_eq!(parse("env \"HOME\"", &mut vars).unwrap_err(), "function \"env\" not defined");
        assert_eq!(parse("$y", &mut vars).unwrap_err(), "undefined variable \"$y\"");
        assert_eq!(parse("nil", &mut vars).unwrap_err(), "nil is not a command");
        assert_eq!(parse(".a |", &mut vars).unwrap_err(), "missing value for command");
        assert_eq!(parse("(len .a", &mut vars).unwrap_err(), "unclosed left paren");
        assert_eq!(parse("len .a)", &mut vars).unwrap_err(), "unexpected \")\" in command");
        assert_eq!(parse("$a, $b := .x", &mut vars).unwrap_err(), "too many declarations in command");
        assert!(parse("\"s\".x", &mut vars).is_err());
        assert!(parse("len(.a)", &mut vars).is_err());
    }
}
