use crate::value::Value;


#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    Space,
    Dot,
    Field(String),
    Variable(String),
    Identifier(String),
    Str(String),
    Number(Value),
    Bool(bool),
    Nil,
    LeftParen,
    RightParen,
    Pipe,
    Declare,
    Assign,
    Comma,
}


/// Splits the text of one action into items.
pub(crate) fn lex(text: &str) -> Result<Vec<Item>, String> {
    let mut lexer = Lexer {
        chars: text.chars().collect(),
        pos: 0,
        items: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.items)
}


struct Lexer {
    chars: Vec<char>,
    pos: usize,
    items: Vec<Item>,
}

impl Lexer {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(&mut self) -> Result<(), String> {
        while let Some(c) = self.peek(0) {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    while self.peek(0).is_some_and(char::is_whitespace) {
                        self.pos += 1;
                    }
                    self.items.push(Item::Space);
                },
                '.' => {
                    if self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
                        self.number()?;
                    } else {
                        self.pos += 1;
                        match self.identifier() {
                            name if name.is_empty() => self.items.push(Item::Dot),
                            name => self.items.push(Item::Field(name)),
                        }
                    }
                },
                '$' => {
                    self.pos += 1;
                    let name = self.identifier();
                    self.items.push(Item::Variable(format!("${}", name)));
                },
                '"' => {
                    self.pos += 1;
                    let s = self.quoted('"')?;
                    self.items.push(Item::Str(s));
                },
                '`' => {
                    self.pos += 1;
                    let start = self.pos;
                    while self.peek(0).is_some_and(|c| c != '`') {
                        self.pos += 1;
                    }
                    if self.peek(0).is_none() {
                        return Err("unterminated raw quoted string".to_owned());
                    }
                    let s = self.chars[start..self.pos].iter().collect::<String>();
                    self.pos += 1;
                    self.items.push(Item::Str(s));
                },
                '\'' => {
                    self.pos += 1;
                    let s = self.quoted('\'')?;
                    let mut chars = s.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => self.items.push(Item::Number(Value::from(c as u32))),
                        _ => return Err(format!("malformed character constant: '{}'", s)),
                    }
                },
                '(' => self.single(Item::LeftParen),
                ')' => self.single(Item::RightParen),
                '|' => self.single(Item::Pipe),
                ',' => self.single(Item::Comma),
                '=' => self.single(Item::Assign),
                ':' if self.peek(1) == Some('=') => {
                    self.pos += 2;
                    self.items.push(Item::Declare);
                },
                '+' | '-' if self.peek(1).is_some_and(|c| c.is_ascii_digit() || c == '.') => {
                    self.number()?;
                },
                c if c.is_ascii_digit() => self.number()?,
                c if c.is_alphabetic() || c == '_' => {
                    let item = match self.identifier().as_str() {
                        "true" => Item::Bool(true),
                        "false" => Item::Bool(false),
                        "nil" => Item::Nil,
                        name => Item::Identifier(name.to_owned()),
                    };
                    self.items.push(item);
                },
                c => return Err(format!("unrecognized character in action: {:?}", c)),
            }
        }
        Ok(())
    }

    fn single(&mut self, item: Item) {
        self.pos += 1;
        self.items.push(item);
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while self.peek(0).is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn number(&mut self) -> Result<(), String> {
        let start = self.pos;
        if matches!(self.peek(0), Some('+') | Some('-')) {
            self.pos += 1;
        }
        let is_hex = self.peek(0) == Some('0') && matches!(self.peek(1), Some('x') | Some('X'));
        if is_hex {
            self.pos += 2;
        }
        while let Some(c) = self.peek(0) {
            let accept = if is_hex {
                c.is_ascii_hexdigit() || c == '_'
            } else if c == 'e' || c == 'E' {
                if matches!(self.peek(1), Some('+') | Some('-')) {
                    self.pos += 1;
                }
                true
            } else {
                c.is_ascii_digit() || c == '.' || c == '_'
            };
            if !accept {
                break;
            }
            self.pos += 1;
        }
        let text = self.chars[start..self.pos].iter().collect::<String>();
        if self.peek(0).is_some_and(|c| c.is_alphanumeric()) {
            return Err(format!("bad number syntax: {:?}", text));
        }
        let item = parse_number(&text).ok_or_else(|| format!("bad number syntax: {:?}", text))?;
        self.items.push(Item::Number(item));
        Ok(())
    }

    fn quoted(&mut self, quote: char) -> Result<String, String> {
        let mut s = String::new();
        loop {
            let c = self.peek(0).ok_or_else(|| "unterminated quoted string".to_owned())?;
            self.pos += 1;
            match c {
                c if c == quote => return Ok(s),
                '\\' => s.push(self.escape()?),
                c => s.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char, String> {
        let c = self.peek(0).ok_or_else(|| "unterminated quoted string".to_owned())?;
        self.pos += 1;
        let digits = match c {
            'n' => return Ok('\n'),
            't' => return Ok('\t'),
            'r' => return Ok('\r'),
            'a' => return Ok('\u{7}'),
            'b' => return Ok('\u{8}'),
            'f' => return Ok('\u{c}'),
            'v' => return Ok('\u{b}'),
            '0' => return Ok('\0'),
            '\\' | '"' | '\'' => return Ok(c),
            'x' => 2,
            'u' => 4,
            'U' => 8,
            c => return Err(format!("unknown escape sequence: \\{}", c)),
        };
        let end = self.pos + digits;
        let hex = self.chars.get(self.pos..end)
            .ok_or_else(|| "unterminated quoted string".to_owned())?
            .iter()
            .collect::<String>();
        self.pos = end;
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| format!("invalid escape sequence: \\{}{}", c, hex))
    }
}


fn parse_number(text: &str) -> Option<Value> {
    let cleaned = text.replace('_', "");
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        let n = i64::from_str_radix(hex, 16).ok()?;
        return Some(Value::from(if negative { -n } else { n }));
    }
    if !digits.contains(['.', 'e', 'E']) {
        if let Ok(n) = cleaned.trim_start_matches('+').parse::<i64>() {
            return Some(Value::from(n));
        }
    }
    let f = cleaned.parse::<f64>().ok()?;
    serde_json::Number::from_f64(f).map(Value::Number)
}
