//! Splits template source into text and action tokens.
//!
//! Trim markers are applied here: `{{- ` removes the whitespace ending the
//! text before the action, ` -}}` the whitespace starting the text after it.

#[derive(Clone)]
pub(crate) struct Reader<'a> {
    input: &'a str,
    open_delimiter: &'a str,
    close_delimiter: &'a str,
    pos: usize,
    line: usize,
    trim_next: bool
}

impl<'a> Reader<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Reader {
            input,
            open_delimiter: "{{",
            close_delimiter: "}}",
            pos: 0,
            line: 1,
            trim_next: false
        }
    }

    pub(crate) fn pop_front(&mut self) -> Option<Token<'a>> {
        while self.pos < self.input.len() {
            let tail = &self.input[self.pos..];
            let token = if tail.starts_with(self.open_delimiter) {
                self.read_tag(tail)
            } else {
                self.read_text(tail)
            };
            match token {
                Token::Text("", _) => continue,
                token => return Some(token)
            }
        }
        None
    }

    fn read_text(&mut self, tail: &'a str) -> Token<'a> {
        let line = self.line;
        let after_text = tail.find(self.open_delimiter).unwrap_or(tail.len());
        let mut text = &tail[..after_text];
        if self.trim_next {
            text = text.trim_start_matches(is_space);
            self.trim_next = false;
        }
        if tail[after_text..].has_left_trim(self.open_delimiter) {
            text = text.trim_end_matches(is_space);
        }
        self.advance(after_text);
        Token::Text(text, line)
    }

    fn read_tag(&mut self, tail: &'a str) -> Token<'a> {
        let line = self.line;
        let mut start = self.open_delimiter.len();
        if tail.has_left_trim(self.open_delimiter) {
            start += 2;
        }
        let body = &tail[start..];
        let span = if body.trim_start().starts_with("/*") {
            body.span_comment(self.close_delimiter)
        } else {
            body.span_action(self.close_delimiter)
        };
        let (end, after) = match span {
            Ok(span) => span,
            Err(message) => {
                self.pos = self.input.len();
                return Token::Error(message, line);
            }
        };
        let mut text = &body[..end];
        self.trim_next = false;
        if text.has_right_trim() {
            text = &text[..text.len() - 1];
            self.trim_next = true;
        }
        self.advance(start + after);
        let text = text.trim();
        if text.starts_with("/*") {
            Token::Comment(line)
        } else if text.is_empty() {
            Token::Error("missing value for command".to_owned(), line)
        } else {
            Token::Action(text, line)
        }
    }

    fn advance(&mut self, len: usize) {
        self.line += self.input[self.pos..self.pos + len].matches('\n').count();
        self.pos += len;
    }
}


#[derive(PartialEq, Debug)]
pub(crate) enum Token<'a> {
    Text(&'a str, usize),
    Action(&'a str, usize),
    Comment(usize),
    Error(String, usize)
}


fn is_space(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\r' || c == '\n'
}


trait ReaderStringOps {
    fn has_left_trim(&self, open_delimiter: &str) -> bool;
    fn has_right_trim(&self) -> bool;
    fn span_action(&self, close_delimiter: &str) -> Result<(usize, usize), String>;
    fn span_comment(&self, close_delimiter: &str) -> Result<(usize, usize), String>;
}

impl ReaderStringOps for str {
    // a tag opening with "{{-" followed by a space
    fn has_left_trim(&self, open_delimiter: &str) -> bool {
        let mut rest = match self.strip_prefix(open_delimiter) {
            Some(rest) => rest.chars(),
            None => return false
        };
        rest.next() == Some('-') && rest.next().is_some_and(is_space)
    }

    // action text ending with a space followed by "-"
    fn has_right_trim(&self) -> bool {
        let mut rest = self.chars().rev();
        rest.next() == Some('-') && rest.next().is_some_and(is_space)
    }

    // return the end of the action text and the position after the close
    // delimiter, skipping over quoted text
    fn span_action(&self, close_delimiter: &str) -> Result<(usize, usize), String> {
        let mut chars = self.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' | '\'' => {
                    let mut closed = false;
                    while let Some((_, q)) = chars.next() {
                        match q {
                            '\\' => {
                                chars.next();
                            },
                            '\n' => break,
                            q if q == c => {
                                closed = true;
                                break;
                            },
                            _ => {}
                        }
                    }
                    if !closed {
                        return Err("unterminated quoted string".to_owned());
                    }
                },
                '`' => {
                    if !chars.any(|(_, q)| q == '`') {
                        return Err("unterminated raw quoted string".to_owned());
                    }
                },
                _ if self[i..].starts_with(close_delimiter) => {
                    return Ok((i, i + close_delimiter.len()));
                },
                _ => {}
            }
        }
        Err("unclosed action".to_owned())
    }

    fn span_comment(&self, close_delimiter: &str) -> Result<(usize, usize), String> {
        let end = match self.find("*/") {
            Some(p) => p + 2,
            None => return Err("unclosed comment".to_owned())
        };
        let rest = &self[end..];
        let closing = rest.trim_start_matches(is_space);
        let closing = match closing.strip_prefix('-') {
            Some(after) if rest.len() > closing.len() => after,
            _ => closing
        };
        if closing.starts_with(close_delimiter) {
            let end = self.len() - closing.len();
            Ok((end, end + close_delimiter.len()))
        } else {
            Err("comment ends before closing delimiter".to_owned())
        }
    }
}
