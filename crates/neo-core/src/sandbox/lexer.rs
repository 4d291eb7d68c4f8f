//! Tokenizer for the sandbox language.
//!
//! Produces a flat token stream with explicit `Newline`, `Indent` and `Dedent`
//! tokens. Newlines inside brackets are ignored, blank and comment-only lines
//! never produce tokens.

use std::fmt;

use super::faults::SyntaxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    And,
    Or,
    Not,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Def,
    Return,
    Break,
    Continue,
    Pass,
    Import,
    From,
    True,
    False,
    None,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Keyword> {
        let kw = match word {
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "not" => Keyword::Not,
            "if" => Keyword::If,
            "elif" => Keyword::Elif,
            "else" => Keyword::Else,
            "while" => Keyword::While,
            "for" => Keyword::For,
            "in" => Keyword::In,
            "def" => Keyword::Def,
            "return" => Keyword::Return,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            "pass" => Keyword::Pass,
            "import" => Keyword::Import,
            "from" => Keyword::From,
            "True" => Keyword::True,
            "False" => Keyword::False,
            "None" => Keyword::None,
            _ => return None,
        };
        Some(kw)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::If => "if",
            Keyword::Elif => "elif",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::For => "for",
            Keyword::In => "in",
            Keyword::Def => "def",
            Keyword::Return => "return",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::Pass => "pass",
            Keyword::Import => "import",
            Keyword::From => "from",
            Keyword::True => "True",
            Keyword::False => "False",
            Keyword::None => "None",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    Kw(Keyword),
    Op(&'static str),
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::Name(name) => write!(f, "'{}'", name),
            Tok::Int(n) => write!(f, "'{}'", n),
            Tok::Float(n) => write!(f, "'{}'", n),
            Tok::Str(_) => f.write_str("text"),
            Tok::Kw(kw) => write!(f, "'{}'", kw.as_str()),
            Tok::Op(op) => write!(f, "'{}'", op),
            Tok::Newline => f.write_str("end of line"),
            Tok::Indent => f.write_str("indent"),
            Tok::Dedent => f.write_str("dedent"),
            Tok::Eof => f.write_str("end of code"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: usize,
}

/// Longest operators first so that `**` wins over `*`.
const OPERATORS: &[&str] = &[
    "**", "//", "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=", "+", "-", "*", "/", "%", "<",
    ">", "=", "(", ")", "[", "]", ",", ":", ".", ";",
];

const TAB_WIDTH: usize = 8;

pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    tokens: Vec<Token>,
    indents: Vec<usize>,
    brackets: Vec<(char, usize)>,
    at_line_start: bool,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            tokens: Vec::new(),
            indents: vec![0],
            brackets: Vec::new(),
            at_line_start: true,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, tok: Tok) {
        self.tokens.push(Token {
            tok,
            line: self.line,
        });
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.line)
    }

    fn run(mut self) -> Result<Vec<Token>, SyntaxError> {
        loop {
            if self.at_line_start && self.brackets.is_empty() {
                if !self.indentation()? {
                    break;
                }
                continue;
            }

            let Some(c) = self.peek() else { break };
            match c {
                '\n' => {
                    self.pos += 1;
                    if self.brackets.is_empty() {
                        self.push(Tok::Newline);
                        self.at_line_start = true;
                    }
                    self.line += 1;
                }
                ' ' | '\t' | '\r' | '\x0c' => self.pos += 1,
                '#' => self.skip_comment(),
                '\\' if self.peek_at(1) == Some('\n') => {
                    self.pos += 2;
                    self.line += 1;
                }
                '"' | '\'' => self.string(c)?,
                c if c.is_ascii_digit() => self.number()?,
                '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.number()?,
                c if c.is_alphabetic() || c == '_' => self.word(),
                _ => self.operator(c)?,
            }
        }

        if let Some(&(open, line)) = self.brackets.last() {
            return Err(SyntaxError::new(
                format!("'{}' was never closed", open),
                line,
            ));
        }
        if !matches!(
            self.tokens.last(),
            None | Some(Token {
                tok: Tok::Newline,
                ..
            })
        ) {
            self.push(Tok::Newline);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(Tok::Dedent);
        }
        self.push(Tok::Eof);
        Ok(self.tokens)
    }

    /// Measures the indentation of a new logical line and emits the
    /// matching `Indent`/`Dedent` tokens. Returns `false` at end of input.
    fn indentation(&mut self) -> Result<bool, SyntaxError> {
        let mut width = 0;
        loop {
            match self.peek() {
                Some(' ') => width += 1,
                Some('\t') => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                Some('\r') | Some('\x0c') => {}
                _ => break,
            }
            self.pos += 1;
        }

        match self.peek() {
            None => return Ok(false),
            Some('\n') => {
                self.pos += 1;
                self.line += 1;
                return Ok(true);
            }
            Some('#') => {
                self.skip_comment();
                return Ok(true);
            }
            _ => {}
        }

        self.at_line_start = false;
        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.push(Tok::Indent);
        } else if width < current {
            while self.indents.last().is_some_and(|&w| w > width) {
                self.indents.pop();
                self.push(Tok::Dedent);
            }
            if self.indents.last() != Some(&width) {
                return Err(self.error(
                    "this line's indentation doesn't line up with any line above it",
                ));
            }
        }
        Ok(true)
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.pos += 1;
        }
    }

    fn word(&mut self) {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match Keyword::from_word(&word) {
            Some(kw) => self.push(Tok::Kw(kw)),
            None => self.push(Tok::Name(word)),
        }
    }

    fn number(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        let mut is_float = false;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.pos += 1;
        }
        if self.peek() == Some('.') {
            is_float = true;
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some('+') | Some('-')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += 1 + sign;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        if self.peek().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return Err(self.error("a name can't start with a number"));
        }

        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        if is_float {
            let value = text
                .parse::<f64>()
                .map_err(|_| self.error(format!("'{}' is not a valid number", text)))?;
            self.push(Tok::Float(value));
        } else {
            let value = text
                .parse::<i64>()
                .map_err(|_| self.error(format!("the number {} is too big", text)))?;
            self.push(Tok::Int(value));
        }
        Ok(())
    }

    fn string(&mut self, quote: char) -> Result<(), SyntaxError> {
        let start_line = self.line;
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut text = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(SyntaxError::new(
                    "this text is missing its closing quote",
                    start_line,
                ));
            };
            if c == quote {
                if !triple {
                    self.pos += 1;
                    break;
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    self.pos += 3;
                    break;
                }
            }
            if c == '\n' {
                if !triple {
                    return Err(SyntaxError::new(
                        "this text is missing its closing quote",
                        start_line,
                    ));
                }
                self.line += 1;
            }
            self.pos += 1;

            if c != '\\' {
                text.push(c);
                continue;
            }
            let Some(escaped) = self.peek() else { continue };
            self.pos += 1;
            match escaped {
                'n' => text.push('\n'),
                't' => text.push('\t'),
                'r' => text.push('\r'),
                '0' => text.push('\0'),
                '\\' => text.push('\\'),
                '\'' => text.push('\''),
                '"' => text.push('"'),
                '\n' => self.line += 1,
                other => {
                    text.push('\\');
                    text.push(other);
                }
            }
        }

        self.tokens.push(Token {
            tok: Tok::Str(text),
            line: start_line,
        });
        Ok(())
    }

    fn operator(&mut self, c: char) -> Result<(), SyntaxError> {
        let op = OPERATORS.iter().find(|op| {
            op.chars()
                .enumerate()
                .all(|(i, ch)| self.peek_at(i) == Some(ch))
        });
        let Some(&op) = op else {
            return Err(self.error(format!("the character '{}' isn't allowed here", c)));
        };

        match op {
            "(" | "[" => self.brackets.push((c, self.line)),
            ")" | "]" => {
                let expected = if op == ")" { '(' } else { '[' };
                match self.brackets.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, _)) => {
                        return Err(self.error(format!(
                            "'{}' doesn't match the opening '{}'",
                            op, open
                        )))
                    }
                    None => return Err(self.error(format!("unmatched '{}'", op))),
                }
            }
            _ => {}
        }
        self.pos += op.len();
        self.push(Tok::Op(op));
        Ok(())
    }
}
