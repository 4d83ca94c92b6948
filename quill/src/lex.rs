//! Lexer for Quill
use crate::{Error, Result};

/// Parsed tokens from snippet text
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Num(f64),
    Str(String),
    /// Template literal split into literal text and `${...}` source chunks
    Template(Vec<Chunk>),
    /// Identifiers and keywords
    Ident(String),
    Punct(&'static str),
}

/// A piece of a template literal
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Str(String),
    Expr(String),
}

/// A token with its source position
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub line: usize,
    /// Whether a line terminator separates this token from the previous one
    pub newline_before: bool,
}

/// Punctuators, longest first so the lexer can take the longest match
const PUNCTS: &[&str] = &[
    "===", "!==", "...", "**", "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--",
    "+=", "-=", "*=", "/=", "%=", "+", "-", "*", "/", "%", "<", ">", "=", "!", "?", ":", ".", ",",
    ";", "(", ")", "[", "]", "{", "}",
];

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Num(n) => write!(f, "{n}"),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Template(_) => write!(f, "template literal"),
            Token::Ident(s) => write!(f, "{s}"),
            Token::Punct(p) => write!(f, "{p}"),
        }
    }
}

/// Tokenize entire snippet text
pub(crate) fn lex(text: &str) -> Result<Vec<Lexeme>> {
    Tokens::new(text).collect()
}

/// An iterator over lexemes
struct Tokens {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Tokens {
    fn new(text: &str) -> Self {
        Tokens {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn err(&self, msg: impl std::fmt::Display) -> Error {
        Error::Syntax(format!("{msg} (line {})", self.line))
    }

    /// Skip whitespace and comments, returning whether a newline was crossed
    fn skip_trivia(&mut self) -> Result<bool> {
        let mut newline = false;
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some('\n'), _) => {
                    newline = true;
                    self.bump();
                }
                (Some(ch), _) if ch.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(ch), _) => {
                                if ch == '\n' {
                                    newline = true;
                                }
                                self.bump();
                            }
                            (None, _) => return Err(self.err("Unterminated comment")),
                        }
                    }
                }
                _ => return Ok(newline),
            }
        }
    }

    fn next_number(&mut self) -> Result<Token> {
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.bump();
            self.bump();
            let digits: String = std::iter::from_fn(|| {
                let ch = self.peek().filter(|c| c.is_ascii_hexdigit())?;
                self.bump();
                Some(ch)
            })
            .collect();
            return i64::from_str_radix(&digits, 16)
                .map(|n| Token::Num(n as f64))
                .map_err(|_| self.err(format!("Invalid hex literal 0x{digits}")));
        }

        let mut text = String::new();
        while let Some(ch) = self.peek() {
            let is_exp_sign = (ch == '+' || ch == '-') && matches!(text.chars().last(), Some('e') | Some('E'));
            if ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E' || ch == '_' || is_exp_sign {
                if ch == '.' && !self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) && text.contains('.') {
                    break;
                }
                if ch == '.' && self.peek_at(1) == Some('.') {
                    break;
                }
                self.bump();
                if ch != '_' {
                    text.push(ch);
                }
            } else {
                break;
            }
        }
        text.parse::<f64>()
            .map(Token::Num)
            .map_err(|_| self.err(format!("Invalid number literal {text}")))
    }

    fn next_escape(&mut self) -> Result<char> {
        let ch = self.bump().ok_or_else(|| self.err("Unterminated escape sequence"))?;
        let escaped = match ch {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            'u' => {
                let hex: String = (0..4).filter_map(|_| self.bump()).collect();
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.err(format!("Invalid unicode escape \\u{hex}")))?
            }
            other => other,
        };
        Ok(escaped)
    }

    fn next_string(&mut self) -> Result<Token> {
        let quote = self.bump().ok_or_else(|| self.err("Expected opening string quotation"))?;
        let mut s = String::new();
        loop {
            match self.bump() {
                Some('\\') => s.push(self.next_escape()?),
                Some(ch) if ch == quote => return Ok(Token::Str(s)),
                Some('\n') | None => return Err(self.err("Unterminated string literal")),
                Some(ch) => s.push(ch),
            }
        }
    }

    fn next_template(&mut self) -> Result<Token> {
        self.bump(); // opening backtick
        let mut chunks = vec![];
        let mut buf = String::new();
        loop {
            match self.bump() {
                Some('`') => break,
                Some('\\') => buf.push(self.next_escape()?),
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    if !buf.is_empty() {
                        chunks.push(Chunk::Str(std::mem::take(&mut buf)));
                    }
                    chunks.push(Chunk::Expr(self.template_expr()?));
                }
                Some(ch) => buf.push(ch),
                None => return Err(self.err("Unterminated template literal")),
            }
        }
        if !buf.is_empty() || chunks.is_empty() {
            chunks.push(Chunk::Str(buf));
        }
        Ok(Token::Template(chunks))
    }

    /// Collect the source of a `${...}` substitution up to its closing brace
    fn template_expr(&mut self) -> Result<String> {
        let mut src = String::new();
        let mut depth = 0usize;
        loop {
            let ch = self
                .bump()
                .ok_or_else(|| self.err("Unterminated template substitution"))?;
            match ch {
                '{' => depth += 1,
                '}' if depth == 0 => return Ok(src),
                '}' => depth -= 1,
                '\'' | '"' | '`' => {
                    src.push(ch);
                    let mut escaped = false;
                    loop {
                        let inner = self
                            .bump()
                            .ok_or_else(|| self.err("Unterminated template substitution"))?;
                        src.push(inner);
                        if escaped {
                            escaped = false;
                        } else if inner == '\\' {
                            escaped = true;
                        } else if inner == ch {
                            break;
                        }
                    }
                    continue;
                }
                _ => (),
            }
            src.push(ch);
        }
    }

    fn next_ident(&mut self) -> Token {
        let ident: String = std::iter::from_fn(|| {
            let ch = self.peek().filter(|c| is_ident_char(*c))?;
            self.bump();
            Some(ch)
        })
        .collect();
        Token::Ident(ident)
    }

    fn next_punct(&mut self) -> Result<Token> {
        for p in PUNCTS {
            let matches = p
                .chars()
                .enumerate()
                .all(|(i, ch)| self.peek_at(i) == Some(ch));
            if !matches {
                continue;
            }
            // `a?.5:1` is a conditional, not optional chaining
            if *p == "?." && self.peek_at(2).is_some_and(|c| c.is_ascii_digit()) {
                continue;
            }
            for _ in 0..p.len() {
                self.bump();
            }
            return Ok(Token::Punct(p));
        }
        let ch = self.peek().unwrap_or_default();
        Err(self.err(format!("Unexpected character '{ch}'")))
    }
}

impl Iterator for Tokens {
    type Item = Result<Lexeme>;

    fn next(&mut self) -> Option<Self::Item> {
        let newline_before = match self.skip_trivia() {
            Ok(n) => n,
            Err(e) => return Some(Err(e)),
        };
        let ch = self.peek()?;
        let line = self.line;
        let token = match ch {
            '"' | '\'' => self.next_string(),
            '`' => self.next_template(),
            _ if ch.is_ascii_digit() => self.next_number(),
            '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.next_number(),
            _ if is_ident_start(ch) => Ok(self.next_ident()),
            _ => self.next_punct(),
        };
        Some(token.map(|token| Lexeme {
            token,
            line,
            newline_before,
        }))
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}
