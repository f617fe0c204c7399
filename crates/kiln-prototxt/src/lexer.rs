use crate::error::{ParseError, ParseResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident(String),
    Number(String),
    /// Quoted string, quotes and escapes kept as written.
    Str(String),
    Punct(char),
    /// Comment text after the `#`.
    Comment(String),
    Eof,
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

const PUNCTUATION: &[char] = &[':', '{', '}', '<', '>', '[', ']', ',', ';'];

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

pub(crate) fn tokenize(input: &str) -> ParseResult<Vec<Token>> {
    let mut lexer = Lexer { chars: input.chars().collect(), pos: 0, line: 1, column: 1 };
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn next_token(&mut self) -> ParseResult<Token> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }

        let (line, column) = (self.line, self.column);
        let token = |kind| Token { kind, line, column };

        let Some(ch) = self.peek() else {
            return Ok(token(TokenKind::Eof));
        };

        if ch == '#' {
            self.bump();
            let mut text = String::new();
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                text.push(c);
                self.bump();
            }
            return Ok(token(TokenKind::Comment(text.trim_end().to_string())));
        }

        if ch == '"' || ch == '\'' {
            return self.string(ch).map(|raw| token(TokenKind::Str(raw)));
        }

        if PUNCTUATION.contains(&ch) {
            self.bump();
            return Ok(token(TokenKind::Punct(ch)));
        }

        if ch == '-' || ch == '+' {
            // `-inf` and friends lex as identifiers, `-0.5` as a number
            if self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) {
                let mut raw = String::new();
                raw.push(ch);
                self.bump();
                raw.push_str(&self.identifier());
                return Ok(token(TokenKind::Ident(raw)));
            }
            if self.peek_at(1).is_some_and(|c| c.is_ascii_digit() || c == '.') {
                return Ok(token(TokenKind::Number(self.number())));
            }
            return Err(ParseError::new(line, column, format!("unexpected character '{ch}'")));
        }

        if ch.is_ascii_digit() || (ch == '.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())) {
            return Ok(token(TokenKind::Number(self.number())));
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            return Ok(token(TokenKind::Ident(self.identifier())));
        }

        Err(ParseError::new(line, column, format!("unexpected character '{ch}'")))
    }

    fn identifier(&mut self) -> String {
        let mut raw = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                raw.push(c);
                self.bump();
            } else {
                break;
            }
        }
        raw
    }

    fn number(&mut self) -> String {
        let mut raw = String::new();
        if let Some(sign) = self.peek().filter(|c| *c == '-' || *c == '+') {
            raw.push(sign);
            self.bump();
        }
        while let Some(c) = self.peek() {
            let exponent_sign =
                (c == '-' || c == '+') && raw.ends_with(|e: char| e == 'e' || e == 'E') && !raw.starts_with("0x");
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign {
                raw.push(c);
                self.bump();
            } else {
                break;
            }
        }
        raw
    }

    fn string(&mut self, quote: char) -> ParseResult<String> {
        let (line, column) = (self.line, self.column);
        let mut raw = String::new();
        raw.push(quote);
        self.bump();
        loop {
            match self.bump() {
                Some('\\') => {
                    raw.push('\\');
                    match self.bump() {
                        Some('\n') | None => break,
                        Some(escaped) => raw.push(escaped),
                    }
                }
                Some(c) if c == quote => {
                    raw.push(c);
                    return Ok(raw);
                }
                Some('\n') | None => break,
                Some(c) => raw.push(c),
            }
        }
        Err(ParseError::new(line, column, "unterminated string literal"))
    }
}
