use crate::document::{Field, Message, Scalar, ScalarKind, Value};
use crate::error::{ParseError, ParseResult};
use crate::lexer::{Token, TokenKind};

/// Deepest allowed `{`/`<` nesting, as in protobuf's text parser.
pub(crate) const MAX_NESTING_DEPTH: usize = 100;

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Line of the last consumed non-comment token.
    prev_line: usize,
    depth: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0, prev_line: 0, depth: 0 }
    }

    pub(crate) fn parse_document(mut self) -> ParseResult<Message> {
        self.parse_fields(None)
    }

    fn peek(&self) -> &Token {
        // tokenize always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        if !matches!(token.kind, TokenKind::Comment(_)) {
            self.prev_line = token.line;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let token = self.peek();
        ParseError::new(token.line, token.column, message)
    }

    fn eat_punct(&mut self, ch: char) -> bool {
        if self.peek().kind == TokenKind::Punct(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_comments(&mut self) {
        while matches!(self.peek().kind, TokenKind::Comment(_)) {
            self.advance();
        }
    }

    fn parse_fields(&mut self, close: Option<char>) -> ParseResult<Message> {
        let mut message = Message::new();
        let mut pending = Vec::new();

        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Comment(text) => {
                    self.advance();
                    let same_line = token.line == self.prev_line && pending.is_empty();
                    match message.fields_mut().last_mut() {
                        Some(last) if same_line && last.trailing_comment.is_none() => {
                            last.trailing_comment = Some(text);
                        }
                        _ => pending.push(text),
                    }
                }
                TokenKind::Eof => {
                    if let Some(close) = close {
                        return Err(self.error(format!("unexpected end of input, expected '{close}'")));
                    }
                    break;
                }
                TokenKind::Punct(ch) if Some(ch) == close => break,
                TokenKind::Ident(name) => {
                    self.advance();
                    let value = self.parse_field_value(&name)?;
                    if !self.eat_punct(';') {
                        self.eat_punct(',');
                    }
                    let mut field = Field::new(name, value);
                    field.comments = std::mem::take(&mut pending);
                    message.push(field);
                }
                _ => return Err(self.error("expected field name")),
            }
        }

        message.trailing_comments = pending;
        Ok(message)
    }

    fn parse_field_value(&mut self, name: &str) -> ParseResult<Value> {
        let has_colon = self.eat_punct(':');
        match self.peek().kind.clone() {
            TokenKind::Punct('{' | '<') => self.parse_braced().map(Value::Message),
            TokenKind::Punct('[') => self.parse_list(),
            TokenKind::Str(_) | TokenKind::Number(_) | TokenKind::Ident(_) => {
                if !has_colon {
                    return Err(self.error(format!("expected ':' after field '{name}'")));
                }
                self.parse_scalar().map(Value::Scalar)
            }
            _ => Err(self.error(format!("expected value for field '{name}'"))),
        }
    }

    fn parse_braced(&mut self) -> ParseResult<Message> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error("message nesting too deep"));
        }
        let close = match self.advance().kind {
            TokenKind::Punct('<') => '>',
            _ => '}',
        };
        self.depth += 1;
        let message = self.parse_fields(Some(close));
        self.depth -= 1;
        let message = message?;
        if !self.eat_punct(close) {
            return Err(self.error(format!("expected '{close}'")));
        }
        Ok(message)
    }

    fn parse_scalar(&mut self) -> ParseResult<Scalar> {
        match self.advance().kind {
            TokenKind::Str(first) => {
                let mut raw = first;
                while let TokenKind::Str(next) = &self.peek().kind {
                    raw.push(' ');
                    raw.push_str(next);
                    self.advance();
                }
                Ok(Scalar::from_raw(raw, ScalarKind::String))
            }
            TokenKind::Number(raw) => Ok(Scalar::from_raw(raw, ScalarKind::Number)),
            TokenKind::Ident(raw) => Ok(Scalar::from_raw(raw, ScalarKind::Identifier)),
            _ => Err(self.error("expected scalar value")),
        }
    }

    fn parse_list(&mut self) -> ParseResult<Value> {
        self.advance();
        let mut items = Vec::new();
        self.skip_comments();
        if self.eat_punct(']') {
            return Ok(Value::List(items));
        }
        loop {
            self.skip_comments();
            let item = match self.peek().kind.clone() {
                TokenKind::Punct('{' | '<') => Value::Message(self.parse_braced()?),
                TokenKind::Str(_) | TokenKind::Number(_) | TokenKind::Ident(_) => {
                    Value::Scalar(self.parse_scalar()?)
                }
                _ => return Err(self.error("expected list element")),
            };
            items.push(item);
            self.skip_comments();
            if self.eat_punct(']') {
                return Ok(Value::List(items));
            }
            if !self.eat_punct(',') {
                return Err(self.error("expected ',' or ']' in list"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MAX_NESTING_DEPTH;
    use crate::{parse, Scalar, ScalarKind, Value};

    const SOLVER: &str = r#"# The train/test net protocol buffer definition
net: "examples/mnist/lenet_train_test.prototxt"
test_iter: 100
base_lr: 0.01 # initial rate
lr_policy: "inv"
snapshot_prefix: "examples/mnist/lenet"
solver_mode: GPU
"#;

    #[test]
    fn test_parse_solver_fields_in_order() {
        let doc = parse(SOLVER).unwrap();
        let names: Vec<_> = doc.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["net", "test_iter", "base_lr", "lr_policy", "snapshot_prefix", "solver_mode"]);
        assert_eq!(doc.get_str("net").as_deref(), Some("examples/mnist/lenet_train_test.prototxt"));
        assert_eq!(doc.get("solver_mode").and_then(Value::as_scalar).and_then(Scalar::as_ident), Some("GPU"));
        assert_eq!(doc.fields()[0].comments, vec![" The train/test net protocol buffer definition".to_string()]);
        assert_eq!(doc.fields()[2].trailing_comment.as_deref(), Some(" initial rate"));
    }

    #[test]
    fn test_round_trip_is_stable() {
        let doc = parse(SOLVER).unwrap();
        let printed = doc.to_string();
        assert_eq!(printed, SOLVER);
        assert_eq!(parse(&printed).unwrap(), doc);
    }

    #[test]
    fn test_parse_nested_layers() {
        let text = r#"name: "LeNet"
layer {
  name: "mnist"
  type: "ImageData"
  top: "data"
  include { phase: TRAIN }
  image_data_param < source: "train.txt"; batch_size: 64 >
}
layers: { type: DATA include: { phase: TEST } }
"#;
        let doc = parse(text).unwrap();
        let layer = doc.messages_named("layer").next().unwrap();
        assert_eq!(layer.get_str("type").as_deref(), Some("ImageData"));
        let include = layer.messages_named("include").next().unwrap();
        assert_eq!(include.get("phase").and_then(Value::as_scalar).and_then(Scalar::as_ident), Some("TRAIN"));
        let param = layer.get("image_data_param").and_then(Value::as_message).unwrap();
        assert_eq!(param.get_str("source").as_deref(), Some("train.txt"));
        assert_eq!(doc.messages_named("layers").count(), 1);
    }

    #[test]
    fn test_parse_lists() {
        let doc = parse("stepvalue: [100, 200]\nitems [ { a: 1 }, { a: 2 } ]\nempty: []\n").unwrap();
        match doc.get("stepvalue").unwrap() {
            Value::List(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[1].as_scalar().map(Scalar::kind), Some(ScalarKind::Number));
            }
            other => panic!("expected list, got {other:?}"),
        }
        assert!(matches!(doc.get("items"), Some(Value::List(items)) if items.len() == 2));
        assert!(matches!(doc.get("empty"), Some(Value::List(items)) if items.is_empty()));
    }

    #[test]
    fn test_missing_colon_before_scalar_is_rejected() {
        let err = parse("base_lr 0.01").unwrap_err();
        assert_eq!((err.line, err.column), (1, 9));
        assert!(err.message.contains("base_lr"));
    }

    #[test]
    fn test_unclosed_block_is_rejected() {
        let err = parse("layer {\n  name: \"x\"\n").unwrap_err();
        assert!(err.message.contains("expected '}'"));
    }

    fn nested(depth: usize) -> String {
        "a {".repeat(depth) + &"}".repeat(depth)
    }

    #[test]
    fn test_nesting_up_to_limit_is_accepted() {
        let doc = parse(&nested(MAX_NESTING_DEPTH)).unwrap();
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let err = parse(&nested(MAX_NESTING_DEPTH + 1)).unwrap_err();
        assert!(err.message.contains("nesting too deep"));
        assert_eq!(err.line, 1);

        // deep enough to exhaust the stack if nesting were unbounded
        assert!(parse(&nested(200_000)).is_err());
        assert!(parse(&format!("items: [{{{}}}]", nested(1_000))).is_err());
    }

    #[test]
    fn test_stray_punctuation_is_rejected() {
        assert!(parse("}").is_err());
        assert!(parse("a: 1 ]").is_err());
    }
}
