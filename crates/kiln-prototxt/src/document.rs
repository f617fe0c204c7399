//! Editable text-format document tree.

use std::fmt;

/// Lexical class of a scalar token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// One or more adjacent quoted strings.
    String,
    Number,
    /// Enum values, booleans and other bare words.
    Identifier,
}

/// A scalar value, kept as the raw token text it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    raw: String,
    kind: ScalarKind,
}

impl Scalar {
    /// Quoted string literal holding `value`.
    #[must_use]
    pub fn string(value: &str) -> Self {
        let mut raw = String::with_capacity(value.len() + 2);
        raw.push('"');
        for ch in value.chars() {
            match ch {
                '"' => raw.push_str("\\\""),
                '\\' => raw.push_str("\\\\"),
                '\n' => raw.push_str("\\n"),
                '\r' => raw.push_str("\\r"),
                '\t' => raw.push_str("\\t"),
                other => raw.push(other),
            }
        }
        raw.push('"');
        Self { raw, kind: ScalarKind::String }
    }

    #[must_use]
    pub fn number(raw: &str) -> Self {
        Self { raw: raw.to_string(), kind: ScalarKind::Number }
    }

    pub(crate) fn from_raw(raw: String, kind: ScalarKind) -> Self {
        Self { raw, kind }
    }

    /// The token text exactly as it appears in the document.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Decoded contents of a string scalar. Adjacent literals are concatenated.
    #[must_use]
    pub fn as_str(&self) -> Option<String> {
        if self.kind != ScalarKind::String {
            return None;
        }
        Some(decode_string_literals(&self.raw))
    }

    /// The bare word of an identifier scalar (e.g. `TRAIN`, `IMAGE_DATA`).
    #[must_use]
    pub fn as_ident(&self) -> Option<&str> {
        (self.kind == ScalarKind::Identifier).then_some(self.raw.as_str())
    }
}

fn decode_string_literals(raw: &str) -> String {
    let mut out = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '"' && ch != '\'' {
            // whitespace between adjacent literals
            continue;
        }
        let quote = ch;
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('a') => out.push('\u{07}'),
                    Some('b') => out.push('\u{08}'),
                    Some('f') => out.push('\u{0c}'),
                    Some('v') => out.push('\u{0b}'),
                    Some('x') => {
                        let mut value = 0u32;
                        for _ in 0..2 {
                            match chars.peek().and_then(|d| d.to_digit(16)) {
                                Some(next) => {
                                    value = value * 16 + next;
                                    chars.next();
                                }
                                None => break,
                            }
                        }
                        out.extend(char::from_u32(value));
                    }
                    Some(d @ '0'..='7') => {
                        let mut value = d.to_digit(8).unwrap_or(0);
                        for _ in 0..2 {
                            match chars.peek().and_then(|d| d.to_digit(8)) {
                                Some(next) => {
                                    value = value * 8 + next;
                                    chars.next();
                                }
                                None => break,
                            }
                        }
                        out.extend(char::from_u32(value));
                    }
                    Some(other) => out.push(other),
                    None => {}
                },
                c if c == quote => break,
                c => out.push(c),
            }
        }
    }
    out
}

/// Value of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(Scalar),
    Message(Message),
    List(Vec<Value>),
}

impl Value {
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Message(m) => Some(m),
            _ => None,
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl From<Message> for Value {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}

/// A named field with the comments that surround it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: Value,
    /// Full-line comments directly above the field.
    pub comments: Vec<String>,
    /// Comment on the same line as the end of the field.
    pub trailing_comment: Option<String>,
}

impl Field {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { name: name.into(), value: value.into(), comments: Vec::new(), trailing_comment: None }
    }
}

/// An ordered list of fields; repeated fields appear once per occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    fields: Vec<Field>,
    /// Comments after the last field of the block.
    pub trailing_comments: Vec<String>,
}

impl Message {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Vec<Field> {
        &mut self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// First occurrence of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Decoded string value of the first `name` field.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).and_then(Value::as_scalar).and_then(Scalar::as_str)
    }

    pub fn fields_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields.iter().filter(move |f| f.name == name)
    }

    pub fn fields_named_mut<'a>(&'a mut self, name: &'a str) -> impl Iterator<Item = &'a mut Field> + 'a {
        self.fields.iter_mut().filter(move |f| f.name == name)
    }

    /// Nested messages stored under `name`, in document order.
    pub fn messages_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Message> + 'a {
        self.fields_named(name).filter_map(|f| f.value.as_message())
    }

    /// Replace the value of the first `name` field, or append a new field.
    /// Comments on an existing field are kept.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(Field::new(name, value)),
        }
    }

    /// First nested message named `name`, appended empty when absent.
    pub fn message_mut_or_insert(&mut self, name: &str) -> &mut Message {
        let idx = match self.fields.iter().position(|f| f.name == name && f.value.as_message().is_some()) {
            Some(idx) => idx,
            None => {
                self.fields.push(Field::new(name, Message::new()));
                self.fields.len() - 1
            }
        };
        match &mut self.fields[idx].value {
            Value::Message(m) => m,
            _ => unreachable!("field {name} was selected as a message"),
        }
    }

    /// Drop every `name` field, returning how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.fields.len();
        self.fields.retain(|f| f.name != name);
        before - self.fields.len()
    }

    fn write_block(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        for field in &self.fields {
            for comment in &field.comments {
                writeln!(f, "{pad}#{comment}")?;
            }
            write!(f, "{pad}{}", field.name)?;
            match &field.value {
                Value::Message(m) => {
                    f.write_str(" ")?;
                    m.write_braced(f, depth)?;
                }
                value => {
                    f.write_str(": ")?;
                    write_value(f, value, depth)?;
                }
            }
            if let Some(comment) = &field.trailing_comment {
                write!(f, " #{comment}")?;
            }
            f.write_str("\n")?;
        }
        for comment in &self.trailing_comments {
            writeln!(f, "{pad}#{comment}")?;
        }
        Ok(())
    }

    fn write_braced(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        f.write_str("{\n")?;
        self.write_block(f, depth + 1)?;
        write!(f, "{}}}", "  ".repeat(depth))
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value, depth: usize) -> fmt::Result {
    match value {
        Value::Scalar(s) => f.write_str(s.raw()),
        Value::Message(m) => m.write_braced(f, depth),
        Value::List(items) => {
            f.write_str("[")?;
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write_value(f, item, depth)?;
            }
            f.write_str("]")
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_block(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_scalar_escapes_and_decodes() {
        let s = Scalar::string("a \"quoted\" path\\x");
        assert_eq!(s.raw(), r#""a \"quoted\" path\\x""#);
        assert_eq!(s.as_str().as_deref(), Some("a \"quoted\" path\\x"));
    }

    #[test]
    fn test_decode_adjacent_literals_and_octal() {
        let s = Scalar::from_raw(r#""ab" 'c\101'"#.to_string(), ScalarKind::String);
        assert_eq!(s.as_str().as_deref(), Some("abcA"));
    }

    #[test]
    fn test_hex_escape_reads_at_most_two_digits() {
        let s = Scalar::from_raw(r#""\x41BC" "\x7""#.to_string(), ScalarKind::String);
        assert_eq!(s.as_str().as_deref(), Some("ABC\u{7}"));
    }

    #[test]
    fn test_fields_named_mut_and_remove() {
        let mut m = Message::new();
        m.push(Field::new("stepvalue", Scalar::number("100")));
        m.push(Field::new("base_lr", Scalar::number("0.01")));
        m.push(Field::new("stepvalue", Scalar::number("200")));
        for field in m.fields_named_mut("stepvalue") {
            field.trailing_comment = Some(" step".to_string());
        }
        assert_eq!(m.fields_named("stepvalue").filter(|f| f.trailing_comment.is_some()).count(), 2);

        assert_eq!(m.remove("stepvalue"), 2);
        assert_eq!(m.remove("stepvalue"), 0);
        assert_eq!(m.to_string(), "base_lr: 0.01\n");
    }

    #[test]
    fn test_set_replaces_first_and_keeps_comments() {
        let mut m = Message::new();
        let mut field = Field::new("net", Scalar::string("old"));
        field.comments.push(" network".to_string());
        m.push(field);
        m.set("net", Scalar::string("new"));
        assert_eq!(m.len(), 1);
        assert_eq!(m.fields()[0].comments, vec![" network".to_string()]);
        assert_eq!(m.get_str("net").as_deref(), Some("new"));
    }

    #[test]
    fn test_message_mut_or_insert_appends_once() {
        let mut m = Message::new();
        m.message_mut_or_insert("data_param").set("source", Scalar::string("x"));
        m.message_mut_or_insert("data_param").set("batch_size", Scalar::number("64"));
        assert_eq!(m.len(), 1);
        assert_eq!(m.to_string(), "data_param {\n  source: \"x\"\n  batch_size: 64\n}\n");
    }

    #[test]
    fn test_display_list_and_comments() {
        let mut m = Message::new();
        let mut f = Field::new("stepvalue", Value::List(vec![Scalar::number("100").into(), Scalar::number("200").into()]));
        f.trailing_comment = Some(" steps".to_string());
        m.push(f);
        m.trailing_comments.push(" end".to_string());
        assert_eq!(m.to_string(), "stepvalue: [100, 200] # steps\n# end\n");
    }
}
