//! Property values carried by nodes and edges on their way to and from a backend
//!
//! Besides the value type itself this module owns the literal text form used
//! by the labeled-property-graph interchange files: `{'name': 'Alice', 'age': 30}`
//! for property maps and `['Node', 'Person']` for label lists. The form is a
//! literal-mapping notation, not JSON: strings may use single or double quotes
//! and booleans/null are spelled `True`, `False`, `None`.

use super::types::Label;
use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

/// Property value type
///
/// Supports:
/// - String
/// - Integer (i64)
/// - Float (f64)
/// - Boolean
/// - List (Vec<PropertyValue>)
/// - Map (PropertyMap)
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<PropertyValue>),
    Map(PropertyMap),
    Null,
}

/// Insertion-ordered property map; order is kept in rendered query text and files
pub type PropertyMap = IndexMap<String, PropertyValue>;

impl PropertyValue {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Get string value if this is a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get integer value if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get float value if this is a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get boolean value if this is a boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<PropertyValue>> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&PropertyMap> {
        match self {
            PropertyValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "String",
            PropertyValue::Integer(_) => "Integer",
            PropertyValue::Float(_) => "Float",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::List(_) => "List",
            PropertyValue::Map(_) => "Map",
            PropertyValue::Null => "Null",
        }
    }

    /// Convert to a JSON value (Neo4j HTTP parameters)
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::String(s) => serde_json::Value::String(s.clone()),
            PropertyValue::Integer(i) => serde_json::Value::from(*i),
            PropertyValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            PropertyValue::Boolean(b) => serde_json::Value::Bool(*b),
            PropertyValue::List(items) => {
                serde_json::Value::Array(items.iter().map(PropertyValue::to_json).collect())
            }
            PropertyValue::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            PropertyValue::Null => serde_json::Value::Null,
        }
    }

    /// Convert from a JSON value (Neo4j HTTP result rows)
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(b) => PropertyValue::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => PropertyValue::Integer(i),
                None => PropertyValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => PropertyValue::String(s.clone()),
            serde_json::Value::Array(items) => {
                PropertyValue::List(items.iter().map(PropertyValue::from_json).collect())
            }
            serde_json::Value::Object(map) => PropertyValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), PropertyValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render in literal-mapping notation
    pub fn to_literal(&self) -> String {
        let mut out = String::new();
        write_literal(self, &mut out);
        out
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

// Convenience conversions
impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(items: Vec<PropertyValue>) -> Self {
        PropertyValue::List(items)
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(map: PropertyMap) -> Self {
        PropertyValue::Map(map)
    }
}

/// Malformed literal text
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid literal at offset {offset}: {message}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// Render a property map as `{'key': value, ...}`
pub fn render_property_map(map: &PropertyMap) -> String {
    let mut out = String::new();
    write_map(map, &mut out);
    out
}

/// Render a label list as `['A', 'B']`
pub fn render_label_list(labels: &[Label]) -> String {
    let items: Vec<PropertyValue> = labels.iter().map(|l| l.as_str().into()).collect();
    PropertyValue::List(items).to_literal()
}

/// Parse any literal value
pub fn parse_literal(text: &str) -> Result<PropertyValue, LiteralError> {
    let mut parser = LiteralParser {
        src: text,
        pos: 0,
        depth: 0,
    };
    parser.skip_whitespace();
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos != text.len() {
        return Err(parser.error("trailing characters"));
    }
    Ok(value)
}

/// Parse `{'key': value, ...}`; an empty or blank cell is an empty map
pub fn parse_property_map(text: &str) -> Result<PropertyMap, LiteralError> {
    if text.trim().is_empty() {
        return Ok(PropertyMap::new());
    }
    match parse_literal(text)? {
        PropertyValue::Map(map) => Ok(map),
        other => Err(LiteralError {
            offset: 0,
            message: format!("expected a mapping, found {}", other.type_name()),
        }),
    }
}

/// Parse `['A', 'B']` into labels
pub fn parse_label_list(text: &str) -> Result<Vec<Label>, LiteralError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let items = match parse_literal(text)? {
        PropertyValue::List(items) => items,
        other => {
            return Err(LiteralError {
                offset: 0,
                message: format!("expected a list of labels, found {}", other.type_name()),
            })
        }
    };
    items
        .into_iter()
        .map(|item| match item {
            PropertyValue::String(s) => Ok(Label::new(s)),
            other => Err(LiteralError {
                offset: 0,
                message: format!("label must be a string, found {}", other.type_name()),
            }),
        })
        .collect()
}

fn write_literal(value: &PropertyValue, out: &mut String) {
    match value {
        PropertyValue::String(s) => write_string(s, out),
        PropertyValue::Integer(i) => out.push_str(&i.to_string()),
        PropertyValue::Float(f) => out.push_str(&format!("{:?}", f)),
        PropertyValue::Boolean(true) => out.push_str("True"),
        PropertyValue::Boolean(false) => out.push_str("False"),
        PropertyValue::Null => out.push_str("None"),
        PropertyValue::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_literal(item, out);
            }
            out.push(']');
        }
        PropertyValue::Map(map) => write_map(map, out),
    }
}

fn write_map(map: &PropertyMap, out: &mut String) {
    out.push('{');
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_string(key, out);
        out.push_str(": ");
        write_literal(value, out);
    }
    out.push('}');
}

fn write_string(s: &str, out: &mut String) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
}

/// Deepest list or mapping nesting a literal may use
const MAX_NESTING: usize = 64;

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> LiteralParser<'a> {
    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn parse_value(&mut self) -> Result<PropertyValue, LiteralError> {
        match self.peek() {
            Some('\'') | Some('"') => self.parse_string().map(PropertyValue::String),
            Some('[') => self.nested(|p| p.parse_sequence('[', ']').map(PropertyValue::List)),
            Some('(') => self.nested(|p| p.parse_sequence('(', ')').map(PropertyValue::List)),
            Some('{') => self.nested(|p| p.parse_map().map(PropertyValue::Map)),
            Some(c) if c == '-' || c == '+' || c.is_ascii_digit() || c == '.' => {
                self.parse_number()
            }
            Some(c) if c.is_alphabetic() => self.parse_keyword(),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, LiteralError>,
    ) -> Result<T, LiteralError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_string(&mut self) -> Result<String, LiteralError> {
        let quote = match self.bump() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted string")),
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_sequence(&mut self, open: char, close: char) -> Result<Vec<PropertyValue>, LiteralError> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(items);
            }
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(items),
                _ => return Err(self.error(format!("expected ',' or '{}'", close))),
            }
        }
    }

    fn parse_map(&mut self) -> Result<PropertyMap, LiteralError> {
        self.expect('{')?;
        let mut map = PropertyMap::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(map);
            }
            let key = self.parse_string()?;
            self.skip_whitespace();
            self.expect(':')?;
            self.skip_whitespace();
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(map),
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn parse_number(&mut self) -> Result<PropertyValue, LiteralError> {
        let start = self.pos;
        let mut is_float = false;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' | 'e' | 'E' => is_float = true,
                '-' | '+' if matches!(self.src[..self.pos].chars().last(), Some('e' | 'E')) => {}
                _ => break,
            }
            self.bump();
        }
        let text: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();
        if is_float {
            text.parse::<f64>()
                .map(PropertyValue::Float)
                .map_err(|_| LiteralError {
                    offset: start,
                    message: format!("invalid float '{}'", text),
                })
        } else {
            text.parse::<i64>()
                .map(PropertyValue::Integer)
                .map_err(|_| LiteralError {
                    offset: start,
                    message: format!("invalid integer '{}'", text),
                })
        }
    }

    fn parse_keyword(&mut self) -> Result<PropertyValue, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "True" | "true" => Ok(PropertyValue::Boolean(true)),
            "False" | "false" => Ok(PropertyValue::Boolean(false)),
            "None" | "null" => Ok(PropertyValue::Null),
            word => Err(LiteralError {
                offset: start,
                message: format!("unknown keyword '{}'", word),
            }),
        }
    }
}
