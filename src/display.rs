//! Text rendering and parsing of values.
//!
//! `value_to_display` produces the Value-column string (truncated, optionally
//! with array min/max), `edit_text` the form shown when a cell is edited, and
//! `display_to_value` turns edited text back into a value of the same type.
//! Free text typed for new keys and values goes through `try_to_eval`, which
//! understands literal syntax (`None`, `True`, numbers, quoted strings, lists,
//! tuples, sets and dicts) and falls back to a plain string.

use crate::value::{format_float, tuple_repr, FrameKind, Key, Mapping, Value};
use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// Longest string shown verbatim in a cell
pub const MAX_TEXT_CHARS: usize = 1000;

/// Container elements rendered before eliding the rest
pub const MAX_ITEMS: usize = 10;

/// Nesting depth past which containers render as an ellipsis
const MAX_DEPTH: usize = 2;

/// 1-D arrays up to this length are listed element by element
const MAX_ARRAY_ITEMS: usize = 10;

/// Tooltip line width
pub const TOOLTIP_WIDTH: usize = 50;

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Value-column string
pub fn value_to_display(value: &Value, minmax: bool) -> String {
    match value {
        Value::Str(s) => truncate(s, MAX_TEXT_CHARS),
        Value::Array(array) if minmax && !array.data.is_empty() => {
            match (array.min(), array.max()) {
                (Some(min), Some(max)) => format!("Min: {}\nMax: {}", format_float(min), format_float(max)),
                _ => render(value, 0),
            }
        }
        other => truncate(&render(other, 0), MAX_TEXT_CHARS),
    }
}

/// Edit-form text; never truncated and never summarized with min/max
pub fn edit_text(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        other => render(other, 0),
    }
}

/// Parses edited text back into a value shaped like `old`.
///
/// With `ignore_errors` a parse failure keeps `old`; otherwise the raw text
/// is returned as a string.
pub fn display_to_value(text: &str, old: &Value, ignore_errors: bool) -> Value {
    let parsed = match old {
        Value::Str(_) => Some(Value::Str(text.to_string())),
        Value::Bool(_) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        Value::Int(_) => text.trim().parse::<i64>().ok().map(Value::Int),
        Value::Float(_) => text.trim().parse::<f64>().ok().map(Value::Float),
        Value::Complex { .. } => parse_literal(text).and_then(|v| match v {
            Value::Complex { .. } => Some(v),
            Value::Int(i) => Some(Value::Complex { re: i as f64, im: 0.0 }),
            Value::Float(re) => Some(Value::Complex { re, im: 0.0 }),
            _ => None,
        }),
        Value::Date(_) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok().map(Value::Date),
        Value::DateTime(_) => parse_datetime(text.trim()).map(Value::DateTime),
        _ => parse_literal(text),
    };

    match parsed {
        Some(value) => value,
        None if ignore_errors => {
            log::debug!("could not parse {:?} as {}, keeping old value", text, old.type_name());
            old.clone()
        }
        None => Value::Str(text.to_string()),
    }
}

/// Literal evaluation with a string fallback
pub fn try_to_eval(text: &str) -> Value {
    parse_literal(text).unwrap_or_else(|| Value::Str(text.to_string()))
}

/// Key typed by the user; unhashable literals fall back to the raw text
pub fn parse_key(text: &str) -> Key {
    Key::from_value(&try_to_eval(text)).unwrap_or_else(|| Key::Str(text.to_string()))
}

/// Greedy word wrap to `width` columns
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

fn render(value: &Value, depth: usize) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Complex { re, im } => complex_repr(*re, *im),
        Value::Str(s) => s.clone(),
        Value::Bytes(bytes) => format!("b'{}'", bytes.escape_ascii()),
        Value::DateTime(dt) => {
            if dt.nanosecond() == 0 {
                dt.format("%Y-%m-%d %H:%M:%S").to_string()
            } else {
                dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
            }
        }
        Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        Value::List(items) => sequence_repr("[", "]", items, depth),
        Value::Tuple(items) => {
            if depth >= MAX_DEPTH {
                return "(...)".to_string();
            }
            tuple_repr(elided(items.iter().map(|v| element_repr(v, depth + 1)), items.len()))
        }
        Value::Set(items) if items.is_empty() => "set()".to_string(),
        Value::Set(items) => sequence_repr("{", "}", items, depth),
        Value::Dict(mapping) => dict_repr(mapping, depth),
        Value::Array(array) => {
            if array.ndim() == 1 && array.data.len() <= MAX_ARRAY_ITEMS {
                let items: Vec<String> = array.data.iter().map(|v| format_float(*v)).collect();
                format!("[{}]", items.join(" "))
            } else {
                format!("Array of {} with shape {}", array.dtype, crate::value::shape_repr(&array.shape))
            }
        }
        Value::Frame(frame) => match frame.kind {
            FrameKind::DataFrame => format!("Column names: {}", frame.columns.join(", ")),
            FrameKind::Series => "Series object of pandas.core.series module".to_string(),
            FrameKind::Index => "Index object of pandas.core.indexes.base module".to_string(),
        },
        Value::Image(image) => format!("{} image of size {}x{}", image.mode, image.width, image.height),
        Value::Object(obj) => format!("<{} object>", obj.type_name()),
    }
}

fn element_repr(value: &Value, depth: usize) -> String {
    match value {
        Value::Str(s) => format!("'{}'", s),
        other => render(other, depth),
    }
}

fn elided<I: Iterator<Item = String>>(items: I, total: usize) -> impl Iterator<Item = String> {
    let tail = (total > MAX_ITEMS).then(|| "...".to_string());
    items.take(MAX_ITEMS).chain(tail)
}

fn sequence_repr(open: &str, close: &str, items: &[Value], depth: usize) -> String {
    if depth >= MAX_DEPTH {
        return format!("{}...{}", open, close);
    }
    let parts: Vec<String> = elided(items.iter().map(|v| element_repr(v, depth + 1)), items.len()).collect();
    format!("{}{}{}", open, parts.join(", "), close)
}

fn dict_repr(mapping: &Mapping, depth: usize) -> String {
    if depth >= MAX_DEPTH {
        return "{...}".to_string();
    }
    let entries = mapping
        .iter()
        .map(|(k, v)| format!("{}: {}", k.repr(), element_repr(v, depth + 1)));
    let parts: Vec<String> = elided(entries, mapping.len()).collect();
    format!("{{{}}}", parts.join(", "))
}

fn complex_part(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

fn complex_repr(re: f64, im: f64) -> String {
    if re == 0.0 {
        return format!("{}j", complex_part(im));
    }
    let sign = if im < 0.0 { '-' } else { '+' };
    format!("({}{}{}j)", complex_part(re), sign, complex_part(im.abs()))
}

/// Literal syntax parser; `None` when the text is not one complete literal
pub fn parse_literal(text: &str) -> Option<Value> {
    let mut parser = Parser {
        chars: text.trim().chars().collect(),
        pos: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos == parser.chars.len() {
        Some(value)
    } else {
        None
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn value(&mut self) -> Option<Value> {
        self.skip_ws();
        match self.peek()? {
            '[' => {
                self.pos += 1;
                let (items, _) = self.items(']')?;
                Some(Value::List(items))
            }
            '(' => {
                self.pos += 1;
                let (mut items, trailing_comma) = self.items(')')?;
                if items.len() == 1 && !trailing_comma {
                    items.pop()
                } else {
                    Some(Value::Tuple(items))
                }
            }
            '{' => {
                self.pos += 1;
                self.braced()
            }
            '\'' | '"' => self.string().map(Value::Str),
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            c if c.is_alphabetic() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
                    self.pos += 1;
                }
                let word: String = self.chars[start..self.pos].iter().collect();
                match word.as_str() {
                    "None" => Some(Value::Null),
                    "True" => Some(Value::Bool(true)),
                    "False" => Some(Value::Bool(false)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Comma-separated values up to `close`; reports a trailing comma
    fn items(&mut self, close: char) -> Option<(Vec<Value>, bool)> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            if self.eat(close) {
                return Some((items, trailing_comma));
            }
            items.push(self.value()?);
            trailing_comma = self.eat(',');
            if !trailing_comma {
                return self.eat(close).then_some((items, false));
            }
        }
    }

    fn braced(&mut self) -> Option<Value> {
        if self.eat('}') {
            return Some(Value::Dict(Mapping::new()));
        }
        let first = self.value()?;
        if !self.eat(':') {
            let mut items = vec![first];
            while self.eat(',') {
                if self.eat('}') {
                    return Some(Value::Set(dedup(items)));
                }
                items.push(self.value()?);
            }
            return self.eat('}').then(|| Value::Set(dedup(items)));
        }

        let mut mapping = Mapping::new();
        let mut key = first;
        loop {
            let value = self.value()?;
            mapping.insert(Key::from_value(&key)?, value);
            if !self.eat(',') {
                break;
            }
            if self.eat('}') {
                return Some(Value::Dict(mapping));
            }
            key = self.value()?;
            if !self.eat(':') {
                return None;
            }
        }
        self.eat('}').then_some(Value::Dict(mapping))
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.peek()?;
        self.pos += 1;
        let mut out = String::new();
        loop {
            let c = self.peek()?;
            self.pos += 1;
            match c {
                '\\' => {
                    let escaped = self.peek()?;
                    self.pos += 1;
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                }
                c if c == quote => return Some(out),
                c => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Option<Value> {
        let re = self.real()?;
        if self.peek() == Some('j') {
            self.pos += 1;
            return Some(Value::Complex { re: 0.0, im: re.as_f64()? });
        }
        // a+bj
        if matches!(self.peek(), Some('+') | Some('-')) {
            let save = self.pos;
            if let Some(im) = self.real() {
                if self.peek() == Some('j') {
                    self.pos += 1;
                    return Some(Value::Complex { re: re.as_f64()?, im: im.as_f64()? });
                }
            }
            self.pos = save;
        }
        Some(re)
    }

    fn real(&mut self) -> Option<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some('+') | Some('-')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    if matches!(self.chars.get(self.pos + 1), Some('+') | Some('-')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().filter(|c| **c != '_').collect();
        if is_float {
            text.parse::<f64>().ok().map(Value::Float)
        } else {
            text.parse::<i64>().ok().map(Value::Int)
        }
    }
}

fn dedup(items: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::NdArray;

    #[test]
    fn test_scalar_display() {
        assert_eq!(value_to_display(&Value::Null, false), "None");
        assert_eq!(value_to_display(&Value::Bool(true), false), "True");
        assert_eq!(value_to_display(&Value::Float(1.0), false), "1.0");
        assert_eq!(value_to_display(&Value::Complex { re: 2.0, im: 1.0 }, false), "(2+1j)");
        assert_eq!(value_to_display(&Value::Complex { re: 0.0, im: 9.0 }, false), "9j");
    }

    #[test]
    fn test_container_display() {
        let list = Value::list(vec![Value::Int(1), Value::str("kjkj"), Value::Null]);
        assert_eq!(value_to_display(&list, false), "[1, 'kjkj', None]");

        let dict = Value::dict(vec![("a", Value::Int(1))]);
        assert_eq!(value_to_display(&dict, false), "{'a': 1}");

        assert_eq!(value_to_display(&Value::Tuple(vec![Value::Int(1)]), false), "(1,)");
        assert_eq!(value_to_display(&Value::Set(vec![]), false), "set()");
    }

    #[test]
    fn test_long_containers_are_elided() {
        let list = Value::list((0..20).map(Value::Int));
        assert_eq!(value_to_display(&list, false), "[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, ...]");

        let nested = Value::list(vec![Value::list(vec![Value::list(vec![Value::Int(1)])])]);
        assert_eq!(value_to_display(&nested, false), "[[[...]]]");
    }

    #[test]
    fn test_long_text_is_truncated() {
        let text = "x".repeat(MAX_TEXT_CHARS + 5);
        let shown = value_to_display(&Value::str(text.clone()), false);
        assert_eq!(shown.len(), MAX_TEXT_CHARS + 3);
        assert!(shown.ends_with("..."));
        // Edit form keeps everything
        assert_eq!(edit_text(&Value::str(text.clone())), text);
    }

    #[test]
    fn test_array_minmax() {
        let array = Value::Array(NdArray::new(vec![3], vec![2.0, -1.0, 5.0]));
        assert_eq!(value_to_display(&array, true), "Min: -1.0\nMax: 5.0");
        assert_eq!(value_to_display(&array, false), "[2.0 -1.0 5.0]");

        let big = Value::Array(NdArray::new(vec![2, 3], vec![0.0; 6]));
        assert_eq!(value_to_display(&big, false), "Array of float64 with shape (2, 3)");
    }

    #[test]
    fn test_display_to_value_follows_old_type() {
        assert_eq!(display_to_value("42", &Value::Int(1), true), Value::Int(42));
        assert_eq!(display_to_value("4.5", &Value::Float(1.0), true), Value::Float(4.5));
        assert_eq!(display_to_value("false", &Value::Bool(true), true), Value::Bool(false));
        assert_eq!(display_to_value("42", &Value::str("a"), true), Value::str("42"));
        assert_eq!(
            display_to_value("1945-05-08", &Value::Date(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()), true),
            Value::Date(NaiveDate::from_ymd_opt(1945, 5, 8).unwrap())
        );
    }

    #[test]
    fn test_display_to_value_keeps_old_on_error() {
        assert_eq!(display_to_value("abc", &Value::Int(7), true), Value::Int(7));
        assert_eq!(display_to_value("abc", &Value::Int(7), false), Value::str("abc"));
    }

    #[test]
    fn test_literals() {
        assert_eq!(try_to_eval("None"), Value::Null);
        assert_eq!(try_to_eval("-3"), Value::Int(-3));
        assert_eq!(try_to_eval("1e3"), Value::Float(1000.0));
        assert_eq!(try_to_eval("2+1j"), Value::Complex { re: 2.0, im: 1.0 });
        assert_eq!(try_to_eval("'a b'"), Value::str("a b"));
        assert_eq!(
            try_to_eval("[1, (2,), {3, 3}]"),
            Value::list(vec![
                Value::Int(1),
                Value::Tuple(vec![Value::Int(2)]),
                Value::Set(vec![Value::Int(3)]),
            ])
        );
        assert_eq!(try_to_eval("(5)"), Value::Int(5));
        assert_eq!(
            try_to_eval("{'a': 1, 2: [None]}"),
            Value::dict(vec![
                (Key::from("a"), Value::Int(1)),
                (Key::Int(2), Value::list(vec![Value::Null])),
            ])
        );
        assert_eq!(try_to_eval("{}"), Value::Dict(Mapping::new()));
        assert_eq!(try_to_eval("hello world"), Value::str("hello world"));
        assert_eq!(try_to_eval("[1, 2"), Value::str("[1, 2"));
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("3"), Key::Int(3));
        assert_eq!(parse_key("'x'"), Key::from("x"));
        assert_eq!(parse_key("new_var"), Key::from("new_var"));
        assert_eq!(parse_key("[1]"), Key::from("[1]"));
        assert_eq!(parse_key("(1, 'a')"), Key::Tuple(vec![Key::Int(1), Key::from("a")]));
    }

    #[test]
    fn test_wrap_text() {
        let text = "Click to select this row. Maintain pressed Ctrl (Cmd on macOS) for multiple rows";
        let lines = wrap_text(text, TOOLTIP_WIDTH);
        assert_eq!(
            lines,
            vec![
                "Click to select this row. Maintain pressed Ctrl",
                "(Cmd on macOS) for multiple rows",
            ]
        );
        assert!(lines.iter().all(|l| l.len() <= TOOLTIP_WIDTH));
    }
}
