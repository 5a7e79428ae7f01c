use std::borrow::Cow;
use std::cmp::Ordering;

use gqlfw_reduce::Operation;
use gqlfw_reduce::Origin;
use gqlfw_reduce::Token;
use gqlfw_reduce::TokenKind;
use gqlfw_template::Expr;

use crate::scan::ValueRef;

/// A value on the evaluation stack.
///
/// Request values are kept as tokens; strings are only decoded when they
/// are compared. `Literal` indexes the constant table of the program that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Float(f64),
    Str(Token),
    Enum(Token),
    Literal(u32),
    Composite(ValueRef),
}

impl Value {
    fn number(self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(f64::from(value)),
            Value::Float(value) => Some(value),
            _ => None,
        }
    }
}

/// Reads the request value at `position`, following variable references.
pub(crate) fn read(operation: &Operation<'_>, position: ValueRef) -> Value {
    let position = position.resolve(operation);
    let Some(token) = position.token(operation) else {
        return Value::Null;
    };
    match token.kind {
        TokenKind::Int => {
            let text = operation.text(&token);
            text.parse()
                .map(Value::Int)
                .or_else(|_| text.parse().map(Value::Float))
                .unwrap_or(Value::Null)
        }
        TokenKind::Float => operation
            .text(&token)
            .parse()
            .map_or(Value::Null, Value::Float),
        TokenKind::String => Value::Str(token),
        TokenKind::Enum => Value::Enum(token),
        TokenKind::True => Value::Bool(true),
        TokenKind::False => Value::Bool(false),
        TokenKind::Array | TokenKind::Object => Value::Composite(position),
        _ => Value::Null,
    }
}

/// Items of the array at `array`, which must be resolved.
pub(crate) fn items<'r>(
    operation: &Operation<'r>,
    array: ValueRef,
) -> impl Iterator<Item = ValueRef> + 'r {
    let tokens = array.tokens(operation);
    let mut index = array.offset + 1;
    std::iter::from_fn(move || {
        let token = tokens.get(index)?;
        if token.kind == TokenKind::ArrayEnd {
            return None;
        }
        let item = ValueRef {
            table: array.table,
            offset: index,
        };
        index = gqlfw_reduce::value_end(tokens, index);
        Some(item)
    })
}

/// Fields of the object at `object`, which must be resolved.
pub(crate) fn fields<'r>(
    operation: &Operation<'r>,
    object: ValueRef,
) -> impl Iterator<Item = (&'r str, ValueRef)> + 'r {
    let operation = *operation;
    let tokens = object.tokens(&operation);
    let mut index = object.offset + 1;
    std::iter::from_fn(move || {
        let token = tokens.get(index).filter(|t| t.kind == TokenKind::ObjectField)?;
        let value = ValueRef {
            table: object.table,
            offset: index + 1,
        };
        index = gqlfw_reduce::value_end(tokens, index + 1);
        Some((operation.text(token), value))
    })
}

pub(crate) fn token_at(operation: &Operation<'_>, position: ValueRef) -> Option<Token> {
    position.resolve(operation).token(operation)
}

/// Decodes the escape sequences of raw string content.
pub(crate) fn unescape(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('u') => out.push(unicode_escape(&mut chars)),
            Some(other) => out.push(other),
            None => {}
        }
    }
    Cow::Owned(out)
}

fn hex4(chars: &mut std::str::Chars<'_>) -> Option<u32> {
    let mut value = 0;
    for _ in 0..4 {
        value = value * 16 + chars.next()?.to_digit(16)?;
    }
    Some(value)
}

fn unicode_escape(chars: &mut std::str::Chars<'_>) -> char {
    let Some(high) = hex4(chars) else {
        return char::REPLACEMENT_CHARACTER;
    };
    if (0xD800..0xDC00).contains(&high) {
        let mut lookahead = chars.clone();
        if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
            if let Some(low) = hex4(&mut lookahead).filter(|low| (0xDC00..0xE000).contains(low)) {
                *chars = lookahead;
                let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                return char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER);
            }
        }
    }
    char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Length of a string (in characters) or an array (in items).
pub(crate) fn length(operation: &Operation<'_>, position: ValueRef) -> Option<usize> {
    let position = position.resolve(operation);
    let token = position.token(operation)?;
    match token.kind {
        TokenKind::String => Some(unescape(operation.text(&token)).chars().count()),
        TokenKind::Array => Some(items(operation, position).count()),
        _ => None,
    }
}

/// Text of a string-like value; enums are only text when `enums` is set.
fn text<'a>(
    operation: &Operation<'a>,
    literals: &'a [Expr],
    value: Value,
    enums: bool,
) -> Option<Cow<'a, str>> {
    match value {
        Value::Str(token) => Some(unescape(operation.text(&token))),
        Value::Enum(token) if enums => Some(Cow::Borrowed(operation.text(&token))),
        Value::Literal(index) => match literals.get(index as usize)? {
            Expr::String(text) => Some(Cow::Borrowed(text)),
            Expr::Enum(text) if enums => Some(Cow::Borrowed(text)),
            _ => None,
        },
        _ => None,
    }
}

/// Structural equality of two values. A string from the variables payload
/// equals the enum value with the same name.
#[allow(clippy::float_cmp)]
pub(crate) fn equal(operation: &Operation<'_>, literals: &[Expr], left: Value, right: Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Literal(a), Value::Literal(b)) => literals.get(a as usize) == literals.get(b as usize),
        (Value::Literal(index), other) | (other, Value::Literal(index)) => {
            literals
                .get(index as usize)
                .is_some_and(|expr| equals_expr(operation, other, expr))
        }
        (Value::Composite(a), Value::Composite(b)) => composites_equal(operation, a, b),
        (Value::Str(a), Value::Str(b)) => {
            unescape(operation.text(&a)) == unescape(operation.text(&b))
        }
        (Value::Enum(a), Value::Enum(b)) => operation.text(&a) == operation.text(&b),
        (Value::Str(text), Value::Enum(name)) | (Value::Enum(name), Value::Str(text)) => {
            text.origin == Origin::Json && unescape(operation.text(&text)) == operation.text(&name)
        }
        _ => match (left.number(), right.number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// Compares a request value with a constant template expression.
#[allow(clippy::float_cmp)]
fn equals_expr(operation: &Operation<'_>, value: Value, expr: &Expr) -> bool {
    match (value, expr) {
        (Value::Null, Expr::Null) => true,
        (Value::Bool(a), Expr::Bool(b)) => a == *b,
        (Value::Int(a), Expr::Int(b)) => a == *b,
        (Value::Int(_) | Value::Float(_), Expr::Int(_) | Expr::Float(_)) => {
            let expected = match expr {
                Expr::Int(b) => f64::from(*b),
                Expr::Float(b) => *b,
                _ => return false,
            };
            value.number() == Some(expected)
        }
        (Value::Str(token), Expr::String(text)) => unescape(operation.text(&token)) == *text,
        (Value::Str(token), Expr::Enum(name)) => {
            token.origin == Origin::Json && unescape(operation.text(&token)) == *name
        }
        (Value::Enum(token), Expr::Enum(name)) => operation.text(&token) == name.as_str(),
        (Value::Composite(position), Expr::Array(expected)) => {
            if token_at(operation, position).map(|t| t.kind) != Some(TokenKind::Array) {
                return false;
            }
            let mut actual = items(operation, position);
            for item in expected {
                match actual.next() {
                    Some(value) if equals_expr(operation, read(operation, value), item) => {}
                    _ => return false,
                }
            }
            actual.next().is_none()
        }
        (Value::Composite(position), Expr::Object(entries)) => {
            if token_at(operation, position).map(|t| t.kind) != Some(TokenKind::Object) {
                return false;
            }
            let mut count = 0;
            for (name, value) in fields(operation, position) {
                count += 1;
                let matched = entries
                    .iter()
                    .find(|entry| entry.name == name)
                    .is_some_and(|entry| equals_expr(operation, read(operation, value), &entry.value));
                if !matched {
                    return false;
                }
            }
            count == entries.len()
        }
        _ => false,
    }
}

fn composites_equal(operation: &Operation<'_>, left: ValueRef, right: ValueRef) -> bool {
    let kinds = (
        token_at(operation, left).map(|t| t.kind),
        token_at(operation, right).map(|t| t.kind),
    );
    match kinds {
        (Some(TokenKind::Array), Some(TokenKind::Array)) => {
            let mut right = items(operation, right);
            for item in items(operation, left) {
                match right.next() {
                    Some(other)
                        if equal(operation, &[], read(operation, item), read(operation, other)) => {}
                    _ => return false,
                }
            }
            right.next().is_none()
        }
        (Some(TokenKind::Object), Some(TokenKind::Object)) => {
            let mut count = 0;
            for (name, value) in fields(operation, left) {
                count += 1;
                let matched = fields(operation, right)
                    .find(|(other, _)| *other == name)
                    .is_some_and(|(_, other)| {
                        equal(operation, &[], read(operation, value), read(operation, other))
                    });
                if !matched {
                    return false;
                }
            }
            count == fields(operation, right).count()
        }
        _ => false,
    }
}

/// Ordering of two numbers or two strings.
pub(crate) fn order(
    operation: &Operation<'_>,
    literals: &[Expr],
    left: Value,
    right: Value,
) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (left.number(), right.number()) {
        if let (Value::Int(a), Value::Int(b)) = (left, right) {
            return Some(a.cmp(&b));
        }
        return a.partial_cmp(&b);
    }
    let a = text(operation, literals, left, false)?;
    let b = text(operation, literals, right, false)?;
    Some(a.cmp(&b))
}
