//! Validation of variable values against their declared types.
//!
//! A value comes either from the JSON variables payload or from the literal
//! default of the declaration. Both are checked recursively against the
//! declared type and converted into value tokens of the variable table.

use std::borrow::Borrow;
use std::borrow::Cow;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::ReduceError;
use crate::lexer::Lexeme;
use crate::lexer::LexemeKind;
use crate::parser::VariableDef;
use crate::tokens::Origin;
use crate::tokens::Span;
use crate::tokens::Token;
use crate::tokens::TokenKind;
use crate::tokens::ValueSource;
use crate::tokens::VariableValue;

/// A value did not fit the declared type.
struct Mismatch;

/// Shape of the type starting at a lexeme index.
enum TypeShape {
    List { item: usize, nullable: bool },
    Named { name: Span, nullable: bool },
}

impl TypeShape {
    fn nullable(&self) -> bool {
        match self {
            TypeShape::List { nullable, .. } | TypeShape::Named { nullable, .. } => *nullable,
        }
    }
}

/// Variable name in the payload. Borrowed from the payload unless the JSON
/// key contains escapes.
#[derive(Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub(crate) struct Key<'j>(#[serde(borrow)] Cow<'j, str>);

impl Borrow<str> for Key<'_> {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Parsed JSON variables payload: variable name to raw JSON value.
///
/// Values stay unparsed slices of the payload so their tokens can point
/// straight into it.
pub(crate) type Payload<'j> = FxHashMap<Key<'j>, &'j RawValue>;

pub(crate) fn parse_payload(json: Option<&str>) -> Result<Option<Payload<'_>>, ReduceError> {
    let Some(json) = json else {
        return Ok(None);
    };
    let trimmed = json.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    match serde_json::from_str::<Payload<'_>>(json) {
        Ok(payload) => Ok(Some(payload)),
        Err(err) if err.classify() == serde_json::error::Category::Data => {
            Err(ReduceError::VariablesNotObject)
        }
        Err(err) => Err(ReduceError::InvalidVariables {
            reason: err.to_string(),
        }),
    }
}

pub(crate) struct Binder<'a> {
    pub source: &'a str,
    pub json: &'a str,
    pub lexemes: &'a [Lexeme],
    pub tokens: &'a mut Vec<Token>,
    pub values: &'a mut Vec<VariableValue>,
}

impl Binder<'_> {
    pub fn bind(
        &mut self,
        definitions: &[VariableDef],
        payload: Option<&Payload<'_>>,
    ) -> Result<(), ReduceError> {
        for (index, definition) in definitions.iter().enumerate() {
            let name = definition.name.as_str(self.source);
            if definitions[..index]
                .iter()
                .any(|d| d.name.as_str(self.source) == name)
            {
                return Err(ReduceError::RedeclaredVariable {
                    name: name.to_string(),
                });
            }

            let start = self.tokens.len();
            let supplied = payload.and_then(|p| p.get(name));
            let source = if let Some(raw) = supplied {
                let offset = (raw.get().as_ptr() as usize).saturating_sub(self.json.as_ptr() as usize);
                self.json_value(definition.ty, offset)
                    .map_err(|Mismatch| self.mismatch(definition, ValueSource::Json))?;
                ValueSource::Json
            } else if let Some(default) = definition.default {
                self.literal(definition.ty, default)
                    .map_err(|Mismatch| self.mismatch(definition, ValueSource::Default))?;
                ValueSource::Default
            } else if self.shape(definition.ty).nullable() {
                self.tokens.push(Token::bare(TokenKind::Null));
                ValueSource::Default
            } else {
                return Err(ReduceError::MissingVariableValue {
                    variable: name.to_string(),
                    expected: self.type_text(definition.ty).to_string(),
                });
            };

            self.values.push(VariableValue {
                name: definition.name,
                tokens: start..self.tokens.len(),
                source,
            });
        }
        Ok(())
    }

    fn mismatch(&self, definition: &VariableDef, provenance: ValueSource) -> ReduceError {
        ReduceError::UnexpectedValueType {
            variable: definition.name.as_str(self.source).to_string(),
            expected: self.type_text(definition.ty).to_string(),
            provenance,
        }
    }

    fn shape(&self, ty: usize) -> TypeShape {
        let nullable_after = |end: usize| {
            self.lexemes
                .get(end + 1)
                .is_none_or(|l| l.kind != LexemeKind::Bang)
        };
        if self.lexemes[ty].kind == LexemeKind::BracketL {
            let end = self.list_end(ty);
            TypeShape::List {
                item: ty + 1,
                nullable: nullable_after(end),
            }
        } else {
            TypeShape::Named {
                name: self.lexemes[ty].span,
                nullable: nullable_after(ty),
            }
        }
    }

    /// Index of the `]` closing the list type opened at `ty`.
    fn list_end(&self, ty: usize) -> usize {
        let mut depth = 0usize;
        for (index, lexeme) in self.lexemes.iter().enumerate().skip(ty) {
            match lexeme.kind {
                LexemeKind::BracketL => depth += 1,
                LexemeKind::BracketR => {
                    depth -= 1;
                    if depth == 0 {
                        return index;
                    }
                }
                _ => {}
            }
        }
        self.lexemes.len() - 1
    }

    fn type_text(&self, ty: usize) -> &str {
        let mut end = match self.lexemes[ty].kind {
            LexemeKind::BracketL => self.list_end(ty),
            _ => ty,
        };
        if self
            .lexemes
            .get(end + 1)
            .is_some_and(|l| l.kind == LexemeKind::Bang)
        {
            end += 1;
        }
        Span::from_bounds(self.lexemes[ty].span.start(), self.lexemes[end].span.end())
            .as_str(self.source)
    }

    fn push_body(&mut self, kind: TokenKind, span: Span) {
        self.tokens.push(Token::new(kind, span, Origin::Body));
    }

    fn push_json(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens
            .push(Token::new(kind, Span::from_bounds(start, end), Origin::Json));
    }

    /// Validates the GraphQL literal at lexeme `at` against the type at
    /// lexeme `ty` and returns the index of the lexeme after the literal.
    fn literal(&mut self, ty: usize, at: usize) -> Result<usize, Mismatch> {
        let lexeme = self.lexemes[at];
        let text = lexeme.span.as_str(self.source);
        let shape = self.shape(ty);

        if lexeme.kind == LexemeKind::Name && text == "null" {
            if !shape.nullable() {
                return Err(Mismatch);
            }
            self.tokens.push(Token::bare(TokenKind::Null));
            return Ok(at + 1);
        }

        match shape {
            TypeShape::List { item, .. } => {
                if lexeme.kind != LexemeKind::BracketL {
                    return self.literal(item, at);
                }
                self.tokens.push(Token::bare(TokenKind::Array));
                let mut next = at + 1;
                while self.lexemes[next].kind != LexemeKind::BracketR {
                    next = self.literal(item, next)?;
                }
                self.tokens.push(Token::bare(TokenKind::ArrayEnd));
                Ok(next + 1)
            }
            TypeShape::Named { name, .. } => {
                let kind = match (name.as_str(self.source), lexeme.kind) {
                    ("Int", LexemeKind::Int) if text.parse::<i32>().is_ok() => TokenKind::Int,
                    ("Float" | "ID", LexemeKind::Int) => TokenKind::Int,
                    ("Float", LexemeKind::Float) => TokenKind::Float,
                    ("String" | "ID", LexemeKind::String) => TokenKind::String,
                    ("Boolean", LexemeKind::Name) if text == "true" => TokenKind::True,
                    ("Boolean", LexemeKind::Name) if text == "false" => TokenKind::False,
                    ("Int" | "Float" | "String" | "Boolean" | "ID", _) => return Err(Mismatch),
                    _ => return Ok(self.copy_literal(at)),
                };
                self.push_body(kind, lexeme.span);
                Ok(at + 1)
            }
        }
    }

    /// Copies a constant literal of a type the reducer knows nothing about.
    fn copy_literal(&mut self, at: usize) -> usize {
        let lexeme = self.lexemes[at];
        match lexeme.kind {
            LexemeKind::Int => self.push_body(TokenKind::Int, lexeme.span),
            LexemeKind::Float => self.push_body(TokenKind::Float, lexeme.span),
            LexemeKind::String => self.push_body(TokenKind::String, lexeme.span),
            LexemeKind::Name => {
                let kind = match lexeme.span.as_str(self.source) {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "null" => TokenKind::Null,
                    _ => TokenKind::Enum,
                };
                self.push_body(kind, lexeme.span);
            }
            LexemeKind::BracketL => {
                self.tokens.push(Token::bare(TokenKind::Array));
                let mut next = at + 1;
                while self.lexemes[next].kind != LexemeKind::BracketR {
                    next = self.copy_literal(next);
                }
                self.tokens.push(Token::bare(TokenKind::ArrayEnd));
                return next + 1;
            }
            LexemeKind::BraceL => {
                self.tokens.push(Token::bare(TokenKind::Object));
                let mut next = at + 1;
                while self.lexemes[next].kind != LexemeKind::BraceR {
                    self.push_body(TokenKind::ObjectField, self.lexemes[next].span);
                    next = self.copy_literal(next + 2);
                }
                self.tokens.push(Token::bare(TokenKind::ObjectEnd));
                return next + 1;
            }
            // The syntax pass only admits the forms above in constant values.
            _ => {}
        }
        at + 1
    }

    fn json_byte(&self, at: usize) -> u8 {
        self.json.as_bytes().get(at).copied().unwrap_or(0)
    }

    fn skip_json_whitespace(&self, mut at: usize) -> usize {
        while matches!(self.json_byte(at), b' ' | b'\t' | b'\n' | b'\r') {
            at += 1;
        }
        at
    }

    /// End of the JSON number starting at `at` and whether it is integral.
    fn json_number(&self, at: usize) -> (usize, bool) {
        let mut end = at;
        let mut integral = true;
        loop {
            match self.json_byte(end) {
                b'0'..=b'9' | b'-' | b'+' => end += 1,
                b'.' | b'e' | b'E' => {
                    integral = false;
                    end += 1;
                }
                _ => return (end, integral),
            }
        }
    }

    /// End of the content of the JSON string whose opening quote is at `at`.
    fn json_string(&self, at: usize) -> usize {
        let bytes = self.json.as_bytes();
        let mut end = at + 1;
        while end < bytes.len() {
            match memchr::memchr2(b'"', b'\\', &bytes[end..]) {
                Some(offset) if bytes[end + offset] == b'\\' => end += offset + 2,
                Some(offset) => return end + offset,
                None => return bytes.len(),
            }
        }
        bytes.len()
    }

    /// Validates the JSON value at byte `at` against the type at lexeme `ty`
    /// and returns the byte offset after the value.
    fn json_value(&mut self, ty: usize, at: usize) -> Result<usize, Mismatch> {
        let at = self.skip_json_whitespace(at);
        let shape = self.shape(ty);
        let byte = self.json_byte(at);

        if byte == b'n' {
            if !shape.nullable() {
                return Err(Mismatch);
            }
            self.tokens.push(Token::bare(TokenKind::Null));
            return Ok(at + 4);
        }

        match shape {
            TypeShape::List { item, .. } => {
                if byte != b'[' {
                    return self.json_value(item, at);
                }
                self.tokens.push(Token::bare(TokenKind::Array));
                let mut next = self.skip_json_whitespace(at + 1);
                while self.json_byte(next) != b']' {
                    next = self.json_value(item, next)?;
                    next = self.skip_json_whitespace(next);
                    if self.json_byte(next) == b',' {
                        next += 1;
                    }
                    next = self.skip_json_whitespace(next);
                }
                self.tokens.push(Token::bare(TokenKind::ArrayEnd));
                Ok(next + 1)
            }
            TypeShape::Named { name, .. } => {
                let builtin = name.as_str(self.source);
                match (builtin, byte) {
                    ("Int" | "Float" | "ID", b'-' | b'0'..=b'9') => {
                        let (end, integral) = self.json_number(at);
                        let kind = match builtin {
                            "Int" if integral && self.json[at..end].parse::<i32>().is_ok() => {
                                TokenKind::Int
                            }
                            "ID" if integral => TokenKind::Int,
                            "Float" if integral => TokenKind::Int,
                            "Float" => TokenKind::Float,
                            _ => return Err(Mismatch),
                        };
                        self.push_json(kind, at, end);
                        Ok(end)
                    }
                    ("String" | "ID", b'"') => {
                        let end = self.json_string(at);
                        self.push_json(TokenKind::String, at + 1, end);
                        Ok(end + 1)
                    }
                    ("Boolean", b't') => {
                        self.push_json(TokenKind::True, at, at + 4);
                        Ok(at + 4)
                    }
                    ("Boolean", b'f') => {
                        self.push_json(TokenKind::False, at, at + 5);
                        Ok(at + 5)
                    }
                    ("Int" | "Float" | "String" | "Boolean" | "ID", _) => Err(Mismatch),
                    _ => Ok(self.copy_json(at)),
                }
            }
        }
    }

    /// Copies a JSON value of a type the reducer knows nothing about.
    fn copy_json(&mut self, at: usize) -> usize {
        let at = self.skip_json_whitespace(at);
        match self.json_byte(at) {
            b'"' => {
                let end = self.json_string(at);
                self.push_json(TokenKind::String, at + 1, end);
                end + 1
            }
            b't' => {
                self.push_json(TokenKind::True, at, at + 4);
                at + 4
            }
            b'f' => {
                self.push_json(TokenKind::False, at, at + 5);
                at + 5
            }
            b'n' => {
                self.push_json(TokenKind::Null, at, at + 4);
                at + 4
            }
            b'[' => {
                self.tokens.push(Token::bare(TokenKind::Array));
                let mut next = self.skip_json_whitespace(at + 1);
                while self.json_byte(next) != b']' && next < self.json.len() {
                    next = self.copy_json(next);
                    next = self.skip_json_whitespace(next);
                    if self.json_byte(next) == b',' {
                        next = self.skip_json_whitespace(next + 1);
                    }
                }
                self.tokens.push(Token::bare(TokenKind::ArrayEnd));
                next + 1
            }
            b'{' => {
                self.tokens.push(Token::bare(TokenKind::Object));
                let mut next = self.skip_json_whitespace(at + 1);
                while self.json_byte(next) == b'"' {
                    let key_end = self.json_string(next);
                    self.push_json(TokenKind::ObjectField, next + 1, key_end);
                    // Skip the closing quote and the colon.
                    next = self.skip_json_whitespace(key_end + 1) + 1;
                    next = self.copy_json(next);
                    next = self.skip_json_whitespace(next);
                    if self.json_byte(next) == b',' {
                        next = self.skip_json_whitespace(next + 1);
                    }
                }
                self.tokens.push(Token::bare(TokenKind::ObjectEnd));
                next + 1
            }
            _ => {
                let (end, integral) = self.json_number(at);
                let kind = if integral {
                    TokenKind::Int
                } else {
                    TokenKind::Float
                };
                self.push_json(kind, at, end.max(at + 1));
                end.max(at + 1)
            }
        }
    }
}
