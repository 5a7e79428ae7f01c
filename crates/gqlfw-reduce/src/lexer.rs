use crate::error::ReduceError;
use crate::tokens::Span;

const BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LexemeKind {
    Name,
    Int,
    Float,
    /// Content between the quotes.
    String,
    Bang,
    Dollar,
    ParenL,
    ParenR,
    Spread,
    Colon,
    Equals,
    At,
    BracketL,
    BracketR,
    BraceL,
    BraceR,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Lexeme {
    pub kind: LexemeKind,
    pub span: Span,
}

/// Splits a GraphQL document into lexemes, dropping ignored tokens
/// (whitespace, commas, comments and a leading byte order mark).
pub(crate) struct Lexer<'s> {
    source: &'s [u8],
    current: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str) -> Self {
        let source = source.as_bytes();
        let current = if source.starts_with(BOM) { BOM.len() } else { 0 };
        Self { source, current }
    }

    pub fn tokenize(mut self, out: &mut Vec<Lexeme>) -> Result<(), ReduceError> {
        loop {
            self.skip_ignored();
            let Some(&byte) = self.source.get(self.current) else {
                return Ok(());
            };
            let start = self.current;
            let kind = match byte {
                b'!' => self.single(LexemeKind::Bang),
                b'$' => self.single(LexemeKind::Dollar),
                b'(' => self.single(LexemeKind::ParenL),
                b')' => self.single(LexemeKind::ParenR),
                b':' => self.single(LexemeKind::Colon),
                b'=' => self.single(LexemeKind::Equals),
                b'@' => self.single(LexemeKind::At),
                b'[' => self.single(LexemeKind::BracketL),
                b']' => self.single(LexemeKind::BracketR),
                b'{' => self.single(LexemeKind::BraceL),
                b'}' => self.single(LexemeKind::BraceR),
                b'.' => {
                    if self.source[start..].starts_with(b"...") {
                        self.current += 3;
                        LexemeKind::Spread
                    } else {
                        return Err(ReduceError::syntax(start, "unexpected '.'"));
                    }
                }
                b'"' => {
                    let span = self.lex_string()?;
                    out.push(Lexeme {
                        kind: LexemeKind::String,
                        span,
                    });
                    continue;
                }
                b'-' | b'0'..=b'9' => self.lex_number()?,
                b'_' | b'a'..=b'z' | b'A'..=b'Z' => {
                    self.lex_name();
                    LexemeKind::Name
                }
                _ => return Err(ReduceError::syntax(start, "unexpected character")),
            };
            out.push(Lexeme {
                kind,
                span: Span::from_bounds(start, self.current),
            });
        }
    }

    fn single(&mut self, kind: LexemeKind) -> LexemeKind {
        self.current += 1;
        kind
    }

    fn skip_ignored(&mut self) {
        while let Some(&byte) = self.source.get(self.current) {
            match byte {
                b' ' | b'\t' | b'\n' | b'\r' | b',' => self.current += 1,
                b'#' => {
                    let rest = &self.source[self.current..];
                    self.current += memchr::memchr2(b'\n', b'\r', rest).unwrap_or(rest.len());
                }
                _ => return,
            }
        }
    }

    fn lex_name(&mut self) {
        while self
            .source
            .get(self.current)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
        {
            self.current += 1;
        }
    }

    fn digits(&mut self) -> usize {
        let start = self.current;
        while self.source.get(self.current).is_some_and(u8::is_ascii_digit) {
            self.current += 1;
        }
        self.current - start
    }

    fn lex_number(&mut self) -> Result<LexemeKind, ReduceError> {
        let start = self.current;
        if self.source[self.current] == b'-' {
            self.current += 1;
        }
        let int_start = self.current;
        let int_digits = self.digits();
        if int_digits == 0 {
            return Err(ReduceError::syntax(start, "invalid number"));
        }
        if int_digits > 1 && self.source[int_start] == b'0' {
            return Err(ReduceError::syntax(start, "invalid number: leading zero"));
        }

        let mut kind = LexemeKind::Int;
        if self.source.get(self.current) == Some(&b'.') {
            self.current += 1;
            if self.digits() == 0 {
                return Err(ReduceError::syntax(start, "invalid number"));
            }
            kind = LexemeKind::Float;
        }
        if matches!(self.source.get(self.current), Some(b'e' | b'E')) {
            self.current += 1;
            if matches!(self.source.get(self.current), Some(b'+' | b'-')) {
                self.current += 1;
            }
            if self.digits() == 0 {
                return Err(ReduceError::syntax(start, "invalid number exponent"));
            }
            kind = LexemeKind::Float;
        }

        if self
            .source
            .get(self.current)
            .is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_' || *b == b'.')
        {
            return Err(ReduceError::syntax(self.current, "invalid number"));
        }
        Ok(kind)
    }

    /// Lexes a quoted string and returns the span of its raw content.
    fn lex_string(&mut self) -> Result<Span, ReduceError> {
        let quote = self.current;
        if self.source[quote..].starts_with(b"\"\"\"") {
            return Err(ReduceError::syntax(quote, "block strings are not supported"));
        }
        self.current += 1;
        let content_start = self.current;

        loop {
            let rest = &self.source[self.current..];
            let Some(offset) = memchr::memchr3(b'"', b'\\', b'\n', rest) else {
                return Err(ReduceError::syntax(quote, "unterminated string"));
            };
            if rest[..offset].contains(&b'\r') {
                return Err(ReduceError::syntax(quote, "unterminated string"));
            }
            self.current += offset;
            match self.source[self.current] {
                b'"' => {
                    let span = Span::from_bounds(content_start, self.current);
                    self.current += 1;
                    return Ok(span);
                }
                b'\\' => self.lex_escape()?,
                _ => return Err(ReduceError::syntax(quote, "unterminated string")),
            }
        }
    }

    fn lex_escape(&mut self) -> Result<(), ReduceError> {
        let at = self.current;
        match self.source.get(at + 1) {
            Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => {
                self.current += 2;
                Ok(())
            }
            Some(b'u') => {
                let hex = self.source.get(at + 2..at + 6);
                if hex.is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit)) {
                    self.current += 6;
                    Ok(())
                } else {
                    Err(ReduceError::syntax(at, "invalid unicode escape"))
                }
            }
            _ => Err(ReduceError::syntax(at, "invalid escape sequence")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<LexemeKind> {
        let mut out = Vec::new();
        Lexer::new(source).tokenize(&mut out).unwrap();
        out.into_iter().map(|l| l.kind).collect()
    }

    fn texts(source: &str) -> Vec<&str> {
        let mut out = Vec::new();
        Lexer::new(source).tokenize(&mut out).unwrap();
        out.into_iter().map(|l| l.span.as_str(source)).collect()
    }

    fn error(source: &str) -> ReduceError {
        let mut out = Vec::new();
        Lexer::new(source).tokenize(&mut out).unwrap_err()
    }

    #[test]
    fn test_punctuators() {
        assert_eq!(
            kinds("{ ( ) [ ] } : = ! $ @ ..."),
            vec![
                LexemeKind::BraceL,
                LexemeKind::ParenL,
                LexemeKind::ParenR,
                LexemeKind::BracketL,
                LexemeKind::BracketR,
                LexemeKind::BraceR,
                LexemeKind::Colon,
                LexemeKind::Equals,
                LexemeKind::Bang,
                LexemeKind::Dollar,
                LexemeKind::At,
                LexemeKind::Spread,
            ]
        );
    }

    #[test]
    fn test_ignored_tokens() {
        let source = "\u{feff}query, # comment\r\n{ a,,b }";
        assert_eq!(texts(source), vec!["query", "{", "a", "b", "}"]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("0 -1 42 1.5 -0.25 1e10 2E-3"),
            vec![
                LexemeKind::Int,
                LexemeKind::Int,
                LexemeKind::Int,
                LexemeKind::Float,
                LexemeKind::Float,
                LexemeKind::Float,
                LexemeKind::Float,
            ]
        );
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(matches!(error("01"), ReduceError::Syntax { .. }));
        assert!(matches!(error("1."), ReduceError::Syntax { .. }));
        assert!(matches!(error("1e"), ReduceError::Syntax { .. }));
        assert!(matches!(error("12abc"), ReduceError::Syntax { .. }));
        assert!(matches!(error("-"), ReduceError::Syntax { .. }));
    }

    #[test]
    fn test_string_content_span() {
        let source = r#"a: "he said \"hi\"" b: "" c: "é""#;
        assert_eq!(
            texts(source),
            vec!["a", ":", r#"he said \"hi\""#, "b", ":", "", "c", ":", r"é"]
        );
    }

    #[test]
    fn test_string_errors() {
        assert_eq!(
            error("\"abc"),
            ReduceError::syntax(0, "unterminated string")
        );
        assert_eq!(
            error("\"ab\ncd\""),
            ReduceError::syntax(0, "unterminated string")
        );
        assert_eq!(
            error(r#""\x""#),
            ReduceError::syntax(1, "invalid escape sequence")
        );
        assert_eq!(
            error(r#""""block""""#),
            ReduceError::syntax(0, "block strings are not supported")
        );
    }

    #[test]
    fn test_unexpected_characters() {
        assert_eq!(error("a . b"), ReduceError::syntax(2, "unexpected '.'"));
        assert_eq!(error("a ; b"), ReduceError::syntax(2, "unexpected character"));
        assert_eq!(error("{ a | b }"), ReduceError::syntax(4, "unexpected character"));
        assert_eq!(error("{ a & b }"), ReduceError::syntax(4, "unexpected character"));
    }
}
