use serde::Serialize;

/// Byte range into one of the request buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: u32,
    pub length: u32,
}

impl Span {
    #[must_use]
    pub fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    #[must_use]
    pub fn from_bounds(start: usize, end: usize) -> Self {
        let start = u32::try_from(start).unwrap_or(u32::MAX);
        let end = u32::try_from(end).unwrap_or(u32::MAX);
        Self {
            start,
            length: end.saturating_sub(start),
        }
    }

    #[must_use]
    pub fn start(self) -> usize {
        self.start as usize
    }

    #[must_use]
    pub fn end(self) -> usize {
        self.start as usize + self.length as usize
    }

    #[must_use]
    pub fn as_str(self, source: &str) -> &str {
        source.get(self.start()..self.end()).unwrap_or_default()
    }
}

/// Which input buffer a token's span points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Origin {
    /// The GraphQL request body.
    Body,
    /// The JSON variables payload.
    Json,
}

/// How a variable obtained its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// The literal default of the variable declaration.
    Default,
    /// The JSON variables payload.
    Json,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Default => f.write_str("default value"),
            ValueSource::Json => f.write_str("JSON variables"),
        }
    }
}

/// Kind of a normalized token.
///
/// Value kinds (`Int` through `Enum`, plus the array/object delimiters) are
/// shared between the operation stream and the variable table.
/// `Variable(index)` only occurs in the operation stream and refers to
/// entry `index` of the variable table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Query,
    Mutation,
    Subscription,
    SelectionSet,
    SelectionSetEnd,
    FieldAlias,
    Field,
    ArgumentList,
    ArgumentListEnd,
    ArgumentName,
    /// Type condition of an inline fragment or an inlined fragment spread.
    /// Empty for `... { }`.
    FragmentInline,
    Array,
    ArrayEnd,
    Object,
    ObjectEnd,
    ObjectField,
    Int,
    Float,
    /// Raw string content between the quotes, escapes not decoded.
    String,
    True,
    False,
    Null,
    Enum,
    Variable(u32),
}

impl TokenKind {
    /// Whether a value starts with this token and consists of nothing else.
    #[must_use]
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            TokenKind::Int
                | TokenKind::Float
                | TokenKind::String
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::Enum
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub origin: Origin,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, span: Span, origin: Origin) -> Self {
        Self { kind, span, origin }
    }

    /// A structural token that carries no text.
    #[must_use]
    pub fn bare(kind: TokenKind) -> Self {
        Self {
            kind,
            span: Span::default(),
            origin: Origin::Body,
        }
    }
}

/// One entry of the variable table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableValue {
    /// Name of the variable without the `$`.
    pub name: Span,
    /// Range of the value tokens in the variable token buffer.
    pub tokens: std::ops::Range<usize>,
    pub source: ValueSource,
}

/// Index of the token following the value that starts at `start`.
///
/// Values are well formed by construction, so a truncated slice simply ends
/// the walk.
#[must_use]
pub fn value_end(tokens: &[Token], start: usize) -> usize {
    let mut depth = 0usize;
    let mut index = start;
    while let Some(token) = tokens.get(index) {
        index += 1;
        match token.kind {
            TokenKind::Array | TokenKind::Object => depth += 1,
            TokenKind::ArrayEnd | TokenKind::ObjectEnd => depth = depth.saturating_sub(1),
            // Field names precede their value inside an object.
            TokenKind::ObjectField => continue,
            _ => {}
        }
        if depth == 0 {
            break;
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(kinds: &[TokenKind]) -> Vec<Token> {
        kinds.iter().copied().map(Token::bare).collect()
    }

    #[test]
    fn test_value_end_scalar() {
        let tokens = bare(&[TokenKind::Int, TokenKind::String]);
        assert_eq!(value_end(&tokens, 0), 1);
        assert_eq!(value_end(&tokens, 1), 2);
    }

    #[test]
    fn test_value_end_nested() {
        let tokens = bare(&[
            TokenKind::Object,
            TokenKind::ObjectField,
            TokenKind::Array,
            TokenKind::Int,
            TokenKind::Int,
            TokenKind::ArrayEnd,
            TokenKind::ObjectField,
            TokenKind::Null,
            TokenKind::ObjectEnd,
            TokenKind::True,
        ]);
        assert_eq!(value_end(&tokens, 0), 9);
        assert_eq!(value_end(&tokens, 2), 6);
    }

    #[test]
    fn test_span_as_str() {
        let source = "query { a }";
        assert_eq!(Span::new(8, 1).as_str(source), "a");
        assert_eq!(Span::from_bounds(0, 5).as_str(source), "query");
        assert_eq!(Span::new(100, 3).as_str(source), "");
    }
}
