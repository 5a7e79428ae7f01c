use std::fmt;

use serde::Serialize;

use crate::tokens::Origin;
use crate::tokens::Token;
use crate::tokens::TokenKind;
use crate::tokens::ValueSource;
use crate::tokens::VariableValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }

    #[must_use]
    pub fn token(self) -> TokenKind {
        match self {
            OperationKind::Query => TokenKind::Query,
            OperationKind::Mutation => TokenKind::Mutation,
            OperationKind::Subscription => TokenKind::Subscription,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reduced operation: the token stream of the selected operation with
/// every fragment inlined, plus its variable table.
///
/// The view borrows the reducer that produced it and both request buffers,
/// so it cannot outlive the call that produced it.
#[derive(Debug, Clone, Copy)]
pub struct Operation<'r> {
    pub(crate) kind: OperationKind,
    pub(crate) name: Option<&'r str>,
    pub(crate) tokens: &'r [Token],
    pub(crate) variables: &'r [VariableValue],
    pub(crate) variable_tokens: &'r [Token],
    pub(crate) body: &'r str,
    pub(crate) json: &'r str,
}

impl<'r> Operation<'r> {
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> Option<&'r str> {
        self.name
    }

    /// The token stream, starting with the operation kind token.
    #[must_use]
    pub fn tokens(&self) -> &'r [Token] {
        self.tokens
    }

    /// Text of a token of this operation or of its variable table.
    #[must_use]
    pub fn text(&self, token: &Token) -> &'r str {
        match token.origin {
            Origin::Body => token.span.as_str(self.body),
            Origin::Json => token.span.as_str(self.json),
        }
    }

    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Value tokens of variable `index`, empty when the index is unknown.
    #[must_use]
    pub fn variable(&self, index: u32) -> &'r [Token] {
        self.variables
            .get(index as usize)
            .and_then(|value| self.variable_tokens.get(value.tokens.clone()))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn variable_name(&self, index: u32) -> Option<&'r str> {
        self.variables
            .get(index as usize)
            .map(|value| value.name.as_str(self.body))
    }

    #[must_use]
    pub fn variable_source(&self, index: u32) -> Option<ValueSource> {
        self.variables.get(index as usize).map(|value| value.source)
    }

    /// Writes the operation as compact GraphQL with variable values inlined.
    pub fn write_to<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        out.write_str(self.kind.as_str())?;
        self.write_tokens(self.tokens.get(1..).unwrap_or_default(), out)
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }

    fn write_tokens<W: fmt::Write>(&self, tokens: &[Token], out: &mut W) -> fmt::Result {
        let mut previous: Option<TokenKind> = None;
        for token in tokens {
            if let Some(previous) = previous {
                if ends_selection(previous) && starts_selection(token.kind) {
                    out.write_char(' ')?;
                } else if ends_value(previous) && starts_entry(token.kind) {
                    out.write_char(',')?;
                }
            }
            previous = Some(token.kind);

            match token.kind {
                TokenKind::Query | TokenKind::Mutation | TokenKind::Subscription => {}
                TokenKind::SelectionSet => out.write_char('{')?,
                TokenKind::SelectionSetEnd => out.write_char('}')?,
                TokenKind::FieldAlias | TokenKind::ArgumentName | TokenKind::ObjectField => {
                    out.write_str(self.text(token))?;
                    out.write_char(':')?;
                }
                TokenKind::Field | TokenKind::Int | TokenKind::Float | TokenKind::Enum => {
                    out.write_str(self.text(token))?;
                }
                TokenKind::ArgumentList => out.write_char('(')?,
                TokenKind::ArgumentListEnd => out.write_char(')')?,
                TokenKind::FragmentInline => {
                    let condition = self.text(token);
                    out.write_str("...")?;
                    if !condition.is_empty() {
                        write!(out, "on {condition}")?;
                    }
                }
                TokenKind::Array => out.write_char('[')?,
                TokenKind::ArrayEnd => out.write_char(']')?,
                TokenKind::Object => out.write_char('{')?,
                TokenKind::ObjectEnd => out.write_char('}')?,
                TokenKind::String => write!(out, "\"{}\"", self.text(token))?,
                TokenKind::True => out.write_str("true")?,
                TokenKind::False => out.write_str("false")?,
                TokenKind::Null => out.write_str("null")?,
                TokenKind::Variable(index) => self.write_tokens(self.variable(index), out)?,
            }
        }
        Ok(())
    }
}

fn ends_selection(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Field | TokenKind::ArgumentListEnd | TokenKind::SelectionSetEnd
    )
}

fn starts_selection(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Field | TokenKind::FieldAlias | TokenKind::FragmentInline
    )
}

fn ends_value(kind: TokenKind) -> bool {
    kind.is_scalar()
        || matches!(
            kind,
            TokenKind::ArrayEnd | TokenKind::ObjectEnd | TokenKind::Variable(_)
        )
}

fn starts_entry(kind: TokenKind) -> bool {
    kind.is_scalar()
        || matches!(
            kind,
            TokenKind::Array
                | TokenKind::Object
                | TokenKind::Variable(_)
                | TokenKind::ArgumentName
                | TokenKind::ObjectField
        )
}

impl fmt::Display for Operation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f)
    }
}
