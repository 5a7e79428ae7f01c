use std::ops::Range;

use crate::error::ReduceError;
use crate::fragments::MAX_FRAGMENTS;
use crate::lexer::Lexeme;
use crate::lexer::LexemeKind;
use crate::operation::OperationKind;
use crate::tokens::Span;

const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone)]
pub(crate) struct OperationDef {
    pub kind: OperationKind,
    pub name: Option<Span>,
    pub variables: Range<usize>,
    /// Lexeme index of the opening brace of the selection set.
    pub selection: usize,
    pub spreads: Range<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct FragmentDef {
    pub name: Span,
    pub type_condition: Span,
    pub selection: usize,
    pub spreads: Range<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct VariableDef {
    pub name: Span,
    /// Lexeme index where the declared type starts.
    pub ty: usize,
    /// Lexeme index of the default value, if any.
    pub default: Option<usize>,
}

/// Definitions of one document, indexed by lexeme position.
#[derive(Debug, Default)]
pub(crate) struct Document {
    pub operations: Vec<OperationDef>,
    pub fragments: Vec<FragmentDef>,
    pub variables: Vec<VariableDef>,
    /// Names of every fragment spread, grouped per definition.
    pub spreads: Vec<Span>,
}

impl Document {
    pub fn clear(&mut self) {
        self.operations.clear();
        self.fragments.clear();
        self.variables.clear();
        self.spreads.clear();
    }
}

/// Syntax pass over the lexemes of a request document.
///
/// Checks the grammar and records where operations, fragments, variable
/// definitions and fragment spreads live, without producing any output
/// tokens.
pub(crate) struct Parser<'a> {
    source: &'a str,
    lexemes: &'a [Lexeme],
    current: usize,
    depth: usize,
    document: &'a mut Document,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, lexemes: &'a [Lexeme], document: &'a mut Document) -> Self {
        Self {
            source,
            lexemes,
            current: 0,
            depth: 0,
            document,
        }
    }

    pub fn parse(mut self) -> Result<(), ReduceError> {
        if self.lexemes.is_empty() {
            return Err(ReduceError::syntax(0, "empty document"));
        }

        while let Some(lexeme) = self.peek() {
            match lexeme.kind {
                LexemeKind::BraceL => self.operation(OperationKind::Query, false)?,
                LexemeKind::Name => match self.text(lexeme) {
                    "query" => self.operation(OperationKind::Query, true)?,
                    "mutation" => self.operation(OperationKind::Mutation, true)?,
                    "subscription" => self.operation(OperationKind::Subscription, true)?,
                    "fragment" => self.fragment()?,
                    _ => return Err(self.unexpected("expected a definition")),
                },
                _ => return Err(self.unexpected("expected a definition")),
            }
        }

        let operations = &self.document.operations;
        if operations.len() > 1 && operations.iter().any(|op| op.name.is_none()) {
            return Err(ReduceError::AmbiguousAnonymousOperation);
        }
        Ok(())
    }

    fn operation(&mut self, kind: OperationKind, keyword: bool) -> Result<(), ReduceError> {
        if keyword {
            self.current += 1;
        }

        let name = match self.peek() {
            Some(lexeme) if keyword && lexeme.kind == LexemeKind::Name => {
                self.current += 1;
                Some(lexeme.span)
            }
            _ => None,
        };
        if let Some(name) = name {
            let text = name.as_str(self.source);
            let redeclared = self
                .document
                .operations
                .iter()
                .any(|op| op.name.is_some_and(|n| n.as_str(self.source) == text));
            if redeclared {
                return Err(ReduceError::RedeclaredOperation {
                    name: text.to_string(),
                });
            }
        }

        let variables_start = self.document.variables.len();
        if self.at(LexemeKind::ParenL) {
            self.variable_definitions()?;
        }
        let variables = variables_start..self.document.variables.len();
        self.reject_directives()?;

        let spreads_start = self.document.spreads.len();
        let selection = self.current;
        self.selection_set()?;

        self.document.operations.push(OperationDef {
            kind,
            name,
            variables,
            selection,
            spreads: spreads_start..self.document.spreads.len(),
        });
        Ok(())
    }

    fn fragment(&mut self) -> Result<(), ReduceError> {
        self.current += 1;
        let name = self.expect(LexemeKind::Name, "expected a fragment name")?;
        if name.as_str(self.source) == "on" {
            return Err(ReduceError::syntax(name.start(), "expected a fragment name"));
        }
        let on = self.expect(LexemeKind::Name, "expected 'on'")?;
        if on.as_str(self.source) != "on" {
            return Err(ReduceError::syntax(on.start(), "expected 'on'"));
        }
        let type_condition = self.expect(LexemeKind::Name, "expected a type condition")?;
        self.reject_directives()?;

        let text = name.as_str(self.source);
        if self
            .document
            .fragments
            .iter()
            .any(|f| f.name.as_str(self.source) == text)
        {
            return Err(ReduceError::RedeclaredFragment {
                name: text.to_string(),
            });
        }
        if self.document.fragments.len() == MAX_FRAGMENTS {
            return Err(ReduceError::FragmentLimitExceeded {
                limit: MAX_FRAGMENTS,
            });
        }

        let spreads_start = self.document.spreads.len();
        let selection = self.current;
        self.selection_set()?;

        self.document.fragments.push(FragmentDef {
            name,
            type_condition,
            selection,
            spreads: spreads_start..self.document.spreads.len(),
        });
        Ok(())
    }

    fn variable_definitions(&mut self) -> Result<(), ReduceError> {
        self.current += 1;
        if self.at(LexemeKind::ParenR) {
            return Err(self.unexpected("expected a variable definition"));
        }
        while !self.at(LexemeKind::ParenR) {
            self.expect(LexemeKind::Dollar, "expected a variable definition")?;
            let name = self.expect(LexemeKind::Name, "expected a variable name")?;
            self.expect(LexemeKind::Colon, "expected ':'")?;
            let ty = self.current;
            self.type_reference()?;
            let default = if self.at(LexemeKind::Equals) {
                self.current += 1;
                let at = self.current;
                self.value(true)?;
                Some(at)
            } else {
                None
            };
            self.reject_directives()?;
            self.document
                .variables
                .push(VariableDef { name, ty, default });
        }
        self.current += 1;
        Ok(())
    }

    fn type_reference(&mut self) -> Result<(), ReduceError> {
        self.enter()?;
        if self.at(LexemeKind::BracketL) {
            self.current += 1;
            self.type_reference()?;
            self.expect(LexemeKind::BracketR, "expected ']'")?;
        } else {
            self.expect(LexemeKind::Name, "expected a type")?;
        }
        if self.at(LexemeKind::Bang) {
            self.current += 1;
        }
        self.leave();
        Ok(())
    }

    fn selection_set(&mut self) -> Result<(), ReduceError> {
        self.enter()?;
        self.expect(LexemeKind::BraceL, "expected '{'")?;
        if self.at(LexemeKind::BraceR) {
            return Err(self.unexpected("empty selection set"));
        }
        while !self.at(LexemeKind::BraceR) {
            self.selection()?;
        }
        self.current += 1;
        self.leave();
        Ok(())
    }

    fn selection(&mut self) -> Result<(), ReduceError> {
        let Some(lexeme) = self.peek() else {
            return Err(self.unexpected("expected a selection"));
        };
        match lexeme.kind {
            LexemeKind::Spread => {
                self.current += 1;
                match self.peek() {
                    Some(next) if next.kind == LexemeKind::Name && self.text(next) == "on" => {
                        self.current += 1;
                        self.expect(LexemeKind::Name, "expected a type condition")?;
                        self.reject_directives()?;
                        self.selection_set()
                    }
                    Some(next) if next.kind == LexemeKind::BraceL => self.selection_set(),
                    Some(next) if next.kind == LexemeKind::Name => {
                        self.current += 1;
                        self.document.spreads.push(next.span);
                        self.reject_directives()
                    }
                    _ => Err(self.unexpected("expected a fragment")),
                }
            }
            LexemeKind::Name => {
                self.current += 1;
                if self.at(LexemeKind::Colon) {
                    self.current += 1;
                    self.expect(LexemeKind::Name, "expected a field name")?;
                }
                if self.at(LexemeKind::ParenL) {
                    self.arguments()?;
                }
                self.reject_directives()?;
                if self.at(LexemeKind::BraceL) {
                    self.selection_set()?;
                }
                Ok(())
            }
            _ => Err(self.unexpected("expected a selection")),
        }
    }

    fn arguments(&mut self) -> Result<(), ReduceError> {
        self.current += 1;
        if self.at(LexemeKind::ParenR) {
            return Err(self.unexpected("empty argument list"));
        }
        while !self.at(LexemeKind::ParenR) {
            self.expect(LexemeKind::Name, "expected an argument name")?;
            self.expect(LexemeKind::Colon, "expected ':'")?;
            self.value(false)?;
        }
        self.current += 1;
        Ok(())
    }

    fn value(&mut self, constant: bool) -> Result<(), ReduceError> {
        let Some(lexeme) = self.peek() else {
            return Err(self.unexpected("expected a value"));
        };
        match lexeme.kind {
            LexemeKind::Dollar => {
                if constant {
                    return Err(self.unexpected("variables are not allowed in constant values"));
                }
                self.current += 1;
                self.expect(LexemeKind::Name, "expected a variable name")?;
            }
            LexemeKind::Int | LexemeKind::Float | LexemeKind::String | LexemeKind::Name => {
                self.current += 1;
            }
            LexemeKind::BracketL => {
                self.enter()?;
                self.current += 1;
                while !self.at(LexemeKind::BracketR) {
                    self.value(constant)?;
                }
                self.current += 1;
                self.leave();
            }
            LexemeKind::BraceL => {
                self.enter()?;
                self.current += 1;
                while !self.at(LexemeKind::BraceR) {
                    self.expect(LexemeKind::Name, "expected an object field")?;
                    self.expect(LexemeKind::Colon, "expected ':'")?;
                    self.value(constant)?;
                }
                self.current += 1;
                self.leave();
            }
            _ => return Err(self.unexpected("expected a value")),
        }
        Ok(())
    }

    fn reject_directives(&self) -> Result<(), ReduceError> {
        if self.at(LexemeKind::At) {
            return Err(self.unexpected("directives are not supported"));
        }
        Ok(())
    }

    fn enter(&mut self) -> Result<(), ReduceError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.unexpected("document is nested too deeply"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn peek(&self) -> Option<Lexeme> {
        self.lexemes.get(self.current).copied()
    }

    fn at(&self, kind: LexemeKind) -> bool {
        self.peek().is_some_and(|l| l.kind == kind)
    }

    fn text(&self, lexeme: Lexeme) -> &'a str {
        lexeme.span.as_str(self.source)
    }

    fn expect(&mut self, kind: LexemeKind, reason: &'static str) -> Result<Span, ReduceError> {
        match self.peek() {
            Some(lexeme) if lexeme.kind == kind => {
                self.current += 1;
                Ok(lexeme.span)
            }
            _ => Err(self.unexpected(reason)),
        }
    }

    fn unexpected(&self, reason: &'static str) -> ReduceError {
        let position = self
            .peek()
            .map_or(self.source.len(), |lexeme| lexeme.span.start());
        ReduceError::syntax(position, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Result<Document, ReduceError> {
        let mut lexemes = Vec::new();
        Lexer::new(source).tokenize(&mut lexemes)?;
        let mut document = Document::default();
        Parser::new(source, &lexemes, &mut document).parse()?;
        Ok(document)
    }

    mod definitions {
        use super::*;

        #[test]
        fn test_shorthand_query() {
            let document = parse("{ a }").unwrap();
            assert_eq!(document.operations.len(), 1);
            assert_eq!(document.operations[0].kind, OperationKind::Query);
            assert!(document.operations[0].name.is_none());
        }

        #[test]
        fn test_named_operations_and_fragments() {
            let source = "query A { ...F } mutation B($x: Int = 1) { m(x: $x) } fragment F on Query { a }";
            let document = parse(source).unwrap();
            assert_eq!(document.operations.len(), 2);
            assert_eq!(document.operations[1].kind, OperationKind::Mutation);
            assert_eq!(document.operations[1].variables, 0..1);
            assert_eq!(document.fragments.len(), 1);
            assert_eq!(document.fragments[0].type_condition.as_str(source), "Query");
            assert_eq!(document.operations[0].spreads, 0..1);
            assert_eq!(document.spreads[0].as_str(source), "F");
        }

        #[test]
        fn test_redeclared_operation() {
            assert_eq!(
                parse("query A { a } query A { b }").unwrap_err(),
                ReduceError::RedeclaredOperation { name: "A".into() }
            );
        }

        #[test]
        fn test_anonymous_operation_must_be_alone() {
            assert_eq!(
                parse("{ a } query B { b }").unwrap_err(),
                ReduceError::AmbiguousAnonymousOperation
            );
        }

        #[test]
        fn test_redeclared_fragment() {
            assert_eq!(
                parse("{ ...F } fragment F on Q { a } fragment F on Q { b }").unwrap_err(),
                ReduceError::RedeclaredFragment { name: "F".into() }
            );
        }

        #[test]
        fn test_fragment_limit() {
            let mut source = String::from("{ a }");
            for i in 0..=MAX_FRAGMENTS {
                source.push_str(&format!(" fragment F{i} on Q {{ a }}"));
            }
            assert_eq!(
                parse(&source).unwrap_err(),
                ReduceError::FragmentLimitExceeded {
                    limit: MAX_FRAGMENTS
                }
            );
        }
    }

    mod syntax {
        use super::*;

        fn reason(source: &str) -> &'static str {
            match parse(source).unwrap_err() {
                ReduceError::Syntax { reason, .. } => reason,
                other => panic!("expected a syntax error, got {other:?}"),
            }
        }

        #[test]
        fn test_empty_document() {
            assert_eq!(reason(""), "empty document");
        }

        #[test]
        fn test_empty_selection_set() {
            assert_eq!(reason("query { }"), "empty selection set");
        }

        #[test]
        fn test_unclosed_selection_set() {
            assert_eq!(
                parse("{ a").unwrap_err(),
                ReduceError::Syntax {
                    position: 3,
                    reason: "expected a selection"
                }
            );
        }

        #[test]
        fn test_directives_rejected() {
            assert_eq!(reason("{ a @skip(if: true) }"), "directives are not supported");
        }

        #[test]
        fn test_variable_in_default() {
            assert_eq!(
                reason("query ($a: Int = $b) { a }"),
                "variables are not allowed in constant values"
            );
        }

        #[test]
        fn test_fragment_named_on() {
            assert_eq!(reason("fragment on on Q { a }"), "expected a fragment name");
        }

        #[test]
        fn test_nesting_limit() {
            let source = format!("{{ a(x: {}1{}) }}", "[".repeat(300), "]".repeat(300));
            assert_eq!(reason(&source), "document is nested too deeply");
        }

        #[test]
        fn test_value_forms() {
            let source = r#"{ a(i: 1, f: 1.5, s: "x", b: true, n: null, e: RED, l: [1 [2]], o: {k: {j: $v}}) }"#;
            assert!(parse(source).is_ok());
        }
    }
}
