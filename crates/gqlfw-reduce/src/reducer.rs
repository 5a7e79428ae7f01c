use std::ops::Range;

use crate::error::ReduceError;
use crate::fragments::FragmentGraph;
use crate::lexer::Lexeme;
use crate::lexer::LexemeKind;
use crate::lexer::Lexer;
use crate::operation::Operation;
use crate::parser::Document;
use crate::parser::FragmentDef;
use crate::parser::OperationDef;
use crate::parser::Parser;
use crate::parser::VariableDef;
use crate::tokens::Origin;
use crate::tokens::Span;
use crate::tokens::Token;
use crate::tokens::TokenKind;
use crate::tokens::VariableValue;
use crate::variables::parse_payload;
use crate::variables::Binder;

/// Turns raw requests into reduced operations.
///
/// All buffers are reused between calls. A reducer serves one request at a
/// time; the [`Operation`] it returns borrows it until dropped.
#[derive(Debug, Default)]
pub struct Reducer {
    lexemes: Vec<Lexeme>,
    document: Document,
    graph: FragmentGraph,
    cycle: Vec<usize>,
    order: Vec<usize>,
    /// Token range of every constructed fragment, by fragment index.
    built: Vec<Option<Range<usize>>>,
    fragment_tokens: Vec<Token>,
    tokens: Vec<Token>,
    variable_tokens: Vec<Token>,
    variables: Vec<VariableValue>,
    contexts: Vec<Context>,
}

impl Reducer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.lexemes.clear();
        self.document.clear();
        self.graph.reset(0);
        self.cycle.clear();
        self.order.clear();
        self.built.clear();
        self.fragment_tokens.clear();
        self.tokens.clear();
        self.variable_tokens.clear();
        self.variables.clear();
        self.contexts.clear();
    }

    /// Reduces `body` to the operation named `operation_name` (or its only
    /// operation), binding variables from the JSON object `variables`.
    pub fn reduce<'r>(
        &'r mut self,
        body: &'r str,
        operation_name: Option<&str>,
        variables: Option<&'r str>,
    ) -> Result<Operation<'r>, ReduceError> {
        self.reset();

        Lexer::new(body).tokenize(&mut self.lexemes)?;
        Parser::new(body, &self.lexemes, &mut self.document).parse()?;
        self.check_fragments(body)?;

        let selected = self.select(body, operation_name)?;
        let operation = self.document.operations[selected].clone();

        let json = variables.unwrap_or_default();
        let payload = parse_payload(variables)?;
        Binder {
            source: body,
            json,
            lexemes: &self.lexemes,
            tokens: &mut self.variable_tokens,
            values: &mut self.variables,
        }
        .bind(
            &self.document.variables[operation.variables.clone()],
            payload.as_ref(),
        )?;

        self.build_fragments(body, &operation)?;

        self.tokens.push(Token::bare(operation.kind.token()));
        Emitter {
            source: body,
            lexemes: &self.lexemes,
            fragments: &self.document.fragments,
            built: &self.built,
            variables: &self.document.variables[operation.variables.clone()],
            contexts: &mut self.contexts,
            out: &mut self.tokens,
            spreads: Spreads::From(&self.fragment_tokens),
        }
        .selection_set(operation.selection)?;

        tracing::trace!(
            tokens = self.tokens.len(),
            variables = self.variables.len(),
            fragments = self.order.len(),
            "reduced operation"
        );

        Ok(Operation {
            kind: operation.kind,
            name: operation.name.map(|name| name.as_str(body)),
            tokens: &self.tokens,
            variables: &self.variables,
            variable_tokens: &self.variable_tokens,
            body,
            json,
        })
    }

    fn select(&self, body: &str, operation_name: Option<&str>) -> Result<usize, ReduceError> {
        let operations = &self.document.operations;
        match operation_name {
            Some(wanted) => operations
                .iter()
                .position(|op| op.name.is_some_and(|name| name.as_str(body) == wanted))
                .ok_or_else(|| ReduceError::OperationNotFound {
                    name: Some(wanted.to_string()),
                }),
            None => match operations.len() {
                0 => Err(ReduceError::OperationNotFound { name: None }),
                1 => Ok(0),
                _ => Err(ReduceError::AmbiguousAnonymousOperation),
            },
        }
    }

    /// Resolves every spread of the document, then rejects spread cycles
    /// and fragments nothing spreads.
    fn check_fragments(&mut self, body: &str) -> Result<(), ReduceError> {
        let document = &self.document;
        self.graph.reset(document.fragments.len());

        let owners = document
            .operations
            .iter()
            .map(|op| (None, op.spreads.clone()))
            .chain(
                document
                    .fragments
                    .iter()
                    .enumerate()
                    .map(|(index, fragment)| (Some(index), fragment.spreads.clone())),
            );
        for (from, spreads) in owners {
            for spread in &document.spreads[spreads] {
                let to = fragment_index(&document.fragments, body, *spread).ok_or_else(|| {
                    ReduceError::UndefinedFragment {
                        name: spread.as_str(body).to_string(),
                    }
                })?;
                self.graph.add_spread(from, to);
            }
        }

        if self.graph.find_cycle(&mut self.cycle) {
            return Err(ReduceError::FragmentRecursion {
                path: self
                    .cycle
                    .iter()
                    .map(|&index| document.fragments[index].name.as_str(body).to_string())
                    .collect(),
            });
        }
        if let Some(unused) = self.graph.first_unreferenced() {
            return Err(ReduceError::UnusedFragment {
                name: document.fragments[unused].name.as_str(body).to_string(),
            });
        }
        Ok(())
    }

    /// Constructs every fragment reachable from the selected operation,
    /// dependencies first, so that each spread becomes a copy of an already
    /// reduced token range.
    fn build_fragments(&mut self, body: &str, operation: &OperationDef) -> Result<(), ReduceError> {
        let fragments = &self.document.fragments;
        let variables = &self.document.variables[operation.variables.clone()];
        let roots = self.document.spreads[operation.spreads.clone()]
            .iter()
            .filter_map(|spread| fragment_index(fragments, body, *spread))
            .fold(0u128, |roots, index| roots | (1 << index));
        self.graph.dependencies_first(roots, &mut self.order);
        self.built.resize(fragments.len(), None);

        for &index in &self.order {
            let fragment = &fragments[index];
            let start = self.fragment_tokens.len();
            self.fragment_tokens.push(Token::new(
                TokenKind::FragmentInline,
                fragment.type_condition,
                Origin::Body,
            ));
            Emitter {
                source: body,
                lexemes: &self.lexemes,
                fragments,
                built: &self.built,
                variables,
                contexts: &mut self.contexts,
                out: &mut self.fragment_tokens,
                spreads: Spreads::Within,
            }
            .selection_set(fragment.selection)?;
            self.built[index] = Some(start..self.fragment_tokens.len());
        }
        Ok(())
    }
}

fn fragment_index(fragments: &[FragmentDef], body: &str, name: Span) -> Option<usize> {
    let name = name.as_str(body);
    fragments
        .iter()
        .position(|fragment| fragment.name.as_str(body) == name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Selection,
    Arguments,
    Object,
    List,
}

/// Where the tokens of already constructed fragments live.
enum Spreads<'a> {
    /// In the output buffer itself.
    Within,
    From(&'a [Token]),
}

/// Translates one selection set of the (already validated) lexeme stream
/// into output tokens.
struct Emitter<'a> {
    source: &'a str,
    lexemes: &'a [Lexeme],
    fragments: &'a [FragmentDef],
    built: &'a [Option<Range<usize>>],
    variables: &'a [VariableDef],
    contexts: &'a mut Vec<Context>,
    out: &'a mut Vec<Token>,
    spreads: Spreads<'a>,
}

impl Emitter<'_> {
    fn push(&mut self, kind: TokenKind, span: Span) {
        self.out.push(Token::new(kind, span, Origin::Body));
    }

    fn kind_at(&self, index: usize) -> Option<LexemeKind> {
        self.lexemes.get(index).map(|lexeme| lexeme.kind)
    }

    fn selection_set(mut self, start: usize) -> Result<(), ReduceError> {
        self.contexts.clear();
        let mut index = start;

        while let Some(&lexeme) = self.lexemes.get(index) {
            index += 1;
            let top = self.contexts.last().copied();
            match lexeme.kind {
                LexemeKind::BraceL => {
                    if matches!(top, None | Some(Context::Selection)) {
                        self.contexts.push(Context::Selection);
                        self.out.push(Token::bare(TokenKind::SelectionSet));
                    } else {
                        self.contexts.push(Context::Object);
                        self.out.push(Token::bare(TokenKind::Object));
                    }
                }
                LexemeKind::BraceR => {
                    let kind = match self.contexts.pop() {
                        Some(Context::Object) => TokenKind::ObjectEnd,
                        _ => TokenKind::SelectionSetEnd,
                    };
                    self.out.push(Token::bare(kind));
                    if self.contexts.is_empty() {
                        return Ok(());
                    }
                }
                LexemeKind::ParenL => {
                    self.contexts.push(Context::Arguments);
                    self.out.push(Token::bare(TokenKind::ArgumentList));
                }
                LexemeKind::ParenR => {
                    self.contexts.pop();
                    self.out.push(Token::bare(TokenKind::ArgumentListEnd));
                }
                LexemeKind::BracketL => {
                    self.contexts.push(Context::List);
                    self.out.push(Token::bare(TokenKind::Array));
                }
                LexemeKind::BracketR => {
                    self.contexts.pop();
                    self.out.push(Token::bare(TokenKind::ArrayEnd));
                }
                LexemeKind::Name => {
                    let colon = self.kind_at(index) == Some(LexemeKind::Colon);
                    match top {
                        Some(Context::Selection) if colon => {
                            self.push(TokenKind::FieldAlias, lexeme.span);
                            self.push(TokenKind::Field, self.lexemes[index + 1].span);
                            index += 2;
                        }
                        Some(Context::Selection) => self.push(TokenKind::Field, lexeme.span),
                        Some(Context::Arguments) if colon => {
                            self.push(TokenKind::ArgumentName, lexeme.span);
                            index += 1;
                        }
                        Some(Context::Object) if colon => {
                            self.push(TokenKind::ObjectField, lexeme.span);
                            index += 1;
                        }
                        _ => {
                            let kind = match lexeme.span.as_str(self.source) {
                                "true" => TokenKind::True,
                                "false" => TokenKind::False,
                                "null" => TokenKind::Null,
                                _ => TokenKind::Enum,
                            };
                            self.push(kind, lexeme.span);
                        }
                    }
                }
                LexemeKind::Int => self.push(TokenKind::Int, lexeme.span),
                LexemeKind::Float => self.push(TokenKind::Float, lexeme.span),
                LexemeKind::String => self.push(TokenKind::String, lexeme.span),
                LexemeKind::Dollar => {
                    let name = self.lexemes[index].span;
                    index += 1;
                    let text = name.as_str(self.source);
                    let position = self
                        .variables
                        .iter()
                        .position(|variable| variable.name.as_str(self.source) == text)
                        .ok_or_else(|| ReduceError::UndefinedVariable {
                            name: text.to_string(),
                        })?;
                    let position = u32::try_from(position).unwrap_or(u32::MAX);
                    self.out.push(Token::new(
                        TokenKind::Variable(position),
                        name,
                        Origin::Body,
                    ));
                }
                LexemeKind::Spread => match self.lexemes.get(index) {
                    Some(next)
                        if next.kind == LexemeKind::Name
                            && next.span.as_str(self.source) == "on" =>
                    {
                        self.push(TokenKind::FragmentInline, self.lexemes[index + 1].span);
                        index += 2;
                    }
                    Some(next) if next.kind == LexemeKind::Name => {
                        index += 1;
                        self.spread(next.span);
                    }
                    _ => self.out.push(Token::bare(TokenKind::FragmentInline)),
                },
                // Everything else was rejected by the syntax pass.
                _ => {}
            }
        }
        Ok(())
    }

    fn spread(&mut self, name: Span) {
        let Some(range) = fragment_index(self.fragments, self.source, name)
            .and_then(|index| self.built.get(index).cloned().flatten())
        else {
            return;
        };
        match self.spreads {
            Spreads::Within => self.out.extend_from_within(range),
            Spreads::From(tokens) => self.out.extend_from_slice(&tokens[range]),
        }
    }
}
