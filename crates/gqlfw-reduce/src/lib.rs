//! GraphQL request reduction.
//!
//! Turns a raw request (document, optional operation name, optional JSON
//! variables) into a flat, validated token stream for exactly one operation.
//!
//! ## Architecture
//!
//! 1. **Lexing**: the document is split into lexemes; ignored tokens are dropped
//! 2. **Indexing**: a syntax pass records operations, fragments, variable
//!    definitions and spreads by lexeme position
//! 3. **Fragment checks**: undefined, unused and recursive fragments are rejected
//! 4. **Variables**: declared variables are bound from JSON or their defaults
//!    and validated against their types
//! 5. **Emission**: the selected operation is written out with fragments
//!    inlined and variable references replaced by table indices
//!
//! Tokens never copy text. Their spans point into the request body or the
//! variables payload, and the returned [`Operation`] borrows both.
//!
//! ## Example
//!
//! ```
//! use gqlfw_reduce::Reducer;
//!
//! let mut reducer = Reducer::new();
//! let operation = reducer
//!     .reduce("query ($id: ID!) { user(id: $id) { name } }", None, Some(r#"{"id": 7}"#))
//!     .unwrap();
//! assert_eq!(operation.render(), "query{user(id:7){name}}");
//! ```

mod error;
mod fragments;
mod lexer;
mod operation;
mod parser;
mod reducer;
mod tokens;
mod variables;

pub use error::ReduceError;
pub use operation::Operation;
pub use operation::OperationKind;
pub use reducer::Reducer;
pub use tokens::value_end;
pub use tokens::Origin;
pub use tokens::Span;
pub use tokens::Token;
pub use tokens::TokenKind;
pub use tokens::ValueSource;
pub use tokens::VariableValue;
