//! Abstract syntax of firewall templates.
//!
//! A template is an allow-listed GraphQL operation shape: the fields a
//! request may select, the arguments it may pass with a constraint on each
//! value, and `max N { ... }` groups limiting how many alternatives may be
//! selected together. Templates are produced by an external parser and
//! arrive here deserialized; nothing in this crate mutates them.

mod ast;
mod visitor;

pub use ast::Argument;
pub use ast::Constraint;
pub use ast::Expr;
pub use ast::Field;
pub use ast::InlineFragment;
pub use ast::MaxSet;
pub use ast::ObjectEntry;
pub use ast::ObjectField;
pub use ast::Operation;
pub use ast::OperationKind;
pub use ast::Selection;
pub use visitor::walk;
pub use visitor::NodeRef;
pub use visitor::Visit;
