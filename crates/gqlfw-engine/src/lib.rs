//! Allow-list matching of GraphQL requests.
//!
//! An [`Engine`] compiles a set of templates once and then, for every
//! request:
//!
//! 1. reduces the request to a single operation ([`gqlfw_reduce`]),
//! 2. scans it into canonical path hashes ([`RequestScanner`]),
//! 3. finds the templates whose structure it matches exactly ([`Matcher`]),
//! 4. checks each candidate's argument constraints ([`Checker`]).
//!
//! The first candidate whose constraints all hold is the match.
//!
//! ```
//! use gqlfw_engine::{Engine, TemplateDefinition};
//!
//! let document = serde_json::from_str(
//!     r#"{"kind": "query", "selections": [
//!         {"field": {"name": "user", "arguments": [
//!             {"name": "id", "constraint": {"greater": {"int": 0}}}
//!         ], "selections": [{"field": {"name": "name"}}]}}
//!     ]}"#,
//! )
//! .unwrap();
//! let mut engine = Engine::new([TemplateDefinition::new("user", document)], None).unwrap();
//!
//! let mut matched = None;
//! engine.match_request(
//!     "query { user(id: 7) { name } }",
//!     None,
//!     None,
//!     |_| {},
//!     |template| matched = template.map(|t| t.id().to_string()),
//!     |err| panic!("{err}"),
//! );
//! assert_eq!(matched.as_deref(), Some("user"));
//! ```

mod checker;
mod engine;
mod error;
mod matcher;
mod path;
mod scan;

pub use checker::Checker;
pub use checker::Context;
pub use checker::Predicate;
pub use checker::MAX_OBJECT_FIELDS;
pub use engine::Engine;
pub use engine::Template;
pub use engine::TemplateDefinition;
pub use error::LoadError;
pub use matcher::Mask;
pub use matcher::MatchState;
pub use matcher::Matcher;
pub use path::hash_path;
pub use path::PathBuilder;
pub use path::PathHash;
pub use scan::scan_template;
pub use scan::ArgumentPath;
pub use scan::Leaf;
pub use scan::RequestPaths;
pub use scan::RequestScanner;
pub use scan::ScopeDef;
pub use scan::TemplatePaths;
pub use scan::ValueRef;
pub use scan::VariablePath;
