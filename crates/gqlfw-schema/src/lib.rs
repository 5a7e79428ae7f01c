//! GraphQL schema model used to type-check template arguments.
//!
//! The model is produced by an external SDL parser and deserialized here.
//! It only carries what value checking needs: root types, named types with
//! their fields, arguments, input fields and enum values. The built-in
//! scalars `Int`, `Float`, `String`, `Boolean` and `ID` are always defined.

use std::fmt;

use gqlfw_template::OperationKind;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

static BUILTIN_SCALAR: TypeDefinition = TypeDefinition::Scalar;

#[must_use]
pub fn is_builtin_scalar(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("root type '{0}' is not defined")]
    MissingRootType(String),
    #[error("type '{name}' referenced by '{referenced_by}' is not defined")]
    UnknownType { name: String, referenced_by: String },
}

fn default_query_type() -> String {
    "Query".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default = "default_query_type")]
    pub query_type: String,
    #[serde(default)]
    pub mutation_type: Option<String>,
    #[serde(default)]
    pub subscription_type: Option<String>,
    pub types: FxHashMap<String, TypeDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDefinition {
    Scalar,
    Enum { values: Vec<String> },
    InputObject { fields: Vec<InputValue> },
    Object { fields: Vec<FieldDefinition> },
    Interface { fields: Vec<FieldDefinition> },
    Union { members: Vec<String> },
}

impl TypeDefinition {
    /// Whether values of this type can appear in arguments.
    #[must_use]
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            TypeDefinition::Scalar | TypeDefinition::Enum { .. } | TypeDefinition::InputObject { .. }
        )
    }

    /// Whether the type can be the parent of a selection set.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            TypeDefinition::Object { .. }
                | TypeDefinition::Interface { .. }
                | TypeDefinition::Union { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<InputValue>,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

impl FieldDefinition {
    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&InputValue> {
        self.arguments.iter().find(|argument| argument.name == name)
    }
}

/// An argument or an input object field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputValue {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub has_default: bool,
}

impl InputValue {
    /// Whether a value for this input must be supplied.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.ty.is_non_null() && !self.has_default
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    #[must_use]
    pub fn named(name: &str) -> Self {
        TypeRef::Named(name.to_string())
    }

    #[must_use]
    pub fn non_null(inner: TypeRef) -> Self {
        TypeRef::NonNull(Box::new(inner))
    }

    #[must_use]
    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    /// Name of the innermost named type.
    #[must_use]
    pub fn name(&self) -> &str {
        let mut current = self;
        loop {
            match current {
                TypeRef::Named(name) => return name,
                TypeRef::List(inner) | TypeRef::NonNull(inner) => current = inner,
            }
        }
    }

    #[must_use]
    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// The type without its outer non-null wrapper.
    #[must_use]
    pub fn nullable(&self) -> &TypeRef {
        match self {
            TypeRef::NonNull(inner) => inner,
            other => other,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

impl Schema {
    /// Named type `name`, including the built-in scalars.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types
            .get(name)
            .or_else(|| is_builtin_scalar(name).then_some(&BUILTIN_SCALAR))
    }

    #[must_use]
    pub fn root_type(&self, kind: OperationKind) -> Option<&str> {
        match kind {
            OperationKind::Query => Some(self.query_type.as_str()),
            OperationKind::Mutation => self.mutation_type.as_deref(),
            OperationKind::Subscription => self.subscription_type.as_deref(),
        }
    }

    /// Field `field` of the object or interface type `parent`.
    #[must_use]
    pub fn field(&self, parent: &str, field: &str) -> Option<&FieldDefinition> {
        match self.types.get(parent)? {
            TypeDefinition::Object { fields } | TypeDefinition::Interface { fields } => {
                fields.iter().find(|definition| definition.name == field)
            }
            _ => None,
        }
    }

    /// Input fields of the input object type `name`.
    #[must_use]
    pub fn input_fields(&self, name: &str) -> Option<&[InputValue]> {
        match self.types.get(name)? {
            TypeDefinition::InputObject { fields } => Some(fields),
            _ => None,
        }
    }

    /// Whether `value` is a member of the enum type `name`.
    #[must_use]
    pub fn has_enum_value(&self, name: &str, value: &str) -> bool {
        matches!(
            self.types.get(name),
            Some(TypeDefinition::Enum { values }) if values.iter().any(|v| v == value)
        )
    }

    /// Checks that the root types exist and every type reference resolves.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let roots = [
            Some(&self.query_type),
            self.mutation_type.as_ref(),
            self.subscription_type.as_ref(),
        ];
        for root in roots.into_iter().flatten() {
            if !self.get(root).is_some_and(TypeDefinition::is_composite) {
                return Err(SchemaError::MissingRootType(root.clone()));
            }
        }

        let check = |ty: &TypeRef, owner: &str| -> Result<(), SchemaError> {
            if self.get(ty.name()).is_none() {
                return Err(SchemaError::UnknownType {
                    name: ty.name().to_string(),
                    referenced_by: owner.to_string(),
                });
            }
            Ok(())
        };

        for (name, definition) in &self.types {
            match definition {
                TypeDefinition::Scalar | TypeDefinition::Enum { .. } => {}
                TypeDefinition::InputObject { fields } => {
                    for field in fields {
                        check(&field.ty, &format!("{name}.{}", field.name))?;
                    }
                }
                TypeDefinition::Object { fields } | TypeDefinition::Interface { fields } => {
                    for field in fields {
                        let owner = format!("{name}.{}", field.name);
                        check(&field.ty, &owner)?;
                        for argument in &field.arguments {
                            check(&argument.ty, &format!("{owner}({})", argument.name))?;
                        }
                    }
                }
                TypeDefinition::Union { members } => {
                    for member in members {
                        check(&TypeRef::named(member), name)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        serde_json::from_str(
            r#"{
                "mutation_type": "Mutation",
                "types": {
                    "Query": {"kind": "object", "fields": [
                        {"name": "user", "arguments": [
                            {"name": "id", "type": {"non_null": {"named": "ID"}}},
                            {"name": "filter", "type": {"named": "UserFilter"}, "has_default": true}
                        ], "type": {"named": "User"}}
                    ]},
                    "Mutation": {"kind": "object", "fields": [
                        {"name": "ping", "type": {"named": "Boolean"}}
                    ]},
                    "User": {"kind": "object", "fields": [
                        {"name": "roles", "type": {"non_null": {"list": {"non_null": {"named": "Role"}}}}}
                    ]},
                    "Role": {"kind": "enum", "values": ["ADMIN", "USER"]},
                    "UserFilter": {"kind": "input_object", "fields": [
                        {"name": "role", "type": {"named": "Role"}}
                    ]}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_lookup() {
        let schema = schema();
        assert_eq!(schema.root_type(OperationKind::Query), Some("Query"));
        assert_eq!(schema.root_type(OperationKind::Subscription), None);

        let user = schema.field("Query", "user").unwrap();
        assert_eq!(user.ty.name(), "User");
        assert!(user.argument("id").unwrap().is_required());
        assert!(!user.argument("filter").unwrap().is_required());
        assert!(schema.field("Query", "missing").is_none());
        assert!(schema.field("Role", "ADMIN").is_none());

        assert_eq!(schema.get("Int"), Some(&TypeDefinition::Scalar));
        assert!(schema.get("Nope").is_none());
        assert!(schema.has_enum_value("Role", "ADMIN"));
        assert!(!schema.has_enum_value("Role", "ROOT"));
        assert_eq!(schema.input_fields("UserFilter").map(<[_]>::len), Some(1));
    }

    #[test]
    fn test_type_display() {
        let schema = schema();
        let roles = schema.field("User", "roles").unwrap();
        assert_eq!(roles.ty.to_string(), "[Role!]!");
        assert_eq!(roles.ty.nullable().to_string(), "[Role!]");
    }

    #[test]
    fn test_validate() {
        let mut schema = schema();
        assert_eq!(schema.validate(), Ok(()));

        schema.types.insert(
            "Broken".to_string(),
            TypeDefinition::InputObject {
                fields: vec![InputValue {
                    name: "x".to_string(),
                    ty: TypeRef::named("Missing"),
                    has_default: false,
                }],
            },
        );
        assert_eq!(
            schema.validate(),
            Err(SchemaError::UnknownType {
                name: "Missing".to_string(),
                referenced_by: "Broken.x".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_root() {
        let mut schema = schema();
        schema.mutation_type = Some("Nope".to_string());
        assert_eq!(
            schema.validate(),
            Err(SchemaError::MissingRootType("Nope".to_string()))
        );
    }
}
