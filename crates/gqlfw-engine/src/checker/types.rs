use gqlfw_reduce::Operation;
use gqlfw_reduce::Origin;
use gqlfw_reduce::TokenKind;
use gqlfw_schema::Schema;
use gqlfw_schema::TypeDefinition;
use gqlfw_schema::TypeRef;

use super::value;
use crate::scan::ValueRef;

/// Whether the request value at `position` can be passed where `ty` is
/// expected.
///
/// Lists accept a single item, and an enum accepts a string only when the
/// string came from the variables payload.
pub(crate) fn assignable(
    operation: &Operation<'_>,
    schema: &Schema,
    position: ValueRef,
    ty: &TypeRef,
) -> bool {
    let position = position.resolve(operation);
    let Some(token) = position.token(operation) else {
        return false;
    };
    if token.kind == TokenKind::Null {
        return !ty.is_non_null();
    }

    match ty.nullable() {
        TypeRef::NonNull(inner) => assignable(operation, schema, position, inner),
        TypeRef::List(item) => {
            if token.kind == TokenKind::Array {
                value::items(operation, position)
                    .all(|element| assignable(operation, schema, element, item))
            } else {
                assignable(operation, schema, position, item)
            }
        }
        TypeRef::Named(name) => match schema.get(name) {
            Some(TypeDefinition::Scalar) => match name.as_str() {
                "Int" => {
                    token.kind == TokenKind::Int && operation.text(&token).parse::<i32>().is_ok()
                }
                "Float" => matches!(token.kind, TokenKind::Int | TokenKind::Float),
                "String" => token.kind == TokenKind::String,
                "Boolean" => matches!(token.kind, TokenKind::True | TokenKind::False),
                "ID" => matches!(token.kind, TokenKind::String | TokenKind::Int),
                _ => true,
            },
            Some(TypeDefinition::Enum { values }) => {
                let text = match token.kind {
                    TokenKind::Enum => value::unescape(operation.text(&token)),
                    TokenKind::String if token.origin == Origin::Json => {
                        value::unescape(operation.text(&token))
                    }
                    _ => return false,
                };
                values.iter().any(|value| *value == text)
            }
            Some(TypeDefinition::InputObject { fields }) => {
                if token.kind != TokenKind::Object {
                    return false;
                }
                let mut seen = Vec::with_capacity(fields.len());
                for (field, value) in value::fields(operation, position) {
                    let Some(index) = fields.iter().position(|f| f.name == field) else {
                        return false;
                    };
                    if seen.contains(&index)
                        || !assignable(operation, schema, value, &fields[index].ty)
                    {
                        return false;
                    }
                    seen.push(index);
                }
                fields
                    .iter()
                    .enumerate()
                    .all(|(index, field)| !field.is_required() || seen.contains(&index))
            }
            _ => false,
        },
    }
}
