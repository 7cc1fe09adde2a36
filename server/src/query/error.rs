//! Query construction errors

use thiserror::Error;

use super::schema::FieldType;

/// Fatal predicate/sort construction errors.
///
/// Per-criterion problems that can be recovered from (bad operator token,
/// empty field name) are handled at parse time by dropping the single
/// criterion; everything here rejects the whole query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// A dotted field path did not resolve against the entity schema
    #[error("unknown filter field '{path}' on entity '{entity}'")]
    UnknownField { entity: &'static str, path: String },

    /// A raw value could not be converted to the resolved field type
    #[error("cannot convert value '{value}' to type {ty}")]
    Conversion { value: String, ty: FieldType },

    /// `between` did not receive exactly two comma-separated values
    #[error("operator 'between' on field '{field}' requires exactly 2 values separated by comma")]
    BetweenArity { field: String },

    /// An ordering operator was applied to a non-comparable field type
    #[error("operator '{operator}' requires a comparable field, but '{field}' is {ty}")]
    NotComparable {
        operator: &'static str,
        field: String,
        ty: FieldType,
    },
}
