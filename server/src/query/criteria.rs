//! Filter criterion and operator types

use std::fmt;

/// Closed set of filter operators accepted in the query-string grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Ne,
    Like,
    NotLike,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    NotIn,
    Between,
    IsNull,
    IsNotNull,
}

impl FilterOperator {
    /// All operators, in grammar-token order
    pub const ALL: &'static [FilterOperator] = &[
        Self::Eq,
        Self::Ne,
        Self::Like,
        Self::NotLike,
        Self::Gt,
        Self::Lt,
        Self::Gte,
        Self::Lte,
        Self::In,
        Self::NotIn,
        Self::Between,
        Self::IsNull,
        Self::IsNotNull,
    ];

    /// The grammar token for this operator (`filter.field:<token>=value`)
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Like => "like",
            Self::NotLike => "not_like",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Between => "between",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
        }
    }

    /// Parse a grammar token case-insensitively
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_str().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed `(field, operator, value)` filter unit
///
/// `field` is a dotted path into the target entity (`sender.id`); `value`
/// keeps the raw string payload — its interpretation (scalar, comma list,
/// range pair) is decided by the operator at predicate-build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriterion {
    field: String,
    operator: FilterOperator,
    value: String,
}

impl FilterCriterion {
    /// Construct a criterion; returns `None` when the trimmed field is empty
    pub fn new(field: &str, operator: FilterOperator, value: impl Into<String>) -> Option<Self> {
        let field = field.trim();
        if field.is_empty() {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            operator,
            value: value.into(),
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}
