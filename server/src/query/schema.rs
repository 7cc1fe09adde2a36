//! Entity schemas: filterable fields, joinable associations, value coercion
//!
//! Every filterable entity carries a static [`EntitySchema`] describing its
//! queryable fields and its associations to other schemas. Dotted filter
//! paths (`sender.email`) are resolved against this table, which doubles as
//! the allow-list keeping user input out of SQL identifiers.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::query::error::QueryError;

/// Logical type of a filterable column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    BigInt,
    Double,
    Boolean,
    Uuid,
    Timestamp,
}

impl FieldType {
    /// Whether ordering comparisons (gt/lt/gte/lte/between) are meaningful
    pub const fn comparable(&self) -> bool {
        !matches!(self, Self::Boolean | Self::Uuid)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Uuid => "uuid",
            Self::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// A typed value coerced from raw filter input
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl ScalarValue {
    /// Canonical string form bound as a SQL parameter.
    ///
    /// SQLite's column affinity converts these back to the stored
    /// representation: integers and floats compare numerically against
    /// INTEGER/REAL columns, timestamps are stored as unix seconds.
    pub fn to_param(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Self::Uuid(u) => u.hyphenated().to_string(),
            Self::Timestamp(t) => t.timestamp().to_string(),
        }
    }

    pub fn partial_cmp_same_type(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Coerce a raw filter value into the field's type
pub fn coerce_value(raw: &str, ty: FieldType) -> Result<ScalarValue, QueryError> {
    let trimmed = raw.trim();
    let conversion = || QueryError::Conversion {
        value: raw.to_string(),
        ty,
    };
    match ty {
        FieldType::Text => Ok(ScalarValue::Text(trimmed.to_string())),
        FieldType::Integer | FieldType::BigInt => trimmed
            .parse::<i64>()
            .map(ScalarValue::Int)
            .map_err(|_| conversion()),
        FieldType::Double => trimmed
            .parse::<f64>()
            .map(ScalarValue::Float)
            .map_err(|_| conversion()),
        FieldType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(ScalarValue::Bool(true)),
            "false" | "0" => Ok(ScalarValue::Bool(false)),
            _ => Err(conversion()),
        },
        FieldType::Uuid => Uuid::parse_str(trimmed)
            .map(ScalarValue::Uuid)
            .map_err(|_| conversion()),
        FieldType::Timestamp => parse_timestamp(trimmed)
            .map(ScalarValue::Timestamp)
            .ok_or_else(conversion),
    }
}

/// RFC 3339 first, then a naive datetime, then a bare date at midnight UTC
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// One filterable field of an entity
#[derive(Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub column: &'static str,
    pub ty: FieldType,
}

/// A to-one association reachable through a dotted path segment
#[derive(Debug)]
pub struct Association {
    pub name: &'static str,
    pub schema: &'static EntitySchema,
    /// Join alias for the associated table, distinct per association
    pub alias: &'static str,
}

/// Static description of a filterable entity
#[derive(Debug)]
pub struct EntitySchema {
    pub entity: &'static str,
    pub alias: &'static str,
    pub fields: &'static [FieldDef],
    pub associations: &'static [Association],
}

/// A dotted path resolved to a qualified column and its type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    pub column: String,
    pub ty: FieldType,
}

static RESOLVE_CACHE: LazyLock<DashMap<(&'static str, String), ResolvedField>> =
    LazyLock::new(DashMap::new);

impl EntitySchema {
    /// Resolve a dotted path to a column, walking associations.
    ///
    /// Successful resolutions are memoized process-wide; the schema tables
    /// are static so a hit can never go stale.
    pub fn resolve(&'static self, path: &str) -> Result<ResolvedField, QueryError> {
        let key = (self.entity, path.to_string());
        if let Some(hit) = RESOLVE_CACHE.get(&key) {
            return Ok(hit.clone());
        }
        let resolved = self.resolve_uncached(path)?;
        RESOLVE_CACHE.insert(key, resolved.clone());
        Ok(resolved)
    }

    fn resolve_uncached(&'static self, path: &str) -> Result<ResolvedField, QueryError> {
        let unknown = || QueryError::UnknownField {
            entity: self.entity,
            path: path.to_string(),
        };
        let mut schema: &'static EntitySchema = self;
        let mut alias = self.alias;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_some() {
                let assoc = schema
                    .associations
                    .iter()
                    .find(|a| a.name == segment)
                    .ok_or_else(unknown)?;
                schema = assoc.schema;
                alias = assoc.alias;
            } else {
                let field = schema
                    .fields
                    .iter()
                    .find(|f| f.name == segment)
                    .ok_or_else(unknown)?;
                return Ok(ResolvedField {
                    column: format!("{alias}.{}", field.column),
                    ty: field.ty,
                });
            }
        }
        Err(unknown())
    }
}

pub static USERS: EntitySchema = EntitySchema {
    entity: "users",
    alias: "u",
    fields: &[
        FieldDef {
            name: "id",
            column: "id",
            ty: FieldType::Uuid,
        },
        FieldDef {
            name: "email",
            column: "email",
            ty: FieldType::Text,
        },
        FieldDef {
            name: "first_name",
            column: "first_name",
            ty: FieldType::Text,
        },
        FieldDef {
            name: "last_name",
            column: "last_name",
            ty: FieldType::Text,
        },
        FieldDef {
            name: "last_seen_at",
            column: "last_seen_at",
            ty: FieldType::Timestamp,
        },
    ],
    associations: &[],
};

pub static CHATS: EntitySchema = EntitySchema {
    entity: "chats",
    alias: "c",
    fields: &[
        FieldDef {
            name: "id",
            column: "id",
            ty: FieldType::Uuid,
        },
        FieldDef {
            name: "created_at",
            column: "created_at",
            ty: FieldType::Timestamp,
        },
    ],
    associations: &[
        Association {
            name: "sender",
            schema: &USERS,
            alias: "s",
        },
        Association {
            name: "receiver",
            schema: &USERS,
            alias: "r",
        },
    ],
};

pub static MESSAGES: EntitySchema = EntitySchema {
    entity: "messages",
    alias: "m",
    fields: &[
        FieldDef {
            name: "id",
            column: "id",
            ty: FieldType::BigInt,
        },
        FieldDef {
            name: "content",
            column: "content",
            ty: FieldType::Text,
        },
        FieldDef {
            name: "state",
            column: "state",
            ty: FieldType::Text,
        },
        FieldDef {
            name: "kind",
            column: "kind",
            ty: FieldType::Text,
        },
        FieldDef {
            name: "sender_id",
            column: "sender_id",
            ty: FieldType::Uuid,
        },
        FieldDef {
            name: "receiver_id",
            column: "receiver_id",
            ty: FieldType::Uuid,
        },
        FieldDef {
            name: "created_at",
            column: "created_at",
            ty: FieldType::Timestamp,
        },
    ],
    associations: &[Association {
        name: "chat",
        schema: &CHATS,
        alias: "c",
    }],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_direct_field() {
        let resolved = USERS.resolve("email").unwrap();
        assert_eq!(resolved.column, "u.email");
        assert_eq!(resolved.ty, FieldType::Text);
    }

    #[test]
    fn resolves_nested_path_through_association() {
        let resolved = MESSAGES.resolve("chat.sender.email").unwrap();
        assert_eq!(resolved.column, "s.email");
        assert_eq!(resolved.ty, FieldType::Text);
    }

    #[test]
    fn association_alias_disambiguates_same_table() {
        let sender = CHATS.resolve("sender.first_name").unwrap();
        let receiver = CHATS.resolve("receiver.first_name").unwrap();
        assert_eq!(sender.column, "s.first_name");
        assert_eq!(receiver.column, "r.first_name");
    }

    #[test]
    fn unknown_field_names_the_entity_and_path() {
        let err = USERS.resolve("password").unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownField {
                entity: "users",
                path: "password".to_string(),
            }
        );
    }

    #[test]
    fn unknown_association_segment_is_rejected() {
        assert!(MESSAGES.resolve("owner.email").is_err());
        assert!(MESSAGES.resolve("content.length").is_err());
    }

    #[test]
    fn repeated_resolution_is_cached() {
        let first = MESSAGES.resolve("chat.receiver.email").unwrap();
        let second = MESSAGES.resolve("chat.receiver.email").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn coerces_by_field_type() {
        assert_eq!(
            coerce_value(" 42 ", FieldType::Integer).unwrap(),
            ScalarValue::Int(42)
        );
        assert_eq!(
            coerce_value("true", FieldType::Boolean).unwrap(),
            ScalarValue::Bool(true)
        );
        assert!(coerce_value("maybe", FieldType::Boolean).is_err());
        assert!(coerce_value("abc", FieldType::Double).is_err());
    }

    #[test]
    fn timestamp_accepts_progressively_looser_formats() {
        for raw in [
            "2026-03-01T10:30:00Z",
            "2026-03-01T10:30:00",
            "2026-03-01 10:30:00",
            "2026-03-01",
        ] {
            assert!(
                coerce_value(raw, FieldType::Timestamp).is_ok(),
                "failed on {raw}"
            );
        }
        assert!(coerce_value("yesterday", FieldType::Timestamp).is_err());
    }

    #[test]
    fn date_only_is_midnight_utc() {
        let ScalarValue::Timestamp(t) = coerce_value("2026-03-01", FieldType::Timestamp).unwrap()
        else {
            panic!("expected timestamp");
        };
        assert_eq!(t.to_rfc3339(), "2026-03-01T00:00:00+00:00");
    }

    #[test]
    fn params_use_sqlite_friendly_forms() {
        assert_eq!(ScalarValue::Bool(false).to_param(), "0");
        let t = coerce_value("1970-01-01T00:01:00Z", FieldType::Timestamp).unwrap();
        assert_eq!(t.to_param(), "60");
    }
}
