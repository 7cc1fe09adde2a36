//! Request binding: one target struct populated from every input channel
//!
//! A handler parameter type implements [`BindTarget`] by listing its
//! bindable fields in a descriptor table. [`bind`] then merges the JSON
//! body, path variables and query parameters into one value, applying the
//! channels in fixed precedence order: body, then path, then query, with
//! later channels overwriting earlier ones per field. Resolved pagination,
//! parsed filter criteria and the authenticated principal are handed to
//! the target afterwards and always win over raw inputs.
//!
//! Binding is total. A value that fails coercion is logged and skipped,
//! leaving the field at whatever an earlier channel (or `Default`) set.

pub mod extract;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::api::auth::context::Principal;
use crate::query::page::{PageDefaults, PageSpec};
use crate::query::{FilterCriterion, parse_filters};

pub use extract::Bound;

/// A raw value from one input channel, prior to coercion
#[derive(Debug, Clone, Copy)]
pub enum BindValue<'a> {
    /// Path variable or query parameter
    Str(&'a str),
    /// JSON body field (never null; nulls are skipped before binding)
    Json(&'a Value),
}

impl BindValue<'_> {
    fn describe(&self) -> String {
        match self {
            Self::Str(s) => (*s).to_string(),
            Self::Json(v) => v.to_string(),
        }
    }
}

/// A raw value that could not be coerced into the field's type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot interpret `{value}` as {ty}")]
pub struct CoerceError {
    pub value: String,
    pub ty: &'static str,
}

impl CoerceError {
    fn new(value: &BindValue<'_>, ty: &'static str) -> Self {
        Self {
            value: value.describe(),
            ty,
        }
    }
}

/// Coercion from a channel value into a typed field
pub trait FromBindValue: Sized {
    fn from_bind(value: &BindValue<'_>) -> Result<Self, CoerceError>;
}

impl FromBindValue for String {
    fn from_bind(value: &BindValue<'_>) -> Result<Self, CoerceError> {
        match value {
            BindValue::Str(s) => Ok((*s).to_string()),
            BindValue::Json(Value::String(s)) => Ok(s.clone()),
            BindValue::Json(Value::Number(n)) => Ok(n.to_string()),
            BindValue::Json(Value::Bool(b)) => Ok(b.to_string()),
            other => Err(CoerceError::new(other, "string")),
        }
    }
}

impl FromBindValue for bool {
    fn from_bind(value: &BindValue<'_>) -> Result<Self, CoerceError> {
        let parse = |s: &str| match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        };
        match value {
            BindValue::Json(Value::Bool(b)) => Ok(*b),
            BindValue::Str(s) => parse(s).ok_or_else(|| CoerceError::new(value, "boolean")),
            BindValue::Json(Value::String(s)) => {
                parse(s).ok_or_else(|| CoerceError::new(value, "boolean"))
            }
            other => Err(CoerceError::new(other, "boolean")),
        }
    }
}

impl FromBindValue for i64 {
    fn from_bind(value: &BindValue<'_>) -> Result<Self, CoerceError> {
        match value {
            BindValue::Str(s) => s.trim().parse().ok(),
            BindValue::Json(Value::Number(n)) => n.as_i64(),
            BindValue::Json(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| CoerceError::new(value, "integer"))
    }
}

impl FromBindValue for i32 {
    fn from_bind(value: &BindValue<'_>) -> Result<Self, CoerceError> {
        i64::from_bind(value)?
            .try_into()
            .map_err(|_| CoerceError::new(value, "integer"))
    }
}

impl FromBindValue for u32 {
    fn from_bind(value: &BindValue<'_>) -> Result<Self, CoerceError> {
        i64::from_bind(value)?
            .try_into()
            .map_err(|_| CoerceError::new(value, "unsigned integer"))
    }
}

impl FromBindValue for f64 {
    fn from_bind(value: &BindValue<'_>) -> Result<Self, CoerceError> {
        match value {
            BindValue::Str(s) => s.trim().parse().ok(),
            BindValue::Json(Value::Number(n)) => n.as_f64(),
            BindValue::Json(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| CoerceError::new(value, "number"))
    }
}

impl FromBindValue for Uuid {
    fn from_bind(value: &BindValue<'_>) -> Result<Self, CoerceError> {
        let raw = match value {
            BindValue::Str(s) => *s,
            BindValue::Json(Value::String(s)) => s.as_str(),
            other => return Err(CoerceError::new(other, "uuid")),
        };
        Uuid::parse_str(raw.trim()).map_err(|_| CoerceError::new(value, "uuid"))
    }
}

impl FromBindValue for DateTime<Utc> {
    fn from_bind(value: &BindValue<'_>) -> Result<Self, CoerceError> {
        let raw = match value {
            BindValue::Str(s) => *s,
            BindValue::Json(Value::String(s)) => s.as_str(),
            other => return Err(CoerceError::new(other, "timestamp")),
        };
        crate::query::schema::parse_timestamp(raw.trim())
            .ok_or_else(|| CoerceError::new(value, "timestamp"))
    }
}

impl<T: FromBindValue> FromBindValue for Option<T> {
    fn from_bind(value: &BindValue<'_>) -> Result<Self, CoerceError> {
        T::from_bind(value).map(Some)
    }
}

/// One bindable field of a target: its wire name and a typed setter
pub struct FieldDescriptor<T> {
    pub name: &'static str,
    pub set: fn(&mut T, &BindValue<'_>) -> Result<(), CoerceError>,
}

/// A handler parameter type populated by [`bind`]
pub trait BindTarget: Default + Send + 'static {
    /// Descriptor table for the channel-bound fields
    const FIELDS: &'static [FieldDescriptor<Self>];

    /// Pagination fallback when the request names no usable sort
    fn page_defaults() -> PageDefaults {
        PageDefaults::ID_ASC
    }

    /// Receive the resolved pagination window
    fn apply_page(&mut self, _page: PageSpec) {}

    /// Receive the parsed filter criteria
    fn apply_filters(&mut self, _filters: Vec<FilterCriterion>) {}

    /// Receive the authenticated principal; wins over every raw channel
    fn apply_principal(&mut self, _principal: &Principal) {}
}

/// Raw material gathered from one request
#[derive(Debug, Default)]
pub struct BindSources {
    pub body: Option<Value>,
    pub path: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub principal: Option<Principal>,
}

/// Merge the sources into a target value. Never fails.
pub fn bind<T: BindTarget>(sources: BindSources) -> T {
    let mut target = T::default();
    for descriptor in T::FIELDS {
        if let Some(body) = sources.body.as_ref()
            && let Some(value) = body.get(descriptor.name)
            && !value.is_null()
        {
            apply(&mut target, descriptor, &BindValue::Json(value));
        }
        if let Some(value) = first_value(&sources.path, descriptor.name) {
            apply(&mut target, descriptor, &BindValue::Str(value));
        }
        if let Some(value) = first_value(&sources.query, descriptor.name) {
            apply(&mut target, descriptor, &BindValue::Str(value));
        }
    }
    let defaults = T::page_defaults();
    target.apply_page(PageSpec::from_query(&sources.query, &defaults));
    target.apply_filters(parse_filters(&sources.query));
    if let Some(principal) = &sources.principal {
        target.apply_principal(principal);
    }
    target
}

fn apply<T: BindTarget>(target: &mut T, descriptor: &FieldDescriptor<T>, value: &BindValue<'_>) {
    if let Err(err) = (descriptor.set)(target, value) {
        warn!(field = descriptor.name, %err, "skipping unbindable value");
    }
}

fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Build a [`BindTarget`] descriptor table from `"wire_name" => field: Type`
/// entries.
#[macro_export]
macro_rules! bind_fields {
    ($target:ty { $($name:literal => $field:ident : $ty:ty),* $(,)? }) => {
        &[
            $(
                $crate::api::bind::FieldDescriptor {
                    name: $name,
                    set: |target: &mut $target, value: &$crate::api::bind::BindValue<'_>| {
                        target.$field =
                            <$ty as $crate::api::bind::FromBindValue>::from_bind(value)?;
                        Ok(())
                    },
                },
            )*
        ]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq)]
    struct Probe {
        name: String,
        count: i64,
        tag: Option<Uuid>,
        page: Option<PageSpec>,
        filters: Vec<FilterCriterion>,
        caller: Option<Uuid>,
    }

    impl BindTarget for Probe {
        const FIELDS: &'static [FieldDescriptor<Self>] = bind_fields!(Probe {
            "name" => name: String,
            "count" => count: i64,
            "tag" => tag: Option<Uuid>,
        });

        fn apply_page(&mut self, page: PageSpec) {
            self.page = Some(page);
        }

        fn apply_filters(&mut self, filters: Vec<FilterCriterion>) {
            self.filters = filters;
        }

        fn apply_principal(&mut self, principal: &Principal) {
            self.caller = Some(principal.user_id);
        }
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn later_channels_overwrite_earlier_ones() {
        let probe: Probe = bind(BindSources {
            body: Some(json!({"name": "from-body"})),
            path: pairs(&[("name", "from-path")]),
            query: pairs(&[("name", "from-query")]),
            principal: None,
        });
        assert_eq!(probe.name, "from-query");
    }

    #[test]
    fn earlier_channel_survives_when_later_is_absent() {
        let probe: Probe = bind(BindSources {
            body: Some(json!({"name": "from-body", "count": 7})),
            path: pairs(&[("name", "from-path")]),
            ..Default::default()
        });
        assert_eq!(probe.name, "from-path");
        assert_eq!(probe.count, 7);
    }

    #[test]
    fn coercion_failure_keeps_the_previous_value() {
        let probe: Probe = bind(BindSources {
            body: Some(json!({"count": 3})),
            query: pairs(&[("count", "many")]),
            ..Default::default()
        });
        assert_eq!(probe.count, 3);
    }

    #[test]
    fn null_body_fields_are_skipped() {
        let probe: Probe = bind(BindSources {
            body: Some(json!({"name": null, "count": 2})),
            ..Default::default()
        });
        assert_eq!(probe.name, "");
        assert_eq!(probe.count, 2);
    }

    #[test]
    fn optional_fields_bind_when_present() {
        let id = Uuid::new_v4();
        let probe: Probe = bind(BindSources {
            query: pairs(&[("tag", &id.to_string())]),
            ..Default::default()
        });
        assert_eq!(probe.tag, Some(id));
        let probe: Probe = bind(BindSources::default());
        assert_eq!(probe.tag, None);
    }

    #[test]
    fn page_and_filters_come_from_the_query_channel() {
        let probe: Probe = bind(BindSources {
            query: pairs(&[("page", "2"), ("size", "5"), ("filter.name:like", "bo")]),
            ..Default::default()
        });
        let page = probe.page.expect("page always applied");
        assert_eq!(page.page, 2);
        assert_eq!(page.size, 5);
        assert_eq!(probe.filters.len(), 1);
        assert_eq!(probe.filters[0].field(), "name");
    }

    #[test]
    fn principal_is_applied_last() {
        let principal = Principal {
            user_id: Uuid::new_v4(),
            email: Some("a@b.c".to_string()),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
        };
        let probe: Probe = bind(BindSources {
            principal: Some(principal.clone()),
            ..Default::default()
        });
        assert_eq!(probe.caller, Some(principal.user_id));
    }

    #[test]
    fn json_numbers_coerce_into_strings() {
        let probe: Probe = bind(BindSources {
            body: Some(json!({"name": 42})),
            ..Default::default()
        });
        assert_eq!(probe.name, "42");
    }
}
