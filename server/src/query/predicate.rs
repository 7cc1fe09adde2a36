//! Composable SQL predicates built from filter criteria
//!
//! Criteria are type-checked against an [`EntitySchema`] and lowered into a
//! [`Predicate`] tree. Rendering emits `?` placeholders and pushes every
//! value into [`SqlParams`]; user input never reaches the SQL text itself.

use crate::query::criteria::{FilterCriterion, FilterOperator};
use crate::query::error::QueryError;
use crate::query::page::{PageDefaults, PageSpec};
use crate::query::schema::{EntitySchema, ScalarValue, coerce_value};

/// Positional parameters accumulated while rendering a predicate
#[derive(Debug, Default)]
pub struct SqlParams {
    pub values: Vec<String>,
}

impl SqlParams {
    pub fn push(&mut self, value: String) -> &'static str {
        self.values.push(value);
        "?"
    }
}

/// Comparison shape for [`Predicate::Compare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl CompareOp {
    const fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
        }
    }
}

/// A renderable WHERE-clause fragment
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: String,
        op: CompareOp,
        value: ScalarValue,
    },
    Like {
        column: String,
        pattern: String,
        negated: bool,
    },
    In {
        column: String,
        values: Vec<ScalarValue>,
        negated: bool,
    },
    Between {
        column: String,
        low: ScalarValue,
        high: ScalarValue,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    And(Vec<Predicate>),
}

impl Predicate {
    /// Render to a SQL fragment, pushing bound values into `params`
    pub fn to_sql(&self, params: &mut SqlParams) -> String {
        match self {
            Self::Compare { column, op, value } => {
                format!("{column} {} {}", op.as_sql(), params.push(value.to_param()))
            }
            Self::Like {
                column,
                pattern,
                negated,
            } => {
                let verb = if *negated { "NOT LIKE" } else { "LIKE" };
                format!(
                    "LOWER({column}) {verb} {} ESCAPE '\\'",
                    params.push(pattern.clone())
                )
            }
            Self::In {
                column,
                values,
                negated,
            } => {
                let verb = if *negated { "NOT IN" } else { "IN" };
                let placeholders: Vec<&str> =
                    values.iter().map(|v| params.push(v.to_param())).collect();
                format!("{column} {verb} ({})", placeholders.join(", "))
            }
            Self::Between { column, low, high } => format!(
                "{column} BETWEEN {} AND {}",
                params.push(low.to_param()),
                params.push(high.to_param())
            ),
            Self::IsNull { column, negated } => {
                if *negated {
                    format!("{column} IS NOT NULL")
                } else {
                    format!("{column} IS NULL")
                }
            }
            Self::And(parts) => {
                if parts.is_empty() {
                    return "1=1".to_string();
                }
                let rendered: Vec<String> = parts.iter().map(|p| p.to_sql(params)).collect();
                rendered.join(" AND ")
            }
        }
    }
}

/// Escape LIKE wildcards so user input matches literally
pub fn escape_like_pattern(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Lower criteria into an AND-combined predicate tree.
///
/// Returns `Ok(None)` for an empty criteria list. Any criterion that fails
/// resolution, coercion, or arity checks fails the whole build; partial
/// filtering would silently widen the result set.
pub fn build_predicate(
    schema: &'static EntitySchema,
    criteria: &[FilterCriterion],
) -> Result<Option<Predicate>, QueryError> {
    if criteria.is_empty() {
        return Ok(None);
    }
    let mut parts = Vec::with_capacity(criteria.len());
    for criterion in criteria {
        parts.push(lower_criterion(schema, criterion)?);
    }
    Ok(Some(if parts.len() == 1 {
        parts.pop().unwrap_or(Predicate::And(Vec::new()))
    } else {
        Predicate::And(parts)
    }))
}

fn lower_criterion(
    schema: &'static EntitySchema,
    criterion: &FilterCriterion,
) -> Result<Predicate, QueryError> {
    let resolved = schema.resolve(criterion.field())?;
    let op = criterion.operator();
    let require_comparable = || {
        if resolved.ty.comparable() {
            Ok(())
        } else {
            Err(QueryError::NotComparable {
                operator: op.as_str(),
                field: criterion.field().to_string(),
                ty: resolved.ty,
            })
        }
    };
    match op {
        FilterOperator::Eq | FilterOperator::Ne => Ok(Predicate::Compare {
            column: resolved.column,
            op: if op == FilterOperator::Eq {
                CompareOp::Eq
            } else {
                CompareOp::Ne
            },
            value: coerce_value(criterion.value(), resolved.ty)?,
        }),
        FilterOperator::Gt | FilterOperator::Lt | FilterOperator::Gte | FilterOperator::Lte => {
            require_comparable()?;
            let compare_op = match op {
                FilterOperator::Gt => CompareOp::Gt,
                FilterOperator::Lt => CompareOp::Lt,
                FilterOperator::Gte => CompareOp::Gte,
                _ => CompareOp::Lte,
            };
            Ok(Predicate::Compare {
                column: resolved.column,
                op: compare_op,
                value: coerce_value(criterion.value(), resolved.ty)?,
            })
        }
        FilterOperator::Like | FilterOperator::NotLike => Ok(Predicate::Like {
            column: resolved.column,
            pattern: format!(
                "%{}%",
                escape_like_pattern(&criterion.value().trim().to_lowercase())
            ),
            negated: op == FilterOperator::NotLike,
        }),
        FilterOperator::In | FilterOperator::NotIn => {
            let values = criterion
                .value()
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| coerce_value(v, resolved.ty))
                .collect::<Result<Vec<_>, _>>()?;
            if values.is_empty() {
                return Err(QueryError::Conversion {
                    value: criterion.value().to_string(),
                    ty: resolved.ty,
                });
            }
            Ok(Predicate::In {
                column: resolved.column,
                values,
                negated: op == FilterOperator::NotIn,
            })
        }
        FilterOperator::Between => {
            require_comparable()?;
            let bounds: Vec<&str> = criterion.value().split(',').map(str::trim).collect();
            let [raw_low, raw_high] = bounds.as_slice() else {
                return Err(QueryError::BetweenArity {
                    field: criterion.field().to_string(),
                });
            };
            let mut low = coerce_value(raw_low, resolved.ty)?;
            let mut high = coerce_value(raw_high, resolved.ty)?;
            if low.partial_cmp_same_type(&high) == Some(std::cmp::Ordering::Greater) {
                std::mem::swap(&mut low, &mut high);
            }
            Ok(Predicate::Between {
                column: resolved.column,
                low,
                high,
            })
        }
        FilterOperator::IsNull | FilterOperator::IsNotNull => Ok(Predicate::IsNull {
            column: resolved.column,
            negated: op == FilterOperator::IsNotNull,
        }),
    }
}

/// Render an ORDER BY clause from the page spec's sort keys.
///
/// Keys that do not resolve against the schema are dropped; if none
/// survive, the endpoint defaults apply. Column names come from the
/// schema table, never from the request.
pub fn order_by_sql(
    schema: &'static EntitySchema,
    page: &PageSpec,
    defaults: &PageDefaults,
) -> String {
    let mut parts: Vec<String> = page
        .sort
        .iter()
        .filter_map(|key| {
            schema
                .resolve(&key.field)
                .ok()
                .map(|resolved| format!("{} {}", resolved.column, key.direction.as_sql()))
        })
        .collect();
    if parts.is_empty() {
        if let Ok(resolved) = schema.resolve(defaults.sort_field) {
            parts.push(format!("{} {}", resolved.column, defaults.direction.as_sql()));
        } else {
            parts.push(format!("{}.id ASC", schema.alias));
        }
    }
    format!("ORDER BY {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::page::SortDirection;
    use crate::query::parse::parse_filters;
    use crate::query::schema::{FieldType, MESSAGES, USERS};

    fn criteria(raw: &[(&str, &str)]) -> Vec<FilterCriterion> {
        parse_filters(
            &raw.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    fn render(
        schema: &'static EntitySchema,
        raw: &[(&str, &str)],
    ) -> Result<(String, Vec<String>), QueryError> {
        let predicate = build_predicate(schema, &criteria(raw))?.expect("non-empty criteria");
        let mut params = SqlParams::default();
        let sql = predicate.to_sql(&mut params);
        Ok((sql, params.values))
    }

    #[test]
    fn empty_criteria_build_nothing() {
        assert_eq!(build_predicate(&USERS, &[]).unwrap(), None);
    }

    #[test]
    fn eq_binds_a_single_parameter() {
        let (sql, params) = render(&USERS, &[("filter.email", "a@b.c")]).unwrap();
        assert_eq!(sql, "u.email = ?");
        assert_eq!(params, ["a@b.c"]);
    }

    #[test]
    fn like_lowercases_and_wraps_with_wildcards() {
        let (sql, params) = render(&USERS, &[("filter.first_name:like", "Ali")]).unwrap();
        assert_eq!(sql, "LOWER(u.first_name) LIKE ? ESCAPE '\\'");
        assert_eq!(params, ["%ali%"]);
    }

    #[test]
    fn like_escapes_wildcard_characters() {
        let (_, params) = render(&USERS, &[("filter.email:like", "50%_off")]).unwrap();
        assert_eq!(params, ["%50\\%\\_off%"]);
    }

    #[test]
    fn in_splits_on_commas() {
        let (sql, params) = render(&MESSAGES, &[("filter.id:in", "1, 2,3")]).unwrap();
        assert_eq!(sql, "m.id IN (?, ?, ?)");
        assert_eq!(params, ["1", "2", "3"]);
    }

    #[test]
    fn between_requires_exactly_two_bounds() {
        let err = build_predicate(&MESSAGES, &criteria(&[("filter.id:between", "1")])).unwrap_err();
        assert!(matches!(err, QueryError::BetweenArity { .. }));
        let err = build_predicate(&MESSAGES, &criteria(&[("filter.id:between", "1,2,3")]))
            .unwrap_err();
        assert!(matches!(err, QueryError::BetweenArity { .. }));
    }

    #[test]
    fn between_normalizes_reversed_bounds() {
        let (sql, params) = render(&MESSAGES, &[("filter.id:between", "9,3")]).unwrap();
        assert_eq!(sql, "m.id BETWEEN ? AND ?");
        assert_eq!(params, ["3", "9"]);
    }

    #[test]
    fn null_checks_bind_no_parameters() {
        let (sql, params) = render(&USERS, &[("filter.last_seen_at:is_null", "")]).unwrap();
        assert_eq!(sql, "u.last_seen_at IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn criteria_combine_with_and_in_order() {
        let (sql, params) = render(
            &MESSAGES,
            &[
                ("filter.state", "SENT"),
                ("filter.chat.sender.email:like", "bob"),
            ],
        )
        .unwrap();
        assert_eq!(sql, "m.state = ? AND LOWER(s.email) LIKE ? ESCAPE '\\'");
        assert_eq!(params, ["SENT", "%bob%"]);
    }

    #[test]
    fn ordering_on_non_comparable_type_is_rejected() {
        let err =
            build_predicate(&USERS, &criteria(&[("filter.id:gt", &uuid::Uuid::nil().to_string())]))
                .unwrap_err();
        assert!(matches!(
            err,
            QueryError::NotComparable {
                operator: "gt",
                ty: FieldType::Uuid,
                ..
            }
        ));
    }

    #[test]
    fn bad_value_fails_the_whole_build() {
        let err = build_predicate(
            &MESSAGES,
            &criteria(&[("filter.state", "SENT"), ("filter.id:gte", "soon")]),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::Conversion { .. }));
    }

    #[test]
    fn timestamps_bind_as_unix_seconds() {
        let (_, params) =
            render(&MESSAGES, &[("filter.created_at:gte", "1970-01-02")]).unwrap();
        assert_eq!(params, ["86400"]);
    }

    #[test]
    fn order_by_resolves_through_the_schema() {
        let page = PageSpec::from_query(
            &[
                ("sortBy".to_string(), "first_name,last_name".to_string()),
                ("sortDir".to_string(), "desc".to_string()),
            ],
            &PageDefaults::ID_ASC,
        );
        assert_eq!(
            order_by_sql(&USERS, &page, &PageDefaults::ID_ASC),
            "ORDER BY u.first_name DESC, u.last_name DESC"
        );
    }

    #[test]
    fn unresolvable_sort_fields_fall_back_to_defaults() {
        let page = PageSpec::from_query(
            &[("sortBy".to_string(), "password;drop".to_string())],
            &PageDefaults::ID_ASC,
        );
        assert_eq!(
            order_by_sql(&USERS, &page, &PageDefaults::ID_ASC),
            "ORDER BY u.id ASC"
        );
    }

    #[test]
    fn mixed_sort_keeps_only_resolvable_fields() {
        let defaults = PageDefaults {
            sort_field: "created_at",
            direction: SortDirection::Desc,
        };
        let page = PageSpec::from_query(
            &[("sortBy".to_string(), "created_at,unknown".to_string())],
            &defaults,
        );
        assert_eq!(
            order_by_sql(&MESSAGES, &page, &defaults),
            "ORDER BY m.created_at DESC"
        );
    }
}
