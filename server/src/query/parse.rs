//! Query-string filter grammar: `filter.<field>[:<operator>]=<value>`

use tracing::warn;

use crate::core::constants::{FILTER_OPERATOR_DELIMITER, FILTER_PARAM_PREFIX};
use crate::query::criteria::{FilterCriterion, FilterOperator};

/// Extract filter criteria from raw query pairs, preserving request order.
///
/// A pair whose key does not start with the filter prefix is ignored.
/// A malformed pair (empty field, unknown operator token) is dropped with
/// a warning; it never poisons the criteria that parsed cleanly.
pub fn parse_filters(pairs: &[(String, String)]) -> Vec<FilterCriterion> {
    let mut criteria = Vec::new();
    for (key, value) in pairs {
        let Some(rest) = key.strip_prefix(FILTER_PARAM_PREFIX) else {
            continue;
        };
        let (field, operator) = match rest.split_once(FILTER_OPERATOR_DELIMITER) {
            Some((field, token)) => match FilterOperator::from_token(token.trim()) {
                Some(op) => (field, op),
                None => {
                    warn!(key = %key, token = %token, "unknown filter operator, dropping");
                    continue;
                }
            },
            None => (rest, FilterOperator::Eq),
        };
        match FilterCriterion::new(field, operator, value.clone()) {
            Some(criterion) => criteria.push(criterion),
            None => warn!(key = %key, "filter with empty field, dropping"),
        }
    }
    criteria
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn bare_field_defaults_to_eq() {
        let criteria = parse_filters(&pairs(&[("filter.name", "alice")]));
        assert_eq!(criteria.len(), 1);
        assert_eq!(criteria[0].field(), "name");
        assert_eq!(criteria[0].operator(), FilterOperator::Eq);
        assert_eq!(criteria[0].value(), "alice");
    }

    #[test]
    fn explicit_operator_and_dotted_path() {
        let criteria = parse_filters(&pairs(&[("filter.sender.email:like", "bob")]));
        assert_eq!(criteria[0].field(), "sender.email");
        assert_eq!(criteria[0].operator(), FilterOperator::Like);
    }

    #[test]
    fn non_filter_keys_are_ignored() {
        let criteria = parse_filters(&pairs(&[
            ("page", "1"),
            ("filters.name", "x"),
            ("filter.age:gt", "30"),
        ]));
        assert_eq!(criteria.len(), 1);
        assert_eq!(criteria[0].field(), "age");
    }

    #[test]
    fn malformed_pairs_do_not_poison_valid_ones() {
        let criteria = parse_filters(&pairs(&[
            ("filter.age:gte", "18"),
            ("filter.age:frobnicate", "99"),
            ("filter.:eq", "ghost"),
            ("filter.name", "alice"),
        ]));
        assert_eq!(criteria.len(), 2);
        assert_eq!(criteria[0].field(), "age");
        assert_eq!(criteria[1].field(), "name");
    }

    #[test]
    fn request_order_is_preserved() {
        let criteria = parse_filters(&pairs(&[
            ("filter.b", "2"),
            ("filter.a", "1"),
            ("filter.c:ne", "3"),
        ]));
        let fields: Vec<&str> = criteria.iter().map(|c| c.field()).collect();
        assert_eq!(fields, ["b", "a", "c"]);
    }

    #[test]
    fn value_may_be_empty_for_null_checks() {
        let criteria = parse_filters(&pairs(&[("filter.deleted_at:is_null", "")]));
        assert_eq!(criteria.len(), 1);
        assert_eq!(criteria[0].operator(), FilterOperator::IsNull);
    }
}
