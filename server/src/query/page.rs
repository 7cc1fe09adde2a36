//! Pagination and sorting resolved from raw query pairs

use serde::Serialize;

use crate::core::constants::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, SORT_DELIMITER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    fn from_param(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }
}

/// One requested sort key, by entity field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Endpoint-level fallback used when the request names no usable sort
#[derive(Debug, Clone, Copy)]
pub struct PageDefaults {
    pub sort_field: &'static str,
    pub direction: SortDirection,
}

impl PageDefaults {
    pub const ID_ASC: PageDefaults = PageDefaults {
        sort_field: "id",
        direction: SortDirection::Asc,
    };
}

/// Resolved pagination window plus requested sort keys
///
/// Construction is total: malformed or missing parameters fall back to
/// defaults, out-of-range values clamp. A request can degrade its own
/// paging but never fail resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpec {
    pub page: u32,
    pub size: u32,
    pub sort: Vec<SortKey>,
}

impl PageSpec {
    /// Resolve from raw query pairs. First occurrence of a key wins.
    pub fn from_query(pairs: &[(String, String)], defaults: &PageDefaults) -> Self {
        let page = first_value(pairs, "page")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|v| v.max(DEFAULT_PAGE as i64) as u32)
            .unwrap_or(DEFAULT_PAGE);

        // Non-positive sizes fall back to the default rather than clamping up
        let size = first_value(pairs, "size")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v > 0)
            .map(|v| v.min(MAX_PAGE_SIZE as i64) as u32)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let direction = first_value(pairs, "dir")
            .or_else(|| first_value(pairs, "sortDir"))
            .or_else(|| first_value(pairs, "sort_dir"))
            .map(SortDirection::from_param)
            .unwrap_or(defaults.direction);

        let mut sort: Vec<SortKey> = first_value(pairs, "sortBy")
            .or_else(|| first_value(pairs, "sort_by"))
            .map(|raw| {
                raw.split(SORT_DELIMITER)
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(|field| SortKey {
                        field: field.to_string(),
                        direction,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if sort.is_empty() {
            sort.push(SortKey {
                field: defaults.sort_field.to_string(),
                direction,
            });
        }

        Self { page, size, sort }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            size: DEFAULT_PAGE_SIZE,
            sort: vec![SortKey {
                field: PageDefaults::ID_ASC.sort_field.to_string(),
                direction: PageDefaults::ID_ASC.direction,
            }],
        }
    }
}

fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
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
    fn empty_query_uses_defaults() {
        let spec = PageSpec::from_query(&[], &PageDefaults::ID_ASC);
        assert_eq!(spec.page, 0);
        assert_eq!(spec.size, 20);
        assert_eq!(spec.sort.len(), 1);
        assert_eq!(spec.sort[0].field, "id");
        assert_eq!(spec.sort[0].direction, SortDirection::Asc);
    }

    #[test]
    fn size_caps_at_maximum() {
        let spec = PageSpec::from_query(&pairs(&[("size", "5000")]), &PageDefaults::ID_ASC);
        assert_eq!(spec.size, 1000);
    }

    #[test]
    fn non_positive_size_falls_back_to_default() {
        let spec = PageSpec::from_query(&pairs(&[("size", "0")]), &PageDefaults::ID_ASC);
        assert_eq!(spec.size, 20);
        let spec = PageSpec::from_query(&pairs(&[("size", "-3")]), &PageDefaults::ID_ASC);
        assert_eq!(spec.size, 20);
    }

    #[test]
    fn negative_page_floors_to_zero() {
        let spec = PageSpec::from_query(&pairs(&[("page", "-4")]), &PageDefaults::ID_ASC);
        assert_eq!(spec.page, 0);
    }

    #[test]
    fn garbage_values_fall_back() {
        let spec = PageSpec::from_query(
            &pairs(&[("page", "two"), ("size", "lots")]),
            &PageDefaults::ID_ASC,
        );
        assert_eq!(spec.page, 0);
        assert_eq!(spec.size, 20);
    }

    #[test]
    fn multi_field_sort_shares_direction() {
        let spec = PageSpec::from_query(
            &pairs(&[("sortBy", "first_name,last_name"), ("dir", "desc")]),
            &PageDefaults::ID_ASC,
        );
        assert_eq!(spec.sort.len(), 2);
        assert_eq!(spec.sort[0].field, "first_name");
        assert_eq!(spec.sort[1].field, "last_name");
        assert!(spec.sort.iter().all(|k| k.direction == SortDirection::Desc));
    }

    #[test]
    fn blank_sort_entries_are_skipped() {
        let spec = PageSpec::from_query(&pairs(&[("sortBy", " , ,name,")]), &PageDefaults::ID_ASC);
        assert_eq!(spec.sort.len(), 1);
        assert_eq!(spec.sort[0].field, "name");
    }

    #[test]
    fn dir_parameter_sets_the_direction() {
        let spec = PageSpec::from_query(&pairs(&[("dir", "desc")]), &PageDefaults::ID_ASC);
        assert_eq!(spec.sort[0].direction, SortDirection::Desc);
    }

    #[test]
    fn direction_applies_to_default_sort_field() {
        let spec = PageSpec::from_query(&pairs(&[("sortDir", "DESC")]), &PageDefaults::ID_ASC);
        assert_eq!(spec.sort[0].field, "id");
        assert_eq!(spec.sort[0].direction, SortDirection::Desc);
    }

    #[test]
    fn first_occurrence_of_a_key_wins() {
        let spec = PageSpec::from_query(
            &pairs(&[("page", "2"), ("page", "9")]),
            &PageDefaults::ID_ASC,
        );
        assert_eq!(spec.page, 2);
    }

    #[test]
    fn offset_is_page_times_size() {
        let spec = PageSpec::from_query(
            &pairs(&[("page", "3"), ("size", "25")]),
            &PageDefaults::ID_ASC,
        );
        assert_eq!(spec.offset(), 75);
        assert_eq!(spec.limit(), 25);
    }
}
