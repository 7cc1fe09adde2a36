//! Generic filter / pagination / predicate engine
//!
//! Turns the `filter.<field>[:<op>]=<value>` query-string grammar and the
//! `page`/`size`/`sortBy`/`dir` parameters into typed criteria and page
//! specs, then lowers criteria lists into parameterized SQL predicates
//! against a declared entity schema graph.

pub mod criteria;
pub mod error;
pub mod page;
pub mod parse;
pub mod predicate;
pub mod schema;

pub use criteria::{FilterCriterion, FilterOperator};
pub use error::QueryError;
pub use page::{PageDefaults, PageSpec, SortDirection, SortKey};
pub use parse::parse_filters;
pub use predicate::{Predicate, SqlParams, build_predicate, order_by_sql};
pub use schema::{EntitySchema, FieldType, ScalarValue};
