//! Query pagination core of the GraphQL-to-database compiler.
//!
//! Given a query that may return many results, this crate decides whether
//! and how to split it into a bounded-size first page and a complementary
//! remainder: two queries that, executed independently, produce a disjoint
//! partition of the original result set while respecting all of its filters
//! and outputs.
//!
//! The split happens in three stages, each usable on its own:
//! - [`planning::get_pagination_plan`] chooses the vertex and field to
//!   partition on, from schema metadata and runtime statistics;
//! - [`parameter_generator::generate_parameters_for_vertex_partition`]
//!   computes the threshold values dividing that field's value space into
//!   approximately equal-cardinality buckets;
//! - [`parameterizer::generate_parameterized_queries`] rewrites the AST to
//!   inject the bounding filters, producing the `next_page` / `remainder`
//!   pair.
//!
//! [`paginate_query`] orchestrates the three and works on query strings;
//! re-invoking it on a returned remainder walks the full result set page by
//! page.

use apollo_compiler::ast;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

pub mod error;
pub mod estimate;
mod interval;
mod operation;
pub mod paginate;
pub mod parameter_generator;
pub mod parameterizer;
pub mod planning;
mod quantiles;
pub mod schema_info;
pub mod statistics;
#[cfg(test)]
pub(crate) mod test_fixtures;
pub mod value_space;

pub use crate::error::PaginationError;
pub use crate::estimate::CardinalityEstimator;
pub use crate::estimate::StatisticsCardinalityEstimator;
pub use crate::paginate::PaginatedQuery;
pub use crate::paginate::paginate_query;
pub use crate::parameter_generator::generate_parameters_for_vertex_partition;
pub use crate::parameterizer::RESERVED_PARAMETER_PREFIX;
pub use crate::parameterizer::generate_parameterized_queries;
pub use crate::planning::PaginationAdvisory;
pub use crate::planning::PaginationPlan;
pub use crate::planning::VertexPartitionPlan;
pub use crate::planning::get_pagination_plan;
pub use crate::schema_info::QueryPlanningSchemaInfo;
pub use crate::statistics::LocalStatistics;
pub use crate::value_space::FieldValue;

/// Parameter bindings of a query: names (without the `$` sigil) to values.
pub type ParameterMap = IndexMap<String, JsonValue>;

/// A query AST together with its parameter bindings.
#[derive(Debug, Clone)]
pub struct ASTWithParameters {
    pub document: ast::Document,
    pub parameters: ParameterMap,
}

/// A printed query together with its parameter bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStringWithParameters {
    pub query_string: String,
    pub parameters: ParameterMap,
}
