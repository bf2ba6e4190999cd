//! Cardinality estimation seam.
//!
//! Estimation is external to the pagination core: callers with a live
//! database bring their own implementation. The bundled
//! [`StatisticsCardinalityEstimator`] works from `LocalStatistics` alone,
//! which is what lets a paginated remainder be re-paginated without ever
//! touching the database.

use tracing::debug;

use crate::ASTWithParameters;
use crate::error::PaginationError;
use crate::interval::ValueInterval;
use crate::interval::narrowed_interval;
use crate::interval::uuid_bounds;
use crate::operation::FilterDirective;
use crate::operation::document_root_field;
use crate::operation::vertex_scope_selections;
use crate::schema_info::QueryPlanningSchemaInfo;
use crate::value_space::FieldValue;
use crate::value_space::ValueDomain;
use crate::value_space::datetime_to_micros;

/// Estimates how many rows a query will produce.
pub trait CardinalityEstimator {
    fn estimate_cardinality(
        &self,
        schema_info: &QueryPlanningSchemaInfo,
        query: &ASTWithParameters,
    ) -> Result<f64, PaginationError>;
}

/// Estimator backed purely by `LocalStatistics`: the root vertex's class
/// count scaled by the selectivity of each range filter on a root field
/// with a known value space. Filters on deeper vertices and non-range
/// filters are assumed to select everything, which keeps the estimate an
/// upper bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsCardinalityEstimator;

impl CardinalityEstimator for StatisticsCardinalityEstimator {
    fn estimate_cardinality(
        &self,
        schema_info: &QueryPlanningSchemaInfo,
        query: &ASTWithParameters,
    ) -> Result<f64, PaginationError> {
        let root = document_root_field(&query.document)?;
        let vertex_type = root.name.clone();
        let Some(class_count) = schema_info.statistics.class_count(&vertex_type) else {
            debug!(%vertex_type, "no class count; estimating zero rows");
            return Ok(0.0);
        };

        let mut selectivity = 1.0f64;
        for selection in vertex_scope_selections(root) {
            let apollo_compiler::ast::Selection::Field(field) = selection else {
                continue;
            };
            let filters: Vec<FilterDirective> = field
                .directives
                .iter()
                .filter_map(|directive| FilterDirective::from_directive(directive))
                .collect();
            if filters.is_empty() {
                continue;
            }
            let Some(domain) = schema_info.field_domain(&vertex_type, &field.name) else {
                continue;
            };
            let interval = narrowed_interval(domain, &filters, &query.parameters)?;
            selectivity *=
                interval_fraction(schema_info, &vertex_type, &field.name, &interval)?;
        }

        let estimate = class_count as f64 * selectivity;
        debug!(%vertex_type, class_count, selectivity, estimate, "estimated query cardinality");
        Ok(estimate)
    }
}

/// The fraction of a field's full value space that `interval` covers.
fn interval_fraction(
    schema_info: &QueryPlanningSchemaInfo,
    vertex_type: &apollo_compiler::Name,
    field: &apollo_compiler::Name,
    interval: &ValueInterval,
) -> Result<f64, PaginationError> {
    if interval.is_empty()? {
        return Ok(0.0);
    }
    match interval.domain() {
        ValueDomain::Uuid => {
            let (lower, upper) = uuid_bounds(interval)?;
            Ok(((upper - lower) as f64 + 1.0) / 2f64.powi(128))
        }
        ValueDomain::Int | ValueDomain::DateTime => {
            let Some(samples) = schema_info.statistics.field_quantiles(vertex_type, field) else {
                return Ok(1.0);
            };
            let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
                return Ok(1.0);
            };
            let (domain_min, domain_max) = (linear_position(first)?, linear_position(last)?);
            if domain_max <= domain_min {
                return Ok(1.0);
            }
            let lower = match interval.lower() {
                Some(bound) => linear_position(bound)?.max(domain_min),
                None => domain_min,
            };
            let upper = match interval.upper() {
                Some(bound) => linear_position(bound)?.min(domain_max),
                None => domain_max,
            };
            if upper < lower {
                return Ok(0.0);
            }
            let fraction =
                ((upper - lower + 1) as f64) / ((domain_max - domain_min + 1) as f64);
            Ok(fraction.clamp(0.0, 1.0))
        }
    }
}

fn linear_position(value: &FieldValue) -> Result<i128, PaginationError> {
    match value {
        FieldValue::Int(v) => Ok(i128::from(*v)),
        FieldValue::DateTime(v) => Ok(i128::from(datetime_to_micros(*v))),
        FieldValue::Uuid(_) => Err(crate::internal_error!(
            "UUID values have no signed linear position"
        )),
    }
}
