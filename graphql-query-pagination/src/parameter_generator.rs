//! Threshold generation for a chosen vertex partition.
//!
//! Given a `VertexPartitionPlan`, produce the `N − 1` boundary values that
//! divide the pagination field's narrowed value space into `N` buckets of
//! approximately equal cardinality. Values come out strictly increasing
//! with consecutive duplicates dropped, so pathological distributions may
//! yield fewer than `N − 1` of them.

use apollo_compiler::Name;
use apollo_compiler::ast;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::PaginationError;
use crate::internal_error;
use crate::interval::narrowed_interval;
use crate::interval::uuid_bounds;
use crate::operation::filters_on_field;
use crate::operation::locate_partition_vertex;
use crate::operation::partition_vertex_type;
use crate::planning::VertexPartitionPlan;
use crate::quantiles::select_thresholds;
use crate::schema_info::QueryPlanningSchemaInfo;
use crate::value_space::FieldValue;
use crate::value_space::uuid_span_fraction;

/// Lazy, finite sequence of partition thresholds.
pub struct PartitionThresholds {
    source: ThresholdSource,
    subdivisions: usize,
    next_index: usize,
    last_produced: Option<FieldValue>,
}

enum ThresholdSource {
    /// The value space itself is empty after narrowing.
    Empty,
    /// Exact interpolation over the 128-bit UUID space: the inclusive
    /// interval `[lower, lower + span]`.
    UuidAnalytic { lower: u128, span: u128 },
    /// Sample-backed selection, already restricted to the narrowed value
    /// range and deduplicated.
    Quantiles(std::vec::IntoIter<FieldValue>),
}

impl Iterator for PartitionThresholds {
    type Item = FieldValue;

    fn next(&mut self) -> Option<FieldValue> {
        while self.next_index < self.subdivisions {
            let i = self.next_index;
            self.next_index += 1;
            let candidate = match &mut self.source {
                ThresholdSource::Empty => return None,
                ThresholdSource::UuidAnalytic { lower, span } => {
                    let offset = uuid_span_fraction(*span, i as u64, self.subdivisions as u64);
                    FieldValue::Uuid(Uuid::from_u128(*lower + offset))
                }
                ThresholdSource::Quantiles(thresholds) => thresholds.next()?,
            };
            if self.last_produced != Some(candidate) {
                self.last_produced = Some(candidate);
                return Some(candidate);
            }
        }
        None
    }
}

/// Compute the threshold values realizing `vertex_partition` against
/// `document`, honoring any filters the query already places on the
/// pagination field.
pub fn generate_parameters_for_vertex_partition(
    schema_info: &QueryPlanningSchemaInfo,
    document: &ast::Document,
    parameters: &IndexMap<String, JsonValue>,
    vertex_partition: &VertexPartitionPlan,
) -> Result<PartitionThresholds, PaginationError> {
    let subdivisions = vertex_partition.number_of_subdivisions;
    if subdivisions < 2 {
        return Err(internal_error!(
            "a vertex partition must have at least 2 subdivisions, got {subdivisions}"
        ));
    }

    let vertex = locate_partition_vertex(document, &vertex_partition.query_path)?;
    let vertex_type = partition_vertex_type(vertex, &vertex_partition.query_path)?;
    let field = &vertex_partition.pagination_field;
    let domain = schema_info
        .field_domain(&vertex_type, field)
        .ok_or_else(|| PaginationError::SchemaMismatch {
            vertex_type: vertex_type.clone(),
            field: field.clone(),
        })?;

    let filters = filters_on_field(vertex, field);
    let interval = narrowed_interval(domain, &filters, parameters)?;
    debug!(
        %vertex_type,
        %field,
        ?interval,
        subdivisions,
        "generating partition thresholds"
    );

    let source = if interval.is_empty()? {
        ThresholdSource::Empty
    } else if schema_info.is_uuid4_field(&vertex_type, field) {
        let (lower, upper) = uuid_bounds(&interval)?;
        ThresholdSource::UuidAnalytic {
            lower,
            span: upper - lower,
        }
    } else {
        quantile_source(schema_info, &vertex_type, field, &interval, subdivisions)?
    };

    Ok(PartitionThresholds {
        source,
        subdivisions,
        next_index: 1,
        last_produced: None,
    })
}

fn quantile_source(
    schema_info: &QueryPlanningSchemaInfo,
    vertex_type: &Name,
    field: &Name,
    interval: &crate::interval::ValueInterval,
    subdivisions: usize,
) -> Result<ThresholdSource, PaginationError> {
    let samples = schema_info
        .statistics
        .field_quantiles(vertex_type, field)
        .ok_or_else(|| {
            internal_error!(
                "no quantile data for {vertex_type}.{field}; the planner should have \
                 refused this partition"
            )
        })?;
    for sample in samples {
        if sample.domain() != interval.domain() {
            return Err(internal_error!(
                "quantile sample for {vertex_type}.{field} is a {} value in a {} field",
                sample.domain(),
                interval.domain()
            ));
        }
    }
    let thresholds =
        select_thresholds(samples, interval.lower(), interval.upper(), subdivisions)?;
    Ok(ThresholdSource::Quantiles(thresholds.into_iter()))
}
