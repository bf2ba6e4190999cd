//! Pagination planning: choosing where and how to split a query.
//!
//! The planner is intentionally conservative. When the statistics cannot
//! support a well-founded split it refuses with an advisory rather than
//! producing a poor plan; advisories are ordinary return values, never
//! errors.

use apollo_compiler::Name;
use apollo_compiler::ast;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::error::PaginationError;
use crate::operation::document_root_field;
use crate::quantiles::required_sample_count;
use crate::schema_info::FieldKind;
use crate::schema_info::QueryPlanningSchemaInfo;

/// A decision to split the result set of one vertex of the query into
/// `number_of_subdivisions` approximately equal parts, keyed on
/// `pagination_field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexPartitionPlan {
    /// Selection names locating the vertex within the query, starting at
    /// the root.
    pub query_path: Vec<Name>,
    pub pagination_field: Name,
    pub number_of_subdivisions: usize,
}

impl VertexPartitionPlan {
    pub fn new(
        query_path: impl IntoIterator<Item = Name>,
        pagination_field: Name,
        number_of_subdivisions: usize,
    ) -> Self {
        Self {
            query_path: query_path.into_iter().collect(),
            pagination_field,
            number_of_subdivisions,
        }
    }

    /// The vertex type being partitioned. Paths name vertex fields, and in
    /// the root-only planning of today the last path element is the root
    /// vertex type itself.
    pub fn vertex_type(&self) -> Option<&Name> {
        self.query_path.last()
    }
}

/// An ordered sequence of vertex partitions. Empty means the query cannot
/// be paginated; an empty plan always travels with at least one advisory
/// explaining why (except for the trivial single-page request).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationPlan {
    pub vertex_partitions: Vec<VertexPartitionPlan>,
}

impl PaginationPlan {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(partition: VertexPartitionPlan) -> Self {
        Self {
            vertex_partitions: vec![partition],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_partitions.is_empty()
    }
}

/// A non-fatal diagnostic explaining a degenerate plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaginationAdvisory {
    /// The statistics hold too few quantile samples for the requested split.
    InsufficientQuantiles {
        vertex_type: Name,
        field: Name,
        have: usize,
        need: usize,
    },
    /// No pagination key is configured for the vertex type.
    PaginationFieldNotSpecified { vertex_type: Name },
    /// The configured pagination field's type cannot carry range filters.
    UnpaginableField {
        vertex_type: Name,
        field: Name,
        kind: FieldKind,
    },
    /// The field's value space, after narrowing by the query's own filters,
    /// is too small to produce any partition boundary.
    DegeneratePartition { vertex_type: Name, field: Name },
}

impl std::fmt::Display for PaginationAdvisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientQuantiles {
                vertex_type,
                field,
                have,
                need,
            } => write!(
                f,
                "Insufficient quantile data for {vertex_type}.{field}: \
                 have {have} samples, need {need}. Pagination is not possible \
                 until more quantiles are collected."
            ),
            Self::PaginationFieldNotSpecified { vertex_type } => write!(
                f,
                "No pagination key is configured for vertex type {vertex_type}."
            ),
            Self::UnpaginableField {
                vertex_type,
                field,
                kind,
            } => write!(
                f,
                "Field {vertex_type}.{field} has type {kind:?}, which does not \
                 support range-based pagination."
            ),
            Self::DegeneratePartition { vertex_type, field } => write!(
                f,
                "The value space of {vertex_type}.{field} is too narrow to \
                 split; the query is returned unpaginated."
            ),
        }
    }
}

/// Decide whether and how to split `document` into `number_of_pages` pages.
///
/// Only the root vertex is considered for partitioning. A single-page
/// request yields the empty plan with no advisories: the query already is
/// its own page.
pub fn get_pagination_plan(
    schema_info: &QueryPlanningSchemaInfo,
    document: &ast::Document,
    number_of_pages: usize,
) -> Result<(PaginationPlan, Vec<PaginationAdvisory>), PaginationError> {
    if number_of_pages <= 1 {
        return Ok((PaginationPlan::empty(), Vec::new()));
    }

    let root = document_root_field(document)?;
    let vertex_type = root.name.clone();
    if !schema_info.schema_graph.is_vertex_type(&vertex_type) {
        return Err(PaginationError::AstShapeUnsupported {
            message: format!("root selection \"{vertex_type}\" is not a vertex type"),
        });
    }

    let Some(pagination_field) = schema_info.pagination_key(&vertex_type).cloned() else {
        debug!(%vertex_type, "no pagination key configured; refusing to paginate");
        return Ok((
            PaginationPlan::empty(),
            vec![PaginationAdvisory::PaginationFieldNotSpecified { vertex_type }],
        ));
    };

    if schema_info.is_uuid4_field(&vertex_type, &pagination_field) {
        // UUID-v4 fields are uniform over the 128-bit space; thresholds are
        // derived analytically and no sampled statistics are needed.
        debug!(%vertex_type, field = %pagination_field, "planning analytic UUID partition");
        let partition =
            VertexPartitionPlan::new([vertex_type], pagination_field, number_of_pages);
        return Ok((PaginationPlan::single(partition), Vec::new()));
    }

    let Some(kind) = schema_info
        .schema_graph
        .field_kind(&vertex_type, &pagination_field)
    else {
        return Err(PaginationError::SchemaMismatch {
            vertex_type,
            field: pagination_field,
        });
    };
    if kind.value_domain().is_none() {
        return Ok((
            PaginationPlan::empty(),
            vec![PaginationAdvisory::UnpaginableField {
                vertex_type,
                field: pagination_field,
                kind,
            }],
        ));
    }

    let have = schema_info
        .statistics
        .field_quantiles(&vertex_type, &pagination_field)
        .map_or(0, |samples| samples.len());
    let need = required_sample_count(number_of_pages);
    if have < need {
        debug!(
            %vertex_type,
            field = %pagination_field,
            have,
            need,
            "quantile data insufficient; refusing to paginate"
        );
        return Ok((
            PaginationPlan::empty(),
            vec![PaginationAdvisory::InsufficientQuantiles {
                vertex_type,
                field: pagination_field,
                have,
                need,
            }],
        ));
    }

    debug!(%vertex_type, field = %pagination_field, "planning quantile-based partition");
    let partition = VertexPartitionPlan::new([vertex_type], pagination_field, number_of_pages);
    Ok((PaginationPlan::single(partition), Vec::new()))
}
