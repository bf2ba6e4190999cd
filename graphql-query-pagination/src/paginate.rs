//! Top-level pagination: split a query string into a bounded first page and
//! a complementary remainder.

use tracing::debug;

use crate::ASTWithParameters;
use crate::ParameterMap;
use crate::QueryStringWithParameters;
use crate::error::PaginationError;
use crate::estimate::CardinalityEstimator;
use crate::internal_error;
use crate::operation::locate_partition_vertex;
use crate::operation::parse_document;
use crate::operation::partition_vertex_type;
use crate::parameter_generator::generate_parameters_for_vertex_partition;
use crate::parameterizer::generate_parameterized_queries;
use crate::planning::PaginationAdvisory;
use crate::planning::get_pagination_plan;
use crate::schema_info::QueryPlanningSchemaInfo;

/// The outcome of one pagination step.
///
/// When the query could not be split, `next_page` is the input query
/// verbatim, `remainder` is `None`, and `advisories` explains why. The
/// caller obtains subsequent pages by re-invoking [`paginate_query`] on the
/// remainder.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedQuery {
    pub next_page: QueryStringWithParameters,
    pub remainder: Option<QueryStringWithParameters>,
    pub advisories: Vec<PaginationAdvisory>,
}

/// Split `query_string` into a first page of approximately
/// `desired_page_row_count` rows and the remainder of its result set.
///
/// The two returned queries, executed independently, produce a disjoint
/// partition of the original query's results: the first page takes the
/// values below the chosen threshold and the remainder takes the rest. Page
/// sizes are approximate; they are only as good as the statistics behind
/// `schema_info` and the supplied estimator.
pub fn paginate_query(
    schema_info: &QueryPlanningSchemaInfo,
    estimator: &dyn CardinalityEstimator,
    query_string: &str,
    parameters: &ParameterMap,
    desired_page_row_count: u64,
) -> Result<PaginatedQuery, PaginationError> {
    if desired_page_row_count == 0 {
        return Err(internal_error!("desired page row count must be positive"));
    }

    let document = parse_document(query_string)?;
    let query = ASTWithParameters {
        document,
        parameters: parameters.clone(),
    };

    let cardinality = estimator.estimate_cardinality(schema_info, &query)?;
    let number_of_pages = if cardinality.is_finite() && cardinality > 0.0 {
        (cardinality / desired_page_row_count as f64).ceil().max(1.0) as usize
    } else {
        1
    };
    debug!(cardinality, number_of_pages, "estimated pagination width");

    let (plan, mut advisories) = get_pagination_plan(schema_info, &query.document, number_of_pages)?;
    let Some(partition) = plan.vertex_partitions.first() else {
        return Ok(unpaginated(query_string, parameters, advisories));
    };

    let mut thresholds = generate_parameters_for_vertex_partition(
        schema_info,
        &query.document,
        &query.parameters,
        partition,
    )?;
    let Some(threshold) = thresholds.next() else {
        // The narrowed value space produced no separator at all; degrade to
        // the unpaginated query rather than erroring.
        let vertex = locate_partition_vertex(&query.document, &partition.query_path)?;
        let vertex_type = partition_vertex_type(vertex, &partition.query_path)?;
        advisories.push(PaginationAdvisory::DegeneratePartition {
            vertex_type,
            field: partition.pagination_field.clone(),
        });
        return Ok(unpaginated(query_string, parameters, advisories));
    };

    let (next_page, remainder) =
        generate_parameterized_queries(schema_info, &query, partition, &threshold)?;
    Ok(PaginatedQuery {
        next_page: print_query(next_page),
        remainder: Some(print_query(remainder)),
        advisories,
    })
}

fn unpaginated(
    query_string: &str,
    parameters: &ParameterMap,
    advisories: Vec<PaginationAdvisory>,
) -> PaginatedQuery {
    PaginatedQuery {
        next_page: QueryStringWithParameters {
            query_string: query_string.to_string(),
            parameters: parameters.clone(),
        },
        remainder: None,
        advisories,
    }
}

fn print_query(query: ASTWithParameters) -> QueryStringWithParameters {
    QueryStringWithParameters {
        query_string: query.document.to_string(),
        parameters: query.parameters,
    }
}
