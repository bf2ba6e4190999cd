//! Shared fixtures for the integration suite: a zoo schema in the shape the
//! schema-discovery layer would hand to the pagination core.

use apollo_compiler::Name;
use apollo_compiler::ast;
use apollo_compiler::name;
use indexmap::IndexMap;
use indexmap::IndexSet;

use graphql_query_pagination::FieldValue;
use graphql_query_pagination::LocalStatistics;
use graphql_query_pagination::QueryPlanningSchemaInfo;
use graphql_query_pagination::schema_info::FieldKind;
use graphql_query_pagination::schema_info::SchemaGraph;

pub fn zoo_schema_graph() -> SchemaGraph {
    let mut vertex_fields = IndexMap::new();
    vertex_fields.insert(
        name!("Animal"),
        IndexMap::from([
            (name!("uuid"), FieldKind::Uuid),
            (name!("name"), FieldKind::Text),
            (name!("birthday"), FieldKind::DateTime),
        ]),
    );
    vertex_fields.insert(
        name!("Species"),
        IndexMap::from([
            (name!("uuid"), FieldKind::Uuid),
            (name!("name"), FieldKind::Text),
            (name!("limbs"), FieldKind::Int),
        ]),
    );
    vertex_fields.insert(
        name!("Event"),
        IndexMap::from([
            (name!("uuid"), FieldKind::Uuid),
            (name!("name"), FieldKind::Text),
            (name!("event_date"), FieldKind::DateTime),
        ]),
    );
    SchemaGraph::new(vertex_fields)
}

/// Schema info paginating every vertex type on its `uuid` field by default,
/// with the given class counts, quantile samples, and per-type pagination
/// key overrides.
pub fn zoo_schema_info(
    class_counts: impl IntoIterator<Item = (Name, u64)>,
    field_quantiles: impl IntoIterator<Item = ((Name, Name), Vec<FieldValue>)>,
    pagination_key_overrides: impl IntoIterator<Item = (Name, Name)>,
) -> QueryPlanningSchemaInfo {
    let schema_graph = zoo_schema_graph();
    let mut pagination_keys: IndexMap<Name, Name> = schema_graph
        .vertex_type_names()
        .map(|vertex| (vertex.clone(), name!("uuid")))
        .collect();
    for (vertex, field) in pagination_key_overrides {
        pagination_keys.insert(vertex, field);
    }
    let uuid4_fields: IndexMap<Name, IndexSet<Name>> = schema_graph
        .vertex_type_names()
        .map(|vertex| (vertex.clone(), IndexSet::from([name!("uuid")])))
        .collect();
    QueryPlanningSchemaInfo {
        schema_graph,
        statistics: LocalStatistics::with_field_quantiles(
            class_counts.into_iter().collect(),
            field_quantiles.into_iter().collect(),
        ),
        pagination_keys,
        uuid4_fields,
    }
}

pub fn parse(query: &str) -> ast::Document {
    ast::Document::parse(query, "query.graphql").expect("test query parses")
}

/// Compare two query strings up to formatting, by parsing and reprinting
/// both.
pub fn assert_same_graphql(expected: &str, actual: &str) {
    pretty_assertions::assert_eq!(parse(expected).to_string(), parse(actual).to_string());
}

pub fn int_quantiles(values: impl IntoIterator<Item = i64>) -> Vec<FieldValue> {
    values.into_iter().map(FieldValue::Int).collect()
}
