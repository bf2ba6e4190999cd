//! Shared fixtures for unit tests: a small zoo schema in the shape the
//! schema-discovery layer would produce.

use apollo_compiler::Name;
use apollo_compiler::name;
use indexmap::IndexMap;
use indexmap::IndexSet;

use crate::schema_info::FieldKind;
use crate::schema_info::QueryPlanningSchemaInfo;
use crate::schema_info::SchemaGraph;
use crate::statistics::LocalStatistics;
use crate::value_space::FieldValue;

pub(crate) fn zoo_schema_graph() -> SchemaGraph {
    let mut vertex_fields = IndexMap::new();
    vertex_fields.insert(
        name!("Animal"),
        IndexMap::from([
            (name!("uuid"), FieldKind::Uuid),
            (name!("name"), FieldKind::Text),
            (name!("birthday"), FieldKind::DateTime),
            (name!("net_worth"), FieldKind::Float),
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

/// Schema info with every vertex type paginated on its `uuid` field, the
/// given class counts, and the given quantile samples. `pagination_keys`
/// entries override the `uuid` default.
pub(crate) fn zoo_schema_info(
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

pub(crate) fn int_quantiles(values: impl IntoIterator<Item = i64>) -> Vec<FieldValue> {
    values.into_iter().map(FieldValue::Int).collect()
}
