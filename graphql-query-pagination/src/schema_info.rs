//! The schema-level inputs to pagination planning.
//!
//! The pagination core does not discover schemas itself; it consumes a
//! schema-graph projection produced elsewhere: the vertex types the database
//! exposes, their scalar fields with database-level typing, plus the
//! per-type pagination configuration and runtime statistics.

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use serde::Deserialize;
use serde::Serialize;

use crate::statistics::LocalStatistics;
use crate::value_space::ValueDomain;

/// Database-level type of a vertex field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Int,
    Float,
    Text,
    Boolean,
    DateTime,
    Uuid,
}

impl FieldKind {
    /// The ordered value space of this field kind, if it has one.
    /// Fields without a value space cannot carry pagination filters.
    pub(crate) fn value_domain(self) -> Option<ValueDomain> {
        match self {
            Self::Int => Some(ValueDomain::Int),
            Self::DateTime => Some(ValueDomain::DateTime),
            Self::Uuid => Some(ValueDomain::Uuid),
            Self::Float | Self::Text | Self::Boolean => None,
        }
    }
}

/// The vertex types reachable in queries, with their scalar fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaGraph {
    vertex_fields: IndexMap<Name, IndexMap<Name, FieldKind>>,
}

impl SchemaGraph {
    pub fn new(vertex_fields: IndexMap<Name, IndexMap<Name, FieldKind>>) -> Self {
        Self { vertex_fields }
    }

    pub fn vertex_type_names(&self) -> impl Iterator<Item = &Name> {
        self.vertex_fields.keys()
    }

    pub fn is_vertex_type(&self, name: &Name) -> bool {
        self.vertex_fields.contains_key(name)
    }

    pub fn field_kind(&self, vertex_type: &Name, field: &Name) -> Option<FieldKind> {
        self.vertex_fields.get(vertex_type)?.get(field).copied()
    }
}

/// Everything the pagination core needs to know about a schema.
#[derive(Debug, Clone)]
pub struct QueryPlanningSchemaInfo {
    pub schema_graph: SchemaGraph,
    pub statistics: LocalStatistics,
    /// The preferred partition field per vertex type. Types without an entry
    /// cannot be paginated.
    pub pagination_keys: IndexMap<Name, Name>,
    /// Fields whose values are uniformly-random UUID-v4s; their quantiles
    /// are derived analytically instead of sampled.
    pub uuid4_fields: IndexMap<Name, IndexSet<Name>>,
}

impl QueryPlanningSchemaInfo {
    pub fn pagination_key(&self, vertex_type: &Name) -> Option<&Name> {
        self.pagination_keys.get(vertex_type)
    }

    pub fn is_uuid4_field(&self, vertex_type: &Name, field: &Name) -> bool {
        self.uuid4_fields
            .get(vertex_type)
            .is_some_and(|fields| fields.contains(field))
    }

    /// The value space of a field as pagination sees it: UUID-v4 fields are
    /// always in the UUID domain regardless of their storage type.
    pub(crate) fn field_domain(&self, vertex_type: &Name, field: &Name) -> Option<ValueDomain> {
        if self.is_uuid4_field(vertex_type, field) {
            return Some(ValueDomain::Uuid);
        }
        self.schema_graph
            .field_kind(vertex_type, field)?
            .value_domain()
    }
}
