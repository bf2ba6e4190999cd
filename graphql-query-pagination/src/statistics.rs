//! Runtime statistics the planner and parameter generator consume.

use apollo_compiler::Name;
use indexmap::IndexMap;

use crate::value_space::FieldValue;

/// Locally-known statistics about the data behind the schema graph.
///
/// `class_counts` holds approximate row counts per vertex type.
/// `field_quantiles` holds, per `(vertex type, field)`, an ordered sample of
/// that field's values: a sequence of length `K` describes `K − 1`
/// inter-sample buckets, each nominally holding `1 / (K − 1)` of the
/// population. The first and last samples are the observed minimum and
/// maximum.
#[derive(Debug, Clone, Default)]
pub struct LocalStatistics {
    class_counts: IndexMap<Name, u64>,
    field_quantiles: IndexMap<(Name, Name), Vec<FieldValue>>,
}

impl LocalStatistics {
    pub fn new(class_counts: IndexMap<Name, u64>) -> Self {
        Self {
            class_counts,
            field_quantiles: IndexMap::new(),
        }
    }

    pub fn with_field_quantiles(
        class_counts: IndexMap<Name, u64>,
        field_quantiles: IndexMap<(Name, Name), Vec<FieldValue>>,
    ) -> Self {
        Self {
            class_counts,
            field_quantiles,
        }
    }

    pub fn class_count(&self, vertex_type: &Name) -> Option<u64> {
        self.class_counts.get(vertex_type).copied()
    }

    pub fn field_quantiles(&self, vertex_type: &Name, field: &Name) -> Option<&[FieldValue]> {
        self.field_quantiles
            .get(&(vertex_type.clone(), field.clone()))
            .map(Vec::as_slice)
    }
}
