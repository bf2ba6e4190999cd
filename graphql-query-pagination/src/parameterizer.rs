//! Rewriting a query into a (`next_page`, `remainder`) pair.
//!
//! Given one threshold value `t` on the chosen pagination field, the next
//! page is the original query plus `@filter(op_name: "<", value: [$t])` and
//! the remainder is the original plus `@filter(op_name: ">=", value: [$t])`.
//! Executed independently, the two queries partition the original result
//! set. The rewrite is value-preserving: it never drops or reorders
//! existing selections, filters, or outputs, and never mutates its input.

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use tracing::debug;

use crate::ASTWithParameters;
use crate::ParameterMap;
use crate::bail;
use crate::error::PaginationError;
use crate::operation::FilterOperator;
use crate::operation::filters_on_field;
use crate::operation::locate_partition_vertex;
use crate::operation::make_filter_directive;
use crate::operation::partition_vertex_type;
use crate::operation::referenced_parameters;
use crate::planning::VertexPartitionPlan;
use crate::schema_info::QueryPlanningSchemaInfo;
use crate::value_space::FieldValue;

/// Parameter names of this form are reserved for the parameterizer.
pub const RESERVED_PARAMETER_PREFIX: &str = "__paged_param_";

/// The smallest reserved name with no binding in `parameters`.
fn allocate_parameter_name(parameters: &ParameterMap) -> String {
    let mut index = 0usize;
    loop {
        let candidate = format!("{RESERVED_PARAMETER_PREFIX}{index}");
        if !parameters.contains_key(&candidate) {
            return candidate;
        }
        index += 1;
    }
}

/// Split `query` at `threshold` on the partition's pagination field,
/// producing the `next_page` and `remainder` queries with their parameter
/// maps.
pub fn generate_parameterized_queries(
    schema_info: &QueryPlanningSchemaInfo,
    query: &ASTWithParameters,
    vertex_partition: &VertexPartitionPlan,
    threshold: &FieldValue,
) -> Result<(ASTWithParameters, ASTWithParameters), PaginationError> {
    let vertex = locate_partition_vertex(&query.document, &vertex_partition.query_path)?;
    let vertex_type = partition_vertex_type(vertex, &vertex_partition.query_path)?;
    let field = &vertex_partition.pagination_field;
    let domain = schema_info
        .field_domain(&vertex_type, field)
        .ok_or_else(|| PaginationError::SchemaMismatch {
            vertex_type: vertex_type.clone(),
            field: field.clone(),
        })?;
    if threshold.domain() != domain {
        bail!(
            "threshold for {vertex_type}.{field} is a {} value but the field's \
             value space is {domain}",
            threshold.domain()
        );
    }

    // An existing filter that already pins the exact bound we would add is
    // reused instead of duplicated; the corresponding query then refers to
    // the existing parameter and does not need the fresh binding.
    let mut reuse_lower = false;
    let mut reuse_upper = false;
    for filter in filters_on_field(vertex, field) {
        let Some(operator) = filter.operator() else {
            continue;
        };
        let bound_equals_threshold = |index: usize| -> Result<bool, PaginationError> {
            match filter
                .operands
                .get(index)
                .and_then(|operand| operand.resolve(domain, &query.parameters))
            {
                Some(value) => Ok(value.try_cmp(threshold)? == std::cmp::Ordering::Equal),
                None => Ok(false),
            }
        };
        match operator {
            FilterOperator::GreaterThanOrEqual | FilterOperator::Equal => {
                reuse_lower = reuse_lower || bound_equals_threshold(0)?;
            }
            FilterOperator::Between => {
                reuse_lower = reuse_lower || bound_equals_threshold(0)?;
            }
            FilterOperator::LessThan => {
                reuse_upper = reuse_upper || bound_equals_threshold(0)?;
            }
            FilterOperator::LessThanOrEqual | FilterOperator::GreaterThan => {}
        }
    }

    let parameter_name = allocate_parameter_name(&query.parameters);
    debug!(
        %vertex_type,
        %field,
        threshold = %threshold,
        %parameter_name,
        reuse_lower,
        reuse_upper,
        "parameterizing query pair"
    );

    let next_page_document = if reuse_upper {
        query.document.clone()
    } else {
        add_filter_to_pagination_field(
            &query.document,
            &vertex_partition.query_path,
            field,
            make_filter_directive(FilterOperator::LessThan, &parameter_name),
        )?
    };
    let remainder_document = if reuse_lower {
        query.document.clone()
    } else {
        add_filter_to_pagination_field(
            &query.document,
            &vertex_partition.query_path,
            field,
            make_filter_directive(FilterOperator::GreaterThanOrEqual, &parameter_name),
        )?
    };

    // Each query carries the input bindings plus the fresh one when and
    // only when it actually references the fresh name.
    let bind = |document: &ast::Document| -> ParameterMap {
        let mut parameters = query.parameters.clone();
        if referenced_parameters(document).contains(&parameter_name) {
            parameters.insert(parameter_name.clone(), threshold.to_json());
        }
        parameters
    };

    let next_page_parameters = bind(&next_page_document);
    let remainder_parameters = bind(&remainder_document);
    Ok((
        ASTWithParameters {
            document: next_page_document,
            parameters: next_page_parameters,
        },
        ASTWithParameters {
            document: remainder_document,
            parameters: remainder_parameters,
        },
    ))
}

/// Return a copy of `document` with `directive` added to the pagination
/// field of the vertex at `query_path`, inserting the field selection at the
/// head of the vertex's scope when the query does not already select it.
fn add_filter_to_pagination_field(
    document: &ast::Document,
    query_path: &[Name],
    field: &Name,
    directive: ast::Directive,
) -> Result<ast::Document, PaginationError> {
    let mut document = document.clone();
    let Some(operation) = document.definitions.iter_mut().find_map(|definition| {
        if let ast::Definition::OperationDefinition(operation) = definition {
            Some(operation)
        } else {
            None
        }
    }) else {
        return Err(PaginationError::AstShapeUnsupported {
            message: "query contains no operation definition".to_string(),
        });
    };

    let mut selections = &mut operation.make_mut().selection_set;
    for (depth, step) in query_path.iter().enumerate() {
        let vertex = selections
            .iter_mut()
            .find_map(|selection| match selection {
                ast::Selection::Field(candidate) if candidate.name == *step => Some(candidate),
                _ => None,
            })
            .ok_or_else(|| PaginationError::AstShapeUnsupported {
                message: format!("vertex path step \"{step}\" not found"),
            })?;
        let vertex = vertex.make_mut();
        if depth + 1 < query_path.len() {
            selections = &mut vertex.selection_set;
            continue;
        }
        // At the target vertex; a sole inline type refinement is transparent.
        let scope = if matches!(
            vertex.selection_set.as_slice(),
            [ast::Selection::InlineFragment(_)]
        ) {
            let Some(ast::Selection::InlineFragment(refinement)) =
                vertex.selection_set.first_mut()
            else {
                bail!("vertex scope changed shape mid-rewrite");
            };
            &mut refinement.make_mut().selection_set
        } else {
            &mut vertex.selection_set
        };
        let existing_position = scope.iter().position(|selection| {
            matches!(selection, ast::Selection::Field(candidate) if candidate.name == *field)
        });
        match existing_position {
            Some(index) => {
                let ast::Selection::Field(selection) = &mut scope[index] else {
                    bail!("selection at the pagination field's position is not a field");
                };
                selection.make_mut().directives.push(Node::new(directive));
            }
            None => {
                let pagination_field = ast::Field {
                    alias: None,
                    name: field.clone(),
                    arguments: Vec::new(),
                    directives: ast::DirectiveList(vec![Node::new(directive)]),
                    selection_set: Vec::new(),
                };
                scope.insert(0, ast::Selection::Field(Node::new(pagination_field)));
            }
        }
        return Ok(document);
    }
    Err(PaginationError::AstShapeUnsupported {
        message: "vertex path is empty".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use serde_json::Value as JsonValue;
    use serde_json::json;

    use super::*;
    use crate::operation::parse_document;
    use crate::test_fixtures::int_quantiles;
    use crate::test_fixtures::zoo_schema_info;

    fn ast_with_parameters(
        query: &str,
        parameters: impl IntoIterator<Item = (&'static str, JsonValue)>,
    ) -> ASTWithParameters {
        ASTWithParameters {
            document: parse_document(query).expect("test query parses"),
            parameters: parameters
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    fn assert_same_graphql(expected: &str, actual: &ast::Document) {
        let expected = parse_document(expected).expect("expected query parses");
        assert_eq!(expected.to_string(), actual.to_string());
    }

    fn species_limbs_schema_info() -> QueryPlanningSchemaInfo {
        zoo_schema_info(
            [(name!("Species"), 1000)],
            [((name!("Species"), name!("limbs")), int_quantiles(0..=100))],
            [(name!("Species"), name!("limbs"))],
        )
    }

    #[test]
    fn splits_on_a_field_the_query_does_not_select() {
        let schema_info = species_limbs_schema_info();
        let query = ast_with_parameters(
            r#"{
                Species {
                    name @output(out_name: "species_name")
                }
            }"#,
            [],
        );
        let partition = VertexPartitionPlan::new([name!("Species")], name!("limbs"), 4);

        let (next_page, remainder) = generate_parameterized_queries(
            &schema_info,
            &query,
            &partition,
            &FieldValue::Int(100),
        )
        .expect("parameterization succeeds");

        assert_same_graphql(
            r#"{
                Species {
                    limbs @filter(op_name: "<", value: ["$__paged_param_0"])
                    name @output(out_name: "species_name")
                }
            }"#,
            &next_page.document,
        );
        assert_same_graphql(
            r#"{
                Species {
                    limbs @filter(op_name: ">=", value: ["$__paged_param_0"])
                    name @output(out_name: "species_name")
                }
            }"#,
            &remainder.document,
        );
        assert_eq!(
            next_page.parameters,
            IndexMap::from([("__paged_param_0".to_string(), json!(100))])
        );
        assert_eq!(remainder.parameters, next_page.parameters);
    }

    #[test]
    fn reserved_names_already_bound_are_skipped() {
        let schema_info = species_limbs_schema_info();
        let query = ast_with_parameters(
            r#"{
                Species {
                    name @output(out_name: "species_name")
                         @filter(op_name: "!=", value: ["$__paged_param_0"])
                }
            }"#,
            [("__paged_param_0", json!("Cow"))],
        );
        let partition = VertexPartitionPlan::new([name!("Species")], name!("limbs"), 4);

        let (next_page, remainder) = generate_parameterized_queries(
            &schema_info,
            &query,
            &partition,
            &FieldValue::Int(100),
        )
        .expect("parameterization succeeds");

        assert_same_graphql(
            r#"{
                Species {
                    limbs @filter(op_name: "<", value: ["$__paged_param_1"])
                    name @output(out_name: "species_name")
                         @filter(op_name: "!=", value: ["$__paged_param_0"])
                }
            }"#,
            &next_page.document,
        );
        assert_same_graphql(
            r#"{
                Species {
                    limbs @filter(op_name: ">=", value: ["$__paged_param_1"])
                    name @output(out_name: "species_name")
                         @filter(op_name: "!=", value: ["$__paged_param_0"])
                }
            }"#,
            &remainder.document,
        );
        assert_eq!(
            next_page.parameters,
            IndexMap::from([
                ("__paged_param_0".to_string(), json!("Cow")),
                ("__paged_param_1".to_string(), json!(100)),
            ])
        );
        assert_eq!(remainder.parameters, next_page.parameters);
    }

    #[test]
    fn allocation_fills_gaps_in_the_reserved_namespace() {
        let parameters: ParameterMap = IndexMap::from([
            ("__paged_param_0".to_string(), json!(1)),
            ("__paged_param_2".to_string(), json!(2)),
        ]);
        assert_eq!(allocate_parameter_name(&parameters), "__paged_param_1");
    }

    #[test]
    fn an_equal_existing_lower_bound_is_reused() {
        let schema_info = species_limbs_schema_info();
        let query = ast_with_parameters(
            r#"{
                Species {
                    limbs @filter(op_name: ">=", value: ["$limbs_more_than"])
                    name @output(out_name: "species_name")
                }
            }"#,
            [("limbs_more_than", json!(100))],
        );
        let partition = VertexPartitionPlan::new([name!("Species")], name!("limbs"), 4);

        let (next_page, remainder) = generate_parameterized_queries(
            &schema_info,
            &query,
            &partition,
            &FieldValue::Int(100),
        )
        .expect("parameterization succeeds");

        assert_same_graphql(
            r#"{
                Species {
                    limbs @filter(op_name: ">=", value: ["$limbs_more_than"])
                          @filter(op_name: "<", value: ["$__paged_param_0"])
                    name @output(out_name: "species_name")
                }
            }"#,
            &next_page.document,
        );
        // The remainder reuses the existing lower bound: no new filter, no
        // fresh binding.
        assert_same_graphql(
            r#"{
                Species {
                    limbs @filter(op_name: ">=", value: ["$limbs_more_than"])
                    name @output(out_name: "species_name")
                }
            }"#,
            &remainder.document,
        );
        assert_eq!(
            next_page.parameters,
            IndexMap::from([
                ("limbs_more_than".to_string(), json!(100)),
                ("__paged_param_0".to_string(), json!(100)),
            ])
        );
        assert_eq!(
            remainder.parameters,
            IndexMap::from([("limbs_more_than".to_string(), json!(100))])
        );
    }

    #[test]
    fn a_differing_lower_bound_is_kept_and_tightened() {
        let schema_info = species_limbs_schema_info();
        let query = ast_with_parameters(
            r#"{
                Species {
                    limbs @filter(op_name: ">=", value: ["$limbs_more_than"])
                    name @output(out_name: "species_name")
                }
            }"#,
            [("limbs_more_than", json!(10))],
        );
        let partition = VertexPartitionPlan::new([name!("Species")], name!("limbs"), 4);

        let (next_page, remainder) = generate_parameterized_queries(
            &schema_info,
            &query,
            &partition,
            &FieldValue::Int(50),
        )
        .expect("parameterization succeeds");

        // No filter is removed: the remainder carries both lower bounds.
        assert_same_graphql(
            r#"{
                Species {
                    limbs @filter(op_name: ">=", value: ["$limbs_more_than"])
                          @filter(op_name: ">=", value: ["$__paged_param_0"])
                    name @output(out_name: "species_name")
                }
            }"#,
            &remainder.document,
        );
        assert_same_graphql(
            r#"{
                Species {
                    limbs @filter(op_name: ">=", value: ["$limbs_more_than"])
                          @filter(op_name: "<", value: ["$__paged_param_0"])
                    name @output(out_name: "species_name")
                }
            }"#,
            &next_page.document,
        );
    }

    #[test]
    fn the_input_query_is_not_mutated() {
        let schema_info = species_limbs_schema_info();
        let query = ast_with_parameters(
            r#"{ Species { name @output(out_name: "species_name") } }"#,
            [],
        );
        let before = query.document.to_string();

        let partition = VertexPartitionPlan::new([name!("Species")], name!("limbs"), 4);
        generate_parameterized_queries(&schema_info, &query, &partition, &FieldValue::Int(42))
            .expect("parameterization succeeds");

        assert_eq!(query.document.to_string(), before);
        assert!(query.parameters.is_empty());
    }

    #[test]
    fn mismatched_threshold_domains_are_fatal() {
        let schema_info = species_limbs_schema_info();
        let query = ast_with_parameters(
            r#"{ Species { name @output(out_name: "species_name") } }"#,
            [],
        );
        let partition = VertexPartitionPlan::new([name!("Species")], name!("limbs"), 4);

        let error = generate_parameterized_queries(
            &schema_info,
            &query,
            &partition,
            &FieldValue::Uuid(uuid::Uuid::from_u128(7)),
        )
        .expect_err("domain mismatch");
        assert!(matches!(
            error,
            PaginationError::InternalInvariantViolated { .. }
        ));
    }
}
