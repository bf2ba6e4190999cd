//! Helpers over the GraphQL AST for the compiler's query dialect.
//!
//! Queries are anonymous operations whose single root field names a vertex
//! type. Field selections carry `@filter(op_name: "...", value: [...])` and
//! `@output(out_name: "...")` directives; `value` entries are strings that
//! reference parameters (`"$name"`), tags (`"%name"`), or literals. A
//! vertex's field selections may be wrapped in a single inline type
//! refinement (`... on Type`).

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::name;
use indexmap::IndexSet;
use serde_json::Value as JsonValue;

use crate::error::PaginationError;
use crate::value_space::FieldValue;
use crate::value_space::ValueDomain;

pub(crate) const FILTER_DIRECTIVE_NAME: &str = "filter";
pub(crate) const OP_NAME_ARGUMENT: &str = "op_name";
pub(crate) const VALUE_ARGUMENT: &str = "value";

/// The comparison operators pagination reasons about. Queries may carry
/// other operators (`!=`, `has_substring`, ...); those are preserved
/// untouched but contribute nothing to value-space narrowing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumString,
)]
pub(crate) enum FilterOperator {
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = "<=")]
    LessThanOrEqual,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = ">=")]
    GreaterThanOrEqual,
    #[strum(serialize = "=")]
    Equal,
    #[strum(serialize = "between")]
    Between,
}

/// One entry of a filter's `value` list.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FilterOperand {
    /// `"$name"` — resolved against the query's parameter bindings.
    Parameter(String),
    /// `"%name"` — only resolvable at execution time; never narrows.
    Tag(String),
    /// Any other value, e.g. a bare integer or string literal.
    Literal(ast::Value),
}

impl FilterOperand {
    fn from_value(value: &ast::Value) -> Self {
        if let ast::Value::String(text) = value {
            if let Some(name) = text.strip_prefix('$') {
                return Self::Parameter(name.to_string());
            }
            if let Some(name) = text.strip_prefix('%') {
                return Self::Tag(name.to_string());
            }
        }
        Self::Literal(value.clone())
    }

    /// The operand's value in the given domain, when it has one: bound
    /// parameters and well-formed literals resolve; unbound parameters and
    /// tags do not.
    pub(crate) fn resolve(
        &self,
        domain: ValueDomain,
        parameters: &indexmap::IndexMap<String, JsonValue>,
    ) -> Option<FieldValue> {
        match self {
            Self::Parameter(name) => {
                let bound = parameters.get(name)?;
                FieldValue::from_json(domain, bound).ok()
            }
            Self::Tag(_) => None,
            Self::Literal(value) => literal_field_value(domain, value),
        }
    }
}

fn literal_field_value(domain: ValueDomain, value: &ast::Value) -> Option<FieldValue> {
    match (domain, value) {
        (ValueDomain::Int, ast::Value::Int(int)) => {
            int.as_str().parse::<i64>().ok().map(FieldValue::Int)
        }
        (ValueDomain::DateTime | ValueDomain::Uuid, ast::Value::String(text)) => {
            FieldValue::from_canonical_text(domain, text).ok()
        }
        _ => None,
    }
}

/// A parsed `@filter` directive.
#[derive(Debug, Clone)]
pub(crate) struct FilterDirective {
    pub(crate) op_name: String,
    pub(crate) operands: Vec<FilterOperand>,
}

impl FilterDirective {
    pub(crate) fn from_directive(directive: &ast::Directive) -> Option<Self> {
        if directive.name.as_str() != FILTER_DIRECTIVE_NAME {
            return None;
        }
        let op_name = match directive_argument(directive, OP_NAME_ARGUMENT)? {
            ast::Value::String(op_name) => op_name.clone(),
            _ => return None,
        };
        let operands = match directive_argument(directive, VALUE_ARGUMENT)? {
            ast::Value::List(values) => values
                .iter()
                .map(|value| FilterOperand::from_value(value))
                .collect(),
            _ => return None,
        };
        Some(Self { op_name, operands })
    }

    pub(crate) fn operator(&self) -> Option<FilterOperator> {
        self.op_name.parse().ok()
    }
}

pub(crate) fn directive_argument<'a>(
    directive: &'a ast::Directive,
    name: &str,
) -> Option<&'a ast::Value> {
    directive
        .arguments
        .iter()
        .find(|argument| argument.name.as_str() == name)
        .map(|argument| argument.value.as_ref())
}

/// Build `@filter(op_name: "<op>", value: ["$<parameter>"])`.
pub(crate) fn make_filter_directive(op: FilterOperator, parameter_name: &str) -> ast::Directive {
    ast::Directive {
        name: name!("filter"),
        arguments: vec![
            Node::new(ast::Argument {
                name: name!("op_name"),
                value: Node::new(ast::Value::String(op.to_string())),
            }),
            Node::new(ast::Argument {
                name: name!("value"),
                value: Node::new(ast::Value::List(vec![Node::new(ast::Value::String(
                    format!("${parameter_name}"),
                ))])),
            }),
        ],
    }
}

pub(crate) fn parse_document(query_string: &str) -> Result<ast::Document, PaginationError> {
    ast::Document::parse(query_string, "query.graphql").map_err(|with_errors| {
        PaginationError::InvalidQuery {
            message: with_errors.errors.to_string(),
        }
    })
}

/// The single root vertex field of the query.
pub(crate) fn document_root_field(
    document: &ast::Document,
) -> Result<&Node<ast::Field>, PaginationError> {
    let mut operations = document.definitions.iter().filter_map(|definition| {
        if let ast::Definition::OperationDefinition(operation) = definition {
            Some(operation)
        } else {
            None
        }
    });
    let operation = operations
        .next()
        .ok_or_else(|| PaginationError::AstShapeUnsupported {
            message: "query contains no operation definition".to_string(),
        })?;
    if operations.next().is_some() {
        return Err(PaginationError::AstShapeUnsupported {
            message: "query contains more than one operation definition".to_string(),
        });
    }
    match operation.selection_set.as_slice() {
        [ast::Selection::Field(root)] => Ok(root),
        [] => Err(PaginationError::AstShapeUnsupported {
            message: "query selects no root vertex".to_string(),
        }),
        _ => Err(PaginationError::AstShapeUnsupported {
            message: "query must select exactly one root vertex".to_string(),
        }),
    }
}

/// The selections a vertex-level operation should look at: a sole inline
/// type refinement is transparent.
pub(crate) fn vertex_scope_selections(field: &ast::Field) -> &[ast::Selection] {
    match field.selection_set.as_slice() {
        [ast::Selection::InlineFragment(refinement)] => &refinement.selection_set,
        selections => selections,
    }
}

fn field_in_scope<'a>(
    selections: &'a [ast::Selection],
    name: &Name,
) -> Option<&'a Node<ast::Field>> {
    selections.iter().find_map(|selection| match selection {
        ast::Selection::Field(field) if field.name == *name => Some(field),
        _ => None,
    })
}

/// Walk the AST along a vertex path (a sequence of selection names rooted at
/// the query root) and return the vertex field it designates.
pub(crate) fn locate_partition_vertex<'a>(
    document: &'a ast::Document,
    query_path: &[Name],
) -> Result<&'a Node<ast::Field>, PaginationError> {
    let root = document_root_field(document)?;
    let Some((root_name, rest)) = query_path.split_first() else {
        return Err(PaginationError::AstShapeUnsupported {
            message: "vertex path is empty".to_string(),
        });
    };
    if root.name != *root_name {
        return Err(PaginationError::AstShapeUnsupported {
            message: format!(
                "vertex path starts at \"{root_name}\" but the query root is \"{}\"",
                root.name
            ),
        });
    }
    let mut vertex = root;
    for step in rest {
        vertex = field_in_scope(vertex_scope_selections(vertex), step).ok_or_else(|| {
            PaginationError::AstShapeUnsupported {
                message: format!("vertex path step \"{step}\" not found under \"{}\"", vertex.name),
            }
        })?;
    }
    Ok(vertex)
}

/// The vertex type a partition-plan path designates. A sole inline type
/// refinement names the type directly; otherwise only the root position is
/// unambiguous, because the root selection names its vertex type.
pub(crate) fn partition_vertex_type(
    vertex: &ast::Field,
    query_path: &[Name],
) -> Result<Name, PaginationError> {
    if let [ast::Selection::InlineFragment(refinement)] = vertex.selection_set.as_slice()
        && let Some(condition) = &refinement.type_condition
    {
        return Ok(condition.clone());
    }
    match query_path {
        [root] => Ok(root.clone()),
        _ => Err(PaginationError::AstShapeUnsupported {
            message: format!(
                "cannot determine the vertex type of \"{}\": non-root vertices must carry \
                 an inline type refinement",
                vertex.name
            ),
        }),
    }
}

/// All `@filter` directives on selections of the named field within a
/// vertex's scope.
pub(crate) fn filters_on_field(vertex: &ast::Field, field: &Name) -> Vec<FilterDirective> {
    vertex_scope_selections(vertex)
        .iter()
        .filter_map(|selection| match selection {
            ast::Selection::Field(candidate) if candidate.name == *field => Some(candidate),
            _ => None,
        })
        .flat_map(|candidate| {
            candidate
                .directives
                .iter()
                .filter_map(|directive| FilterDirective::from_directive(directive))
        })
        .collect()
}

/// Every parameter name referenced by any directive in the document.
pub(crate) fn referenced_parameters(document: &ast::Document) -> IndexSet<String> {
    let mut names = IndexSet::new();
    for definition in &document.definitions {
        if let ast::Definition::OperationDefinition(operation) = definition {
            collect_from_selections(&operation.selection_set, &mut names);
        }
    }
    names
}

fn collect_from_selections(selections: &[ast::Selection], names: &mut IndexSet<String>) {
    for selection in selections {
        match selection {
            ast::Selection::Field(field) => {
                collect_from_directives(&field.directives, names);
                collect_from_selections(&field.selection_set, names);
            }
            ast::Selection::InlineFragment(refinement) => {
                collect_from_directives(&refinement.directives, names);
                collect_from_selections(&refinement.selection_set, names);
            }
            ast::Selection::FragmentSpread(spread) => {
                collect_from_directives(&spread.directives, names);
            }
        }
    }
}

fn collect_from_directives(directives: &ast::DirectiveList, names: &mut IndexSet<String>) {
    for directive in directives.iter() {
        if let Some(filter) = FilterDirective::from_directive(directive) {
            for operand in filter.operands {
                if let FilterOperand::Parameter(name) = operand {
                    names.insert(name);
                }
            }
        }
    }
}
