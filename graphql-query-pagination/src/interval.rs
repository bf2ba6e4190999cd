//! Inclusive value intervals and their narrowing by query filters.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::PaginationError;
use crate::internal_error;
use crate::operation::FilterDirective;
use crate::operation::FilterOperator;
use crate::value_space::FieldValue;
use crate::value_space::ValueDomain;
use crate::value_space::datetime_to_micros;
use crate::value_space::micros_to_datetime;

/// A contiguous slice of one field's value space, with optional inclusive
/// bounds. An absent bound means the domain's own extreme.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ValueInterval {
    domain: ValueDomain,
    lower: Option<FieldValue>,
    upper: Option<FieldValue>,
}

impl ValueInterval {
    pub(crate) fn unbounded(domain: ValueDomain) -> Self {
        Self {
            domain,
            lower: None,
            upper: None,
        }
    }

    pub(crate) fn domain(&self) -> ValueDomain {
        self.domain
    }

    pub(crate) fn lower(&self) -> Option<&FieldValue> {
        self.lower.as_ref()
    }

    pub(crate) fn upper(&self) -> Option<&FieldValue> {
        self.upper.as_ref()
    }

    /// True when no value can satisfy both bounds.
    pub(crate) fn is_empty(&self) -> Result<bool, PaginationError> {
        match (&self.lower, &self.upper) {
            (Some(lower), Some(upper)) => upper.less_than(lower),
            _ => Ok(false),
        }
    }

    fn check_domain(&self, value: &FieldValue) -> Result<(), PaginationError> {
        if value.domain() != self.domain {
            return Err(internal_error!(
                "cannot narrow a {} interval with a {} value",
                self.domain,
                value.domain()
            ));
        }
        Ok(())
    }

    /// Raise the lower bound to `value` if that is tighter.
    pub(crate) fn narrow_lower(&mut self, value: FieldValue) -> Result<(), PaginationError> {
        self.check_domain(&value)?;
        let tighter = match &self.lower {
            Some(current) => current.less_than(&value)?,
            None => true,
        };
        if tighter {
            self.lower = Some(value);
        }
        Ok(())
    }

    /// Lower the upper bound to `value` if that is tighter.
    pub(crate) fn narrow_upper(&mut self, value: FieldValue) -> Result<(), PaginationError> {
        self.check_domain(&value)?;
        let tighter = match &self.upper {
            Some(current) => value.less_than(current)?,
            None => true,
        };
        if tighter {
            self.upper = Some(value);
        }
        Ok(())
    }

    /// Narrow by one `@filter` directive. Operators outside the comparison
    /// set, and operands that do not resolve to a value (unbound parameters,
    /// tags), leave the interval unchanged.
    pub(crate) fn apply_filter(
        &mut self,
        filter: &FilterDirective,
        parameters: &IndexMap<String, JsonValue>,
    ) -> Result<(), PaginationError> {
        let Some(operator) = filter.operator() else {
            return Ok(());
        };
        let domain = self.domain;
        let resolved = |index: usize| -> Option<FieldValue> {
            filter
                .operands
                .get(index)
                .and_then(|operand| operand.resolve(domain, parameters))
        };
        match operator {
            FilterOperator::LessThan => {
                if let Some(value) = resolved(0) {
                    self.narrow_upper(predecessor(&value)?)?;
                }
            }
            FilterOperator::LessThanOrEqual => {
                if let Some(value) = resolved(0) {
                    self.narrow_upper(value)?;
                }
            }
            FilterOperator::GreaterThan => {
                if let Some(value) = resolved(0) {
                    self.narrow_lower(successor(&value)?)?;
                }
            }
            FilterOperator::GreaterThanOrEqual => {
                if let Some(value) = resolved(0) {
                    self.narrow_lower(value)?;
                }
            }
            FilterOperator::Equal => {
                if let Some(value) = resolved(0) {
                    self.narrow_lower(value)?;
                    self.narrow_upper(value)?;
                }
            }
            FilterOperator::Between => {
                if let Some(value) = resolved(0) {
                    self.narrow_lower(value)?;
                }
                if let Some(value) = resolved(1) {
                    self.narrow_upper(value)?;
                }
            }
        }
        Ok(())
    }
}

/// Derive the effective interval of a pagination field from the filters
/// already present on it.
pub(crate) fn narrowed_interval(
    domain: ValueDomain,
    filters: &[FilterDirective],
    parameters: &IndexMap<String, JsonValue>,
) -> Result<ValueInterval, PaginationError> {
    let mut interval = ValueInterval::unbounded(domain);
    for filter in filters {
        interval.apply_filter(filter, parameters)?;
    }
    Ok(interval)
}

/// One step down in the domain's integer representation, saturating at the
/// domain minimum.
fn predecessor(value: &FieldValue) -> Result<FieldValue, PaginationError> {
    Ok(match value {
        FieldValue::Int(v) => FieldValue::Int(v.saturating_sub(1)),
        FieldValue::DateTime(v) => {
            FieldValue::DateTime(micros_to_datetime(datetime_to_micros(*v).saturating_sub(1))?)
        }
        FieldValue::Uuid(v) => FieldValue::Uuid(Uuid::from_u128(v.as_u128().saturating_sub(1))),
    })
}

/// One step up, saturating at the domain maximum.
fn successor(value: &FieldValue) -> Result<FieldValue, PaginationError> {
    Ok(match value {
        FieldValue::Int(v) => FieldValue::Int(v.saturating_add(1)),
        FieldValue::DateTime(v) => {
            FieldValue::DateTime(micros_to_datetime(datetime_to_micros(*v).saturating_add(1))?)
        }
        FieldValue::Uuid(v) => FieldValue::Uuid(Uuid::from_u128(v.as_u128().saturating_add(1))),
    })
}

/// The inclusive 128-bit integer bounds of a UUID interval.
pub(crate) fn uuid_bounds(interval: &ValueInterval) -> Result<(u128, u128), PaginationError> {
    let lower = match interval.lower() {
        Some(FieldValue::Uuid(v)) => v.as_u128(),
        None => u128::MIN,
        Some(other) => {
            return Err(internal_error!(
                "UUID interval carries a {} bound",
                other.domain()
            ));
        }
    };
    let upper = match interval.upper() {
        Some(FieldValue::Uuid(v)) => v.as_u128(),
        None => u128::MAX,
        Some(other) => {
            return Err(internal_error!(
                "UUID interval carries a {} bound",
                other.domain()
            ));
        }
    };
    Ok((lower, upper))
}
