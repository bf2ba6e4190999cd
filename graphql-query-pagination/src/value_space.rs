//! Typed value spaces for pagination fields.
//!
//! Every pagination field value lives in exactly one ordered, interpolable
//! domain: 64-bit integers, datetimes with microsecond precision, or
//! UUID-v4s ordered over the full 128-bit space. All interpolation is exact
//! integer arithmetic; no floating point is involved anywhere thresholds are
//! computed.

use std::cmp::Ordering;

use serde_json::Value as JsonValue;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use uuid::Uuid;

use crate::bail;
use crate::error::PaginationError;
use crate::internal_error;

/// Canonical datetime form: ISO-8601 with microsecond precision.
static DATETIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]");

/// Lenient input form: fractional seconds may be omitted.
static DATETIME_FORMAT_WHOLE_SECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// The ordered domains a pagination field's values can inhabit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum ValueDomain {
    #[strum(to_string = "Int")]
    Int,
    #[strum(to_string = "Datetime")]
    DateTime,
    #[strum(to_string = "UUID")]
    Uuid,
}

/// A single value of a pagination field, tagged with its domain.
///
/// Values of different domains are incomparable; mixing them is a
/// programming error surfaced as `InternalInvariantViolated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldValue {
    Int(i64),
    DateTime(PrimitiveDateTime),
    Uuid(Uuid),
}

impl FieldValue {
    pub fn domain(&self) -> ValueDomain {
        match self {
            Self::Int(_) => ValueDomain::Int,
            Self::DateTime(_) => ValueDomain::DateTime,
            Self::Uuid(_) => ValueDomain::Uuid,
        }
    }

    /// Compare two values of the same domain.
    pub fn try_cmp(&self, other: &Self) -> Result<Ordering, PaginationError> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Ok(a.cmp(b)),
            (Self::DateTime(a), Self::DateTime(b)) => Ok(a.cmp(b)),
            (Self::Uuid(a), Self::Uuid(b)) => Ok(a.as_u128().cmp(&b.as_u128())),
            (a, b) => Err(internal_error!(
                "cannot compare values across domains: {} vs {}",
                a.domain(),
                b.domain()
            )),
        }
    }

    pub fn less_than(&self, other: &Self) -> Result<bool, PaginationError> {
        Ok(self.try_cmp(other)? == Ordering::Less)
    }

    /// Render the canonical textual form: decimal for integers, ISO-8601
    /// with microseconds for datetimes, lowercase dashed hex for UUIDs.
    pub fn to_canonical_text(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::DateTime(value) => value
                .format(DATETIME_FORMAT)
                .unwrap_or_else(|_| value.to_string()),
            Self::Uuid(value) => value.hyphenated().to_string(),
        }
    }

    /// Parse the canonical textual form of a value in the given domain.
    pub fn from_canonical_text(domain: ValueDomain, text: &str) -> Result<Self, PaginationError> {
        match domain {
            ValueDomain::Int => text
                .parse::<i64>()
                .map(Self::Int)
                .map_err(|_| internal_error!("not a valid Int value: {text:?}")),
            ValueDomain::DateTime => parse_datetime(text).map(Self::DateTime),
            ValueDomain::Uuid => Uuid::parse_str(text)
                .map(Self::Uuid)
                .map_err(|_| internal_error!("not a valid UUID value: {text:?}")),
        }
    }

    /// Coerce a parameter binding into this domain.
    pub(crate) fn from_json(domain: ValueDomain, value: &JsonValue) -> Result<Self, PaginationError> {
        match (domain, value) {
            (ValueDomain::Int, JsonValue::Number(number)) => number
                .as_i64()
                .map(Self::Int)
                .ok_or_else(|| internal_error!("Int parameter out of range: {number}")),
            (ValueDomain::DateTime, JsonValue::String(text)) => {
                parse_datetime(text).map(Self::DateTime)
            }
            (ValueDomain::Uuid, JsonValue::String(text)) => Uuid::parse_str(text)
                .map(Self::Uuid)
                .map_err(|_| internal_error!("not a valid UUID parameter: {text:?}")),
            (domain, value) => Err(internal_error!(
                "parameter {value} is not a valid {domain} value"
            )),
        }
    }

    /// The JSON form used in parameter maps: integers stay numeric, other
    /// domains bind their canonical text.
    pub(crate) fn to_json(&self) -> JsonValue {
        match self {
            Self::Int(value) => JsonValue::from(*value),
            Self::DateTime(_) | Self::Uuid(_) => JsonValue::String(self.to_canonical_text()),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_canonical_text())
    }
}

fn parse_datetime(text: &str) -> Result<PrimitiveDateTime, PaginationError> {
    PrimitiveDateTime::parse(text, DATETIME_FORMAT)
        .or_else(|_| PrimitiveDateTime::parse(text, DATETIME_FORMAT_WHOLE_SECONDS))
        .map_err(|_| internal_error!("not a valid Datetime value: {text:?}"))
}

pub(crate) fn datetime_to_micros(value: PrimitiveDateTime) -> i64 {
    (value.assume_utc().unix_timestamp_nanos() / 1_000) as i64
}

pub(crate) fn micros_to_datetime(micros: i64) -> Result<PrimitiveDateTime, PaginationError> {
    let instant = OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .map_err(|_| internal_error!("datetime value out of range: {micros} microseconds"))?;
    Ok(PrimitiveDateTime::new(instant.date(), instant.time()))
}

/// Linear interpolation for the sampled domains: `a + round((b − a) · t)`
/// with `t = numerator / denominator`, carried out in integer arithmetic.
pub fn interpolate(
    lo: &FieldValue,
    hi: &FieldValue,
    numerator: u64,
    denominator: u64,
) -> Result<FieldValue, PaginationError> {
    if denominator == 0 || numerator > denominator {
        bail!("interpolation fraction {numerator}/{denominator} is not within [0, 1]");
    }
    match (lo, hi) {
        (FieldValue::Int(a), FieldValue::Int(b)) => {
            Ok(FieldValue::Int(lerp_i64(*a, *b, numerator, denominator)?))
        }
        (FieldValue::DateTime(a), FieldValue::DateTime(b)) => {
            let micros = lerp_i64(
                datetime_to_micros(*a),
                datetime_to_micros(*b),
                numerator,
                denominator,
            )?;
            Ok(FieldValue::DateTime(micros_to_datetime(micros)?))
        }
        (FieldValue::Uuid(a), FieldValue::Uuid(b)) => {
            let (a, b) = (a.as_u128(), b.as_u128());
            if a > b {
                bail!("interpolation bounds are reversed");
            }
            let offset = mul_div_floor(b - a, u128::from(numerator), u128::from(denominator));
            Ok(FieldValue::Uuid(Uuid::from_u128(a + offset)))
        }
        (lo, hi) => Err(internal_error!(
            "cannot interpolate across domains: {} vs {}",
            lo.domain(),
            hi.domain()
        )),
    }
}

fn lerp_i64(a: i64, b: i64, numerator: u64, denominator: u64) -> Result<i64, PaginationError> {
    if a > b {
        bail!("interpolation bounds are reversed");
    }
    let span = i128::from(b) - i128::from(a);
    let half = i128::from(denominator) / 2;
    let offset = (span * i128::from(numerator) + half) / i128::from(denominator);
    i64::try_from(i128::from(a) + offset)
        .map_err(|_| internal_error!("interpolated value out of range"))
}

/// `⌊(span_inclusive + 1) · numerator / denominator⌋` over the 128-bit UUID
/// space, without overflowing even when the span covers the entire space.
///
/// The split point of an inclusive interval `[lo, hi]` at fraction `i/N` is
/// `lo + uuid_span_fraction(hi - lo, i, N)`.
pub(crate) fn uuid_span_fraction(span_inclusive: u128, numerator: u64, denominator: u64) -> u128 {
    let numerator = u128::from(numerator);
    let denominator = u128::from(denominator);
    // span_inclusive + 1 may be 2^128; decompose before multiplying.
    let quotient = span_inclusive / denominator;
    let remainder = span_inclusive % denominator;
    quotient * numerator + (remainder + 1) * numerator / denominator
}

fn mul_div_floor(value: u128, numerator: u128, denominator: u128) -> u128 {
    let quotient = value / denominator;
    let remainder = value % denominator;
    quotient * numerator + remainder * numerator / denominator
}
