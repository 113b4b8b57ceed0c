//! Post-filter predicates for search results.
//!
//! Evaluates metadata and timestamp conditions against documents after the
//! k-NN phase. Equality and containment compare strings; the ordered
//! operators parse both operands as `f64` and compare numerically, with any
//! parse failure making the predicate false. A missing metadata key never
//! matches. All filters on a query are conjoined.

use crate::document::{Document, Metadata};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};

/// Comparison operator of a metadata filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// String equality (`==`).
    Eq,
    /// String inequality (`!=`).
    Ne,
    /// Numeric less-than (`<`).
    Lt,
    /// Numeric less-or-equal (`<=`).
    Le,
    /// Numeric greater-than (`>`).
    Gt,
    /// Numeric greater-or-equal (`>=`).
    Ge,
    /// Substring containment (`contains`).
    Contains,
}

impl FilterOperator {
    /// Parses the textual operator form. Unknown operators are reported as
    /// [`Error::InvalidFilter`].
    pub fn parse(op: &str) -> Result<Self> {
        match op {
            "==" => Ok(FilterOperator::Eq),
            "!=" => Ok(FilterOperator::Ne),
            "<" => Ok(FilterOperator::Lt),
            "<=" => Ok(FilterOperator::Le),
            ">" => Ok(FilterOperator::Gt),
            ">=" => Ok(FilterOperator::Ge),
            "contains" => Ok(FilterOperator::Contains),
            other => Err(Error::InvalidFilter(format!("unknown operator '{other}'"))),
        }
    }
}

/// A single `(key, op, value)` condition over document metadata.
#[derive(Debug, Clone)]
pub struct MetadataFilter {
    pub key: String,
    pub op: FilterOperator,
    pub value: String,
}

impl MetadataFilter {
    pub fn new(key: impl Into<String>, op: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            op,
            value: value.into(),
        }
    }

    /// Builds a filter from a textual operator, failing on unknown ones.
    pub fn parse(
        key: impl Into<String>,
        op: &str,
        value: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::new(key.into(), FilterOperator::parse(op)?, value))
    }

    /// Evaluates the condition against a metadata map.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        let actual = match metadata.get(&self.key) {
            Some(v) => v,
            None => return false,
        };
        match self.op {
            FilterOperator::Eq => actual == &self.value,
            FilterOperator::Ne => actual != &self.value,
            FilterOperator::Contains => actual.contains(&self.value),
            FilterOperator::Lt | FilterOperator::Le | FilterOperator::Gt | FilterOperator::Ge => {
                let (lhs, rhs) = match (actual.parse::<f64>(), self.value.parse::<f64>()) {
                    (Ok(l), Ok(r)) => (l, r),
                    _ => return false,
                };
                match self.op {
                    FilterOperator::Lt => lhs < rhs,
                    FilterOperator::Le => lhs <= rhs,
                    FilterOperator::Gt => lhs > rhs,
                    FilterOperator::Ge => lhs >= rhs,
                    _ => unreachable!(),
                }
            }
        }
    }
}

/// Inclusive `[start, end]` timestamp range.
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Post-filter set applied to search results; all conditions are conjoined.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub metadata: Vec<MetadataFilter>,
    pub created: Option<DateRange>,
    pub modified: Option<DateRange>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty() && self.created.is_none() && self.modified.is_none()
    }

    /// Whether a document passes every configured condition.
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(range) = &self.created {
            if !range.contains(doc.created_at) {
                return false;
            }
        }
        if let Some(range) = &self.modified {
            if !range.contains(doc.modified_at) {
                return false;
            }
        }
        self.metadata.iter().all(|f| f.matches(&doc.metadata))
    }
}
