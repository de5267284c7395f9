//! Structured query compiler that converts condition trees into
//! Elasticsearch-style boolean/term/range queries.
//!
//! The output is a [`QueryFragment`] tree that can be serialized straight into
//! the search backend's JSON query syntax. Pagination, sorting and field
//! projections are request-building concerns and are handled elsewhere.

use crate::ast::{Combinator, CompOp, Comparison};
use crate::parser;
use crate::schema::Schema;
use crate::value::{self, QueryValue};
use crate::visitor::{self, QueryEmitter, TranslateError};
use serde_json::Value as JsonValue;

/// The marker character that turns an (in)equality into a wildcard match.
const WILDCARD_CHARACTER: char = '*';

/// One node of translated structured query output.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFragment {
    /// An exact match on a single property.
    Term { property: String, value: QueryValue },
    /// A wildcard match; the pattern contains at least one `*`.
    Wildcard { property: String, pattern: String },
    /// A range with at most one bound per side. Both bounds are only ever set
    /// as the accumulated result of folding, never from a fresh leaf.
    Range {
        property: String,
        lower: Option<QueryValue>,
        lower_inclusive: bool,
        upper: Option<QueryValue>,
        upper_inclusive: bool,
    },
    /// Negation of the inner fragment.
    Negate(Box<QueryFragment>),
    /// A boolean combinator: AND parts land in `must`, OR parts in `should`.
    Bool {
        must: Vec<QueryFragment>,
        should: Vec<QueryFragment>,
    },
}

impl QueryFragment {
    fn range_with_lower(property: String, bound: QueryValue, inclusive: bool) -> Self {
        QueryFragment::Range {
            property,
            lower: Some(bound),
            lower_inclusive: inclusive,
            upper: None,
            upper_inclusive: false,
        }
    }

    fn range_with_upper(property: String, bound: QueryValue, inclusive: bool) -> Self {
        QueryFragment::Range {
            property,
            lower: None,
            lower_inclusive: false,
            upper: Some(bound),
            upper_inclusive: inclusive,
        }
    }

    /// Serializes the fragment into the backend's native JSON query syntax.
    pub fn to_json(&self) -> JsonValue {
        match self {
            QueryFragment::Term { property, value } => {
                single_entry("term", single_entry(property, value.to_json()))
            }
            QueryFragment::Wildcard { property, pattern } => {
                single_entry("wildcard", single_entry(property, JsonValue::from(pattern.clone())))
            }
            QueryFragment::Range {
                property,
                lower,
                lower_inclusive,
                upper,
                upper_inclusive,
            } => {
                let mut bounds = serde_json::Map::new();
                if let Some(bound) = lower {
                    let key = if *lower_inclusive { "gte" } else { "gt" };
                    bounds.insert(key.to_string(), bound.to_json());
                }
                if let Some(bound) = upper {
                    let key = if *upper_inclusive { "lte" } else { "lt" };
                    bounds.insert(key.to_string(), bound.to_json());
                }
                single_entry("range", single_entry(property, JsonValue::Object(bounds)))
            }
            QueryFragment::Negate(inner) => single_entry(
                "bool",
                single_entry("must_not", JsonValue::Array(vec![inner.to_json()])),
            ),
            QueryFragment::Bool { must, should } => {
                let mut body = serde_json::Map::new();
                if !must.is_empty() {
                    body.insert(
                        "must".to_string(),
                        JsonValue::Array(must.iter().map(QueryFragment::to_json).collect()),
                    );
                }
                if !should.is_empty() {
                    body.insert(
                        "should".to_string(),
                        JsonValue::Array(should.iter().map(QueryFragment::to_json).collect()),
                    );
                }
                single_entry("bool", JsonValue::Object(body))
            }
        }
    }
}

fn single_entry(key: &str, value: JsonValue) -> JsonValue {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), value);
    JsonValue::Object(map)
}

/// Decides whether two adjacent query parts can be merged into a single part.
/// This is possible IFF the combinator is AND, both parts are ranges, and both
/// ranges refer to the same property. Parts separated by a parenthesized
/// sub-expression never meet here: the nested scope has already been folded
/// into one opaque `Bool` by the time its parent frame is assembled.
pub fn can_fold(previous: &QueryFragment, current: &QueryFragment, combinator: Combinator) -> bool {
    if combinator != Combinator::And {
        return false;
    }
    match (previous, current) {
        (
            QueryFragment::Range { property: prev, .. },
            QueryFragment::Range { property: curr, .. },
        ) => prev == curr,
        _ => false,
    }
}

/// Merges `current` into `previous`, assuming [`can_fold`] held. A fresh range
/// leaf carries exactly one bound: a lower bound came from GT/GTE, an upper
/// bound from LT/LTE. Repeated bounds on the same side overwrite - last value
/// wins.
pub fn fold(previous: &mut QueryFragment, current: QueryFragment) {
    let QueryFragment::Range {
        lower,
        lower_inclusive,
        upper,
        upper_inclusive,
        ..
    } = previous
    else {
        return;
    };
    let QueryFragment::Range {
        lower: current_lower,
        lower_inclusive: current_lower_inclusive,
        upper: current_upper,
        upper_inclusive: current_upper_inclusive,
        ..
    } = current
    else {
        return;
    };

    if current_upper.is_none() {
        *lower = current_lower;
        *lower_inclusive = current_lower_inclusive;
    } else {
        *upper = current_upper;
        *upper_inclusive = current_upper_inclusive;
    }
}

/// The structured query emitter. Stateless: all traversal state lives in the
/// frame stack owned by [`visitor::translate`].
pub struct EsQueryEmitter;

impl QueryEmitter for EsQueryEmitter {
    type Fragment = QueryFragment;

    fn build_leaf(&self, leaf: &Comparison) -> Result<Option<QueryFragment>, TranslateError> {
        // count() style cardinality checks have no structured equivalent and
        // must surface to the caller rather than silently vanish.
        if let Some(check) = &leaf.collection_check {
            return Err(TranslateError::UnsupportedOperation {
                property: leaf.property.clone(),
                operator: leaf.op.clone(),
                check: check.clone(),
            });
        }

        let value = value::enum_safe(&leaf.value);
        // Wildcard matching stringifies the value - prefix matching on numbers
        // makes no sense anyway.
        let value_text = value.as_text();
        let is_wildcard = value_text.contains(WILDCARD_CHARACTER);
        let property = leaf.property.clone();

        let fragment = match leaf.op {
            // Wildcards only apply to (in)equality; the range operators have no
            // sensible wildcard semantics.
            CompOp::Eq => {
                if is_wildcard {
                    QueryFragment::Wildcard {
                        property,
                        pattern: value_text,
                    }
                } else {
                    QueryFragment::Term { property, value }
                }
            }
            CompOp::NotEq => {
                let inner = if is_wildcard {
                    QueryFragment::Wildcard {
                        property,
                        pattern: value_text,
                    }
                } else {
                    QueryFragment::Term { property, value }
                };
                QueryFragment::Negate(Box::new(inner))
            }
            CompOp::Lt => QueryFragment::range_with_upper(property, value, false),
            CompOp::Lte => QueryFragment::range_with_upper(property, value, true),
            CompOp::Gt => QueryFragment::range_with_lower(property, value, false),
            CompOp::Gte => QueryFragment::range_with_lower(property, value, true),
            // Unknown custom operators contribute nothing.
            CompOp::Custom(_) => return Ok(None),
        };
        Ok(Some(fragment))
    }

    fn build_composite(
        &self,
        combinator: Combinator,
        parts: Vec<QueryFragment>,
        _open_frames: usize,
    ) -> QueryFragment {
        let mut must = Vec::new();
        let mut should = Vec::new();

        for part in parts {
            let list = match combinator {
                Combinator::And => &mut must,
                Combinator::Or => &mut should,
            };
            // Try to fold this part into the previous one IFF possible.
            match list.last_mut() {
                Some(previous) if can_fold(previous, &part, combinator) => fold(previous, part),
                _ => list.push(part),
            }
        }

        QueryFragment::Bool { must, should }
    }
}

/// Compiles FIQL filter strings into structured search queries, using a schema
/// to type the comparison values. Holds no per-call state, so one compiler can
/// be shared across calls and threads.
pub struct EsQueryCompiler {
    schema: Schema,
}

impl EsQueryCompiler {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Compiles a filter into a query fragment. `None` means the filter
    /// contributed no query at all (every leaf was declined).
    pub fn compile(&self, filter: &str) -> anyhow::Result<Option<QueryFragment>> {
        let tree = parser::parse_filter(filter, &self.schema)?;
        let fragment = visitor::translate(&tree, &EsQueryEmitter)?;
        Ok(fragment)
    }

    /// Compiles a filter straight to backend JSON.
    pub fn compile_to_json(&self, filter: &str) -> anyhow::Result<Option<JsonValue>> {
        Ok(self.compile(filter)?.map(|fragment| fragment.to_json()))
    }
}
