//! Metadata filter grammar: a conjunction of `key op value` predicates.
//!
//! Grammar fixed per the open question in the design notes: `op ∈ {==, !=,
//! <, <=, >, >=, in}`. A predicate referencing a missing key evaluates to
//! `false`, never an error.

use std::collections::HashMap;
use std::fmt;

/// A scalar metadata value. Chunk and document metadata maps are
/// `String -> MetadataValue`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Number(n) => write!(f, "{n}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

pub type Metadata = HashMap<String, MetadataValue>;

/// A single comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
}

/// One `key op value` term. `In` carries a list of acceptable values instead
/// of a single one.
#[derive(Debug, Clone)]
pub enum FilterPredicate {
    Cmp {
        key: String,
        op: FilterOp,
        value: MetadataValue,
    },
    In {
        key: String,
        values: Vec<MetadataValue>,
    },
}

/// A conjunction (logical AND) of predicates. The empty filter matches
/// everything.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    predicates: Vec<FilterPredicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, predicate: FilterPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Evaluate the filter against a metadata map. Missing keys make the
    /// owning predicate evaluate false.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.predicates.iter().all(|p| p.matches(metadata))
    }
}

impl FilterPredicate {
    pub fn eq(key: impl Into<String>, value: MetadataValue) -> Self {
        FilterPredicate::Cmp {
            key: key.into(),
            op: FilterOp::Eq,
            value,
        }
    }

    pub fn ne(key: impl Into<String>, value: MetadataValue) -> Self {
        FilterPredicate::Cmp {
            key: key.into(),
            op: FilterOp::Ne,
            value,
        }
    }

    pub fn lt(key: impl Into<String>, value: MetadataValue) -> Self {
        FilterPredicate::Cmp {
            key: key.into(),
            op: FilterOp::Lt,
            value,
        }
    }

    pub fn le(key: impl Into<String>, value: MetadataValue) -> Self {
        FilterPredicate::Cmp {
            key: key.into(),
            op: FilterOp::Le,
            value,
        }
    }

    pub fn gt(key: impl Into<String>, value: MetadataValue) -> Self {
        FilterPredicate::Cmp {
            key: key.into(),
            op: FilterOp::Gt,
            value,
        }
    }

    pub fn ge(key: impl Into<String>, value: MetadataValue) -> Self {
        FilterPredicate::Cmp {
            key: key.into(),
            op: FilterOp::Ge,
            value,
        }
    }

    pub fn in_set(key: impl Into<String>, values: Vec<MetadataValue>) -> Self {
        FilterPredicate::In {
            key: key.into(),
            values,
        }
    }

    fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            FilterPredicate::Cmp { key, op, value } => match metadata.get(key) {
                Some(actual) => compare(actual, *op, value),
                None => false,
            },
            FilterPredicate::In { key, values } => match metadata.get(key) {
                Some(actual) => values.iter().any(|v| values_eq(actual, v)),
                None => false,
            },
        }
    }
}

fn values_eq(a: &MetadataValue, b: &MetadataValue) -> bool {
    match (a, b) {
        (MetadataValue::String(x), MetadataValue::String(y)) => x == y,
        (MetadataValue::Number(x), MetadataValue::Number(y)) => x == y,
        (MetadataValue::Bool(x), MetadataValue::Bool(y)) => x == y,
        _ => false,
    }
}

/// Ordering comparisons only apply between two numbers; any other
/// combination (including op Eq/Ne on mismatched types) falls back to
/// equality/inequality by type-aware comparison, and is `false` for
/// `<`/`<=`/`>`/`>=` on non-numeric types.
fn compare(actual: &MetadataValue, op: FilterOp, value: &MetadataValue) -> bool {
    match op {
        FilterOp::Eq => values_eq(actual, value),
        FilterOp::Ne => !values_eq(actual, value),
        FilterOp::Lt | FilterOp::Le | FilterOp::Gt | FilterOp::Ge => {
            match (actual, value) {
                (MetadataValue::Number(a), MetadataValue::Number(b)) => match op {
                    FilterOp::Lt => a < b,
                    FilterOp::Le => a <= b,
                    FilterOp::Gt => a > b,
                    FilterOp::Ge => a >= b,
                    _ => unreachable!(),
                },
                (MetadataValue::String(a), MetadataValue::String(b)) => match op {
                    FilterOp::Lt => a < b,
                    FilterOp::Le => a <= b,
                    FilterOp::Gt => a > b,
                    FilterOp::Ge => a >= b,
                    _ => unreachable!(),
                },
                _ => false,
            }
        }
        FilterOp::In => unreachable!("In is handled by FilterPredicate::In"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, MetadataValue)]) -> Metadata {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let f = Filter::new();
        assert!(f.matches(&meta(&[])));
    }

    #[test]
    fn missing_key_is_false() {
        let f = Filter::new().and(FilterPredicate::eq("lang", MetadataValue::String("en".into())));
        assert!(!f.matches(&meta(&[])));
    }

    #[test]
    fn equality_predicate() {
        let f = Filter::new().and(FilterPredicate::eq("lang", MetadataValue::String("en".into())));
        assert!(f.matches(&meta(&[("lang", MetadataValue::String("en".into()))])));
        assert!(!f.matches(&meta(&[("lang", MetadataValue::String("fr".into()))])));
    }

    #[test]
    fn numeric_range_predicate() {
        let f = Filter::new().and(FilterPredicate::ge("year", MetadataValue::Number(2020.0)));
        assert!(f.matches(&meta(&[("year", MetadataValue::Number(2021.0))])));
        assert!(!f.matches(&meta(&[("year", MetadataValue::Number(2019.0))])));
    }

    #[test]
    fn in_predicate() {
        let f = Filter::new().and(FilterPredicate::in_set(
            "lang",
            vec![
                MetadataValue::String("en".into()),
                MetadataValue::String("fr".into()),
            ],
        ));
        assert!(f.matches(&meta(&[("lang", MetadataValue::String("fr".into()))])));
        assert!(!f.matches(&meta(&[("lang", MetadataValue::String("de".into()))])));
    }

    #[test]
    fn conjunction_requires_all_predicates() {
        let f = Filter::new()
            .and(FilterPredicate::eq("lang", MetadataValue::String("en".into())))
            .and(FilterPredicate::ge("year", MetadataValue::Number(2020.0)));
        assert!(f.matches(&meta(&[
            ("lang", MetadataValue::String("en".into())),
            ("year", MetadataValue::Number(2021.0))
        ])));
        assert!(!f.matches(&meta(&[
            ("lang", MetadataValue::String("en".into())),
            ("year", MetadataValue::Number(2019.0))
        ])));
    }
}
