use crate::core::{Record, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Predicate over a stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    All,
    Eq { field: String, value: Value },
    In { field: String, values: Vec<Value> },
    Exists { field: String, exists: bool },
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// `field ∈ ids`.
    pub fn in_ids(field: impl Into<String>, ids: &[i64]) -> Self {
        Self::In {
            field: field.into(),
            values: ids.iter().copied().map(Value::Integer).collect(),
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists {
            field: field.into(),
            exists: true,
        }
    }

    /// Conjunction that drops `All` terms and collapses trivial cases.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut terms: Vec<Filter> = filters
            .into_iter()
            .filter(|f| !matches!(f, Filter::All))
            .collect();
        match terms.len() {
            0 => Filter::All,
            1 => terms.remove(0),
            _ => Filter::And(terms),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::Eq { field, value } => record.get(field).is_some_and(|v| v == value),
            Self::In { field, values } => record
                .get(field)
                .is_some_and(|v| values.iter().any(|candidate| candidate == v)),
            Self::Exists { field, exists } => record.contains_key(field) == *exists,
            Self::And(terms) => terms.iter().all(|t| t.matches(record)),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::All
    }
}

/// Projection, paging and sort for a `find`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Fields to return; empty means the whole document.
    pub fields: Vec<String>,
    pub start: usize,
    pub limit: Option<usize>,
    /// Sort field, `-` prefix for descending.
    pub sort: Option<String>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn project(&self, record: &Record) -> Record {
        if self.fields.is_empty() {
            return record.clone();
        }
        self.fields
            .iter()
            .filter_map(|f| record.get(f).map(|v| (f.clone(), v.clone())))
            .collect()
    }

    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let Some(sort) = self.sort.as_deref() else {
            return Ordering::Equal;
        };
        let (field, descending) = match sort.strip_prefix('-') {
            Some(field) => (field, true),
            None => (sort, false),
        };
        let null = Value::Null;
        let ord = a
            .get(field)
            .unwrap_or(&null)
            .sort_cmp(b.get(field).unwrap_or(&null));
        if descending { ord.reverse() } else { ord }
    }
}

/// Index definition: ordered keys with direction (1 or -1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub keys: Vec<(String, i32)>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub background: bool,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
            unique: false,
            background: false,
        }
    }

    pub fn key(mut self, field: impl Into<String>, direction: i32) -> Self {
        self.keys.push((field.into(), direction));
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    /// Same name, or the same key spec under any name.
    pub fn conflicts_with(&self, other: &IndexSpec) -> bool {
        self.name == other.name || self.keys == other.keys
    }
}
