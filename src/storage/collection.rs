use super::{Filter, FindOptions, IndexSpec};
use crate::core::{Record, Result, TopoError, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    name: String,
    #[serde(default)]
    docs: Vec<Record>,
    #[serde(default)]
    indexes: Vec<IndexSpec>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn docs(&self) -> &[Record] {
        &self.docs
    }

    pub fn indexes(&self) -> &[IndexSpec] {
        &self.indexes
    }

    pub fn insert(&mut self, doc: Record) -> Result<()> {
        self.check_uniqueness(&doc, None)?;
        self.docs.push(doc);
        Ok(())
    }

    pub fn find(&self, filter: &Filter, opts: &FindOptions) -> Vec<Record> {
        let mut matched: Vec<&Record> = self.docs.iter().filter(|d| filter.matches(d)).collect();
        if opts.sort.is_some() {
            // stable, so ties keep insertion order
            matched.sort_by(|a, b| opts.compare(a, b));
        }
        let limit = opts.limit.unwrap_or(usize::MAX);
        matched
            .into_iter()
            .skip(opts.start)
            .take(limit)
            .map(|d| opts.project(d))
            .collect()
    }

    pub fn count(&self, filter: &Filter) -> u64 {
        self.docs.iter().filter(|d| filter.matches(d)).count() as u64
    }

    pub fn create_index(&mut self, index: &IndexSpec) -> Result<()> {
        if self.indexes.iter().any(|existing| existing.conflicts_with(index)) {
            return Err(TopoError::DuplicateIndex {
                collection: self.name.clone(),
                index: index.name.clone(),
            });
        }
        if index.unique {
            let mut seen: Vec<Vec<Value>> = Vec::with_capacity(self.docs.len());
            for doc in &self.docs {
                let key = index_key(index, doc);
                if seen.contains(&key) {
                    return Err(TopoError::Validation(format!(
                        "cannot build unique index '{}' on '{}': duplicate key",
                        index.name, self.name
                    )));
                }
                seen.push(key);
            }
        }
        self.indexes.push(index.clone());
        Ok(())
    }

    pub fn drop_fields(&mut self, filter: &Filter, fields: &[String]) -> u64 {
        let mut touched = 0;
        for doc in self.docs.iter_mut().filter(|d| filter.matches(d)) {
            let mut changed = false;
            for field in fields {
                changed |= doc.remove(field).is_some();
            }
            if changed {
                touched += 1;
            }
        }
        touched
    }

    pub fn update(&mut self, filter: &Filter, changes: &Record) -> Result<u64> {
        let targets: Vec<usize> = self
            .docs
            .iter()
            .enumerate()
            .filter(|(_, d)| filter.matches(d))
            .map(|(idx, _)| idx)
            .collect();

        for &idx in &targets {
            let mut updated = self.docs[idx].clone();
            for (field, value) in changes {
                updated.insert(field.clone(), value.clone());
            }
            self.check_uniqueness(&updated, Some(idx))?;
            self.docs[idx] = updated;
        }
        Ok(targets.len() as u64)
    }

    fn check_uniqueness(&self, doc: &Record, skip: Option<usize>) -> Result<()> {
        for index in self.indexes.iter().filter(|i| i.unique) {
            let key = index_key(index, doc);
            let clash = self
                .docs
                .iter()
                .enumerate()
                .any(|(idx, existing)| Some(idx) != skip && index_key(index, existing) == key);
            if clash {
                return Err(TopoError::Validation(format!(
                    "duplicate key for unique index '{}' on '{}'",
                    index.name, self.name
                )));
            }
        }
        Ok(())
    }
}

fn index_key(index: &IndexSpec, doc: &Record) -> Vec<Value> {
    index
        .keys
        .iter()
        .map(|(field, _)| doc.get(field).cloned().unwrap_or(Value::Null))
        .collect()
}
