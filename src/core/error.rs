use std::fmt;
use thiserror::Error;

/// Where a batched aggregation or migration was when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    HostPage,
    Relations,
    SetNames,
    ModuleNames,
    SetScan,
    MigrationPage,
    MigrationMutate,
    Migration(String),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostPage => write!(f, "host page"),
            Self::Relations => write!(f, "host module relations"),
            Self::SetNames => write!(f, "set names"),
            Self::ModuleNames => write!(f, "module names"),
            Self::SetScan => write!(f, "set scan"),
            Self::MigrationPage => write!(f, "migration page"),
            Self::MigrationMutate => write!(f, "migration mutate"),
            Self::Migration(version) => write!(f, "migration {}", version),
        }
    }
}

#[derive(Error, Debug)]
pub enum TopoError {
    #[error("Invalid parameter: {0}")]
    Validation(String),

    #[error("Field '{field}' cannot be coerced to {expected}: {found}")]
    TypeCoercion {
        field: String,
        expected: &'static str,
        found: String,
    },

    #[error("Lookup in '{collection}' failed: {reason}")]
    Lookup { collection: String, reason: String },

    #[error("Index '{index}' already exists on '{collection}'")]
    DuplicateIndex { collection: String, index: String },

    #[error("Aggregation failed at {stage}: {source}")]
    Aggregation {
        stage: Stage,
        #[source]
        source: Box<TopoError>,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, TopoError>;

impl TopoError {
    pub fn lookup(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Lookup {
            collection: collection.into(),
            reason: reason.into(),
        }
    }

    pub fn at(self, stage: Stage) -> Self {
        Self::Aggregation {
            stage,
            source: Box::new(self),
        }
    }

    /// True when the store reported an index with the same name or key spec.
    pub fn is_duplicate_index(&self) -> bool {
        matches!(self, Self::DuplicateIndex { .. })
    }

    /// Unwraps aggregation layers down to the originating error.
    pub fn root_cause(&self) -> &TopoError {
        match self {
            Self::Aggregation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for TopoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for TopoError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_nested_stages() {
        let err = TopoError::lookup("cc_SetBase", "connection reset")
            .at(Stage::SetNames)
            .at(Stage::Migration("x1".into()));

        assert!(matches!(err.root_cause(), TopoError::Lookup { .. }));
        assert_eq!(
            err.to_string(),
            "Aggregation failed at migration x1: Aggregation failed at set names: Lookup in 'cc_SetBase' failed: connection reset"
        );
    }

    #[test]
    fn test_duplicate_index_classification() {
        let dup = TopoError::DuplicateIndex {
            collection: "cc_HostBase".into(),
            index: "bk_cloud_id_1".into(),
        };
        assert!(dup.is_duplicate_index());
        assert!(!TopoError::Cancelled.is_duplicate_index());
    }
}
