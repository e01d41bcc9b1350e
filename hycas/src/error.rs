use thiserror::Error;

/// Errors surfaced by the arena, the edit primitives, the rewrite engine and the
/// reduction pipeline.
///
/// `CapacityExceeded`, `TableFull` and `Cancelled` are recoverable: the pipeline rolls back
/// to its checkpoint and retries with a cheaper strategy. `NoMatch` is ordinary control flow.
#[derive(Debug, Error)]
pub enum CalcError {
    #[error("arena capacity exceeded: {requested} bytes requested, capacity is {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },

    #[error("handle table is full ({capacity} entries)")]
    TableFull { capacity: usize },

    #[error("handle does not reference a live tree")]
    Uninitialized,

    #[error("pattern did not match")]
    NoMatch,

    #[error("computation was interrupted")]
    Cancelled,

    #[error("malformed tree: {0}")]
    Malformed(String),

    #[error("failed to parse engine configuration: {source}")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },

    #[error("failed to serialize engine configuration: {0}")]
    ConfigSerialize(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CalcError {
    /// Whether the reduction pipeline may recover from this error by rolling back and
    /// retrying under a cheaper strategy.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CalcError::CapacityExceeded { .. } | CalcError::TableFull { .. } | CalcError::Cancelled
        )
    }
}

pub type CalcResult<T> = Result<T, CalcError>;
