use thiserror::Error;

/// Failure to reconstruct a [`crate::Message`] from a persisted line.
///
/// History loaders skip the offending line rather than aborting the load.
#[derive(Error, Debug)]
pub enum MessageParseError {
    #[error("expected 4 fields, found {0}")]
    FieldCount(usize),

    #[error("empty sender field")]
    MissingSender,

    #[error("unparseable timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("invalid read flag: {0:?}")]
    ReadFlag(String),
}
