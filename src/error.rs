use std::result::Result as StdResult;

use thiserror::Error;

/// Error kinds surfaced by the ledger core. Balancing errors are
/// transaction-scoped; directive errors propagate straight out of
/// [`Datastore::apply`][crate::Datastore::apply].
#[derive(Error, Debug, PartialEq)]
pub enum LedgerError {
    #[error("empty transaction")]
    EmptyTransaction,
    #[error("unbalanced transaction")]
    UnbalancedTransaction,
    #[error("only one null posting allowed per transaction")]
    MultipleNullPostings,
    #[error("no price chain from `{from}' to `{to}'")]
    UnitPathNotFound { from: String, to: String },
    #[error("directive not-implemented: {0}")]
    NotImplemented(&'static str),
    #[error("alias `{0}' is not registered")]
    AliasNotFound(String),
    #[error("unrecognized placeholder in date format `{0}'")]
    InvalidDateFormat(String),
}

pub type Result<T> = StdResult<T, LedgerError>;
