//! Plainbook - the semantic core of a plain-text double-entry ledger
//! ---
//!
//! Plainbook turns a sequence of already-parsed journal records (account
//! directives, commodity prices, transactions) into a validated ledger: a
//! chart of accounts, a time-ordered set of balanced transactions, and a
//! historical price table for unit conversion.
//!
//! Tokenizing journal text, loading files, and rendering reports are
//! collaborator concerns; the crate consumes [`Record`] values and hands
//! finalized transactions to a [`Reporter`] capability.

/// Account hierarchy, e.g. `assets:bank:checking`.
///
/// The main structure is [`AccountStore`][account::AccountStore], an arena
/// of accounts keyed by full colon-joined path. Accounts are created
/// lazily on first reference, with every absent ancestor created and
/// linked along the way.
pub mod account;

pub mod amount;

/// The aggregate registry and the two-pass evaluation pipeline.
pub mod datastore;

pub mod error;
pub mod posting;

/// Historical unit-to-unit conversion rates, seeded with the built-in
/// binary-size and time-unit chains.
pub mod price;

pub mod record;
pub mod transaction;

pub use account::{Account, AccountStore};
pub use amount::Commodity;
pub use datastore::{Datastore, Reporter};
pub use error::LedgerError;
pub use posting::Posting;
pub use price::{Price, PriceTable};
pub use record::{AccountDecl, Directive, Record};
pub use transaction::Transaction;
