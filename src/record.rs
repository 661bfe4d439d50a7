use crate::price::Price;
use crate::transaction::Transaction;

/// Fields of an `account` directive. Beyond declaring the path, the
/// directive may carry a note, register an alias or a payee-matching
/// pattern for the account, and nominate it as the default balancing
/// account.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccountDecl {
    pub name: String,
    pub note: Option<String>,
    pub alias: Option<String>,
    pub payee: Option<String>,
    pub default_balancing: bool,
}

impl AccountDecl {
    pub fn new(name: &str) -> Self {
        AccountDecl {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// A non-transaction journal instruction. Each variant mutates exactly one
/// piece of datastore state; `Assert` is not implemented and always fails.
#[derive(Clone, Debug, PartialEq)]
pub enum Directive {
    Year(i32),
    Month(u32),
    DateFormat(String),
    Account(AccountDecl),
    Apply(String),
    Alias { name: String, account: String },
    Assert(String),
}

/// One record emitted by the parser collaborator. A closed sum type, so
/// dispatch in [`Datastore::apply`][crate::Datastore::apply] is exhaustive
/// by construction.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Transaction(Transaction),
    Price(Price),
    Directive(Directive),
}
