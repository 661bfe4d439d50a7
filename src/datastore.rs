use std::collections::BTreeMap;

use chrono::NaiveDate;
use indexmap::IndexMap;
use tracing::debug;

use crate::account::AccountStore;
use crate::error::{LedgerError, Result};
use crate::price::PriceTable;
use crate::record::{AccountDecl, Directive, Record};
use crate::transaction::Transaction;

// matches the dblentry default; placeholders are year/month/day and
// hour/minute/second, nothing strftime beyond that
const DEFAULT_DATEFORMAT: &str = "%Y/%m/%d %h:%n:%s";

/// Consumer of finalized transactions during the second pass. A
/// capability: any `FnMut(&Datastore, &Transaction)` qualifies, and its
/// failures propagate out of the pipeline unchanged.
pub trait Reporter {
    fn transaction(&mut self, db: &Datastore, txn: &Transaction) -> anyhow::Result<()>;
}

impl<F> Reporter for F
where
    F: FnMut(&Datastore, &Transaction) -> anyhow::Result<()>,
{
    fn transaction(&mut self, db: &Datastore, txn: &Transaction) -> anyhow::Result<()> {
        self(db, txn)
    }
}

/// The aggregate registry for one ledger run: the account tree, alias and
/// payee maps, directive state, and the two date-ordered indices
/// (transactions and prices). Mutated only by [`apply`][Datastore::apply]
/// calls and the first pass; read-only afterwards.
#[derive(Debug)]
pub struct Datastore {
    name: String,
    accounts: AccountStore,
    transactions: BTreeMap<NaiveDate, Vec<Transaction>>,
    prices: PriceTable,
    aliases: IndexMap<String, String>,
    payees: IndexMap<String, String>,
    // directive state
    year: Option<i32>,
    month: Option<u32>,
    dateformat: String,
    rootaccount: String,
    balancing_account: Option<String>,
}

impl Datastore {
    pub fn new(name: &str) -> Self {
        Datastore {
            name: name.to_string(),
            accounts: AccountStore::new(),
            transactions: BTreeMap::new(),
            prices: PriceTable::new(),
            aliases: IndexMap::new(),
            payees: IndexMap::new(),
            year: None,
            month: None,
            dateformat: DEFAULT_DATEFORMAT.to_string(),
            rootaccount: String::new(),
            balancing_account: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    pub fn accounts_mut(&mut self) -> &mut AccountStore {
        &mut self.accounts
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    /// Transactions in ascending date order, insertion order within a
    /// date.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values().flatten()
    }

    pub fn get_at(&self, date: &NaiveDate) -> Option<&Vec<Transaction>> {
        self.transactions.get(date)
    }

    // directive state

    pub fn set_year(&mut self, year: i32) -> &mut Self {
        self.year = Some(year);
        self
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn set_month(&mut self, month: u32) -> &mut Self {
        self.month = Some(month);
        self
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    /// Store the active date format. Only the recognized placeholder set
    /// is accepted; the core never parses dates itself.
    pub fn set_dateformat(&mut self, format: &str) -> Result<&mut Self> {
        validate_dateformat(format)?;
        self.dateformat = format.to_string();
        Ok(self)
    }

    pub fn dateformat(&self) -> &str {
        &self.dateformat
    }

    pub fn set_rootaccount(&mut self, name: &str) -> &mut Self {
        self.rootaccount = name.to_string();
        self
    }

    pub fn rootaccount(&self) -> &str {
        &self.rootaccount
    }

    /// Join the apply-account prefix onto a relative account reference.
    pub fn apply_root(&self, name: &str) -> String {
        if self.rootaccount.is_empty() {
            name.to_string()
        } else {
            format!("{}:{}", self.rootaccount, name)
        }
    }

    pub fn set_balancing_account(&mut self, name: &str) -> &mut Self {
        self.balancing_account = Some(name.to_string());
        self
    }

    pub fn balancing_account(&self) -> Option<&str> {
        self.balancing_account.as_deref()
    }

    // aliases and payee rules

    pub fn add_alias(&mut self, alias: &str, account: &str) -> &mut Self {
        self.aliases.insert(alias.to_string(), account.to_string());
        self
    }

    /// Flat, single-level lookup; alias targets are never themselves
    /// resolved again.
    pub fn lookup_alias(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    pub fn resolve_alias(&self, alias: &str) -> Result<&str> {
        self.lookup_alias(alias)
            .ok_or_else(|| LedgerError::AliasNotFound(alias.to_string()))
    }

    pub fn add_payee(&mut self, pattern: &str, account: &str) -> &mut Self {
        self.payees.insert(pattern.to_string(), account.to_string());
        self
    }

    /// Account for a payee, by case-insensitive substring match over the
    /// registered patterns.
    pub fn payee_account(&self, payee: &str) -> Option<&str> {
        let payee = payee.to_lowercase();
        self.payees
            .iter()
            .find(|(pattern, _)| payee.contains(&pattern.to_lowercase()))
            .map(|(_, account)| account.as_str())
    }

    /// Declare an account from its directive. Declaration is the only
    /// place balancing-account identity is established: a declaration
    /// carrying the default flag switches the datastore's balancing
    /// account as a side effect.
    pub fn declare(&mut self, decl: &AccountDecl) {
        let account = self.accounts.declare(&decl.name);
        if let Some(note) = &decl.note {
            account.set_note(note);
        }
        if decl.default_balancing {
            account.set_default_balancing(true);
            self.balancing_account = Some(decl.name.clone());
        }
        if let Some(alias) = &decl.alias {
            self.add_alias(alias, &decl.name);
        }
        if let Some(payee) = &decl.payee {
            self.add_payee(payee, &decl.name);
        }
    }

    /// Apply one parsed record. Transactions and prices land in their
    /// date-ordered indices; each directive mutates exactly one piece of
    /// datastore state.
    pub fn apply(&mut self, record: Record) -> Result<()> {
        match record {
            Record::Transaction(txn) => {
                self.transactions.entry(txn.date).or_default().push(txn);
            }
            Record::Price(price) => {
                self.prices
                    .record(price.when, &price.from_unit, &price.to_unit, price.factor);
            }
            Record::Directive(directive) => {
                debug!(?directive, "apply directive");
                match directive {
                    Directive::Year(year) => {
                        self.set_year(year);
                    }
                    Directive::Month(month) => {
                        self.set_month(month);
                    }
                    Directive::DateFormat(format) => {
                        self.set_dateformat(&format)?;
                    }
                    Directive::Account(decl) => self.declare(&decl),
                    Directive::Apply(name) => {
                        self.set_rootaccount(&name);
                    }
                    Directive::Alias { name, account } => {
                        self.add_alias(&name, &account);
                    }
                    Directive::Assert(_) => return Err(LedgerError::NotImplemented("assert")),
                }
            }
        }
        Ok(())
    }

    /// First pass over the transaction index: resolve accounts and
    /// prices, auto-balance each transaction exactly once. Stops at the
    /// first failing transaction, annotated with its source position.
    pub fn firstpass(&mut self) -> anyhow::Result<()> {
        debug!(name = %self.name, "ledger firstpass");
        let mut transactions = std::mem::take(&mut self.transactions);
        let mut result = Ok(());

        'pass: for txns in transactions.values_mut() {
            for txn in txns.iter_mut() {
                if let Err(err) = txn.firstpass(self) {
                    let pos = txn.pos.clone().unwrap_or_else(|| txn.date.to_string());
                    result = Err(anyhow::Error::new(err)
                        .context(format!("transaction `{}' at {}", txn.desc, pos)));
                    break 'pass;
                }
            }
        }

        self.transactions = transactions;
        result
    }

    /// Second pass: hand every balanced transaction to the reporter, in
    /// the same deterministic order as the first pass.
    pub fn secondpass(&self, reporter: &mut dyn Reporter) -> anyhow::Result<()> {
        debug!(name = %self.name, "ledger secondpass");
        for txn in self.transactions() {
            reporter.transaction(self, txn)?;
        }
        Ok(())
    }
}

fn validate_dateformat(format: &str) -> Result<()> {
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.next() {
                Some('Y' | 'm' | 'd' | 'h' | 'n' | 's' | '%') => {}
                _ => return Err(LedgerError::InvalidDateFormat(format.to_string())),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::amount::Commodity;
    use crate::datastore::Datastore;
    use crate::error::LedgerError;
    use crate::posting::Posting;
    use crate::price::Price;
    use crate::record::{AccountDecl, Directive, Record};
    use crate::transaction::Transaction;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn apply_directives_mutate_state() -> anyhow::Result<()> {
        let mut db = Datastore::new("test");

        db.apply(Record::Directive(Directive::Year(2021)))?;
        db.apply(Record::Directive(Directive::Month(5)))?;
        db.apply(Record::Directive(Directive::DateFormat("%Y/%m/%d".to_string())))?;
        db.apply(Record::Directive(Directive::Apply("ledger".to_string())))?;
        db.apply(Record::Directive(Directive::Alias {
            name: "cc".to_string(),
            account: "liabilities:card".to_string(),
        }))?;

        assert_eq!(db.year(), Some(2021));
        assert_eq!(db.month(), Some(5));
        assert_eq!(db.dateformat(), "%Y/%m/%d");
        assert_eq!(db.rootaccount(), "ledger");
        assert_eq!(db.lookup_alias("cc"), Some("liabilities:card"));
        Ok(())
    }

    #[test]
    fn apply_rejects_bad_dateformat() {
        let mut db = Datastore::new("test");
        let err = db
            .apply(Record::Directive(Directive::DateFormat("%Y-%q".to_string())))
            .unwrap_err();
        assert_eq!(err, LedgerError::InvalidDateFormat("%Y-%q".to_string()));
        // state untouched
        assert_eq!(db.dateformat(), "%Y/%m/%d %h:%n:%s");
    }

    #[test]
    fn assert_directive_is_not_implemented() {
        let mut db = Datastore::new("test");
        assert_eq!(
            db.apply(Record::Directive(Directive::Assert("whatever".to_string()))),
            Err(LedgerError::NotImplemented("assert"))
        );
    }

    #[test]
    fn account_declaration_side_effects() -> anyhow::Result<()> {
        let mut db = Datastore::new("test");
        let decl = AccountDecl {
            name: "equity:opening".to_string(),
            note: Some("opening balances".to_string()),
            alias: Some("opening".to_string()),
            payee: Some("payroll".to_string()),
            default_balancing: true,
        };
        db.apply(Record::Directive(Directive::Account(decl)))?;

        let account = db.accounts().get("equity:opening").unwrap();
        assert!(account.is_declared());
        assert!(account.is_default_balancing());
        assert_eq!(account.note(), Some("opening balances"));
        assert_eq!(db.balancing_account(), Some("equity:opening"));
        assert_eq!(db.lookup_alias("opening"), Some("equity:opening"));
        assert_eq!(db.payee_account("ACME Payroll May"), Some("equity:opening"));
        Ok(())
    }

    #[test]
    fn resolve_alias_reports_missing() {
        let db = Datastore::new("test");
        assert_eq!(
            db.resolve_alias("nope"),
            Err(LedgerError::AliasNotFound("nope".to_string()))
        );
    }

    #[test]
    fn price_records_feed_the_table() -> anyhow::Result<()> {
        let mut db = Datastore::new("test");
        db.apply(Record::Price(Price {
            when: date(2021, 1, 1),
            from_unit: "usd".to_string(),
            to_unit: "idr".to_string(),
            factor: 14000f64,
        }))?;

        assert_eq!(
            db.prices().rate("usd", "idr", date(2021, 2, 1)),
            Some(14000f64)
        );
        Ok(())
    }

    #[test]
    fn transactions_keep_journal_order_within_a_date() -> anyhow::Result<()> {
        let mut db = Datastore::new("test");
        let day = date(2021, 5, 20);

        for desc in ["first", "second"] {
            let mut txn = Transaction::new(day, desc);
            txn.add_posting(Posting::new("assets:cash", Commodity::new(1f64, "usd")));
            txn.add_posting(Posting::null("expenses:misc"));
            db.apply(Record::Transaction(txn))?;
        }
        let mut early = Transaction::new(date(2021, 5, 19), "earlier");
        early.add_posting(Posting::new("assets:cash", Commodity::new(1f64, "usd")));
        early.add_posting(Posting::null("expenses:misc"));
        db.apply(Record::Transaction(early))?;

        let order: Vec<&str> = db.transactions().map(|t| t.desc.as_str()).collect();
        assert_eq!(order, vec!["earlier", "first", "second"]);
        assert_eq!(db.get_at(&day).unwrap().len(), 2);
        Ok(())
    }

    #[test]
    fn firstpass_error_carries_position() -> anyhow::Result<()> {
        let mut db = Datastore::new("test");
        let mut bad = Transaction::new(date(2021, 5, 20), "lopsided");
        bad.pos = Some("journal:42".to_string());
        bad.add_posting(Posting::new("assets:cash", Commodity::new(10f64, "usd")));
        bad.add_posting(Posting::new("expenses:food", Commodity::new(-8f64, "usd")));
        db.apply(Record::Transaction(bad))?;

        let err = db.firstpass().unwrap_err();
        assert!(err.to_string().contains("journal:42"));
        assert_eq!(
            err.downcast_ref::<LedgerError>(),
            Some(&LedgerError::UnbalancedTransaction)
        );
        Ok(())
    }
}
