use chrono::NaiveDate;
use tracing::debug;

use crate::amount::Commodity;
use crate::datastore::Datastore;
use crate::error::{LedgerError, Result};
use crate::posting::Posting;

/// A dated entry of postings, constructed incrementally by the parser
/// collaborator and balanced exactly once during the first pass.
/// `pos` is an opaque source-position reference carried through for error
/// reporting; the core never interprets it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub edate: Option<NaiveDate>,
    pub prefix: Option<char>,
    pub code: Option<String>,
    pub desc: String,
    pub postings: Vec<Posting>,
    pub note: Option<String>,
    pub pos: Option<String>,
}

impl Transaction {
    pub fn new(date: NaiveDate, desc: &str) -> Self {
        Transaction {
            date,
            desc: desc.to_string(),
            ..Default::default()
        }
    }

    pub fn add_posting(&mut self, posting: Posting) {
        self.postings.push(posting);
    }

    /// Unit of the first posting that carries a commodity.
    pub fn primary_unit(&self) -> Option<String> {
        self.postings
            .iter()
            .find_map(|p| p.commodity.as_ref().map(|c| c.unit.clone()))
    }

    /// Sum of negative non-virtual amounts in the primary unit.
    pub fn credits(&self) -> f64 {
        self.tally_sum(|amount| amount < 0f64)
    }

    /// Sum of positive non-virtual amounts in the primary unit.
    pub fn debits(&self) -> f64 {
        self.tally_sum(|amount| amount > 0f64)
    }

    fn tally_sum(&self, keep: impl Fn(f64) -> bool) -> f64 {
        let primary = self.primary_unit();
        self.postings
            .iter()
            .filter(|p| !p.virtual_posting)
            .filter_map(|p| p.commodity.as_ref())
            .filter(|c| Some(c.unit.as_str()) == primary.as_deref())
            .map(|c| c.amount)
            .filter(|&amount| keep(amount))
            .sum()
    }

    /// True only when every posting, virtual or not, has been individually
    /// marked balanced. An assertion hook, independent from the
    /// auto-balance algorithm.
    pub fn should_balance(&self) -> bool {
        self.postings.iter().all(|p| p.balanced)
    }

    /// Locate the single permitted null posting, if any.
    fn end_posting(&self) -> Result<Option<usize>> {
        let mut tally = None;
        for (idx, posting) in self.postings.iter().enumerate() {
            if posting.is_null() {
                if tally.is_some() {
                    return Err(LedgerError::MultipleNullPostings);
                }
                tally = Some(idx);
            }
        }
        Ok(tally)
    }

    /// Synthesize the balancing counter-posting on the default balancing
    /// account, with the negated amount of `posting`.
    fn default_posting(account: &str, posting: &Posting) -> Result<Posting> {
        let basis = posting
            .commodity
            .as_ref()
            .ok_or(LedgerError::UnbalancedTransaction)?;
        let mut commodity = Commodity::default();
        commodity.balance(basis, -basis.amount);
        Ok(Posting::new(account, commodity))
    }

    fn mark_balanced(&mut self) {
        for posting in self.postings.iter_mut() {
            posting.balanced = true;
        }
    }

    /// The auto-balance algorithm. Runs once per transaction, after all
    /// postings have been appended and resolved:
    ///
    /// - no postings at all is an error;
    /// - a single posting is answered by the default balancing account,
    ///   or rejected when none is configured;
    /// - otherwise the one permitted null posting absorbs the negated
    ///   remainder of the credits/debits tally.
    pub fn autobalance(&mut self, default_account: Option<&str>) -> Result<bool> {
        if self.postings.is_empty() {
            return Err(LedgerError::EmptyTransaction);
        } else if self.postings.len() == 1 {
            let account = default_account.ok_or(LedgerError::UnbalancedTransaction)?;
            let posting = Self::default_posting(account, &self.postings[0])?;
            self.postings.push(posting);
            self.mark_balanced();
            return Ok(true);
        }

        let tally = self.end_posting()?;
        let (credits, debits) = (self.credits(), self.debits());
        let remainder = -(credits + debits);

        if remainder == 0f64 {
            if let Some(idx) = tally {
                let unit = self.primary_unit().unwrap_or_default();
                self.postings[idx].commodity = Some(Commodity::zero(&unit));
            }
            self.mark_balanced();
            return Ok(true);
        }

        let idx = tally.ok_or(LedgerError::UnbalancedTransaction)?;
        let basis = self
            .postings
            .iter()
            .find_map(|p| p.commodity.clone())
            .ok_or(LedgerError::UnbalancedTransaction)?;
        let mut commodity = Commodity::default();
        commodity.balance(&basis, remainder);
        self.postings[idx].commodity = Some(commodity);
        self.mark_balanced();
        Ok(true)
    }

    /// First pass: resolve every posting against the account tree and the
    /// price table, then balance the transaction.
    pub fn firstpass(&mut self, db: &mut Datastore) -> Result<()> {
        debug!(date = %self.date, desc = %self.desc, "transaction firstpass");
        let primary = self.primary_unit();
        for posting in self.postings.iter_mut() {
            posting.firstpass(db, self.date, primary.as_deref())?;
        }

        let default_account = db.balancing_account().map(str::to_string);
        self.autobalance(default_account.as_deref())?;

        // the synthesized default posting may reference an account that
        // was never mentioned before
        for posting in &self.postings {
            db.accounts_mut().get_or_create(&posting.account);
        }
        Ok(())
    }
}
