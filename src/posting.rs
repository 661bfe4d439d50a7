use chrono::NaiveDate;

use crate::amount::Commodity;
use crate::datastore::Datastore;
use crate::error::{LedgerError, Result};

/// One account/amount line within a transaction. A posting with no
/// commodity is the null (tally) posting whose amount is inferred during
/// auto-balance; a virtual posting is excluded from the zero-sum check.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Posting {
    pub account: String,
    pub commodity: Option<Commodity>,
    pub virtual_posting: bool,
    pub balanced: bool,
}

impl Posting {
    pub fn new(account: &str, commodity: Commodity) -> Self {
        Posting {
            account: account.to_string(),
            commodity: Some(commodity),
            ..Default::default()
        }
    }

    /// A posting whose amount is left to be inferred.
    pub fn null(account: &str) -> Self {
        Posting {
            account: account.to_string(),
            ..Default::default()
        }
    }

    pub fn as_virtual(mut self) -> Self {
        self.virtual_posting = true;
        self
    }

    pub fn is_null(&self) -> bool {
        self.commodity.is_none()
    }

    /// First-pass resolution: the account reference goes through alias
    /// lookup, then the apply-root prefix, then a soft declaration in the
    /// account tree; a commodity in a unit connected to the transaction's
    /// primary unit is converted through the price table as of the
    /// transaction date. Unconnected units stay in their own commodity
    /// group.
    pub fn firstpass(
        &mut self,
        db: &mut Datastore,
        date: NaiveDate,
        primary_unit: Option<&str>,
    ) -> Result<()> {
        let name = match db.lookup_alias(&self.account) {
            Some(target) => target.to_string(),
            None => self.account.clone(),
        };
        let name = db.apply_root(&name);
        db.accounts_mut().get_or_create(&name);
        self.account = name;

        if let (Some(commodity), Some(primary)) = (self.commodity.as_mut(), primary_unit) {
            if commodity.unit != primary {
                match db
                    .prices()
                    .convert(commodity.amount, &commodity.unit, primary, date)
                {
                    Ok(amount) => *commodity = Commodity::new(amount, primary),
                    Err(LedgerError::UnitPathNotFound { .. }) => {}
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(())
    }
}
