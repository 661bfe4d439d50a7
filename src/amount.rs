use std::fmt;

/// A signed amount tagged with a unit symbol. Debits are positive,
/// credits negative. An empty unit marks a commodity that has not been
/// assigned one yet (a freshly created tally amount).
///
/// Arithmetic between two commodities requires identical units; anything
/// else must go through [`PriceTable::convert`][crate::PriceTable::convert]
/// first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Commodity {
    pub amount: f64,
    pub unit: String,
}

impl Commodity {
    pub fn new(amount: f64, unit: &str) -> Self {
        Commodity {
            amount,
            unit: unit.to_string(),
        }
    }

    pub fn zero(unit: &str) -> Self {
        Commodity::new(0f64, unit)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0f64
    }

    pub fn is_unitless(&self) -> bool {
        self.unit.is_empty()
    }

    /// Set this commodity's amount to `target`, adopting `other`'s unit
    /// when this commodity has none. Used to synthesize the one permitted
    /// null-posting amount during auto-balance.
    pub fn balance(&mut self, other: &Commodity, target: f64) {
        if self.is_unitless() {
            self.unit = other.unit.clone();
        }
        self.amount = target;
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.unit)
    }
}

impl std::ops::Add<&Commodity> for &Commodity {
    type Output = Commodity;

    fn add(self, rhs: &Commodity) -> Self::Output {
        debug_assert_eq!(self.unit, rhs.unit, "unit mismatch in commodity add");
        Commodity {
            amount: self.amount + rhs.amount,
            unit: self.unit.clone(),
        }
    }
}

impl std::ops::Sub<&Commodity> for &Commodity {
    type Output = Commodity;

    fn sub(self, rhs: &Commodity) -> Self::Output {
        self + &(-rhs)
    }
}

impl std::ops::Neg for &Commodity {
    type Output = Commodity;

    fn neg(self) -> Self::Output {
        Self::Output {
            amount: -self.amount,
            unit: self.unit.clone(),
        }
    }
}
