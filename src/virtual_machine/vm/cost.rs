use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Mnemonic;

/// Budget used when the caller does not supply one (logic signature limit).
pub const DEFAULT_COST_BUDGET: u64 = 20_000;

/// Number of cost categories tracked by [`CostProfile`].
const COST_CATEGORY_COUNT: usize = 6;

/// Categories of opcode cost for profiling.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum CostCategory {
    /// Integer arithmetic, logic, stack and byte-string manipulation.
    General = 0,
    /// Hash digests.
    Hashing = 1,
    /// Signature verification.
    Signature = 2,
    /// Arbitrary-precision byte-string math.
    ByteMath = 3,
    /// Transaction, global and ledger reads and writes.
    State = 4,
    /// Branches, subroutines and program termination.
    Control = 5,
}

impl CostCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CostCategory::General => "General",
            CostCategory::Hashing => "Hashing",
            CostCategory::Signature => "Signature",
            CostCategory::ByteMath => "Byte Math",
            CostCategory::State => "State",
            CostCategory::Control => "Control",
        }
    }

    /// All categories in discriminant order.
    const ALL: [CostCategory; COST_CATEGORY_COUNT] = [
        CostCategory::General,
        CostCategory::Hashing,
        CostCategory::Signature,
        CostCategory::ByteMath,
        CostCategory::State,
        CostCategory::Control,
    ];

    /// Category an opcode's cost is booked under.
    pub fn of(key: Mnemonic) -> Self {
        use Mnemonic::*;
        match key {
            Sha256 | Keccak256 | Sha512_256 => CostCategory::Hashing,
            Ed25519Verify | EcdsaVerify => CostCategory::Signature,
            BAdd | BSub | BMul | BDiv | BMod | BLt | BGt | BLe | BGe | BEq | BNeq | BOr
            | BAnd | BXor | BNot => CostCategory::ByteMath,
            Txn | Global | Gtxn | Txna | Gtxna | Gtxns | Gtxnsa | Balance | MinBalance
            | AppOptedIn | AppLocalGet | AppLocalGetEx | AppGlobalGet | AppGlobalGetEx
            | AppLocalPut | AppGlobalPut | AppLocalDel | AppGlobalDel | AssetHoldingGet
            | AssetParamsGet | Log => CostCategory::State,
            Fail | Bnz | Bz | Branch | Return | Assert | Callsub | Retsub => {
                CostCategory::Control
            }
            _ => CostCategory::General,
        }
    }
}

/// Cost consumption profile.
///
/// Backed by a flat array indexed by [`CostCategory`] discriminant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CostProfile {
    counts: [u64; COST_CATEGORY_COUNT],
}

impl CostProfile {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn add(&mut self, category: CostCategory, amount: u64) {
        let slot = &mut self.counts[category as usize];
        *slot = slot.saturating_add(amount);
    }

    /// Returns the total cost across all categories.
    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .fold(0u64, |acc, &v| acc.saturating_add(v))
    }

    /// Returns an iterator over all categories and their costs.
    pub fn iter(&self) -> impl Iterator<Item = (CostCategory, u64)> {
        CostCategory::ALL.into_iter().zip(self.counts)
    }
}

/// Running cost total checked against a budget.
#[derive(Clone, Debug)]
pub struct CostMeter {
    budget: u64,
    used: u64,
    profile: CostProfile,
}

impl CostMeter {
    pub fn new(budget: u64) -> Self {
        Self {
            budget,
            used: 0,
            profile: CostProfile::new(),
        }
    }

    /// Adds the cost of one opcode, failing once the budget is exceeded.
    pub fn charge(&mut self, key: Mnemonic, amount: u64) -> Result<(), VMError> {
        self.used = self.used.saturating_add(amount);
        self.profile.add(CostCategory::of(key), amount);
        if self.used > self.budget {
            return Err(VMError::BudgetExceeded {
                used: self.used,
                budget: self.budget,
            });
        }
        Ok(())
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn into_profile(self) -> CostProfile {
        self.profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(CostCategory::of(Mnemonic::Sha256), CostCategory::Hashing);
        assert_eq!(CostCategory::of(Mnemonic::BMul), CostCategory::ByteMath);
        assert_eq!(CostCategory::of(Mnemonic::AppGlobalPut), CostCategory::State);
        assert_eq!(CostCategory::of(Mnemonic::Callsub), CostCategory::Control);
        assert_eq!(CostCategory::of(Mnemonic::Add), CostCategory::General);
    }

    #[test]
    fn charge_up_to_budget() {
        let mut meter = CostMeter::new(10);
        meter.charge(Mnemonic::Add, 4).unwrap();
        meter.charge(Mnemonic::Sha256, 6).unwrap();
        assert_eq!(meter.used(), 10);
        let profile = meter.into_profile();
        assert_eq!(profile.total(), 10);
        let hashing = profile
            .iter()
            .find(|(c, _)| *c == CostCategory::Hashing)
            .map(|(_, v)| v);
        assert_eq!(hashing, Some(6));
    }

    #[test]
    fn charge_past_budget_fails() {
        let mut meter = CostMeter::new(5);
        meter.charge(Mnemonic::Add, 5).unwrap();
        assert!(matches!(
            meter.charge(Mnemonic::Add, 1),
            Err(VMError::BudgetExceeded { used: 6, budget: 5 })
        ));
    }

    #[test]
    fn profile_saturates() {
        let mut profile = CostProfile::new();
        profile.add(CostCategory::General, u64::MAX);
        profile.add(CostCategory::General, 1);
        profile.add(CostCategory::State, 1);
        assert_eq!(profile.total(), u64::MAX);
    }
}
