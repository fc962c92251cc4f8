//! Ledger transfers between holders.

use world_model::{Assets, Value};

use super::DeltaError;

/// Balances of both parties before and after a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub from_before: u64,
    pub to_before: u64,
    pub from_after: u64,
    pub to_after: u64,
}

impl Settlement {
    pub(super) fn before_value(&self, from: &str, to: &str) -> Value {
        Value::map([(from, Value::from(self.from_before)), (to, Value::from(self.to_before))])
    }

    pub(super) fn after_value(&self, from: &str, to: &str) -> Value {
        Value::map([(from, Value::from(self.from_after)), (to, Value::from(self.to_after))])
    }
}

/// Convert a requested amount to whole denarii.
pub(super) fn whole_amount(amount: f64) -> Result<u64, DeltaError> {
    if amount.is_finite() && amount > 0.0 && amount.fract() == 0.0 && amount <= u64::MAX as f64 {
        Ok(amount as u64)
    } else {
        Err(DeltaError::InvalidAmount { amount })
    }
}

/// Check every transfer precondition without touching the ledger.
pub(super) fn check_transfer(
    assets: &Assets,
    from: &str,
    to: &str,
    amount: f64,
) -> Result<Settlement, DeltaError> {
    let amount = whole_amount(amount)?;
    let from_before = assets.balance(from).ok_or_else(|| DeltaError::NoLedgerEntry {
        holder: from.to_string(),
    })?;
    if from_before < amount {
        return Err(DeltaError::InsufficientFunds {
            holder: from.to_string(),
            balance: from_before,
            amount,
        });
    }

    if from == to {
        return Ok(Settlement {
            from_before,
            to_before: from_before,
            from_after: from_before,
            to_after: from_before,
        });
    }

    let to_before = assets.balance(to).unwrap_or(0);
    let to_after = to_before
        .checked_add(amount)
        .ok_or(DeltaError::OutOfRange {
            path: format!("assets.cash_ledger.{}.denarii", to),
            value: to_before as f64 + amount as f64,
            expected: "balance within u64",
        })?;

    Ok(Settlement {
        from_before,
        to_before,
        from_after: from_before - amount,
        to_after,
    })
}

/// Move `amount` denarii from one holder to another.
///
/// All preconditions are checked before either balance changes. The
/// destination entry is created on first use. A transfer to oneself
/// succeeds without changing anything.
pub fn transfer(assets: &mut Assets, from: &str, to: &str, amount: f64) -> Result<Settlement, DeltaError> {
    let settlement = check_transfer(assets, from, to, amount)?;
    if from != to {
        assets.set_balance(from, settlement.from_after);
        assets.set_balance(to, settlement.to_after);
    }
    Ok(settlement)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(entries: &[(&str, u64)]) -> Assets {
        let mut assets = Assets::new();
        for (holder, denarii) in entries {
            assets.set_balance(holder, *denarii);
        }
        assets
    }

    #[test]
    fn test_transfer_creates_destination() {
        let mut assets = ledger(&[("varo", 100)]);
        let settlement = transfer(&mut assets, "varo", "quintus", 30.0).unwrap();

        assert_eq!(assets.balance("varo"), Some(70));
        assert_eq!(assets.balance("quintus"), Some(30));
        assert_eq!(settlement.from_before + settlement.to_before, 100);
        assert_eq!(settlement.from_after + settlement.to_after, 100);
    }

    #[test]
    fn test_insufficient_funds_changes_nothing() {
        let mut assets = ledger(&[("varo", 10)]);
        let err = transfer(&mut assets, "varo", "quintus", 30.0).unwrap_err();

        assert_eq!(err.code(), "InsufficientFunds");
        assert_eq!(assets.balance("varo"), Some(10));
        assert_eq!(assets.balance("quintus"), None);
    }

    #[test]
    fn test_missing_source_entry() {
        let mut assets = ledger(&[("quintus", 5)]);
        let err = transfer(&mut assets, "varo", "quintus", 1.0).unwrap_err();
        assert_eq!(
            err,
            DeltaError::NoLedgerEntry {
                holder: "varo".into()
            }
        );
    }

    #[test]
    fn test_invalid_amounts() {
        let mut assets = ledger(&[("varo", 100)]);
        for amount in [0.0, -5.0, 2.5, f64::NAN] {
            let err = transfer(&mut assets, "varo", "quintus", amount).unwrap_err();
            assert_eq!(err.code(), "InvalidAmount");
        }
        assert_eq!(assets.balance("varo"), Some(100));
    }

    #[test]
    fn test_transfer_to_self_is_noop() {
        let mut assets = ledger(&[("varo", 100)]);
        transfer(&mut assets, "varo", "varo", 40.0).unwrap();
        assert_eq!(assets.balance("varo"), Some(100));
        assert_eq!(assets.cash_ledger.len(), 1);
    }

    #[test]
    fn test_exact_balance_drains_to_zero() {
        let mut assets = ledger(&[("varo", 30), ("quintus", 5)]);
        transfer(&mut assets, "varo", "quintus", 30.0).unwrap();
        assert_eq!(assets.balance("varo"), Some(0));
        assert_eq!(assets.balance("quintus"), Some(35));
    }
}
