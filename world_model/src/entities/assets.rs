//! Material assets: the cash ledger, patronage networks, offices, contracts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::value::addressable;

/// One holder's balance in the cash ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub holder: String,
    /// Balance in denarii; the type itself rules out negative balances.
    #[serde(default)]
    pub denarii: u64,
}

addressable!(LedgerEntry, key = holder {
    "holder" => holder: Text,
    "denarii" => denarii: Count,
});

impl LedgerEntry {
    pub fn new(holder: impl Into<String>, denarii: u64) -> Self {
        Self {
            holder: holder.into(),
            denarii,
        }
    }
}

/// A web of clients, informants or allies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub members: BTreeSet<String>,
    /// Reach of the network (0-100).
    #[serde(default)]
    pub strength: f64,
}

addressable!(Network, key = id {
    "id" => id: Text,
    "name" => name: Text,
    "owner" => owner: Text,
    "members" => members: Ids,
    "strength" => strength: Number,
});

/// A public office and whoever holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Office {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub holder: Option<String>,
    /// Characters with a claim on or interest in the office.
    #[serde(default)]
    pub stakeholders: BTreeSet<String>,
}

addressable!(Office, key = id {
    "id" => id: Text,
    "title" => title: Text,
    "holder" => holder: OptText,
    "stakeholders" => stakeholders: Ids,
});

/// A binding agreement between parties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parties: BTreeSet<String>,
    /// Value in denarii.
    #[serde(default)]
    pub value: f64,
}

addressable!(Contract, key = id {
    "id" => id: Text,
    "description" => description: Text,
    "parties" => parties: Ids,
    "value" => value: Number,
});

/// Which kind of asset a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Network,
    Office,
    Contract,
}

impl Network {
    pub fn involves_any(&self, participants: &BTreeSet<String>) -> bool {
        participants.contains(&self.owner) || self.members.iter().any(|m| participants.contains(m))
    }

    pub fn describe(&self) -> String {
        format!(
            "{} network of {} ({} members, strength {})",
            self.name,
            self.owner,
            self.members.len(),
            self.strength
        )
    }
}

impl Office {
    pub fn involves_any(&self, participants: &BTreeSet<String>) -> bool {
        self.holder.as_ref().is_some_and(|h| participants.contains(h))
            || self.stakeholders.iter().any(|s| participants.contains(s))
    }

    pub fn describe(&self) -> String {
        match &self.holder {
            Some(holder) => format!("{} held by {}", self.title, holder),
            None => format!("{} (vacant)", self.title),
        }
    }
}

impl Contract {
    pub fn involves_any(&self, participants: &BTreeSet<String>) -> bool {
        self.parties.iter().any(|p| participants.contains(p))
    }

    pub fn describe(&self) -> String {
        let parties: Vec<_> = self.parties.iter().map(String::as_str).collect();
        format!(
            "{} between {} worth {} denarii",
            self.description,
            parties.join(" and "),
            self.value
        )
    }
}

/// Every asset in the world.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Assets {
    #[serde(default)]
    pub cash_ledger: Vec<LedgerEntry>,
    #[serde(default)]
    pub networks: Vec<Network>,
    #[serde(default)]
    pub offices: Vec<Office>,
    #[serde(default)]
    pub contracts: Vec<Contract>,
}

addressable!(Assets {
    "cash_ledger" => cash_ledger: Records,
    "networks" => networks: Records,
    "offices" => offices: Records,
    "contracts" => contracts: Records,
});

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance for a holder, `None` if they have no ledger entry.
    pub fn balance(&self, holder: &str) -> Option<u64> {
        self.ledger_entry(holder).map(|e| e.denarii)
    }

    pub fn ledger_entry(&self, holder: &str) -> Option<&LedgerEntry> {
        self.cash_ledger.iter().find(|e| e.holder == holder)
    }

    pub fn ledger_entry_mut(&mut self, holder: &str) -> Option<&mut LedgerEntry> {
        self.cash_ledger.iter_mut().find(|e| e.holder == holder)
    }

    /// Set a holder's balance, creating the entry if needed.
    pub fn set_balance(&mut self, holder: &str, denarii: u64) {
        match self.ledger_entry_mut(holder) {
            Some(entry) => entry.denarii = denarii,
            None => self.cash_ledger.push(LedgerEntry::new(holder, denarii)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_balance_keeps_one_entry_per_holder() {
        let mut assets = Assets::new();
        assets.set_balance("char_varo", 100);
        assets.set_balance("char_varo", 70);
        assets.set_balance("char_quintus", 30);

        assert_eq!(assets.cash_ledger.len(), 2);
        assert_eq!(assets.balance("char_varo"), Some(70));
        assert_eq!(assets.balance("char_quintus"), Some(30));
        assert_eq!(assets.balance("char_clodia"), None);
    }

    #[test]
    fn test_office_involvement() {
        let office = Office {
            id: "off_praetor".to_string(),
            title: "Praetor Urbanus".to_string(),
            holder: Some("char_varo".to_string()),
            stakeholders: ["char_clodia".to_string()].into_iter().collect(),
        };

        let varo: BTreeSet<String> = ["char_varo".to_string()].into_iter().collect();
        let tiro: BTreeSet<String> = ["char_tiro".to_string()].into_iter().collect();
        assert!(office.involves_any(&varo));
        assert!(!office.involves_any(&tiro));
        assert_eq!(office.describe(), "Praetor Urbanus held by char_varo");
    }

    #[test]
    fn test_negative_balance_rejected_by_serde() {
        let result: Result<LedgerEntry, _> =
            serde_json::from_str(r#"{"holder": "char_varo", "denarii": -5}"#);
        assert!(result.is_err());
    }
}
