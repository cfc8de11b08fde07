use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// category -> account name -> rate as typed by the user.
pub type CellGrid = BTreeMap<String, BTreeMap<String, String>>;

/// category -> estimated monthly spend.
pub type SpendingMap = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardAccount {
    pub name: String,
    pub max_categories: u32,
    pub cashback_cap: f64,
}

impl RewardAccount {
    pub fn new(name: &str, max_categories: u32, cashback_cap: f64) -> Self {
        Self {
            name: name.to_string(),
            max_categories,
            cashback_cap,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum RankingStrategy {
    /// Rank offers by their headline percentage.
    ByRate,
    /// Rank offers by the reward they actually pay out after the cap.
    #[default]
    ByCashback,
}

impl RankingStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ByRate => "by rate",
            Self::ByCashback => "by cashback",
        }
    }
}

/// The persisted unit for one (user, period) in the shared store.
///
/// Every field is optional on the wire: an older or partial document decodes
/// with empty collections, and the reader decides what "empty" means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub cells: CellGrid,
    #[serde(default)]
    pub accounts: Vec<RewardAccount>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub priorities: Vec<String>,
    #[serde(default)]
    pub spending: SpendingMap,
    #[serde(default)]
    pub strategy: Option<RankingStrategy>,
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub device_id: String,
}
