use std::collections::BTreeMap;

use crate::allocator::{allocate, collect_offers, AllocationResult};
use crate::error::{CashplanError, Result};
use crate::models::{CellGrid, RankingStrategy, RewardAccount, Snapshot, SpendingMap};
use crate::period::Period;
use crate::priority::toggle_priority;

// (name, max categories, cashback cap)
const DEFAULT_ACCOUNTS: &[(&str, u32, f64)] = &[
    ("VTB", 3, 3000.0),
    ("Alfa", 3, 5000.0),
    ("Sber", 5, 5000.0),
    ("Tinkoff", 4, 3000.0),
];

const DEFAULT_CATEGORIES: &[&str] = &[
    "Auto services",
    "Gas stations",
    "Accessories",
    "Pharmacy",
    "All purchases",
    "Delivery",
    "Kids",
    "Home and repair",
    "Art",
    "Cafes and restaurants",
    "Books and stationery",
    "Beauty",
    "Medical services",
    "Megamarket",
    "Education",
    "Clothes and shoes",
    "Perekrestok",
    "Toll roads",
    "Entertainment",
    "Travel service",
    "Sporting goods",
    "Supermarkets",
    "Taxi",
    "Theaters and cinema",
    "Transport",
    "Flowers",
    "Digital content",
    "Hobbies",
    "Electronics",
    "Yandex Food",
];

const DEFAULT_SPENDING: &[(&str, f64)] = &[
    ("Auto services", 5000.0),
    ("Gas stations", 8000.0),
    ("All purchases", 30000.0),
    ("Kids", 10000.0),
    ("Cafes and restaurants", 15000.0),
    ("Supermarkets", 25000.0),
    ("Transport", 8000.0),
    ("Taxi", 5000.0),
    ("Education", 3000.0),
    ("Beauty", 4000.0),
    ("Sporting goods", 3000.0),
    ("Theaters and cinema", 2000.0),
];

const DEFAULT_PRIORITIES: &[&str] = &["Supermarkets", "Cafes and restaurants", "All purchases"];

// (category, [(account, rate)])
const SAMPLE_OFFERS: &[(&str, &[(&str, &str)])] = &[
    ("Auto services", &[("Tinkoff", "5.0")]),
    ("Gas stations", &[("VTB", "3.0"), ("Alfa", "5.0"), ("Tinkoff", "7.0")]),
    ("All purchases", &[("VTB", "1.5"), ("Alfa", "1.0"), ("Sber", "1.0"), ("Tinkoff", "1.0")]),
    ("Kids", &[("VTB", "15.0")]),
    ("Cafes and restaurants", &[("VTB", "8.0"), ("Alfa", "5.0")]),
    ("Books and stationery", &[("Alfa", "7.0")]),
    ("Beauty", &[("Sber", "5.0")]),
    ("Education", &[("Sber", "5.0")]),
    ("Sporting goods", &[("VTB", "6.0"), ("Tinkoff", "5.0")]),
    ("Supermarkets", &[("VTB", "3.0")]),
    ("Taxi", &[("Alfa", "5.0")]),
    ("Transport", &[("VTB", "10.0"), ("Sber", "10.0")]),
];

/// In-memory working state of this process.
///
/// Per-period rate grids plus the period-independent lists. Every mutation
/// recomputes the allocation for the active period, so `allocation()` is
/// always derivable from the fields alone.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalStateStore {
    active: Period,
    cells: BTreeMap<Period, CellGrid>,
    accounts: Vec<RewardAccount>,
    categories: Vec<String>,
    priorities: Vec<String>,
    spending: SpendingMap,
    strategy: RankingStrategy,
    allocation: AllocationResult,
}

impl LocalStateStore {
    /// A store seeded with the stock account and category lists.
    pub fn new(active: Period) -> Self {
        let mut store = Self::empty(active);
        store.accounts = DEFAULT_ACCOUNTS
            .iter()
            .map(|(name, max, cap)| RewardAccount::new(name, *max, *cap))
            .collect();
        store.categories = DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect();
        store.spending = DEFAULT_SPENDING
            .iter()
            .map(|(c, amount)| (c.to_string(), *amount))
            .collect();
        store.priorities = DEFAULT_PRIORITIES.iter().map(|p| p.to_string()).collect();
        store.recompute();
        store
    }

    pub fn empty(active: Period) -> Self {
        Self {
            active,
            cells: BTreeMap::from([(active, CellGrid::new())]),
            accounts: Vec::new(),
            categories: Vec::new(),
            priorities: Vec::new(),
            spending: SpendingMap::new(),
            strategy: RankingStrategy::default(),
            allocation: AllocationResult::default(),
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn active_period(&self) -> Period {
        self.active
    }

    pub fn accounts(&self) -> &[RewardAccount] {
        &self.accounts
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn priorities(&self) -> &[String] {
        &self.priorities
    }

    pub fn spending(&self) -> &SpendingMap {
        &self.spending
    }

    pub fn strategy(&self) -> RankingStrategy {
        self.strategy
    }

    pub fn allocation(&self) -> &AllocationResult {
        &self.allocation
    }

    pub fn grid(&self, period: Period) -> Option<&CellGrid> {
        self.cells.get(&period)
    }

    pub fn cell(&self, category: &str, account: &str) -> Option<&str> {
        self.cells
            .get(&self.active)
            .and_then(|g| g.get(category))
            .and_then(|row| row.get(account))
            .map(String::as_str)
    }

    // ------------------------------------------------------------------
    // Period handling
    // ------------------------------------------------------------------

    pub fn set_active_period(&mut self, period: Period) {
        self.active = period;
        self.ensure_period(period);
        self.recompute();
    }

    /// Create an empty grid for `period` unless one already exists.
    pub fn ensure_period(&mut self, period: Period) {
        self.cells.entry(period).or_default();
    }

    pub fn clear_period(&mut self) {
        self.cells.insert(self.active, CellGrid::new());
        self.recompute();
    }

    /// Replace the active grid with the previous month's grid.
    pub fn copy_from_previous(&mut self) -> Result<Period> {
        let previous = self.active.predecessor().ok_or_else(|| {
            CashplanError::Other(format!("{} has no previous month to copy from", self.active))
        })?;
        let grid = self.cells.get(&previous).cloned().unwrap_or_default();
        self.cells.insert(self.active, grid);
        self.recompute();
        Ok(previous)
    }

    /// Merge the sample offers into the active grid. Returns cells written.
    pub fn load_sample(&mut self) -> usize {
        let grid = self.cells.entry(self.active).or_default();
        let mut written = 0;
        for (category, offers) in SAMPLE_OFFERS {
            if !self.categories.iter().any(|c| c == category) {
                continue;
            }
            for (account, rate) in offers.iter() {
                if !self.accounts.iter().any(|a| a.name == *account) {
                    continue;
                }
                grid.entry(category.to_string())
                    .or_default()
                    .insert(account.to_string(), rate.to_string());
                written += 1;
            }
        }
        self.recompute();
        written
    }

    // ------------------------------------------------------------------
    // Cells
    // ------------------------------------------------------------------

    /// Store a rate as typed. An empty value clears the cell.
    pub fn set_cell(&mut self, category: &str, account: &str, value: &str) -> Result<()> {
        self.require_category(category)?;
        self.require_account(account)?;
        let grid = self.cells.entry(self.active).or_default();
        let value = value.trim();
        if value.is_empty() {
            if let Some(row) = grid.get_mut(category) {
                row.remove(account);
                if row.is_empty() {
                    grid.remove(category);
                }
            }
        } else {
            grid.entry(category.to_string())
                .or_default()
                .insert(account.to_string(), value.to_string());
        }
        self.recompute();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    pub fn add_account(&mut self, name: &str, max_categories: u32, cashback_cap: f64) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CashplanError::Other("Account name cannot be empty".to_string()));
        }
        if self.accounts.iter().any(|a| a.name == name) {
            return Err(CashplanError::Other(format!("Account already exists: {name}")));
        }
        validate_cap(cashback_cap)?;
        self.accounts
            .push(RewardAccount::new(name, max_categories, cashback_cap));
        self.recompute();
        Ok(())
    }

    pub fn update_account(
        &mut self,
        name: &str,
        max_categories: Option<u32>,
        cashback_cap: Option<f64>,
    ) -> Result<()> {
        if let Some(cap) = cashback_cap {
            validate_cap(cap)?;
        }
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.name == name)
            .ok_or_else(|| CashplanError::UnknownAccount(name.to_string()))?;
        if let Some(max) = max_categories {
            account.max_categories = max;
        }
        if let Some(cap) = cashback_cap {
            account.cashback_cap = cap;
        }
        self.recompute();
        Ok(())
    }

    pub fn rename_account(&mut self, from: &str, to: &str) -> Result<()> {
        let to = to.trim();
        self.require_account(from)?;
        if to.is_empty() || self.accounts.iter().any(|a| a.name == to) {
            return Err(CashplanError::Other(format!("Cannot rename account to {to:?}")));
        }
        for account in self.accounts.iter_mut().filter(|a| a.name == from) {
            account.name = to.to_string();
        }
        for grid in self.cells.values_mut() {
            for row in grid.values_mut() {
                if let Some(rate) = row.remove(from) {
                    row.insert(to.to_string(), rate);
                }
            }
        }
        self.recompute();
        Ok(())
    }

    pub fn remove_account(&mut self, name: &str) -> Result<()> {
        self.require_account(name)?;
        if self.accounts.len() == 1 {
            return Err(CashplanError::Other("Cannot remove the last account".to_string()));
        }
        self.accounts.retain(|a| a.name != name);
        for grid in self.cells.values_mut() {
            for row in grid.values_mut() {
                row.remove(name);
            }
            grid.retain(|_, row| !row.is_empty());
        }
        self.recompute();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    /// Returns false when the name is blank or already listed.
    pub fn add_category(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.categories.iter().any(|c| c == name) {
            return false;
        }
        self.categories.push(name.to_string());
        self.recompute();
        true
    }

    pub fn rename_category(&mut self, from: &str, to: &str) -> Result<()> {
        let to = to.trim();
        self.require_category(from)?;
        if to.is_empty() || self.categories.iter().any(|c| c == to) {
            return Err(CashplanError::Other(format!("Cannot rename category to {to:?}")));
        }
        for category in self.categories.iter_mut().filter(|c| c.as_str() == from) {
            *category = to.to_string();
        }
        for grid in self.cells.values_mut() {
            if let Some(row) = grid.remove(from) {
                grid.insert(to.to_string(), row);
            }
        }
        if let Some(amount) = self.spending.remove(from) {
            self.spending.insert(to.to_string(), amount);
        }
        for pattern in self.priorities.iter_mut().filter(|p| p.as_str() == from) {
            *pattern = to.to_string();
        }
        self.recompute();
        Ok(())
    }

    pub fn remove_category(&mut self, name: &str) -> Result<()> {
        self.require_category(name)?;
        self.categories.retain(|c| c != name);
        for grid in self.cells.values_mut() {
            grid.remove(name);
        }
        self.spending.remove(name);
        self.recompute();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Priorities, spending, strategy
    // ------------------------------------------------------------------

    /// Returns the new priority status of `category`.
    pub fn toggle_priority(&mut self, category: &str) -> bool {
        let now_priority = toggle_priority(&mut self.priorities, category);
        self.recompute();
        now_priority
    }

    pub fn set_spending(&mut self, category: &str, amount: f64) -> Result<()> {
        self.require_category(category)?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(CashplanError::Other(format!("Invalid spend amount: {amount}")));
        }
        self.spending.insert(category.to_string(), amount);
        self.recompute();
        Ok(())
    }

    pub fn set_strategy(&mut self, strategy: RankingStrategy) {
        self.strategy = strategy;
        self.recompute();
    }

    // ------------------------------------------------------------------
    // Snapshot transfer
    // ------------------------------------------------------------------

    /// Assemble the full persisted unit for `period`.
    pub fn snapshot(&self, period: Period, last_modified: i64, device_id: &str) -> Snapshot {
        Snapshot {
            cells: self.cells.get(&period).cloned().unwrap_or_default(),
            accounts: self.accounts.clone(),
            categories: self.categories.clone(),
            priorities: self.priorities.clone(),
            spending: self.spending.clone(),
            strategy: Some(self.strategy),
            last_modified,
            device_id: device_id.to_string(),
        }
    }

    /// Apply a fetched snapshot field by field. Empty or missing remote
    /// fields leave the local value alone.
    pub fn apply_snapshot(&mut self, period: Period, remote: &Snapshot) {
        if !remote.accounts.is_empty() {
            self.accounts = remote.accounts.clone();
        }
        if !remote.categories.is_empty() {
            self.categories = remote.categories.clone();
        }
        if !remote.priorities.is_empty() {
            self.priorities = remote.priorities.clone();
        }
        if !remote.spending.is_empty() {
            self.spending = remote.spending.clone();
        }
        if let Some(strategy) = remote.strategy {
            self.strategy = strategy;
        }
        if !remote.cells.is_empty() {
            self.cells.insert(period, remote.cells.clone());
        } else {
            self.ensure_period(period);
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        let grid = self.cells.get(&self.active);
        let offers = grid
            .map(|g| collect_offers(g, &self.categories, &self.accounts))
            .unwrap_or_default();
        self.allocation = allocate(
            &offers,
            &self.accounts,
            &self.spending,
            &self.priorities,
            self.strategy,
        );
    }

    fn require_category(&self, name: &str) -> Result<()> {
        if self.categories.iter().any(|c| c == name) {
            Ok(())
        } else {
            Err(CashplanError::UnknownCategory(name.to_string()))
        }
    }

    fn require_account(&self, name: &str) -> Result<()> {
        if self.accounts.iter().any(|a| a.name == name) {
            Ok(())
        } else {
            Err(CashplanError::UnknownAccount(name.to_string()))
        }
    }
}

fn validate_cap(cap: f64) -> Result<()> {
    if cap.is_finite() && cap > 0.0 {
        Ok(())
    } else {
        Err(CashplanError::Other(format!("Cashback cap must be positive, got {cap}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(s: &str) -> Period {
        s.parse().unwrap()
    }

    fn store() -> LocalStateStore {
        LocalStateStore::new(period("2025-03"))
    }

    #[test]
    fn test_defaults_seeded() {
        let s = store();
        assert_eq!(s.accounts().len(), 4);
        assert_eq!(s.categories().len(), 30);
        assert_eq!(s.priorities().len(), 3);
        assert_eq!(s.spending().get("Supermarkets"), Some(&25000.0));
        assert!(s.allocation().selected.is_empty());
    }

    #[test]
    fn test_set_cell_recomputes() {
        let mut s = store();
        s.set_cell("Taxi", "Alfa", "5").unwrap();
        assert_eq!(s.cell("Taxi", "Alfa"), Some("5"));
        assert!(s.allocation().is_selected("Taxi", "Alfa"));
        assert_eq!(s.allocation().total_reward, 250.0);
    }

    #[test]
    fn test_set_cell_blank_clears() {
        let mut s = store();
        s.set_cell("Taxi", "Alfa", "5").unwrap();
        s.set_cell("Taxi", "Alfa", "  ").unwrap();
        assert_eq!(s.cell("Taxi", "Alfa"), None);
        assert!(s.grid(period("2025-03")).unwrap().is_empty());
        assert!(s.allocation().selected.is_empty());
    }

    #[test]
    fn test_set_cell_unknown_names() {
        let mut s = store();
        assert!(matches!(
            s.set_cell("Nope", "Alfa", "5"),
            Err(CashplanError::UnknownCategory(_))
        ));
        assert!(matches!(
            s.set_cell("Taxi", "Nope", "5"),
            Err(CashplanError::UnknownAccount(_))
        ));
    }

    #[test]
    fn test_periods_are_independent() {
        let mut s = store();
        s.set_cell("Taxi", "Alfa", "5").unwrap();
        s.set_active_period(period("2025-04"));
        assert_eq!(s.cell("Taxi", "Alfa"), None);
        assert!(s.allocation().selected.is_empty());
        s.set_active_period(period("2025-03"));
        assert_eq!(s.cell("Taxi", "Alfa"), Some("5"));
    }

    #[test]
    fn test_copy_from_previous() {
        let mut s = store();
        s.set_active_period(period("2025-02"));
        s.set_cell("Kids", "VTB", "15").unwrap();
        s.set_active_period(period("2025-03"));
        let from = s.copy_from_previous().unwrap();
        assert_eq!(from, period("2025-02"));
        assert_eq!(s.cell("Kids", "VTB"), Some("15"));
    }

    #[test]
    fn test_copy_from_previous_in_january_fails() {
        let mut s = LocalStateStore::new(period("2025-01"));
        assert!(s.copy_from_previous().is_err());
    }

    #[test]
    fn test_clear_period() {
        let mut s = store();
        s.load_sample();
        assert!(!s.allocation().selected.is_empty());
        s.clear_period();
        assert!(s.grid(period("2025-03")).unwrap().is_empty());
        assert!(s.allocation().selected.is_empty());
    }

    #[test]
    fn test_load_sample_respects_lists() {
        let mut s = store();
        s.remove_account("Sber").unwrap();
        let written = s.load_sample();
        assert_eq!(written, 16);
        assert_eq!(s.cell("Transport", "VTB"), Some("10.0"));
        assert_eq!(s.cell("Transport", "Sber"), None);
    }

    #[test]
    fn test_rename_category_moves_everything() {
        let mut s = store();
        s.set_cell("Supermarkets", "VTB", "3").unwrap();
        s.rename_category("Supermarkets", "Groceries").unwrap();
        assert_eq!(s.cell("Groceries", "VTB"), Some("3"));
        assert_eq!(s.spending().get("Groceries"), Some(&25000.0));
        assert!(s.priorities().iter().any(|p| p == "Groceries"));
        assert!(s.allocation().is_selected("Groceries", "VTB"));
    }

    #[test]
    fn test_remove_category_prunes_cells_and_spending() {
        let mut s = store();
        s.set_cell("Taxi", "Alfa", "5").unwrap();
        s.remove_category("Taxi").unwrap();
        assert!(!s.categories().iter().any(|c| c == "Taxi"));
        assert!(s.spending().get("Taxi").is_none());
        assert!(s.grid(period("2025-03")).unwrap().get("Taxi").is_none());
    }

    #[test]
    fn test_add_category_rejects_duplicates() {
        let mut s = store();
        assert!(s.add_category("  Pets  "));
        assert!(!s.add_category("Pets"));
        assert!(!s.add_category(" "));
    }

    #[test]
    fn test_account_edits() {
        let mut s = store();
        s.add_account("Ozon", 2, 2000.0).unwrap();
        assert!(s.add_account("Ozon", 2, 2000.0).is_err());
        assert!(s.add_account("Zero cap", 2, 0.0).is_err());
        s.set_cell("Taxi", "Ozon", "7").unwrap();
        s.rename_account("Ozon", "Ozon Bank").unwrap();
        assert_eq!(s.cell("Taxi", "Ozon Bank"), Some("7"));
        s.update_account("Ozon Bank", Some(0), None).unwrap();
        assert!(!s.allocation().is_selected("Taxi", "Ozon Bank"));
        s.remove_account("Ozon Bank").unwrap();
        assert_eq!(s.cell("Taxi", "Ozon Bank"), None);
    }

    #[test]
    fn test_cannot_remove_last_account() {
        let mut s = LocalStateStore::empty(period("2025-03"));
        s.add_account("Only", 1, 100.0).unwrap();
        assert!(s.remove_account("Only").is_err());
    }

    #[test]
    fn test_toggle_priority_recomputes() {
        let mut s = store();
        s.set_cell("Taxi", "Alfa", "5").unwrap();
        assert!(!s.allocation().accounts[1].picks[0].is_priority);
        assert!(s.toggle_priority("Taxi"));
        assert!(s.allocation().accounts[1].picks[0].is_priority);
        assert_eq!(s.allocation().priority_total, 4);
    }

    #[test]
    fn test_set_spending_validates() {
        let mut s = store();
        assert!(s.set_spending("Taxi", -1.0).is_err());
        assert!(s.set_spending("Nope", 1.0).is_err());
        s.set_spending("Taxi", 9000.0).unwrap();
        assert_eq!(s.spending().get("Taxi"), Some(&9000.0));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut s = store();
        s.load_sample();
        s.set_strategy(RankingStrategy::ByRate);
        let snap = s.snapshot(period("2025-03"), 1000, "dev");

        let mut other = LocalStateStore::empty(period("2025-03"));
        other.apply_snapshot(period("2025-03"), &snap);
        assert_eq!(other, s);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut source = store();
        source.load_sample();
        let snap = source.snapshot(period("2025-03"), 1000, "dev");

        let mut once = store();
        once.apply_snapshot(period("2025-03"), &snap);
        let mut twice = once.clone();
        twice.apply_snapshot(period("2025-03"), &snap);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_apply_keeps_local_when_remote_fields_empty() {
        let mut s = store();
        s.set_cell("Taxi", "Alfa", "5").unwrap();
        let remote = Snapshot {
            cells: CellGrid::new(),
            accounts: vec![],
            categories: vec![],
            priorities: vec![],
            spending: SpendingMap::new(),
            strategy: None,
            last_modified: 5,
            device_id: "other".to_string(),
        };
        let before = s.clone();
        s.apply_snapshot(period("2025-03"), &remote);
        assert_eq!(s, before);
    }
}
