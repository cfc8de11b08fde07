use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use crate::models::{CellGrid, RankingStrategy, RewardAccount, SpendingMap};
use crate::priority::is_priority;
use crate::reward::realized_reward;

/// A numeric rate entered for one (category, account) cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    pub category: String,
    pub account_index: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pick {
    pub category: String,
    pub rate: f64,
    pub spending: f64,
    pub reward: f64,
    pub is_priority: bool,
    pub cap_hit: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountAllocation {
    pub account: String,
    pub max_categories: u32,
    pub cashback_cap: f64,
    pub picks: Vec<Pick>,
    /// Plain sum of the picks' rewards; it is not clamped to the cap.
    pub total_reward: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapWarning {
    pub account: String,
    pub category: String,
    pub cap: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationResult {
    pub accounts: Vec<AccountAllocation>,
    pub total_rate: f64,
    pub total_reward: f64,
    pub priority_covered: usize,
    pub priority_total: usize,
    /// (category, account) cells chosen by the pass.
    pub selected: BTreeSet<(String, String)>,
    pub warnings: Vec<CapWarning>,
}

impl AllocationResult {
    pub fn is_selected(&self, category: &str, account: &str) -> bool {
        self.selected
            .contains(&(category.to_string(), account.to_string()))
    }

    pub fn account_for(&self, category: &str) -> Option<&str> {
        self.selected
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, a)| a.as_str())
    }
}

/// Parse a rate cell. Accepts a comma as decimal separator; anything that is
/// not a finite, non-negative number yields `None`.
pub fn parse_rate(raw: &str) -> Option<f64> {
    let s = raw.trim().replace(',', ".");
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>()
        .ok()
        .filter(|r| r.is_finite() && *r >= 0.0)
}

/// Enumerate offers in category-list order, then account-list order.
pub fn collect_offers(
    grid: &CellGrid,
    categories: &[String],
    accounts: &[RewardAccount],
) -> Vec<Offer> {
    let mut offers = Vec::new();
    for category in categories {
        let Some(row) = grid.get(category) else {
            continue;
        };
        for (account_index, account) in accounts.iter().enumerate() {
            let Some(raw) = row.get(&account.name) else {
                continue;
            };
            match parse_rate(raw) {
                Some(rate) => offers.push(Offer {
                    category: category.clone(),
                    account_index,
                    rate,
                }),
                None if raw.trim().is_empty() => {}
                None => log::trace!(
                    "skipping unparseable rate {raw:?} for {category} / {}",
                    account.name
                ),
            }
        }
    }
    offers
}

struct RankedOffer<'a> {
    offer: &'a Offer,
    spending: f64,
    reward: f64,
    cap_hit: bool,
    is_priority: bool,
}

/// Greedy category-to-account assignment.
///
/// Offers are ranked priority-first, then by rate or by realized reward
/// depending on `strategy`; ties keep their input order. A single pass then
/// takes each offer whose account still has a free slot and whose category
/// has not been placed yet.
pub fn allocate(
    offers: &[Offer],
    accounts: &[RewardAccount],
    spending: &SpendingMap,
    priorities: &[String],
    strategy: RankingStrategy,
) -> AllocationResult {
    let mut ranked: Vec<RankedOffer> = offers
        .iter()
        .filter(|o| o.account_index < accounts.len())
        .map(|offer| {
            let account = &accounts[offer.account_index];
            let spend = spending.get(&offer.category).copied().unwrap_or(0.0);
            let reward = realized_reward(offer.rate, spend, account.cashback_cap);
            RankedOffer {
                offer,
                spending: spend,
                reward: reward.value,
                cap_hit: reward.cap_hit,
                is_priority: is_priority(&offer.category, priorities),
            }
        })
        .collect();

    // sort_by is stable, which keeps equal offers in encounter order
    ranked.sort_by(|a, b| {
        b.is_priority.cmp(&a.is_priority).then_with(|| match strategy {
            RankingStrategy::ByRate => desc(a.offer.rate, b.offer.rate),
            RankingStrategy::ByCashback => desc(a.reward, b.reward),
        })
    });

    let mut result = AllocationResult {
        accounts: accounts
            .iter()
            .map(|a| AccountAllocation {
                account: a.name.clone(),
                max_categories: a.max_categories,
                cashback_cap: a.cashback_cap,
                picks: Vec::new(),
                total_reward: 0.0,
            })
            .collect(),
        priority_total: priorities.len(),
        ..Default::default()
    };
    let mut used: HashSet<&str> = HashSet::new();

    for r in &ranked {
        let slot = &mut result.accounts[r.offer.account_index];
        if slot.picks.len() >= slot.max_categories as usize
            || used.contains(r.offer.category.as_str())
        {
            continue;
        }

        slot.picks.push(Pick {
            category: r.offer.category.clone(),
            rate: r.offer.rate,
            spending: r.spending,
            reward: r.reward,
            is_priority: r.is_priority,
            cap_hit: r.cap_hit,
        });
        slot.total_reward += r.reward;
        used.insert(&r.offer.category);

        result.total_rate += r.offer.rate;
        result.total_reward += r.reward;
        result
            .selected
            .insert((r.offer.category.clone(), slot.account.clone()));
        if r.is_priority {
            result.priority_covered += 1;
        }
        if r.cap_hit {
            result.warnings.push(CapWarning {
                account: slot.account.clone(),
                category: r.offer.category.clone(),
                cap: slot.cashback_cap,
            });
        }
    }

    result
}

fn desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
