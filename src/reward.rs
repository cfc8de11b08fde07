/// Reward actually paid out for one category at one account.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reward {
    pub value: f64,
    pub cap_hit: bool,
}

/// `min(spend * rate / 100, cap)`, never negative.
///
/// The cap is the account's full payout limit, applied to this category on
/// its own rather than to whatever budget earlier assignments left over.
pub fn realized_reward(rate: f64, spend: f64, cap: f64) -> Reward {
    let value = (spend * rate / 100.0).min(cap).max(0.0);
    Reward {
        value,
        cap_hit: value >= cap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_cap() {
        let r = realized_reward(4.0, 5000.0, 1000.0);
        assert_eq!(r.value, 200.0);
        assert!(!r.cap_hit);
    }

    #[test]
    fn test_capped() {
        let r = realized_reward(10.0, 30000.0, 1000.0);
        assert_eq!(r.value, 1000.0);
        assert!(r.cap_hit);
    }

    #[test]
    fn test_exactly_at_cap_counts_as_hit() {
        let r = realized_reward(10.0, 10000.0, 1000.0);
        assert_eq!(r.value, 1000.0);
        assert!(r.cap_hit);
    }

    #[test]
    fn test_no_spend_pays_nothing() {
        let r = realized_reward(15.0, 0.0, 3000.0);
        assert_eq!(r.value, 0.0);
        assert!(!r.cap_hit);
    }

    #[test]
    fn test_never_negative() {
        let r = realized_reward(5.0, -100.0, 3000.0);
        assert_eq!(r.value, 0.0);
    }
}
