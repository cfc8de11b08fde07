//! Loose matching of category names against the user's priority patterns.
//!
//! A category is a priority when, ignoring case, it equals a pattern, contains
//! it, or is contained by it. Adding stores the literal category name; removing
//! strips every pattern that overlaps the category under the same relation.

fn overlaps(category: &str, pattern: &str) -> bool {
    let category = category.to_lowercase();
    let pattern = pattern.to_lowercase();
    category == pattern || category.contains(&pattern) || pattern.contains(&category)
}

pub fn is_priority(category: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| overlaps(category, p))
}

/// Flip the priority status of `category`. Returns the new status.
pub fn toggle_priority(patterns: &mut Vec<String>, category: &str) -> bool {
    if is_priority(category, patterns) {
        patterns.retain(|p| !overlaps(category, p));
        false
    } else {
        patterns.push(category.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match_ignores_case() {
        assert!(is_priority("Groceries", &patterns(&["groceries"])));
        assert!(is_priority("ТАКСИ", &patterns(&["такси"])));
    }

    #[test]
    fn test_substring_either_direction() {
        // pattern inside category
        assert!(is_priority("Taxi and rideshare", &patterns(&["taxi"])));
        // category inside pattern
        assert!(is_priority("Cafe", &patterns(&["Cafes and restaurants"])));
        assert!(!is_priority("Pharmacy", &patterns(&["Taxi", "Cafe"])));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        assert!(!is_priority("Anything", &[]));
    }

    #[test]
    fn test_toggle_adds_literal_name() {
        let mut set = patterns(&["Cafe"]);
        assert!(toggle_priority(&mut set, "Pharmacy"));
        assert_eq!(set, patterns(&["Cafe", "Pharmacy"]));
    }

    #[test]
    fn test_toggle_removes_every_overlapping_pattern() {
        let mut set = patterns(&["taxi", "Yandex Taxi", "Cafe", "TAXI"]);
        assert!(!toggle_priority(&mut set, "Taxi"));
        assert_eq!(set, patterns(&["Cafe"]));
    }

    #[test]
    fn test_toggle_twice_restores_status() {
        let mut set = Vec::new();
        assert!(toggle_priority(&mut set, "Books"));
        assert!(is_priority("Books", &set));
        assert!(!toggle_priority(&mut set, "Books"));
        assert!(set.is_empty());
    }
}
