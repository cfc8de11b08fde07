use std::fmt;

/// UI-visible sync status. Load and save cycles share it; the latest
/// transition wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Loading,
    Applied,
    Conflict,
    Syncing,
    Success,
    Error,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Applied => "applied",
            Self::Conflict => "conflict",
            Self::Syncing => "syncing",
            Self::Success => "saved",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// No identity; nothing was fetched.
    Inert,
    /// No shared document for the period yet.
    Absent,
    /// Remote snapshot applied; carries its `lastModified`.
    Applied(i64),
    /// Local watermark is ahead of the remote copy; nothing applied.
    Conflict { local: i64, remote: i64 },
    /// The period or identity changed while the fetch was in flight.
    Stale,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Inert,
    /// Nothing unsaved to flush.
    Clean,
    /// Skipped while a conflict is waiting for the user.
    Suppressed,
    /// A timer fired after its period stopped being active.
    Stale,
    /// Written; carries the stamped `lastModified`.
    Saved(i64),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResyncOutcome {
    pub load: LoadOutcome,
    pub save: Option<SaveOutcome>,
}

/// True when the locally remembered watermark is ahead of the remote
/// timestamp by more than `threshold_ms`. Differences inside the window are
/// treated as clock skew.
pub fn is_conflict(watermark: Option<i64>, remote: i64, threshold_ms: i64) -> bool {
    watermark.is_some_and(|local| local - remote > threshold_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_watermark_never_conflicts() {
        assert!(!is_conflict(None, 0, 0));
    }

    #[test]
    fn test_strictly_ahead_conflicts_without_threshold() {
        assert!(is_conflict(Some(101), 100, 0));
        assert!(!is_conflict(Some(100), 100, 0));
        assert!(!is_conflict(Some(99), 100, 0));
    }

    #[test]
    fn test_threshold_absorbs_skew() {
        assert!(!is_conflict(Some(130_000), 100_000, 60_000));
        assert!(is_conflict(Some(170_000), 100_000, 60_000));
    }
}
