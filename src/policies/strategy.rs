//! # Supervisor restart strategies.
//!
//! When a child is going to be restarted, the [`Strategy`] decides which of its
//! siblings go down and come back with it. Registration order matters: it is
//! the startup order, and its reverse is the teardown order.
//!
//! ```text
//! children: [a, b, c, d]      b fails
//!
//! OneForOne  → respawn b
//! AllForOne  → stop d, c, a   → respawn a, b, c, d
//! RestForOne → stop d, c      → respawn b, c, d
//! ```

/// Blast radius applied to siblings when one child is restarted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Only the failed child is restarted (default).
    #[default]
    OneForOne,
    /// Every child is stopped and restarted.
    AllForOne,
    /// The failed child and every child registered after it are restarted.
    RestForOne,
}

impl Strategy {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Strategy::OneForOne => "one_for_one",
            Strategy::AllForOne => "all_for_one",
            Strategy::RestForOne => "rest_for_one",
        }
    }

    /// Indices of the siblings that must be stopped before `failed` is
    /// respawned, in teardown (reverse registration) order. The same siblings
    /// come back with `failed`, in registration order.
    pub(crate) fn siblings_to_stop(&self, failed: usize, len: usize) -> Vec<usize> {
        match self {
            Strategy::OneForOne => Vec::new(),
            Strategy::AllForOne => (0..len).rev().filter(|&i| i != failed).collect(),
            Strategy::RestForOne => ((failed + 1)..len).rev().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_for_one_touches_nobody_else() {
        assert!(Strategy::OneForOne.siblings_to_stop(1, 4).is_empty());
    }

    #[test]
    fn test_all_for_one_stops_others_in_reverse() {
        assert_eq!(Strategy::AllForOne.siblings_to_stop(1, 4), vec![3, 2, 0]);
    }

    #[test]
    fn test_rest_for_one_only_later_children() {
        assert_eq!(Strategy::RestForOne.siblings_to_stop(1, 4), vec![3, 2]);
        assert!(Strategy::RestForOne.siblings_to_stop(3, 4).is_empty());
        assert_eq!(Strategy::RestForOne.as_label(), "rest_for_one");
    }
}
