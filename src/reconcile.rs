//! Inventory reconciliation.
//!
//! Three inventories can hold a recording: the recorder's local folder, the
//! Drive backup folder, and the lecture database. Reconciliation is a pure
//! set difference over derived `(date, class)` identifiers, recomputed fresh
//! each run. Files get deleted off the recorder and rows get edited by hand,
//! so cached state would only lie.

use crate::schedule::{ClassSchedule, RecordingIdentity};
use std::collections::HashSet;
use std::fmt;

/// The natural key joining local files, remote files, and persisted lectures:
/// `"<date>: <class name>"`.
///
/// Keying on the derived date/class pair instead of the filename absorbs
/// renames and re-uploads. The cost is that two recordings of the same class
/// on the same date collide; one lecture per class per day is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LectureIdentifier(String);

impl LectureIdentifier {
    pub fn new(date: &str, class_name: &str) -> Self {
        Self(format!("{}: {}", date, class_name))
    }

    /// Reconstruct from an already-rendered key (e.g. read back from the
    /// database).
    pub fn from_key(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LectureIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the identifier for a resolved recording, or `None` when its
/// schedule slot is unmapped (the file is skipped, not failed).
pub fn identify(identity: &RecordingIdentity, schedule: &ClassSchedule) -> Option<LectureIdentifier> {
    schedule
        .class_for(&identity.class_key)
        .map(|class| LectureIdentifier::new(&identity.date, class))
}

/// Identifiers present in `candidates` but absent from `persisted`.
///
/// Exact string equality, no fuzzy matching. Items only in the persisted set
/// are never surfaced. Output order follows `candidates`; duplicates within
/// `candidates` are collapsed.
pub fn reconcile(
    candidates: &[LectureIdentifier],
    persisted: &HashSet<LectureIdentifier>,
) -> Vec<LectureIdentifier> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|id| !persisted.contains(*id) && seen.insert((*id).clone()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::resolve;

    fn id(key: &str) -> LectureIdentifier {
        LectureIdentifier::from_key(key)
    }

    #[test]
    fn test_reconcile_is_exact_set_difference() {
        let local = vec![id("2024-03-04: A"), id("2024-03-05: B"), id("2024-03-06: C")];
        let persisted: HashSet<_> = [id("2024-03-05: B")].into_iter().collect();

        let missing = reconcile(&local, &persisted);
        assert_eq!(missing, vec![id("2024-03-04: A"), id("2024-03-06: C")]);
    }

    #[test]
    fn test_persisted_only_items_never_surface() {
        let local = vec![id("2024-03-04: A")];
        let persisted: HashSet<_> =
            [id("2024-03-04: A"), id("2023-01-01: Old")].into_iter().collect();

        assert!(reconcile(&local, &persisted).is_empty());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let local = vec![id("2024-03-04: A"), id("2024-03-05: B")];
        let persisted: HashSet<_> = [id("2024-03-04: A")].into_iter().collect();

        let first = reconcile(&local, &persisted);
        let second = reconcile(&local, &persisted);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_candidates_collapse() {
        let local = vec![id("2024-03-04: A"), id("2024-03-04: A")];
        let persisted = HashSet::new();
        assert_eq!(reconcile(&local, &persisted).len(), 1);
    }

    #[test]
    fn test_unmapped_slot_yields_no_identifier() {
        // 14:30 on a Tuesday is not in the schedule; the recording is skipped.
        let identity = resolve("20240305143000.wav").unwrap();
        let schedule = crate::schedule::ClassSchedule::default();
        assert_eq!(identify(&identity, &schedule), None);
    }

    #[test]
    fn test_mapped_recording_becomes_work() {
        // Monday 9:30 AM slot is Operations Management.
        let identity = resolve("20240304093000.wav").unwrap();
        let schedule = crate::schedule::ClassSchedule::default();
        let identifier = identify(&identity, &schedule).unwrap();
        assert_eq!(
            identifier.as_str(),
            "2024-03-04: MBA 530 Operations Management"
        );

        let persisted: HashSet<_> =
            [id("2024-03-03: MBA 530 Operations Management")].into_iter().collect();
        let missing = reconcile(&[identifier.clone()], &persisted);
        assert_eq!(missing, vec![identifier]);
    }
}
