//! Imported-subject list and its merge-by-title semantics.

use crate::schedule::RawScheduleSource;

/// Outcome of merging an import batch into the library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Titles whose data was replaced in place
    pub replaced: Vec<String>,
    /// Titles appended to the end of the list
    pub added: Vec<String>,
}

impl MergeReport {
    pub fn total(&self) -> usize {
        self.replaced.len() + self.added.len()
    }
}

/// Merges `incoming` into `library`.
///
/// A subject whose title is already present replaces that entry at its
/// position; new titles are appended in batch order.
pub fn merge_subjects(
    library: &mut Vec<RawScheduleSource>,
    incoming: Vec<RawScheduleSource>,
) -> MergeReport {
    let mut report = MergeReport::default();

    for subject in incoming {
        match library.iter_mut().find(|s| s.title == subject.title) {
            Some(existing) => {
                report.replaced.push(subject.title.clone());
                *existing = subject;
            }
            None => {
                report.added.push(subject.title.clone());
                library.push(subject);
            }
        }
    }

    report
}
