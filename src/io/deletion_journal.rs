use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::model::catalog::Catalog;
use crate::model::item::{CollectionId, ItemId};
use crate::ops::store::{DeleteCommand, DeletionQueue};

/// Journal file inside the bulkmod directory
pub const JOURNAL_FILE: &str = "deletions.jsonl";

/// Error type for journal operations
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed journal entry on line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
    #[error("could not encode journal entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Append-only record of requested deletions, one JSON object per line.
/// `bm purge` consumes it.
#[derive(Debug, Clone)]
pub struct DeletionJournal {
    path: PathBuf,
}

impl DeletionJournal {
    pub fn new(bulk_dir: &Path) -> Self {
        DeletionJournal {
            path: bulk_dir.join(JOURNAL_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> JournalError {
        JournalError::Io {
            path: self.path.clone(),
            source,
        }
    }

    pub fn append(&self, command: &DeleteCommand) -> Result<(), JournalError> {
        let mut line = serde_json::to_string(command)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| self.io_error(e))
    }

    /// Every journaled command, oldest first. A missing journal is empty.
    pub fn read(&self) -> Result<Vec<DeleteCommand>, JournalError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        text.lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| {
                serde_json::from_str(l).map_err(|source| JournalError::Parse {
                    line: i + 1,
                    source,
                })
            })
            .collect()
    }

    pub fn clear(&self) -> Result<(), JournalError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

impl DeletionQueue for DeletionJournal {
    fn enqueue(&self, command: DeleteCommand) {
        if let Err(e) = self.append(&command) {
            tracing::warn!(item = command.item, error = %e, "could not journal deletion");
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub purged: Vec<(CollectionId, ItemId)>,
    /// Commands whose item was already gone or no longer flagged
    pub skipped: usize,
    /// Flagged items purged without a journal entry
    pub unjournaled: usize,
}

/// Remove every journaled item that is still marked deleting, then any
/// other item still flagged whose command never reached the journal
pub fn purge(catalog: &mut Catalog, commands: &[DeleteCommand]) -> PurgeReport {
    let mut report = PurgeReport::default();
    for command in commands {
        if catalog.purge_item(command.collection, command.item) {
            report.purged.push((command.collection, command.item));
        } else {
            report.skipped += 1;
        }
    }

    let leftovers: Vec<(CollectionId, ItemId)> = catalog
        .collections()
        .flat_map(|c| {
            c.items
                .values()
                .filter(|item| item.deleting)
                .map(move |item| (c.id, item.id))
        })
        .collect();
    for (collection, item) in leftovers {
        if catalog.purge_item(collection, item) {
            tracing::warn!(collection, item, "purging flagged item missing from the journal");
            report.purged.push((collection, item));
            report.unjournaled += 1;
        }
    }

    if !report.purged.is_empty() {
        tracing::info!(purged = report.purged.len(), skipped = report.skipped, "purged deleted items");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::store::Store;
    use crate::ops::test_helpers::sample_catalog;
    use tempfile::TempDir;

    #[test]
    fn test_journal_append_and_read() {
        let tmp = TempDir::new().unwrap();
        let journal = DeletionJournal::new(tmp.path());
        assert!(journal.read().unwrap().is_empty());

        journal.enqueue(DeleteCommand::new(1, 12));
        journal.enqueue(DeleteCommand::new(2, 201));

        let commands = journal.read().unwrap();
        let pairs: Vec<(CollectionId, ItemId)> =
            commands.iter().map(|c| (c.collection, c.item)).collect();
        assert_eq!(pairs, vec![(1, 12), (2, 201)]);

        let text = fs::read_to_string(journal.path()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with(r#"{"collection":1,"item":12,"requested_at":""#));

        journal.clear().unwrap();
        assert!(journal.read().unwrap().is_empty());
        journal.clear().unwrap();
    }

    #[test]
    fn test_journal_reports_bad_lines() {
        let tmp = TempDir::new().unwrap();
        let journal = DeletionJournal::new(tmp.path());
        journal.append(&DeleteCommand::new(1, 12)).unwrap();
        let mut file = OpenOptions::new().append(true).open(journal.path()).unwrap();
        file.write_all(b"\nnot json\n").unwrap();

        assert!(matches!(
            journal.read(),
            Err(JournalError::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn test_purge_sweeps_flagged_items_without_journal_entry() {
        let mut catalog = sample_catalog();
        catalog.mark_deleting(21).unwrap();
        catalog.mark_deleting(201).unwrap();

        let report = purge(&mut catalog, &[]);
        assert_eq!(report.purged, vec![(1, 21), (2, 201)]);
        assert_eq!(report.unjournaled, 2);
        assert_eq!(report.skipped, 0);
        assert!(catalog.item(21).is_none());
        assert!(catalog.get(1).unwrap().container(2).unwrap().sequence.is_empty());
        assert!(catalog.get(1).unwrap().dirty);
        assert!(catalog.get(2).unwrap().dirty);

        let again = purge(&mut catalog, &[]);
        assert_eq!(again, PurgeReport::default());
    }

    #[test]
    fn test_purge_removes_only_flagged_items() {
        let mut catalog = sample_catalog();
        catalog.mark_deleting(12).unwrap();
        let commands = vec![
            DeleteCommand::new(1, 12),
            // Never flagged
            DeleteCommand::new(1, 13),
            // Unknown
            DeleteCommand::new(1, 999),
        ];

        let report = purge(&mut catalog, &commands);
        assert_eq!(report.purged, vec![(1, 12)]);
        assert_eq!(report.skipped, 2);
        assert!(catalog.item(12).is_none());
        assert_eq!(
            catalog.get(1).unwrap().container(1).unwrap().sequence,
            vec![11, 13, 14]
        );
    }
}
