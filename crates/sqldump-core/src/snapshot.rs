//! Snapshot transaction guard
//!
//! Holds the one read-only, repeatable-read transaction a dump runs in. The
//! transaction is never committed: `close()` rolls it back, and dropping an
//! open guard rolls it back too, so every exit path leaves the source
//! database untouched. Object locks taken through the guard are released
//! before the rollback.

use crate::errors::{invalid_state, DumpError, DumpErrorKind, Result};
use crate::source::DumpSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapshotState {
    Idle,
    Open,
    Closed,
}

/// RAII handle over the dump's snapshot transaction
pub struct SnapshotTransaction<'s> {
    source: &'s mut dyn DumpSource,
    state: SnapshotState,
    locked: bool,
}

impl<'s> SnapshotTransaction<'s> {
    pub fn new(source: &'s mut dyn DumpSource) -> Self {
        Self {
            source,
            state: SnapshotState::Idle,
            locked: false,
        }
    }

    /// Begin the snapshot
    ///
    /// # Errors
    ///
    /// - `Connection`: the database could not start the transaction
    /// - `InvalidState`: the guard was already opened
    pub fn open(&mut self) -> Result<()> {
        if self.state != SnapshotState::Idle {
            return Err(invalid_state("open_snapshot", "snapshot already opened"));
        }
        match self.source.begin_snapshot() {
            Ok(()) => {
                self.state = SnapshotState::Open;
                tracing::debug!("Opened read-only snapshot");
                Ok(())
            }
            Err(err) => {
                // Undo any partial session setup the source did before failing
                if let Err(rollback_err) = self.source.rollback() {
                    tracing::warn!(error = %rollback_err, "Rollback after failed begin also failed");
                }
                self.state = SnapshotState::Closed;
                Err(as_connection_error("open_snapshot", err))
            }
        }
    }

    /// Select the database to dump, inside the snapshot
    ///
    /// # Errors
    ///
    /// - `InvalidState`: called before `open()` or after `close()`
    /// - `Connection`: the database cannot be selected
    pub fn select_database(&mut self, name: &str) -> Result<()> {
        if self.state != SnapshotState::Open {
            return Err(invalid_state("select_database", "transaction not started"));
        }
        self.source
            .use_database(name)
            .map_err(|err| as_connection_error("select_database", err))
    }

    /// Read-lock `objects` until the guard is closed or dropped
    pub fn lock_tables(&mut self, objects: &[String]) -> Result<()> {
        if self.state != SnapshotState::Open {
            return Err(invalid_state("lock_tables", "transaction not started"));
        }
        self.source.lock_tables(objects)?;
        self.locked = true;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.state == SnapshotState::Open
    }

    /// The source, for queries issued inside the snapshot
    pub fn source(&mut self) -> &mut dyn DumpSource {
        &mut *self.source
    }

    /// Release locks and roll the snapshot back
    ///
    /// Calling `close` more than once is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.state != SnapshotState::Open {
            return Ok(());
        }
        self.state = SnapshotState::Closed;
        let unlocked = self.release_locks();
        let rolled_back = self.source.rollback();
        tracing::debug!("Rolled back read-only snapshot");
        unlocked.and(rolled_back)
    }

    fn release_locks(&mut self) -> Result<()> {
        if !self.locked {
            return Ok(());
        }
        self.locked = false;
        self.source.unlock_tables()
    }
}

impl Drop for SnapshotTransaction<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(error = %err, "Failed to release snapshot");
        }
    }
}

fn as_connection_error(op: &str, err: DumpError) -> DumpError {
    if err.kind() == DumpErrorKind::Connection {
        return err;
    }
    DumpError::new(DumpErrorKind::Connection)
        .with_op(op.to_string())
        .with_message(err.to_string())
}
