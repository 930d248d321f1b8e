use crate::error::Result;
use rusqlite::{Connection, OpenFlags};

/// SQLite `journal_mode` applied when the container is opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JournalMode {
    #[default]
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Persist => "PERSIST",
            Self::Memory => "MEMORY",
            Self::Wal => "WAL",
            Self::Off => "OFF",
        }
    }
}

/// SQLite `synchronous` setting applied when the container is opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SynchronousMode {
    Off,
    Normal,
    #[default]
    Full,
    Extra,
}

impl SynchronousMode {
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
            Self::Extra => "EXTRA",
        }
    }
}

/// SQLite `locking_mode` applied when the container is opened.
///
/// With `Exclusive` the write lock is kept from the first write until the
/// connection is closed, so no other process can read the file meanwhile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LockingMode {
    #[default]
    Normal,
    Exclusive,
}

impl LockingMode {
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Exclusive => "EXCLUSIVE",
        }
    }
}

/// Connection settings applied once when a container is opened for writing.
///
/// `Default` keeps SQLite's own defaults and commits every tile on its own.
/// [`ContainerOptions::throughput`] trades durability for speed, which suits
/// a single-writer output file that is thrown away if the session fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerOptions {
    pub shared_cache: bool,
    pub journal_mode: JournalMode,
    pub synchronous: SynchronousMode,
    pub locking_mode: LockingMode,
    /// Number of tile rows inserted per transaction.
    pub batch_insert_size: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            shared_cache: false,
            journal_mode: JournalMode::default(),
            synchronous: SynchronousMode::default(),
            locking_mode: LockingMode::default(),
            batch_insert_size: 1,
        }
    }
}

impl ContainerOptions {
    pub fn throughput() -> Self {
        Self {
            shared_cache: true,
            journal_mode: JournalMode::Off,
            synchronous: SynchronousMode::Off,
            locking_mode: LockingMode::Exclusive,
            batch_insert_size: 10_000,
        }
    }

    pub(crate) fn open_flags(&self) -> OpenFlags {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.shared_cache {
            flags |= OpenFlags::SQLITE_OPEN_SHARED_CACHE;
        }
        flags
    }

    pub(crate) fn apply(&self, conn: &Connection) -> Result<()> {
        // journal_mode and locking_mode report the resulting mode back as a row.
        let journal_mode: String = conn.pragma_update_and_check(
            None,
            "journal_mode",
            self.journal_mode.pragma_value(),
            |row| row.get(0),
        )?;
        conn.pragma_update(None, "synchronous", self.synchronous.pragma_value())?;
        let locking_mode: String = conn.pragma_update_and_check(
            None,
            "locking_mode",
            self.locking_mode.pragma_value(),
            |row| row.get(0),
        )?;

        log::debug!(
            "container pragmas: journal_mode={journal_mode}, synchronous={}, locking_mode={locking_mode}, shared_cache={}",
            self.synchronous.pragma_value(),
            self.shared_cache
        );
        Ok(())
    }

    pub(crate) fn effective_batch_size(&self) -> usize {
        self.batch_insert_size.max(1)
    }
}
