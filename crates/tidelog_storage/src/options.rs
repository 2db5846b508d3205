//! File configuration.

/// Default capacity of a writable file's in-memory buffer (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Default basename prefix that marks a manifest file.
pub const DEFAULT_MANIFEST_PREFIX: &str = "MANIFEST";

/// How `sync` forces data to stable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Sync file contents only (`fdatasync`).
    Data,
    /// Sync file contents and metadata (`fsync`).
    All,
}

/// Configuration for files created by an environment.
#[derive(Debug, Clone, Copy)]
pub struct FileOptions {
    /// Capacity of the write buffer in bytes.
    pub buffer_size: usize,

    /// Files whose basename starts with this prefix get a directory sync
    /// before every file sync.
    pub manifest_prefix: &'static str,

    /// Sync strategy used by `sync`.
    pub sync_mode: SyncMode,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            manifest_prefix: DEFAULT_MANIFEST_PREFIX,
            sync_mode: SyncMode::Data,
        }
    }
}

impl FileOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the write buffer capacity.
    ///
    /// A capacity of zero is raised to one byte.
    #[must_use]
    pub const fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = if size == 0 { 1 } else { size };
        self
    }

    /// Sets the manifest basename prefix.
    #[must_use]
    pub const fn manifest_prefix(mut self, prefix: &'static str) -> Self {
        self.manifest_prefix = prefix;
        self
    }

    /// Sets the sync strategy.
    #[must_use]
    pub const fn sync_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = mode;
        self
    }
}
