//! The record store.
//!
//! Each category owns a CSV file under the store root. The first append
//! writes the header together with the first row; later appends add one
//! row each, projected onto that header.

use super::clock::{Clock, SystemClock};
use super::error::StoreError;
use crate::models::{Category, Record, Table, TIMESTAMP_FIELD};
use csv::{ReaderBuilder, WriterBuilder};
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Configuration for opening a [`RecordStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the per-category datasets.
    pub root_path: PathBuf,
}

impl From<&crate::config::StoreSettings> for StoreConfig {
    fn from(settings: &crate::config::StoreSettings) -> Self {
        Self {
            root_path: PathBuf::from(&settings.data_dir),
        }
    }
}

/// Difference between a record's fields and a dataset's header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDrift {
    /// Header fields the record does not supply.
    pub missing: Vec<String>,
    /// Record fields the header has no column for.
    pub extra: Vec<String>,
}

impl SchemaDrift {
    fn between(header: &[String], record: &Record) -> Option<Self> {
        let has = |name: &str| name == TIMESTAMP_FIELD || record.get(name).is_some();

        let missing: Vec<String> = header.iter().filter(|h| !has(h.as_str())).cloned().collect();
        let extra: Vec<String> = record
            .field_names()
            .filter(|n| *n != TIMESTAMP_FIELD && !header.iter().any(|h| h == n))
            .map(String::from)
            .collect();

        if missing.is_empty() && extra.is_empty() {
            None
        } else {
            Some(Self { missing, extra })
        }
    }
}

/// Result of trying to publish a new dataset file.
enum Created {
    New,
    Existing,
}

/// Per-category state guarded by the category's lock.
#[derive(Debug, Default)]
struct Dataset {
    /// Cached header, loaded from disk on first use.
    header: Option<Vec<String>>,
}

/// Durable, append-only storage of records, one dataset per category.
///
/// Appends to one category are serialized; loads share the lock and never
/// see a partially written row.
pub struct RecordStore {
    root: PathBuf,
    clock: Arc<dyn Clock>,
    datasets: [RwLock<Dataset>; 4],
}

impl RecordStore {
    /// Open a store rooted at `config.root_path`, creating the directory.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Open a store that stamps records using `clock`.
    pub fn with_clock(config: StoreConfig, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        fs::create_dir_all(&config.root_path)
            .map_err(|e| StoreError::unavailable(&config.root_path, e))?;

        info!("Record store at: {}", config.root_path.display());

        Ok(Self {
            root: config.root_path,
            clock,
            datasets: Default::default(),
        })
    }

    /// Directory holding the datasets.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the dataset file for a category.
    pub fn dataset_path(&self, category: Category) -> PathBuf {
        self.root.join(category.file_name())
    }

    /// Append a record to a category's dataset.
    ///
    /// The record is stamped with the current time. If the dataset already
    /// has a header, header fields the record lacks are written empty and
    /// fields outside the header are dropped.
    pub fn append(&self, category: Category, mut record: Record) -> Result<(), StoreError> {
        let path = self.dataset_path(category);
        let mut dataset = self.datasets[category.index()].write();

        // Stamped under the lock so row order matches timestamp order.
        record.stamp(self.clock.timestamp());

        if dataset.header.is_none() {
            dataset.header = read_header(&path)?;
        }

        let header = match dataset.header.clone() {
            Some(header) => header,
            None => {
                let header: Vec<String> = record.field_names().map(String::from).collect();
                let mut bytes = encode_row(&header)?;
                bytes.extend(encode_row(&project(&record, &header))?);

                match self.create_dataset(&path, &bytes)? {
                    Created::New => {
                        info!("Created {} dataset at {}", category, path.display());
                        debug!("Established {} header: {:?}", category, header);
                        dataset.header = Some(header);
                        return Ok(());
                    }
                    Created::Existing => match read_header(&path)? {
                        Some(existing) => {
                            debug!("{} dataset was created by another writer", category);
                            existing
                        }
                        None => {
                            // Empty file left in place: establish the header in it.
                            append_durably(&path, &bytes)?;
                            debug!("Established {} header: {:?}", category, header);
                            dataset.header = Some(header);
                            return Ok(());
                        }
                    },
                }
            }
        };

        if let Some(drift) = SchemaDrift::between(&header, &record) {
            warn!(
                "Schema drift in {} dataset: missing {:?}, extra {:?}",
                category, drift.missing, drift.extra
            );
        }

        let bytes = encode_row(&project(&record, &header))?;
        append_durably(&path, &bytes)?;
        dataset.header = Some(header);

        debug!("Appended {} record ({} bytes)", category, bytes.len());
        Ok(())
    }

    /// Load every record of a category as a table.
    ///
    /// A category that was never appended to yields an empty table.
    pub fn load_all(&self, category: Category) -> Result<Table, StoreError> {
        let path = self.dataset_path(category);
        let _guard = self.datasets[category.index()].read();

        let Some(file) = open_existing(&path)? else {
            debug!("No {} dataset yet", category);
            return Ok(Table::empty());
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| StoreError::malformed(&path, e))?
            .iter()
            .map(String::from)
            .collect();

        let mut table = Table::with_columns(columns);
        for result in reader.records() {
            let row = result.map_err(|e| StoreError::malformed(&path, e))?;
            table.push_raw(row.iter());
        }

        if !table.drifted_rows().is_empty() {
            warn!(
                "{} dataset has {} row(s) that do not match its header",
                category,
                table.drifted_rows().len()
            );
        }

        debug!("Loaded {} {} row(s)", table.len(), category);
        Ok(table)
    }

    /// The established header of a category, if any record was appended.
    pub fn header(&self, category: Category) -> Result<Option<Vec<String>>, StoreError> {
        let mut dataset = self.datasets[category.index()].write();
        if dataset.header.is_none() {
            dataset.header = read_header(&self.dataset_path(category))?;
        }
        Ok(dataset.header.clone())
    }

    /// Report how `record` would be reshaped if appended to `category`.
    ///
    /// `None` when the dataset has no header yet or the fields match.
    pub fn check_drift(
        &self,
        category: Category,
        record: &Record,
    ) -> Result<Option<SchemaDrift>, StoreError> {
        Ok(self
            .header(category)?
            .and_then(|header| SchemaDrift::between(&header, record)))
    }

    /// Publish a new dataset holding `bytes`, unless one already exists.
    ///
    /// The content is written to a temporary file in the store root and
    /// linked into place without clobbering, so other writers never see a
    /// dataset without its header.
    fn create_dataset(&self, path: &Path, bytes: &[u8]) -> Result<Created, StoreError> {
        let mut staged =
            NamedTempFile::new_in(&self.root).map_err(|e| StoreError::unavailable(&self.root, e))?;

        staged
            .write_all(bytes)
            .and_then(|_| staged.as_file().sync_data())
            .map_err(|e| StoreError::unavailable(staged.path(), e))?;

        match staged.persist_noclobber(path) {
            Ok(_) => Ok(Created::New),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(Created::Existing),
            Err(e) => Err(StoreError::unavailable(path, e.error)),
        }
    }
}

/// Values of `record` in header order; absent fields are empty.
fn project(record: &Record, header: &[String]) -> Vec<String> {
    header
        .iter()
        .map(|h| record.get(h).map(|v| v.to_string()).unwrap_or_default())
        .collect()
}

/// Encode one CSV row, including its terminator.
fn encode_row(fields: &[String]) -> Result<Vec<u8>, StoreError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|e| StoreError::Encode(e.into_error().into()))
}

/// Open a dataset file that exists and holds at least one byte.
fn open_existing(path: &Path) -> Result<Option<File>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::unavailable(path, e)),
    };

    let len = file
        .metadata()
        .map_err(|e| StoreError::unavailable(path, e))?
        .len();

    Ok((len > 0).then_some(file))
}

/// Read the header row of an existing dataset.
fn read_header(path: &Path) -> Result<Option<Vec<String>>, StoreError> {
    let Some(file) = open_existing(path)? else {
        return Ok(None);
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let header = reader
        .headers()
        .map_err(|e| StoreError::malformed(path, e))?
        .iter()
        .map(String::from)
        .collect();

    Ok(Some(header))
}

/// Append `bytes` to an existing dataset with a single write and flush them
/// to disk.
///
/// A last line left without its terminator is closed first so the new row
/// starts on a line of its own.
fn append_durably(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::unavailable(path, e))?;

    let unterminated = ends_unterminated(&mut file).map_err(|e| StoreError::unavailable(path, e))?;

    let mut buf = Vec::with_capacity(bytes.len() + 1);
    if unterminated {
        warn!("{} does not end with a newline; terminating its last line", path.display());
        buf.push(b'\n');
    }
    buf.extend_from_slice(bytes);

    file.write_all(&buf)
        .and_then(|_| file.sync_data())
        .map_err(|e| StoreError::unavailable(path, e))
}

/// Whether a non-empty file's last byte is something other than `\n`.
fn ends_unterminated(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
