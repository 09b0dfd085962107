//! Schema loader: refreshes extension slots from the descriptor file.
//!
//! The loader keeps the modification time of the last descriptor file it
//! parsed and only parses again when the file on disk is strictly newer.
//! That makes [`SchemaLoader::refresh`] cheap enough to run before every
//! registry read.
//!
//! # File Layout
//!
//! ```text
//! line 0 .. OB_SPARE-1          reserved, skipped without parsing
//! line OB_SPARE .. N-1          one extension record per line
//! ```
//!
//! Lines longer than [`MAX_LINE_LEN`] bytes are not buffered in full. A
//! reserved line over the limit is skipped, and an extension line over the
//! limit is reported as malformed.
//!
//! Nothing the file contains can make a refresh fail. Unreadable files, stale
//! caches, malformed lines, and truncated files all leave the slots in their
//! last good state and are reported through [`RefreshOutcome`].

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::descriptor::{DescriptorRecord, parse_record};
use crate::observable::{OB_SPARE, OBSERVABLE_COUNT};
use crate::slot::Slot;

/// Longest descriptor line read, terminator included.
pub const MAX_LINE_LEN: usize = 1024;

/// How one bounded line read ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineRead {
    /// No bytes left.
    End,
    /// A line ending in `\n`.
    Terminated,
    /// The last line of the file, without a terminator.
    Unterminated,
    /// A line longer than [`MAX_LINE_LEN`]; the buffer holds its first bytes.
    Overlong,
}

/// Reads one line into `buf`, keeping at most [`MAX_LINE_LEN`] bytes.
///
/// The rest of an overlong line is consumed without being buffered.
fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<LineRead> {
    buf.clear();
    let read = reader
        .by_ref()
        .take(MAX_LINE_LEN as u64)
        .read_until(b'\n', buf)?;

    if read == 0 {
        return Ok(LineRead::End);
    }
    if buf.last() == Some(&b'\n') {
        return Ok(LineRead::Terminated);
    }
    if read < MAX_LINE_LEN || reader.skip_until(b'\n')? == 0 {
        return Ok(LineRead::Unterminated);
    }
    Ok(LineRead::Overlong)
}

/// Result of a [`SchemaLoader::refresh`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Nothing was parsed.
    Skipped(SkipReason),
    /// The file was parsed cleanly.
    Loaded(ReloadReport),
    /// The file was parsed but some records were malformed or missing.
    Degraded(ReloadReport),
}

impl RefreshOutcome {
    /// The reload report, if the file was parsed.
    pub fn report(&self) -> Option<&ReloadReport> {
        match self {
            Self::Skipped(_) => None,
            Self::Loaded(report) | Self::Degraded(report) => Some(report),
        }
    }

    /// Whether the file was parsed during this refresh.
    pub fn reloaded(&self) -> bool {
        self.report().is_some()
    }
}

/// Why a refresh parsed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The descriptor file could not be opened or stat'ed.
    Unavailable,
    /// The file has not been modified since the last parse.
    Unchanged,
}

/// What happened during one parse of the descriptor file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReloadReport {
    /// Extension slots replaced with new attributes.
    pub installed: usize,
    /// Records marked `spare`.
    pub spare: usize,
    /// Records that matched neither layout.
    pub malformed: Vec<MalformedLine>,
    /// Record index at which the file ended early, if it did.
    pub truncated_at: Option<usize>,
}

impl ReloadReport {
    /// Whether any record was malformed or missing.
    pub fn is_degraded(&self) -> bool {
        !self.malformed.is_empty() || self.truncated_at.is_some()
    }
}

/// A descriptor line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLine {
    /// Record (line) index in the file.
    pub record: usize,
    /// Number of fields that parsed before the scan stopped.
    pub fields: usize,
    /// The offending line, without its terminator.
    pub line: String,
}

/// Loads extension slot definitions from a descriptor file.
///
/// # Thread Safety
///
/// The loader mutates its cache on every refresh and is meant for a single
/// thread. Callers sharing one across threads must serialize access.
#[derive(Debug)]
pub struct SchemaLoader {
    /// Descriptor file path.
    path: PathBuf,
    /// Modification time of the last file parsed.
    load_time: Option<SystemTime>,
    /// Number of times the file has been parsed.
    parse_count: u64,
}

impl SchemaLoader {
    /// Creates a loader for the descriptor file at `path`.
    ///
    /// The file does not need to exist yet.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            load_time: None,
            parse_count: 0,
        }
    }

    /// The descriptor file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Modification time of the last file parsed, if any.
    pub fn load_time(&self) -> Option<SystemTime> {
        self.load_time
    }

    /// Number of times the descriptor file has been parsed.
    pub fn parse_count(&self) -> u64 {
        self.parse_count
    }

    /// Forgets the cached modification time so the next refresh parses the
    /// file regardless of its age.
    pub fn invalidate(&mut self) {
        self.load_time = None;
    }

    /// Re-reads the descriptor file if it changed since the last parse.
    ///
    /// `extensions` is the extension range of the slot table, so
    /// `extensions[0]` is the slot at index [`OB_SPARE`]. Only records that
    /// parse into a new, non-spare slot replace an entry; every other entry
    /// keeps its previous state.
    pub fn refresh(&mut self, extensions: &mut [Slot]) -> RefreshOutcome {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) => {
                tracing::trace!("descriptor '{}' not readable: {e}", self.path.display());
                return RefreshOutcome::Skipped(SkipReason::Unavailable);
            }
        };

        let modified = match file.metadata().and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::debug!("cannot stat descriptor '{}': {e}", self.path.display());
                return RefreshOutcome::Skipped(SkipReason::Unavailable);
            }
        };

        if self.load_time.is_some_and(|loaded| modified <= loaded) {
            return RefreshOutcome::Skipped(SkipReason::Unchanged);
        }
        self.load_time = Some(modified);
        self.parse_count += 1;

        let report = self.parse(BufReader::new(file), extensions);
        tracing::debug!(
            "loaded descriptor '{}': {} installed, {} spare, {} malformed",
            self.path.display(),
            report.installed,
            report.spare,
            report.malformed.len()
        );

        if report.is_degraded() {
            RefreshOutcome::Degraded(report)
        } else {
            RefreshOutcome::Loaded(report)
        }
    }

    fn parse<R: BufRead>(&self, mut reader: R, extensions: &mut [Slot]) -> ReloadReport {
        let mut report = ReloadReport::default();
        let mut buf = Vec::new();

        for record in 0..OBSERVABLE_COUNT {
            let read = match read_line(&mut reader, &mut buf) {
                Ok(read) => read,
                Err(e) => {
                    tracing::warn!(
                        "error reading descriptor '{}' at record {record}: {e}",
                        self.path.display()
                    );
                    report.truncated_at = Some(record);
                    break;
                }
            };

            if record < OB_SPARE {
                // A reserved line without a terminator means the file ended.
                if matches!(read, LineRead::End | LineRead::Unterminated) {
                    tracing::warn!(
                        "descriptor '{}' ended in reserved record {record}",
                        self.path.display()
                    );
                    report.truncated_at = Some(record);
                    break;
                }
                continue;
            }

            match read {
                LineRead::End => {
                    tracing::warn!(
                        "descriptor '{}' ended after {record} of {OBSERVABLE_COUNT} records",
                        self.path.display()
                    );
                    report.truncated_at = Some(record);
                    break;
                }
                LineRead::Overlong => {
                    tracing::warn!(
                        "descriptor record {record} is longer than {MAX_LINE_LEN} bytes"
                    );
                    report.malformed.push(MalformedLine {
                        record,
                        fields: 0,
                        line: String::from_utf8_lossy(&buf).into_owned(),
                    });
                    continue;
                }
                LineRead::Terminated | LineRead::Unterminated => {}
            }

            let line = String::from_utf8_lossy(&buf);
            match parse_record(&line) {
                DescriptorRecord::Slot { attrs, .. } => {
                    if let Some(slot) = extensions.get_mut(record - OB_SPARE)
                        && slot.install(attrs)
                    {
                        report.installed += 1;
                    }
                }
                DescriptorRecord::Spare => report.spare += 1,
                DescriptorRecord::Malformed { fields } => {
                    let line = line.trim_end_matches(['\n', '\r']).to_string();
                    tracing::warn!("wrong line format in descriptor record {record}: {line}");
                    report.malformed.push(MalformedLine {
                        record,
                        fields,
                        line,
                    });
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;
    use crate::observable::EXTENSION_COUNT;

    fn empty_extensions() -> Vec<Slot> {
        vec![Slot::Extension(None); EXTENSION_COUNT]
    }

    fn reserved_lines() -> String {
        (0..OB_SPARE).map(|i| format!("{i},builtin_{i}\n")).collect()
    }

    fn write_descriptor(path: &Path, contents: &str, modified: SystemTime) {
        let mut file = File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.set_modified(modified).unwrap();
    }

    fn epoch_plus(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = SchemaLoader::new(dir.path().join("ts_key"));
        let mut slots = empty_extensions();

        let outcome = loader.refresh(&mut slots);
        assert_eq!(outcome, RefreshOutcome::Skipped(SkipReason::Unavailable));
        assert_eq!(loader.parse_count(), 0);
        assert!(loader.load_time().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_keeps_slots() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts_key");
        let mut loader = SchemaLoader::new(&path);
        let mut slots = empty_extensions();

        let contents = format!("{}64,queue,Queue depth,jobs,0,10,1\n", reserved_lines());
        write_descriptor(&path, &contents, epoch_plus(1_000));
        assert!(loader.refresh(&mut slots).reloaded());

        let newer = format!("{}64,other,Other,ops,0,1,0\n", reserved_lines());
        write_descriptor(&path, &newer, epoch_plus(2_000));
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can open the file regardless of its mode.
        if File::open(&path).is_ok() {
            return;
        }

        assert_eq!(
            loader.refresh(&mut slots),
            RefreshOutcome::Skipped(SkipReason::Unavailable)
        );
        assert_eq!(slots[0].attrs().unwrap().name, "queue");
        assert_eq!(loader.parse_count(), 1);
        assert_eq!(loader.load_time(), Some(epoch_plus(1_000)));
    }

    #[test]
    fn test_overlong_line_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts_key");
        let long_name = "x".repeat(MAX_LINE_LEN * 4);
        let contents = format!(
            "{}64,{long_name},Long,units,0,1,1\n65,next,Next\n",
            reserved_lines()
        );
        write_descriptor(&path, &contents, epoch_plus(1_000));

        let mut loader = SchemaLoader::new(&path);
        let mut slots = empty_extensions();

        match loader.refresh(&mut slots) {
            RefreshOutcome::Degraded(report) => {
                assert_eq!(report.malformed.len(), 1);
                assert_eq!(report.malformed[0].record, OB_SPARE);
                assert_eq!(report.malformed[0].fields, 0);
                assert_eq!(report.malformed[0].line.len(), MAX_LINE_LEN);
                assert_eq!(report.installed, 1);
            }
            other => panic!("expected degraded outcome, got {other:?}"),
        }
        assert!(!slots[0].is_populated());
        assert_eq!(slots[1].attrs().unwrap().name, "next");
    }

    #[test]
    fn test_overlong_reserved_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts_key");
        let mut contents = format!("0,{}\n", "r".repeat(MAX_LINE_LEN * 2));
        for i in 1..OB_SPARE {
            contents.push_str(&format!("{i},builtin_{i}\n"));
        }
        contents.push_str("64,queue,Queue depth,jobs,0,10,1\n");
        write_descriptor(&path, &contents, epoch_plus(1_000));

        let mut loader = SchemaLoader::new(&path);
        let mut slots = empty_extensions();

        let outcome = loader.refresh(&mut slots);
        let report = outcome.report().unwrap();
        assert!(report.malformed.is_empty());
        assert_eq!(report.installed, 1);
        assert_eq!(slots[0].attrs().unwrap().name, "queue");
    }

    #[test]
    fn test_unchanged_file_is_not_reparsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts_key");
        let contents = format!("{}64,queue,Queue depth,jobs,0,10,1\n", reserved_lines());
        write_descriptor(&path, &contents, epoch_plus(1_000));

        let mut loader = SchemaLoader::new(&path);
        let mut slots = empty_extensions();

        assert!(loader.refresh(&mut slots).reloaded());
        assert_eq!(
            loader.refresh(&mut slots),
            RefreshOutcome::Skipped(SkipReason::Unchanged)
        );
        assert_eq!(loader.parse_count(), 1);
        assert_eq!(loader.load_time(), Some(epoch_plus(1_000)));

        // An older file is not newer than the cache either.
        write_descriptor(&path, &contents, epoch_plus(500));
        assert!(!loader.refresh(&mut slots).reloaded());

        loader.invalidate();
        assert!(loader.refresh(&mut slots).reloaded());
        assert_eq!(loader.parse_count(), 2);
    }

    #[test]
    fn test_truncated_in_reserved_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts_key");
        write_descriptor(&path, "0,users\n1,rootprocs", epoch_plus(1_000));

        let mut loader = SchemaLoader::new(&path);
        let mut slots = empty_extensions();

        match loader.refresh(&mut slots) {
            RefreshOutcome::Degraded(report) => {
                assert_eq!(report.truncated_at, Some(1));
                assert_eq!(report.installed, 0);
            }
            other => panic!("expected degraded outcome, got {other:?}"),
        }
        assert!(slots.iter().all(|slot| !slot.is_populated()));
    }

    #[test]
    fn test_truncated_in_extension_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts_key");
        let contents = format!(
            "{}64,first,First,units,0,1,1\n65,second,Second",
            reserved_lines()
        );
        write_descriptor(&path, &contents, epoch_plus(1_000));

        let mut loader = SchemaLoader::new(&path);
        let mut slots = empty_extensions();

        let outcome = loader.refresh(&mut slots);
        let report = outcome.report().unwrap();
        assert_eq!(report.installed, 2);
        assert_eq!(report.truncated_at, Some(OB_SPARE + 2));
        assert_eq!(slots[1].attrs().unwrap().description, "Second");
        assert!(!slots[2].is_populated());
    }

    #[test]
    fn test_malformed_line_keeps_previous_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts_key");
        let mut loader = SchemaLoader::new(&path);
        let mut slots = empty_extensions();

        let good = format!("{}64,queue,Queue depth,jobs,0,10,1\n", reserved_lines());
        write_descriptor(&path, &good, epoch_plus(1_000));
        loader.refresh(&mut slots);

        let bad = format!("{}64,queue,Queue depth,jobs\n", reserved_lines());
        write_descriptor(&path, &bad, epoch_plus(2_000));
        match loader.refresh(&mut slots) {
            RefreshOutcome::Degraded(report) => {
                assert_eq!(
                    report.malformed,
                    vec![MalformedLine {
                        record: OB_SPARE,
                        fields: 3,
                        line: "64,queue,Queue depth,jobs".to_string(),
                    }]
                );
            }
            other => panic!("expected degraded outcome, got {other:?}"),
        }
        assert_eq!(slots[0].attrs().unwrap().expected_maximum, 10.0);
    }

    #[test]
    fn test_full_file_loads_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts_key");
        let mut contents = reserved_lines();
        for i in OB_SPARE..OBSERVABLE_COUNT {
            if i % 2 == 0 {
                contents.push_str(&format!("{i},spare\n"));
            } else {
                contents.push_str(&format!("{i},metric_{i},Metric {i}\n"));
            }
        }
        // Lines past the last record are ignored.
        contents.push_str("100,overflow,Overflow\n");
        write_descriptor(&path, &contents, epoch_plus(1_000));

        let mut loader = SchemaLoader::new(&path);
        let mut slots = empty_extensions();

        match loader.refresh(&mut slots) {
            RefreshOutcome::Loaded(report) => {
                assert_eq!(report.installed, EXTENSION_COUNT / 2);
                assert_eq!(report.spare, EXTENSION_COUNT / 2);
                assert!(report.malformed.is_empty());
                assert_eq!(report.truncated_at, None);
            }
            other => panic!("expected clean load, got {other:?}"),
        }
        assert!(!slots[0].is_populated());
        assert_eq!(slots[1].attrs().unwrap().name, "metric_65");
    }
}
