// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed event journal
//!
//! One JSON envelope per line, fsync'd after every append. Reopening a
//! journal resumes id assignment after the highest recorded envelope, so
//! a restarted coordinator can replay the log and continue it.

use saga_core::{EventEnvelope, EventStore, SagaEvent, StoreError};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable [`EventStore`] implementation
pub struct Journal {
    inner: Mutex<Inner>,
}

struct Inner {
    path: PathBuf,
    file: File,
    next_id: u64,
    entries: u64,
    appended: bool,
    // The file already held envelopes when this instance opened it.
    reopened_with_content: bool,
}

impl Journal {
    /// Open or create a journal at `path`
    ///
    /// An existing file is scanned to resume id assignment after its
    /// last envelope; a corrupt line fails the open.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let mut next_id = 1u64;
        let mut entries = 0u64;
        for envelope in read_envelopes(path)? {
            next_id = next_id.max(envelope.id + 1);
            entries += 1;
        }

        tracing::debug!(path = %path.display(), entries, "journal opened");

        Ok(Self {
            inner: Mutex::new(Inner {
                path: path.to_path_buf(),
                file,
                next_id,
                entries,
                appended: false,
                reopened_with_content: entries > 0,
            }),
        })
    }
}

impl EventStore for Journal {
    fn append(&self, event: SagaEvent) -> Result<EventEnvelope, StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        let envelope = EventEnvelope::new(inner.next_id, event);
        let line = serde_json::to_string(&envelope)?;
        writeln!(inner.file, "{}", line)?;
        // Durability before acknowledgment.
        inner.file.sync_all()?;

        inner.next_id += 1;
        inner.entries += 1;
        inner.appended = true;
        Ok(envelope)
    }

    fn events(&self) -> Result<Vec<EventEnvelope>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        read_envelopes(&inner.path)
    }

    fn populate(&self, envelopes: Vec<EventEnvelope>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        // A populated prefix and an organically written log are mutually
        // exclusive sources of history. Repeating populate before the
        // first append replaces the previous prefix.
        if inner.appended || inner.reopened_with_content {
            return Err(StoreError::PopulateAfterAppend);
        }

        inner.file.set_len(0)?;
        for envelope in &envelopes {
            let line = serde_json::to_string(envelope)?;
            writeln!(inner.file, "{}", line)?;
        }
        inner.file.sync_all()?;

        inner.next_id = envelopes.iter().map(|e| e.id + 1).max().unwrap_or(1);
        inner.entries = envelopes.len() as u64;
        Ok(())
    }
}

fn read_envelopes(path: &Path) -> Result<Vec<EventEnvelope>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let reader = BufReader::new(file);
    let mut envelopes = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        envelopes.push(serde_json::from_str(&line)?);
    }
    Ok(envelopes)
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
