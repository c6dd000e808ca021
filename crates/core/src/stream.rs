//! Seeding and streaming the appointment dataset.
//!
//! [`StreamWriter::seed`] replaces the dataset with a header and a fresh population of records.
//! [`StreamWriter::run`] then keeps appending batches at a fixed cadence until it is told to stop
//! through a cancellation channel. Every batch reaches the file through a single `write_all` on
//! an append-mode handle, so a reader opening the file between batches only sees whole rows.

use crate::config::GenerationSettings;
use crate::record::{csv_header, AppointmentRecord};
use crate::synthesizer::Synthesizer;
use crate::{CoreError, CoreResult};
use rand::rngs::StdRng;
use rand::Rng;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// State of an append loop: where the next batch starts and how batches are paced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSession {
    pub next_id: u64,
    pub batch_size: u64,
    pub interval: Duration,
}

/// Sole writer of one dataset file.
pub struct StreamWriter<R: Rng = StdRng> {
    path: PathBuf,
    synthesizer: Synthesizer<R>,
}

impl<R: Rng> StreamWriter<R> {
    pub fn new(path: impl Into<PathBuf>, synthesizer: Synthesizer<R>) -> Self {
        Self {
            path: path.into(),
            synthesizer,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the dataset with a header and `count` records numbered from `start_id`.
    ///
    /// Blocks until the file is fully written. Returns the id following the last record written.
    pub fn seed(&mut self, count: u64, start_id: u64) -> CoreResult<u64> {
        let records = self.synthesizer.generate(to_len(count)?, start_id)?;

        let mut contents = csv_header();
        contents.push('\n');
        for record in &records {
            record.write_csv_row(&mut contents);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(CoreError::DatasetWrite)?;
        }
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, contents).map_err(CoreError::DatasetWrite)?;
        fs::rename(&tmp, &self.path).map_err(CoreError::DatasetWrite)?;

        tracing::info!(
            "seeded {} with {} records (no-show rate {:.3})",
            self.path.display(),
            records.len(),
            no_show_rate(&records)
        );
        Ok(start_id + count)
    }

    /// Appends `count` records numbered from `start_id` without touching the header.
    ///
    /// Returns the id following the last record appended.
    pub fn append_batch(&mut self, start_id: u64, count: u64) -> CoreResult<u64> {
        let records = self.synthesizer.generate(to_len(count)?, start_id)?;

        let mut rows = String::new();
        for record in &records {
            record.write_csv_row(&mut rows);
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(CoreError::DatasetWrite)?;
        file.write_all(rows.as_bytes())
            .map_err(CoreError::DatasetWrite)?;

        let next_id = start_id + count;
        tracing::debug!(
            "appended ids {}..{} to {}",
            start_id,
            next_id,
            self.path.display()
        );
        Ok(next_id)
    }

    /// Seeds the dataset per `settings` and returns the session the append loop continues.
    pub fn start_session(&mut self, settings: &GenerationSettings) -> CoreResult<GenerationSession> {
        if settings.batch_size == 0 || settings.interval.is_zero() {
            return Err(CoreError::InvalidInput(
                "batch size and interval must both be non-zero".into(),
            ));
        }
        let next_id = self.seed(settings.seed_count, 1)?;
        Ok(GenerationSession {
            next_id,
            batch_size: settings.batch_size,
            interval: settings.interval,
        })
    }

    /// Appends one batch per interval until `cancel` yields a message or its sender is dropped.
    ///
    /// The batch in progress always completes before cancellation is observed. `session.next_id`
    /// is advanced after every successful append, so an interrupted session can be resumed. A
    /// failed append is logged and retried with the same ids on the next tick; the loop never
    /// ends on its own.
    pub fn run(&mut self, session: &mut GenerationSession, cancel: &Receiver<()>) {
        tracing::info!(
            "streaming {} records every {:?} to {}",
            session.batch_size,
            session.interval,
            self.path.display()
        );
        loop {
            match self.append_batch(session.next_id, session.batch_size) {
                Ok(next_id) => session.next_id = next_id,
                Err(e) => tracing::warn!(
                    "append to {} from id {} failed, retrying next tick: {}",
                    self.path.display(),
                    session.next_id,
                    e
                ),
            }
            match cancel.recv_timeout(session.interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::info!(
            "stream to {} stopped; next id {}",
            self.path.display(),
            session.next_id
        );
    }
}

fn to_len(count: u64) -> CoreResult<usize> {
    usize::try_from(count)
        .map_err(|_| CoreError::InvalidInput(format!("record count {count} is too large")))
}

fn no_show_rate(records: &[AppointmentRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let no_shows = records
        .iter()
        .filter(|r| r.label_no_show == crate::Label::NoShow)
        .count();
    no_shows as f64 / records.len() as f64
}
