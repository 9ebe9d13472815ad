//! Client upload progress simulation.
//!
//! An upload is paced by ticks, not by bytes: each tick adds a fixed
//! percentage and the file is ingested once 100% is reached. Nothing is
//! catalogued while the session is in flight.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Result of advancing an upload by one tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UploadStep {
    /// Still streaming; carries the new percentage.
    InProgress(u32),
    /// Reached 100%; ready to ingest.
    Complete,
}

/// Externally visible progress of the in-flight upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadProgress {
    /// Name of the file being uploaded.
    pub file_name: String,
    /// Progress, 0..=100.
    pub percent: u32,
}

/// An in-flight upload.
#[derive(Clone, Debug)]
pub struct UploadSession {
    file_name: String,
    size_bytes: u64,
    percent: u32,
    started_at: Timestamp,
}

impl UploadSession {
    /// Starts a session at 0%.
    pub fn new(file_name: impl Into<String>, size_bytes: u64, now: Timestamp) -> Self {
        Self {
            file_name: file_name.into(),
            size_bytes,
            percent: 0,
            started_at: now,
        }
    }

    /// Adds `step` percent.
    pub fn advance(&mut self, step: u32) -> UploadStep {
        self.percent = self.percent.saturating_add(step).min(100);
        if self.percent >= 100 {
            UploadStep::Complete
        } else {
            UploadStep::InProgress(self.percent)
        }
    }

    /// Name of the file being uploaded.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Declared size.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Declared size in MiB, for log lines.
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0 / 1024.0
    }

    /// When the client started streaming.
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Current progress.
    pub fn progress(&self) -> UploadProgress {
        UploadProgress {
            file_name: self.file_name.clone(),
            percent: self.percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completes_after_25_ticks_of_4() {
        let mut session = UploadSession::new("a.txt", 1024, Timestamp::default());
        for i in 1..25 {
            assert_eq!(session.advance(4), UploadStep::InProgress(i * 4));
        }
        assert_eq!(session.advance(4), UploadStep::Complete);
        assert_eq!(session.progress().percent, 100);
    }

    #[test]
    fn test_progress_is_capped() {
        let mut session = UploadSession::new("big.iso", 0, Timestamp::default());
        assert_eq!(session.advance(70), UploadStep::InProgress(70));
        assert_eq!(session.advance(70), UploadStep::Complete);
        assert_eq!(session.progress().percent, 100);
    }

    #[test]
    fn test_size_mb() {
        let session = UploadSession::new("a.bin", 3 * 1024 * 1024, Timestamp::default());
        assert!((session.size_mb() - 3.0).abs() < f64::EPSILON);
        assert_eq!(session.file_name(), "a.bin");
        assert_eq!(session.size_bytes(), 3 * 1024 * 1024);
    }
}
