use crate::data_model::{JobRecord, JobType, TrackingData};
use crate::error::Result;
use crate::utils::common::{load_json, save_json};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Persisted record of every batch job ever submitted.
///
/// The uniqueness key is `(filename, job_type)`. Records are never removed;
/// resubmitting a pair overwrites its batch id and resets completion, so the
/// file is both the work queue for the polling sweep and an audit trail.
///
/// Persistence is whole-file overwrite (atomic temp-and-rename) on every
/// mutation. There is no cross-process locking: a single writer at a time is
/// assumed.
#[derive(Debug)]
pub struct JobTracker {
    path: PathBuf,
    data: TrackingData,
}

impl JobTracker {
    /// Loads the tracking file. An absent file yields an empty tracker; an
    /// unreadable or unparseable file is logged and also yields an empty
    /// tracker rather than failing the run.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = if path.exists() {
            match load_json::<TrackingData>(&path) {
                Ok(data) => data,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Tracking file unreadable; starting from empty state"
                    );
                    TrackingData::default()
                }
            }
        } else {
            debug!(path = %path.display(), "No tracking file yet; starting empty");
            TrackingData::default()
        };
        JobTracker { path, data }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn jobs(&self) -> &[JobRecord] {
        &self.data.jobs
    }

    /// Records a submission for `(filename, job_type)`. An existing record
    /// gets the new batch id, `completed` reset to false and its output file
    /// cleared; otherwise a new record is appended.
    pub fn upsert(&mut self, filename: &str, job_type: JobType, batch_id: &str) {
        for job in &mut self.data.jobs {
            if job.filename == filename && job.job_type == job_type {
                job.batch_id = Some(batch_id.to_string());
                job.completed = false;
                job.output_file = None;
                return;
            }
        }
        self.data.jobs.push(JobRecord {
            filename: filename.to_string(),
            job_type,
            batch_id: Some(batch_id.to_string()),
            completed: false,
            output_file: None,
        });
    }

    /// Marks the matching record completed and stores where its result
    /// bundle was saved. At most one record matches by construction.
    pub fn mark_completed(&mut self, filename: &str, job_type: JobType, output_file: &str) {
        for job in &mut self.data.jobs {
            if job.filename == filename && job.job_type == job_type {
                job.completed = true;
                job.output_file = Some(output_file.to_string());
                return;
            }
        }
        warn!(
            filename,
            job_type = %job_type,
            "mark_completed called for an untracked job"
        );
    }

    /// Incomplete jobs that have a batch id to poll.
    pub fn pollable(&self) -> Vec<JobRecord> {
        self.data
            .jobs
            .iter()
            .filter(|j| !j.completed && j.batch_id.is_some())
            .cloned()
            .collect()
    }

    /// Writes the current state to the tracking file.
    pub fn save(&self) -> Result<()> {
        save_json(&self.data, &self.path)
    }
}
