//! End-to-end job runner
//!
//! Ties a [`JobPlan`] to the filesystem: discovers shards, runs the pipeline
//! against the reference side file and writes the ordered results.

use crate::config::JobPlan;
use crate::error::Result;
use crate::input::discover_shards;
use crate::output::write_results;
use crate::pipeline::{DropCounters, JobPreset, Pipeline, ReferenceSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, info_span};
use uuid::Uuid;

/// What a finished run reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub run_id: Uuid,
    pub name: String,
    pub preset: JobPreset,
    pub shards: usize,
    pub groups: usize,
    pub shuffled_pairs: usize,
    pub counters: DropCounters,
    /// File the results went to; `None` when written to stdout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobSummary {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Run a job to completion
///
/// Blocks the calling thread; async callers should use `spawn_blocking`.
pub fn run_job(plan: &JobPlan) -> Result<JobSummary> {
    let run_id = Uuid::new_v4();
    let span = info_span!("job", %run_id, name = %plan.name, preset = %plan.preset);
    let _guard = span.enter();

    let started_at = Utc::now();
    info!(
        reference = %plan.reference.display(),
        input = %plan.input.display(),
        output = %plan.output,
        "Starting job"
    );

    let shards = discover_shards(&plan.input)?;
    let shard_count = shards.len();

    let pipeline = Pipeline::new(plan.spec.clone(), plan.settings.clone());
    let reference = ReferenceSource::File(plan.reference.clone());
    let output = pipeline.run(&reference, shards)?;

    let written = write_results(&output.results, &plan.output)?;
    let finished_at = Utc::now();

    let summary = JobSummary {
        run_id,
        name: plan.name.clone(),
        preset: plan.preset,
        shards: shard_count,
        groups: output.results.len(),
        shuffled_pairs: output.shuffled_pairs,
        counters: output.counters,
        output: written,
        started_at,
        finished_at,
    };
    info!(
        groups = summary.groups,
        elapsed_ms = summary.duration().num_milliseconds(),
        "Job complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigOverrides, JobConfig};
    use crate::error::ErrorCode;
    use std::fs;
    use tempfile::TempDir;

    fn plan(root: &std::path::Path, preset: JobPreset) -> JobPlan {
        JobConfig::default()
            .apply_overrides(ConfigOverrides {
                preset: Some(preset),
                reference: Some(root.join("device.csv")),
                input: Some(root.join("input")),
                output: Some(root.join("output").display().to_string()),
                workers: Some(2),
                ..ConfigOverrides::default()
            })
            .resolve()
            .unwrap()
    }

    #[test]
    fn test_run_job_writes_results_and_summary() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("device.csv"), "1,A\n2,B\n").unwrap();
        fs::create_dir(root.join("input")).unwrap();
        fs::write(root.join("input").join("part-0"), "1,NULL,10.0\n2,NULL,5.0\n").unwrap();
        fs::write(root.join("input").join("part-1"), "1,NULL,20.0\n3,NULL,1.0\n").unwrap();

        let summary = run_job(&plan(root, JobPreset::StatsOne)).unwrap();

        assert_eq!(summary.name, "device stats 1");
        assert_eq!(summary.shards, 2);
        assert_eq!(summary.groups, 2);
        assert_eq!(summary.counters.records_read, 4);
        assert_eq!(summary.counters.join_misses, 1);
        assert!(summary.finished_at >= summary.started_at);

        let written = summary.output.unwrap();
        assert_eq!(fs::read_to_string(written).unwrap(), "B\t5.0\nA\t30.0\n");
    }

    #[test]
    fn test_run_job_fails_without_output_on_missing_reference() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("input")).unwrap();
        fs::write(root.join("input").join("part-0"), "1,NULL,10.0\n").unwrap();

        let err = run_job(&plan(root, JobPreset::StatsOne)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::STORAGE_REFERENCE_UNREADABLE);
        assert!(!root.join("output").exists());
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("device.csv"), "1,A\n").unwrap();
        fs::create_dir(root.join("input")).unwrap();
        fs::write(root.join("input").join("part-0"), "1,X,10.0\n1,X,30.0\n1,Y,4.0\n").unwrap();

        let summary = run_job(&plan(root, JobPreset::StatsTwo)).unwrap();
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["preset"], "stats-2");
        assert_eq!(json["groups"], 2);
        assert_eq!(json["counters"]["emitted"], 3);
    }
}
