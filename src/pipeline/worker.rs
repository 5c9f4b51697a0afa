//! Map-side worker
//!
//! A worker owns one shard of raw records. It builds its own reference table,
//! classifies every line, buffers the surviving entries and hands the
//! (optionally combined) result to the shuffle together with its counters.

use super::combiner::{MapOutput, SpillBuffer};
use super::counters::DropCounters;
use super::preset::JobSpec;
use super::record::{MapOutcome, RecordFilterJoin};
use super::reference::ReferenceTable;
use super::ExecutionSettings;
use crate::error::{ErrorCode, RecordError, Result, StatsError};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Where a worker gets its reference table from
#[derive(Debug, Clone)]
pub enum ReferenceSource {
    /// Side file read by every worker at start-up
    File(PathBuf),
    /// Prebuilt table; every worker takes its own copy
    Table(ReferenceTable),
}

impl ReferenceSource {
    pub fn load(&self) -> Result<ReferenceTable> {
        match self {
            Self::File(path) => ReferenceTable::load(path),
            Self::Table(table) => Ok(table.clone()),
        }
    }
}

/// One unit of map work
#[derive(Debug, Clone, PartialEq)]
pub enum Shard {
    File(PathBuf),
    Lines(Vec<String>),
}

impl Shard {
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Lines(lines) => format!("<{} in-memory lines>", lines.len()),
        }
    }
}

/// Everything a finished worker reports
#[derive(Debug, Clone, Default)]
pub struct WorkerOutput {
    pub map: MapOutput,
    pub counters: DropCounters,
}

/// Map task bound to one job and one freshly loaded reference table
pub struct Worker<'a> {
    id: usize,
    spec: &'a JobSpec,
    settings: &'a ExecutionSettings,
    table: ReferenceTable,
}

impl<'a> Worker<'a> {
    /// Start a worker, loading its reference table
    pub fn start(
        id: usize,
        spec: &'a JobSpec,
        settings: &'a ExecutionSettings,
        reference: &ReferenceSource,
    ) -> Result<Self> {
        let table = reference
            .load()
            .map_err(|e| e.with_context(format!("while starting worker {}", id)))?;
        Ok(Self {
            id,
            spec,
            settings,
            table,
        })
    }

    /// Process a whole shard
    pub fn run(self, shard: &Shard) -> Result<WorkerOutput> {
        let id = self.id;
        debug!(worker = id, shard = %shard.describe(), "Worker started");
        let output = match shard {
            Shard::File(path) => self.run_file(path)?,
            Shard::Lines(lines) => self.run_lines(lines),
        };
        debug!(
            worker = id,
            read = output.counters.records_read,
            emitted = output.counters.emitted,
            pairs = output.map.pairs.len(),
            spills = output.map.spills,
            "Worker finished"
        );
        Ok(output)
    }

    /// Process lines that are already decoded
    pub fn run_lines<S: AsRef<str>>(self, lines: &[S]) -> WorkerOutput {
        let mut task = MapTask::new(&self);
        for line in lines {
            task.line(line.as_ref());
        }
        task.finish()
    }

    fn run_file(self, path: &Path) -> Result<WorkerOutput> {
        let unreadable = |e: std::io::Error| {
            StatsError::storage_with_code(
                ErrorCode::STORAGE_INPUT_UNREADABLE,
                "Input shard could not be read",
                Some(path.to_path_buf()),
            )
            .with_source(e)
        };
        let file = std::fs::File::open(path).map_err(unreadable)?;
        self.run_reader(BufReader::new(file)).map_err(unreadable)
    }

    /// Process raw bytes, treating lines that are not UTF-8 as malformed
    pub fn run_reader<R: BufRead>(self, reader: R) -> std::io::Result<WorkerOutput> {
        let mut task = MapTask::new(&self);
        for line in reader.split(b'\n') {
            match String::from_utf8(line?) {
                Ok(line) => task.line(&line),
                Err(_) => task.unreadable(),
            }
        }
        Ok(task.finish())
    }
}

struct MapTask<'w> {
    worker: usize,
    join: RecordFilterJoin<'w>,
    buffer: SpillBuffer,
    counters: DropCounters,
}

impl<'w> MapTask<'w> {
    fn new(worker: &'w Worker<'_>) -> Self {
        let mut counters = DropCounters::default();
        counters.record_reference_load(worker.table.report());
        Self {
            worker: worker.id,
            join: RecordFilterJoin::new(&worker.spec.policy, &worker.table),
            buffer: SpillBuffer::new(
                worker.spec.aggregate,
                worker.settings.combiner,
                worker.settings.spill_threshold,
            ),
            counters,
        }
    }

    fn line(&mut self, line: &str) {
        let outcome = self.join.classify(line);
        self.counters.record(&outcome);
        match outcome {
            MapOutcome::Emit(entry) => self.buffer.push(entry),
            MapOutcome::Malformed(err) => {
                trace!(worker = self.worker, code = err.code(), %err, "Dropped malformed record");
            }
            other => trace!(worker = self.worker, outcome = ?other, "Dropped record"),
        }
    }

    fn unreadable(&mut self) {
        let outcome = MapOutcome::Malformed(RecordError::InvalidUtf8);
        self.counters.record(&outcome);
        trace!(worker = self.worker, "Dropped record that is not valid UTF-8");
    }

    fn finish(self) -> WorkerOutput {
        WorkerOutput {
            map: self.buffer.finish(),
            counters: self.counters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::aggregate::PartialAggregate;
    use crate::pipeline::combiner::combine_partials;
    use crate::pipeline::preset::JobPreset;

    fn reference() -> ReferenceSource {
        ReferenceSource::Table(ReferenceTable::from_rows([(1, "A"), (2, "B")]))
    }

    #[test]
    fn test_worker_combines_and_counts() {
        let spec = JobPreset::StatsOne.spec();
        let settings = ExecutionSettings::default();
        let worker = Worker::start(0, &spec, &settings, &reference()).unwrap();

        let output = worker.run_lines(&[
            "1,NULL,10.0",
            "2,NULL,5.0",
            "1,NULL,20.0",
            "3,NULL,1.0",
            "1,NULL,abc",
            "bogus",
        ]);

        let combined = combine_partials(output.map.pairs);
        assert_eq!(combined["A"], PartialAggregate::sum(30.0));
        assert_eq!(combined["B"], PartialAggregate::sum(5.0));
        assert_eq!(output.counters.records_read, 6);
        assert_eq!(output.counters.emitted, 3);
        assert_eq!(output.counters.join_misses, 1);
        assert_eq!(output.counters.malformed, 2);
    }

    #[test]
    fn test_run_processes_in_memory_and_file_shards() {
        let spec = JobPreset::StatsOne.spec();
        let settings = ExecutionSettings::default();

        let shard = Shard::Lines(vec!["1,NULL,2.0".to_string(), "2,NULL,3.0".to_string()]);
        let output = Worker::start(0, &spec, &settings, &reference())
            .unwrap()
            .run(&shard)
            .unwrap();
        assert_eq!(output.counters.emitted, 2);

        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("part-0");
        std::fs::write(&path, "1,NULL,4.0\n9,NULL,1.0\n").unwrap();
        let output = Worker::start(1, &spec, &settings, &reference())
            .unwrap()
            .run(&Shard::File(path))
            .unwrap();
        assert_eq!(output.counters.emitted, 1);
        assert_eq!(output.counters.join_misses, 1);
    }

    #[test]
    fn test_run_reports_unreadable_file_shard() {
        let spec = JobPreset::StatsOne.spec();
        let settings = ExecutionSettings::default();
        let worker = Worker::start(0, &spec, &settings, &reference()).unwrap();

        let err = worker
            .run(&Shard::File(PathBuf::from("/nonexistent/part-0")))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::STORAGE_INPUT_UNREADABLE);
    }

    #[test]
    fn test_run_reader_counts_invalid_utf8() {
        let spec = JobPreset::StatsOne.spec();
        let settings = ExecutionSettings::default();
        let worker = Worker::start(0, &spec, &settings, &reference()).unwrap();

        let input: &[u8] = b"1,NULL,1.0\r\n\xff\xfe,NULL,2.0\n2,NULL,3.0";
        let output = worker.run_reader(input).unwrap();

        assert_eq!(output.counters.records_read, 3);
        assert_eq!(output.counters.malformed, 1);
        assert_eq!(output.counters.emitted, 2);
    }

    #[test]
    fn test_worker_start_fails_on_missing_reference() {
        let spec = JobPreset::StatsOne.spec();
        let settings = ExecutionSettings::default();
        let source = ReferenceSource::File(PathBuf::from("/nonexistent/device.csv"));

        let err = Worker::start(3, &spec, &settings, &source)
            .err()
            .expect("missing reference file must fail");
        assert!(err.to_string().contains("worker 3"));
    }

    #[test]
    fn test_reference_anomalies_are_reported_in_counters() {
        let spec = JobPreset::StatsOne.spec();
        let settings = ExecutionSettings::default();
        let table = ReferenceTable::from_reader("1,A\n1,B\nbad\n".as_bytes()).unwrap();
        let worker = Worker::start(0, &spec, &settings, &ReferenceSource::Table(table)).unwrap();

        let output = worker.run_lines::<&str>(&[]);
        assert_eq!(output.counters.reference_rows_skipped, 1);
        assert_eq!(output.counters.reference_ids_overwritten, 1);
    }
}
