//! Common test utilities and helpers

#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Job directory layout mirroring the defaults: `preload/device.csv`,
/// `input/` and `output/`
pub struct JobFixtureBuilder {
    temp_dir: TempDir,
    reference: Option<String>,
    shards: Vec<(String, String)>,
    job_file: Option<String>,
}

impl JobFixtureBuilder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
            reference: None,
            shards: Vec::new(),
            job_file: None,
        })
    }

    /// Reference table contents
    pub fn with_reference(mut self, contents: &str) -> Self {
        self.reference = Some(contents.to_string());
        self
    }

    /// Add an input shard under `input/`
    pub fn with_shard(mut self, name: &str, contents: &str) -> Self {
        self.shards.push((name.to_string(), contents.to_string()));
        self
    }

    /// Write `job.yml` at the fixture root
    pub fn with_job_file(mut self, contents: &str) -> Self {
        self.job_file = Some(contents.to_string());
        self
    }

    pub fn build(self) -> Result<JobFixture> {
        let root = self.temp_dir.path();

        if let Some(reference) = &self.reference {
            fs::create_dir_all(root.join("preload"))?;
            fs::write(root.join("preload").join("device.csv"), reference)?;
        }

        fs::create_dir_all(root.join("input"))?;
        for (name, contents) in &self.shards {
            fs::write(root.join("input").join(name), contents)?;
        }

        if let Some(job_file) = &self.job_file {
            fs::write(root.join("job.yml"), job_file)?;
        }

        Ok(JobFixture {
            temp_dir: self.temp_dir,
        })
    }
}

pub struct JobFixture {
    temp_dir: TempDir,
}

impl JobFixture {
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn reference(&self) -> PathBuf {
        self.root().join("preload").join("device.csv")
    }

    pub fn input(&self) -> PathBuf {
        self.root().join("input")
    }

    pub fn output(&self) -> PathBuf {
        self.root().join("output")
    }

    pub fn job_file(&self) -> PathBuf {
        self.root().join("job.yml")
    }

    /// Contents of the single result file in the output directory
    pub fn read_results(&self) -> Result<String> {
        Ok(fs::read_to_string(self.output().join("part-r-00000"))?)
    }
}

/// Reference table shared by most scenarios
pub const DEVICES: &str = "1,A\n2,B\n3,C\n";
