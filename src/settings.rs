//! run configuration for the evolution engine.
//! callers (CLI, demo drivers) fill this in; the engine only validates it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::mutate::MutateParams;

/// default RNG seed, kept fixed so unattended runs are reproducible
pub const DEFAULT_SEED: u64 = 0xDEAD_BEEF;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    /// raster file the paintings evolve toward; decoding it is fatal-on-failure
    pub target_path: Option<PathBuf>,

    // chromosome shape
    /// triangles per painting, fixed for the whole run
    pub triangle_count: usize,
    /// canvas background as un-premultiplied RGBA in 0..1
    pub background: [f32; 4],

    // population
    pub population_size: usize,
    /// fraction of the population carried over unchanged each generation
    /// (0.0 disables elitism entirely)
    pub survival_fraction: f32,

    // mutation
    pub mutation: MutateParams,

    // run control
    /// generations to run when the caller does not pass its own count
    pub generations: u64,
    /// evaluation worker pool size
    pub workers: usize,
    pub seed: u64,

    // artifacts
    pub output_dir: PathBuf,
    /// best-image filename pattern; `{gen}` expands to the zero-padded
    /// generation number
    pub image_template: String,
    /// population snapshot every N generations (0 disables checkpointing)
    pub checkpoint_interval: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_path: None,

            triangle_count: 50,
            background: [1.0, 1.0, 1.0, 1.0],

            population_size: 50,
            survival_fraction: 0.05,

            mutation: MutateParams::default(),

            generations: 5000,
            workers: 6,
            seed: DEFAULT_SEED,

            output_dir: PathBuf::from("out"),
            image_template: "drawing_{gen}.png".to_owned(),
            checkpoint_interval: 50,
        }
    }
}

impl Settings {
    /// reject configurations that cannot produce a valid run.
    /// called before any work starts so there is no partial execution.
    pub fn validate(&self) -> Result<()> {
        if self.target_path.is_none() {
            return Err(Error::Config("no target image configured".into()));
        }
        self.validate_run()
    }

    /// the same checks minus the target path, for callers that supply an
    /// already-decoded target
    pub(crate) fn validate_run(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(Error::Config("population size must be at least 1".into()));
        }
        if self.triangle_count == 0 {
            return Err(Error::Config("triangle count must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(Error::Config("worker count must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.survival_fraction) {
            return Err(Error::Config(format!(
                "survival fraction must be within 0..=1, got {}",
                self.survival_fraction
            )));
        }
        if self.mutation.sigma < 0.0 {
            return Err(Error::Config("mutation sigma must be non-negative".into()));
        }
        if !(0.0..=1.0).contains(&self.mutation.rate) || !(0.0..=1.0).contains(&self.mutation.swap_prob)
        {
            return Err(Error::Config(
                "mutation rate and swap probability must be within 0..=1".into(),
            ));
        }
        if !self.image_template.contains("{gen}") {
            return Err(Error::Config(format!(
                "image template {:?} is missing a {{gen}} placeholder",
                self.image_template
            )));
        }
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
