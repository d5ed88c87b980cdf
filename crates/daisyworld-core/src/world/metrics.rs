use super::{StepError, World};
use crate::agent::AgentType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Default)]
pub struct StepTimings {
    pub activation_us: u64,
    pub aggregate_us: u64,
    pub total_us: u64,
}

/// Per-step aggregates consumed by charts and reports.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StepMetrics {
    pub step: u64,
    pub white_daisies: usize,
    pub black_daisies: usize,
    pub total_daisies: usize,
    pub mean_temperature: f64,
    pub world_temperature: f64,
    pub birth_count: usize,
    pub death_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct PopulationStats {
    pub patches: usize,
    pub white_daisies: usize,
    pub black_daisies: usize,
    pub total_births: usize,
    pub total_deaths: usize,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub steps: usize,
    pub sample_every: usize,
    pub samples: Vec<StepMetrics>,
    pub final_population: PopulationStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExperimentError {
    #[error("sample_every must be positive")]
    InvalidSampleEvery,
    #[error("steps ({actual}) exceed supported maximum ({max})")]
    TooManySteps { max: usize, actual: usize },
    #[error("sample count ({actual}) exceeds supported maximum ({max})")]
    TooManySamples { max: usize, actual: usize },
    #[error("step failed: {0}")]
    Step(#[from] StepError),
}

/// Read-only hook run after every step.
pub trait StepObserver {
    fn observe(&mut self, world: &World);
}

impl<F: FnMut(&World)> StepObserver for F {
    fn observe(&mut self, world: &World) {
        self(world)
    }
}

/// Observer that samples `StepMetrics` every `sample_every` steps.
#[derive(Clone, Debug)]
pub struct MetricsRecorder {
    sample_every: u64,
    samples: Vec<StepMetrics>,
}

impl MetricsRecorder {
    pub fn new(sample_every: usize) -> Result<Self, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        Ok(Self {
            sample_every: sample_every as u64,
            samples: Vec::new(),
        })
    }

    pub fn samples(&self) -> &[StepMetrics] {
        &self.samples
    }
}

impl StepObserver for MetricsRecorder {
    fn observe(&mut self, world: &World) {
        if world.time() % self.sample_every == 0 {
            self.samples.push(world.collect_step_metrics());
        }
    }
}

impl World {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;

    pub fn collect_step_metrics(&self) -> StepMetrics {
        let white_daisies = self.type_count(AgentType::WhiteDaisy);
        let black_daisies = self.type_count(AgentType::BlackDaisy);
        StepMetrics {
            step: self.time(),
            white_daisies,
            black_daisies,
            total_daisies: white_daisies + black_daisies,
            mean_temperature: self.mean_temperature(),
            world_temperature: self.world_temperature,
            birth_count: self.habitat.births_last_step,
            death_count: self.habitat.deaths_last_step,
        }
    }

    pub fn population_stats(&self) -> PopulationStats {
        PopulationStats {
            patches: self.type_count(AgentType::Patch),
            white_daisies: self.type_count(AgentType::WhiteDaisy),
            black_daisies: self.type_count(AgentType::BlackDaisy),
            total_births: self.habitat.total_births,
            total_deaths: self.habitat.total_deaths,
        }
    }

    pub fn run_experiment(&mut self, steps: usize, sample_every: usize) -> RunSummary {
        self.try_run_experiment(steps, sample_every)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Run `steps` steps, sampling metrics every `sample_every` steps and
    /// always after the last one.
    pub fn try_run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }

        let mut samples = Vec::with_capacity(estimated_samples);
        for step in 1..=steps {
            self.step()?;
            if step % sample_every == 0 || step == steps {
                samples.push(self.collect_step_metrics());
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            steps,
            sample_every,
            samples,
            final_population: self.population_stats(),
        })
    }
}
