pub mod lifecycle;
pub mod metrics;
pub mod view;

pub use metrics::*;
pub use view::*;

use crate::agent::{AgentId, AgentType, Daisy, DaisyColor, Patch};
use crate::config::{ConfigError, MeanTemperature, Placement, WorldConfig};
use crate::grid::{Grid, GridError, Position};
use crate::schedule::{ScheduleError, Scheduler};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::collections::BTreeMap;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldInitError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to populate world: {0}")]
    Populate(#[from] StepError),
}

/// Grid/scheduler desynchronization detected while stepping. These never
/// occur while the spawn and removal contracts hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("agent {0} is scheduled but has no state")]
    UnknownAgent(AgentId),
}

/// Read-only view of the globals handed to every activation of one step.
pub(crate) struct StepContext<'a> {
    pub(crate) config: &'a WorldConfig,
    /// World temperature aggregated at the end of the previous step.
    pub(crate) world_temperature: f64,
    /// Patch temperatures as they were before this step, by cell index.
    pub(crate) pre_step_temperatures: &'a [f64],
    /// Whether a daisy covered the cell before this step, by cell index. A
    /// covered cell is heated by its daisy only, whatever happens to the
    /// daisy or its neighbours later in the step.
    pub(crate) pre_step_occupied: &'a [bool],
    /// Number of the step being executed (1-based).
    pub(crate) step_number: u64,
}

/// Agent state plus the spatial index. Everything an activation may mutate
/// apart from the scheduler itself.
#[derive(Clone, Debug)]
pub(crate) struct Habitat {
    pub(crate) grid: Grid,
    /// Indexed by cell index; a patch's id equals its cell index.
    pub(crate) patches: Vec<Patch>,
    pub(crate) daisies: BTreeMap<AgentId, Daisy>,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) next_agent_id: u64,
    pub(crate) births_last_step: usize,
    pub(crate) deaths_last_step: usize,
    pub(crate) total_births: usize,
    pub(crate) total_deaths: usize,
}

impl Habitat {
    fn allocate_id(&mut self) -> AgentId {
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        id
    }

    pub(crate) fn patch_index(&self, agent: AgentId) -> Result<usize, StepError> {
        let idx = usize::try_from(agent.0).map_err(|_| StepError::UnknownAgent(agent))?;
        match self.patches.get(idx) {
            Some(patch) if patch.id == agent => Ok(idx),
            _ => Err(StepError::UnknownAgent(agent)),
        }
    }

    pub(crate) fn patch_temperatures(&self) -> Vec<f64> {
        self.patches.iter().map(|p| p.local_temperature).collect()
    }

    pub(crate) fn occupied_cells(&self) -> Vec<bool> {
        self.grid
            .positions()
            .map(|pos| !self.grid.is_vacant(pos))
            .collect()
    }

    /// Temperature of the cell an agent stands on.
    pub(crate) fn cell_temperature_of(&self, agent: AgentId) -> Result<f64, StepError> {
        let position = match self.daisies.get(&agent) {
            Some(daisy) => daisy.position,
            None => self.patches[self.patch_index(agent)?].position,
        };
        Ok(self.patches[self.grid.index(position)].local_temperature)
    }

    /// Register a daisy with the grid and the scheduler as one unit.
    pub(crate) fn spawn(
        &mut self,
        scheduler: &mut Scheduler,
        daisy: Daisy,
    ) -> Result<(), StepError> {
        self.grid.place(daisy.id, daisy.position)?;
        if let Err(e) = scheduler.add(daisy.id, daisy.agent_type()) {
            self.grid.remove(daisy.id, daisy.position)?;
            return Err(e.into());
        }
        self.daisies.insert(daisy.id, daisy);
        Ok(())
    }

    /// Deregister a daisy from the scheduler and the grid and drop its state.
    pub(crate) fn despawn(
        &mut self,
        scheduler: &mut Scheduler,
        agent: AgentId,
    ) -> Result<Daisy, StepError> {
        let position = self
            .daisies
            .get(&agent)
            .map(|d| d.position)
            .ok_or(StepError::UnknownAgent(agent))?;
        scheduler.remove(agent)?;
        self.grid.remove(agent, position)?;
        self.daisies
            .remove(&agent)
            .ok_or(StepError::UnknownAgent(agent))
    }

    fn scatter_daisies(
        &mut self,
        scheduler: &mut Scheduler,
        config: &WorldConfig,
        color: DaisyColor,
        count: usize,
    ) -> Result<usize, StepError> {
        let mut placed = 0;
        match config.placement {
            Placement::SkipOccupied => {
                for _ in 0..count {
                    let x = self.rng.random_range(0..config.width);
                    let y = self.rng.random_range(0..config.height);
                    let position = Position::new(x, y);
                    if !self.grid.is_vacant(position) {
                        continue;
                    }
                    let id = self.allocate_id();
                    self.spawn(scheduler, Daisy::new(id, position, color, config, 0))?;
                    placed += 1;
                }
            }
            Placement::ResampleVacant => {
                let mut vacant = self.grid.vacant_positions();
                for _ in 0..count {
                    if vacant.is_empty() {
                        break;
                    }
                    let position = vacant.swap_remove(self.rng.random_range(0..vacant.len()));
                    let id = self.allocate_id();
                    self.spawn(scheduler, Daisy::new(id, position, color, config, 0))?;
                    placed += 1;
                }
            }
        }
        Ok(placed)
    }
}

pub struct World {
    pub(crate) config: WorldConfig,
    pub(crate) scheduler: Scheduler,
    pub(crate) habitat: Habitat,
    pub(crate) world_temperature: f64,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_new(config: WorldConfig) -> Result<Self, WorldInitError> {
        config.validate()?;

        let mut scheduler = Scheduler::new(
            ChaCha12Rng::seed_from_u64(config.seed.wrapping_add(1)),
            config.shuffle_types,
        );
        let mut next_id = 0u64;
        let grid = Grid::new(config.width, config.height, |_| {
            next_id += 1;
            AgentId(next_id - 1)
        });
        let patches: Vec<Patch> = grid
            .positions()
            .map(|pos| {
                Patch::new(
                    grid.contents(pos).patch,
                    pos,
                    config.initial_temperature,
                    config.surface_albedo,
                )
            })
            .collect();
        for patch in &patches {
            scheduler
                .add(patch.id, AgentType::Patch)
                .map_err(StepError::from)?;
        }

        let mut habitat = Habitat {
            grid,
            patches,
            daisies: BTreeMap::new(),
            rng: ChaCha12Rng::seed_from_u64(config.seed),
            next_agent_id: next_id,
            births_last_step: 0,
            deaths_last_step: 0,
            total_births: 0,
            total_deaths: 0,
        };
        let white = habitat.scatter_daisies(
            &mut scheduler,
            &config,
            DaisyColor::White,
            config.initial_white,
        )?;
        let black = habitat.scatter_daisies(
            &mut scheduler,
            &config,
            DaisyColor::Black,
            config.initial_black,
        )?;

        info!(
            width = config.width,
            height = config.height,
            white,
            black,
            skipped = config.initial_white + config.initial_black - white - black,
            solar_luminosity = config.solar_luminosity,
            "daisyworld initialized"
        );

        Ok(Self {
            world_temperature: config.initial_temperature,
            config,
            scheduler,
            habitat,
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.habitat.grid
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Completed steps.
    pub fn time(&self) -> u64 {
        self.scheduler.time()
    }

    /// Aggregate recomputed at the end of every step; the initial temperature before the first.
    pub fn world_temperature(&self) -> f64 {
        self.world_temperature
    }

    pub fn step(&mut self) -> Result<StepTimings, StepError> {
        self.step_filtered(None)
    }

    /// Step only the listed agent types (all types for `None`), then refresh
    /// the world temperature.
    pub fn step_filtered(
        &mut self,
        filter: Option<&[AgentType]>,
    ) -> Result<StepTimings, StepError> {
        let total_start = Instant::now();
        self.habitat.births_last_step = 0;
        self.habitat.deaths_last_step = 0;

        let t0 = Instant::now();
        let pre_step_temperatures = self.habitat.patch_temperatures();
        let pre_step_occupied = self.habitat.occupied_cells();
        let ctx = StepContext {
            config: &self.config,
            world_temperature: self.world_temperature,
            pre_step_temperatures: &pre_step_temperatures,
            pre_step_occupied: &pre_step_occupied,
            step_number: self.scheduler.time() + 1,
        };
        let habitat = &mut self.habitat;
        self.scheduler
            .step(filter, |s, id, t| habitat.activate(s, id, t, &ctx))?;
        let activation_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        self.world_temperature = self.try_mean_temperature()?;
        let aggregate_us = t1.elapsed().as_micros() as u64;

        debug!(
            time = self.time(),
            white = self.type_count(AgentType::WhiteDaisy),
            black = self.type_count(AgentType::BlackDaisy),
            births = self.habitat.births_last_step,
            deaths = self.habitat.deaths_last_step,
            world_temperature = self.world_temperature,
            "step"
        );

        Ok(StepTimings {
            activation_us,
            aggregate_us,
            total_us: total_start.elapsed().as_micros() as u64,
        })
    }

    pub fn run(&mut self, steps: usize) -> Result<(), StepError> {
        self.run_observed(steps, &mut |_: &World| {})
    }

    /// Run `steps` steps, handing the world to `observer` after each one.
    pub fn run_observed<O: StepObserver + ?Sized>(
        &mut self,
        steps: usize,
        observer: &mut O,
    ) -> Result<(), StepError> {
        for _ in 0..steps {
            self.step()?;
            observer.observe(self);
        }
        info!(
            time = self.time(),
            white = self.type_count(AgentType::WhiteDaisy),
            black = self.type_count(AgentType::BlackDaisy),
            world_temperature = self.world_temperature,
            "run finished"
        );
        Ok(())
    }

    /// Live agents of exactly `agent_type`.
    pub fn type_count(&self, agent_type: AgentType) -> usize {
        self.scheduler.type_count(agent_type)
    }

    pub fn type_count_where(
        &self,
        agent_type: AgentType,
        mut predicate: impl FnMut(AgentView<'_>) -> bool,
    ) -> usize {
        self.scheduler
            .count_where(agent_type, |id| self.agent(id).is_some_and(&mut predicate))
    }

    pub fn daisy_count(&self) -> usize {
        self.habitat.daisies.len()
    }

    /// Current temperature aggregate under the configured policy.
    pub fn mean_temperature(&self) -> f64 {
        self.try_mean_temperature()
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Like `mean_temperature`, but reports a scheduled agent without state
    /// instead of panicking. Keeps the last value when nothing is scheduled.
    pub fn try_mean_temperature(&self) -> Result<f64, StepError> {
        let types: &[AgentType] = match self.config.mean_temperature {
            MeanTemperature::Patches => &[AgentType::Patch],
            MeanTemperature::PopulationWeighted => &AgentType::ALL,
        };
        let mean = self
            .scheduler
            .mean_over(types, |id| self.habitat.cell_temperature_of(id))?;
        Ok(mean.unwrap_or(self.world_temperature))
    }
}
