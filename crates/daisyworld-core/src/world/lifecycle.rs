use super::{Habitat, StepContext, StepError};
use crate::agent::{AgentId, AgentType};
use crate::climate;
use crate::config::{DiffusionMode, PatchUpdate, ReproductionDriver};
use crate::grid::Position;
use crate::schedule::Scheduler;
use rand::Rng;
use tracing::trace;

impl Habitat {
    pub(crate) fn activate(
        &mut self,
        scheduler: &mut Scheduler,
        agent: AgentId,
        agent_type: AgentType,
        ctx: &StepContext<'_>,
    ) -> Result<(), StepError> {
        match agent_type {
            AgentType::Patch => self.step_patch(agent, ctx),
            AgentType::WhiteDaisy | AgentType::BlackDaisy => self.step_daisy(scheduler, agent, ctx),
        }
    }

    /// A bare patch heats itself from the ground albedo. A patch covered at
    /// the start of the step is left to the daisy standing on it.
    fn step_patch(&mut self, agent: AgentId, ctx: &StepContext<'_>) -> Result<(), StepError> {
        let idx = self.patch_index(agent)?;
        if ctx.pre_step_occupied[idx] {
            return Ok(());
        }
        let albedo = self.patches[idx].albedo;
        let absorbed = climate::absorbed_luminosity(albedo, ctx.config.solar_luminosity);
        let heating = climate::local_heating(absorbed);
        let diffuse = ctx.config.diffusion != DiffusionMode::Off;
        self.heat_patch(idx, heating, ctx.config.bare_patch_update, diffuse, ctx);
        Ok(())
    }

    /// Heat the patch underneath, maybe seed a neighbour, then age. Removal
    /// on expiry is the last thing a daisy does.
    fn step_daisy(
        &mut self,
        scheduler: &mut Scheduler,
        agent: AgentId,
        ctx: &StepContext<'_>,
    ) -> Result<(), StepError> {
        let (position, albedo) = self
            .daisies
            .get(&agent)
            .map(|d| (d.position, d.albedo))
            .ok_or(StepError::UnknownAgent(agent))?;
        let idx = self.grid.index(position);

        let absorbed = climate::absorbed_luminosity(albedo, ctx.config.solar_luminosity);
        let heating = climate::local_heating(absorbed);
        let diffuse = ctx.config.diffusion == DiffusionMode::AllPatches;
        self.heat_patch(idx, heating, PatchUpdate::Blend, diffuse, ctx);

        let governing = match ctx.config.reproduction_driver {
            ReproductionDriver::Local => self.patches[idx].local_temperature,
            ReproductionDriver::Global => ctx.world_temperature,
        };
        self.try_seed(scheduler, agent, position, governing, ctx)?;

        self.age_daisy(scheduler, agent)
    }

    /// Fold `heating` into a patch. Diffusion mixes with neighbour values
    /// from before the step, so it does not depend on activation order.
    fn heat_patch(
        &mut self,
        idx: usize,
        heating: f64,
        update: PatchUpdate,
        diffuse: bool,
        ctx: &StepContext<'_>,
    ) {
        let current = self.patches[idx].local_temperature;
        let mut next = match update {
            PatchUpdate::Blend => climate::blend(current, heating),
            PatchUpdate::Overwrite => heating,
        };
        if diffuse {
            let neighbor_temps: Vec<f64> = self
                .grid
                .neighbors(self.patches[idx].position, true, false)
                .into_iter()
                .map(|p| ctx.pre_step_temperatures[self.grid.index(p)])
                .collect();
            next = climate::diffuse(next, &neighbor_temps, ctx.config.diffusion_degree);
        }
        self.patches[idx].local_temperature = next;
    }

    fn try_seed(
        &mut self,
        scheduler: &mut Scheduler,
        parent: AgentId,
        position: Position,
        temperature: f64,
        ctx: &StepContext<'_>,
    ) -> Result<(), StepError> {
        let threshold = climate::seed_threshold(temperature);
        if self.rng.random::<f64>() >= threshold {
            return Ok(());
        }
        let neighbors = self.grid.neighbors(position, true, false);
        if neighbors.is_empty() {
            return Ok(());
        }
        let target = neighbors[self.rng.random_range(0..neighbors.len())];
        if !self.grid.is_vacant(target) {
            trace!(%parent, %target, "seed landed on an occupied cell");
            return Ok(());
        }
        let id = self.allocate_id();
        let child = self
            .daisies
            .get(&parent)
            .ok_or(StepError::UnknownAgent(parent))?
            .offspring(id, target, ctx.config.daisy_lifespan, ctx.step_number);
        self.spawn(scheduler, child)?;
        self.births_last_step += 1;
        self.total_births += 1;
        trace!(%parent, child = %id, %target, "daisy born");
        Ok(())
    }

    fn age_daisy(&mut self, scheduler: &mut Scheduler, agent: AgentId) -> Result<(), StepError> {
        let expired = self
            .daisies
            .get_mut(&agent)
            .ok_or(StepError::UnknownAgent(agent))?
            .age();
        if expired {
            let daisy = self.despawn(scheduler, agent)?;
            self.deaths_last_step += 1;
            self.total_deaths += 1;
            trace!(%agent, position = %daisy.position, "daisy died");
        }
        Ok(())
    }
}
