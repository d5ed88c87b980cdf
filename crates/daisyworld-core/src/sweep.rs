//! Independent worlds over a range of solar luminosities.

use crate::config::WorldConfig;
use crate::world::{StepError, StepMetrics, World, WorldInitError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Luminosities offered by the classic parameter slider.
pub const DEFAULT_LUMINOSITIES: [f64; 4] = [0.6, 0.8, 1.0, 1.4];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SweepPoint {
    pub solar_luminosity: f64,
    pub steps: usize,
    pub final_metrics: StepMetrics,
    /// Mean of the world temperature over the second half of the run.
    pub settled_temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SweepError {
    #[error("luminosity {luminosity}: {source}")]
    Init {
        luminosity: f64,
        source: WorldInitError,
    },
    #[error("luminosity {luminosity}: {source}")]
    Step { luminosity: f64, source: StepError },
}

fn run_point(base: &WorldConfig, luminosity: f64, steps: usize) -> Result<SweepPoint, SweepError> {
    let config = WorldConfig {
        solar_luminosity: luminosity,
        ..base.clone()
    };
    let mut world = World::try_new(config)
        .map_err(|source| SweepError::Init { luminosity, source })?;
    let settle_from = (steps / 2) as u64;
    let mut settled_sum = 0.0;
    let mut settled_count = 0usize;
    world
        .run_observed(steps, &mut |w: &World| {
            if w.time() > settle_from {
                settled_sum += w.world_temperature();
                settled_count += 1;
            }
        })
        .map_err(|source| SweepError::Step { luminosity, source })?;
    Ok(SweepPoint {
        solar_luminosity: luminosity,
        steps,
        final_metrics: world.collect_step_metrics(),
        settled_temperature: if settled_count > 0 {
            settled_sum / settled_count as f64
        } else {
            world.world_temperature()
        },
    })
}

/// Run one world per luminosity in parallel. Each world is seeded from
/// `base`, so results are reproducible and returned in input order.
pub fn sweep_luminosity(
    base: &WorldConfig,
    luminosities: &[f64],
    steps: usize,
) -> Result<Vec<SweepPoint>, SweepError> {
    info!(
        points = luminosities.len(),
        steps,
        "starting luminosity sweep"
    );
    luminosities
        .par_iter()
        .map(|&luminosity| run_point(base, luminosity, steps))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> WorldConfig {
        WorldConfig {
            width: 8,
            height: 8,
            initial_white: 10,
            initial_black: 10,
            ..WorldConfig::default()
        }
    }

    #[test]
    fn sweep_preserves_input_order_and_is_reproducible() {
        let base = small_config();
        let first = sweep_luminosity(&base, &DEFAULT_LUMINOSITIES, 20).unwrap();
        let second = sweep_luminosity(&base, &DEFAULT_LUMINOSITIES, 20).unwrap();
        assert_eq!(first, second);
        let lums: Vec<f64> = first.iter().map(|p| p.solar_luminosity).collect();
        assert_eq!(lums, DEFAULT_LUMINOSITIES.to_vec());
        assert!(first.iter().all(|p| p.final_metrics.step == 20));
    }

    #[test]
    fn sweep_matches_a_sequential_run() {
        let base = small_config();
        let points = sweep_luminosity(&base, &[1.0], 15).unwrap();
        let mut world = World::new(WorldConfig {
            solar_luminosity: 1.0,
            ..base
        });
        world.run(15).unwrap();
        assert_eq!(points[0].final_metrics, world.collect_step_metrics());
    }

    #[test]
    fn sweep_rejects_invalid_luminosity() {
        let err = sweep_luminosity(&small_config(), &[1.0, -1.0], 5).unwrap_err();
        assert!(matches!(err, SweepError::Init { luminosity, .. } if luminosity == -1.0));
    }
}
