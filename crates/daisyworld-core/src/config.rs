use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which temperature drives the daisy seeding threshold.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReproductionDriver {
    /// Temperature of the daisy's own patch, after it heated it this step.
    #[default]
    Local,
    /// World temperature aggregated at the end of the previous step.
    Global,
}

/// How a bare patch folds its freshly computed heating into its temperature.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PatchUpdate {
    /// `(old + heating) / 2`, same as a daisy-covered patch.
    #[default]
    Blend,
    /// `heating` replaces the old temperature outright.
    Overwrite,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiffusionMode {
    Off,
    /// Only patches that heat themselves (no daisy on top) diffuse.
    #[default]
    BarePatches,
    /// Daisy-heated patches diffuse too.
    AllPatches,
}

/// Aggregate used for `World::mean_temperature`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MeanTemperature {
    /// Mean over live patches.
    #[default]
    Patches,
    /// Mean over every live scheduled agent of its cell temperature, so a
    /// daisy-covered cell is counted twice.
    PopulationWeighted,
}

/// Initial daisy scattering policy.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Draw a random cell per daisy and drop the daisy if the cell is taken.
    #[default]
    SkipOccupied,
    /// Draw only among vacant cells so the configured counts are met exactly.
    ResampleVacant,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// Grid columns. The grid wraps in both directions.
    pub width: usize,
    /// Grid rows.
    pub height: usize,
    /// Starting temperature of every patch and of the world.
    pub initial_temperature: f64,
    /// Number of white daisies scattered at construction.
    pub initial_white: usize,
    /// Number of black daisies scattered at construction.
    pub initial_black: usize,
    /// Incoming solar energy multiplier.
    pub solar_luminosity: f64,
    pub white_albedo: f64,
    pub black_albedo: f64,
    /// Reflectivity of bare ground.
    pub surface_albedo: f64,
    /// Steps a daisy survives; it is removed when its countdown drops below zero.
    pub daisy_lifespan: u32,
    pub reproduction_driver: ReproductionDriver,
    pub bare_patch_update: PatchUpdate,
    pub diffusion: DiffusionMode,
    /// Share of its own temperature a patch keeps when diffusing.
    pub diffusion_degree: f64,
    pub mean_temperature: MeanTemperature,
    pub placement: Placement,
    /// Shuffle the order in which agent types are activated each step.
    pub shuffle_types: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            width: 20,
            height: 20,
            initial_temperature: 25.0,
            initial_white: 100,
            initial_black: 100,
            solar_luminosity: 1.4,
            white_albedo: 0.75,
            black_albedo: 0.25,
            surface_albedo: 0.4,
            daisy_lifespan: 5,
            reproduction_driver: ReproductionDriver::Local,
            bare_patch_update: PatchUpdate::Blend,
            diffusion: DiffusionMode::BarePatches,
            diffusion_degree: 0.5,
            mean_temperature: MeanTemperature::Patches,
            placement: Placement::SkipOccupied,
            shuffle_types: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("width must be greater than 0")]
    InvalidWidth,
    #[error("height must be greater than 0")]
    InvalidHeight,
    #[error("grid cell count ({actual}) exceeds supported maximum ({max})")]
    GridTooLarge { max: usize, actual: usize },
    #[error("initial_temperature must be finite")]
    InvalidInitialTemperature,
    #[error("solar_luminosity must be finite and non-negative")]
    InvalidSolarLuminosity,
    #[error("{name} must be finite and within [0,1]")]
    InvalidAlbedo { name: &'static str },
    #[error("{name} ({actual}) exceeds the number of grid cells ({max})")]
    TooManyDaisies {
        name: &'static str,
        max: usize,
        actual: usize,
    },
    #[error("diffusion_degree must be finite and within [0,1]")]
    InvalidDiffusionDegree,
}

impl WorldConfig {
    pub const MAX_CELLS: usize = 1 << 22;

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_grid()?;
        self.validate_physics()?;
        self.validate_population()?;
        Ok(())
    }

    /// Number of cells, valid only after `validate_grid` succeeded.
    pub fn cell_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    fn validate_grid(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(ConfigError::InvalidWidth);
        }
        if self.height == 0 {
            return Err(ConfigError::InvalidHeight);
        }
        let cells = self.width.checked_mul(self.height).unwrap_or(usize::MAX);
        if cells > Self::MAX_CELLS {
            return Err(ConfigError::GridTooLarge {
                max: Self::MAX_CELLS,
                actual: cells,
            });
        }
        Ok(())
    }

    fn validate_physics(&self) -> Result<(), ConfigError> {
        if !self.initial_temperature.is_finite() {
            return Err(ConfigError::InvalidInitialTemperature);
        }
        if !(self.solar_luminosity.is_finite() && self.solar_luminosity >= 0.0) {
            return Err(ConfigError::InvalidSolarLuminosity);
        }
        for (name, albedo) in [
            ("white_albedo", self.white_albedo),
            ("black_albedo", self.black_albedo),
            ("surface_albedo", self.surface_albedo),
        ] {
            if !(albedo.is_finite() && (0.0..=1.0).contains(&albedo)) {
                return Err(ConfigError::InvalidAlbedo { name });
            }
        }
        if !(self.diffusion_degree.is_finite() && (0.0..=1.0).contains(&self.diffusion_degree)) {
            return Err(ConfigError::InvalidDiffusionDegree);
        }
        Ok(())
    }

    fn validate_population(&self) -> Result<(), ConfigError> {
        let max = self.cell_count();
        for (name, actual) in [
            ("initial_white", self.initial_white),
            ("initial_black", self.initial_black),
        ] {
            if actual > max {
                return Err(ConfigError::TooManyDaisies { name, max, actual });
            }
        }
        if self.placement == Placement::ResampleVacant {
            let actual = self.initial_white.saturating_add(self.initial_black);
            if actual > max {
                return Err(ConfigError::TooManyDaisies {
                    name: "initial_white + initial_black",
                    max,
                    actual,
                });
            }
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
