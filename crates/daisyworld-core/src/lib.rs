pub mod agent;
pub mod climate;
pub mod config;
pub mod grid;
pub mod schedule;
pub mod sweep;
pub mod world;

pub use agent::{AgentId, AgentType, Daisy, DaisyColor, Patch};
pub use config::{
    ConfigError, DiffusionMode, MeanTemperature, PatchUpdate, Placement, ReproductionDriver,
    WorldConfig,
};
pub use grid::{Grid, GridError, Position};
pub use schedule::{ScheduleError, Scheduler};
pub use world::{
    AgentView, CellView, DaisyView, ExperimentError, MetricsRecorder, PopulationStats, RunSummary,
    StepError, StepMetrics, StepObserver, StepTimings, World, WorldInitError,
};
