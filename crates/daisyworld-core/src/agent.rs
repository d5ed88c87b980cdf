use crate::config::WorldConfig;
use crate::grid::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier shared by the grid and the scheduler. Never reused within a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaisyColor {
    White,
    Black,
}

impl DaisyColor {
    pub fn albedo(self, config: &WorldConfig) -> f64 {
        match self {
            DaisyColor::White => config.white_albedo,
            DaisyColor::Black => config.black_albedo,
        }
    }

    pub fn agent_type(self) -> AgentType {
        match self {
            DaisyColor::White => AgentType::WhiteDaisy,
            DaisyColor::Black => AgentType::BlackDaisy,
        }
    }
}

/// Concrete agent type, the unit the scheduler buckets and counts by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Patch,
    WhiteDaisy,
    BlackDaisy,
}

impl AgentType {
    pub const ALL: [AgentType; 3] = [
        AgentType::Patch,
        AgentType::WhiteDaisy,
        AgentType::BlackDaisy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AgentType::Patch => "patch",
            AgentType::WhiteDaisy => "white_daisy",
            AgentType::BlackDaisy => "black_daisy",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// Ground cell holding the local temperature. One per cell, never removed.
#[derive(Clone, Debug, Serialize)]
pub struct Patch {
    pub id: AgentId,
    pub position: Position,
    pub local_temperature: f64,
    pub albedo: f64,
}

impl Patch {
    pub fn new(id: AgentId, position: Position, local_temperature: f64, albedo: f64) -> Self {
        Self {
            id,
            position,
            local_temperature,
            albedo,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Daisy {
    pub id: AgentId,
    pub position: Position,
    pub color: DaisyColor,
    pub albedo: f64,
    /// Counts down once per step; the daisy is removed when it goes negative.
    pub remaining_lifespan: i64,
    /// Scheduler time at which the daisy was created.
    pub born_at: u64,
}

impl Daisy {
    pub fn new(
        id: AgentId,
        position: Position,
        color: DaisyColor,
        config: &WorldConfig,
        born_at: u64,
    ) -> Self {
        Self {
            id,
            position,
            color,
            albedo: color.albedo(config),
            remaining_lifespan: i64::from(config.daisy_lifespan),
            born_at,
        }
    }

    pub fn agent_type(&self) -> AgentType {
        self.color.agent_type()
    }

    /// Offspring of the same color and albedo with a fresh lifespan.
    pub fn offspring(&self, id: AgentId, position: Position, lifespan: u32, born_at: u64) -> Daisy {
        Daisy {
            id,
            position,
            color: self.color,
            albedo: self.albedo,
            remaining_lifespan: i64::from(lifespan),
            born_at,
        }
    }

    /// Decrement the countdown. Returns true once the daisy has expired.
    pub fn age(&mut self) -> bool {
        self.remaining_lifespan -= 1;
        self.remaining_lifespan < 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_albedo_comes_from_config() {
        let config = WorldConfig {
            white_albedo: 0.9,
            black_albedo: 0.1,
            ..WorldConfig::default()
        };
        assert_eq!(DaisyColor::White.albedo(&config), 0.9);
        assert_eq!(DaisyColor::Black.albedo(&config), 0.1);
    }

    #[test]
    fn agent_type_names_round_trip() {
        for t in AgentType::ALL {
            assert_eq!(AgentType::from_name(t.name()), Some(t));
        }
        assert_eq!(AgentType::from_name("grass"), None);
        assert_eq!(DaisyColor::Black.agent_type(), AgentType::BlackDaisy);
    }

    #[test]
    fn daisy_expires_when_countdown_goes_negative() {
        let config = WorldConfig {
            daisy_lifespan: 2,
            ..WorldConfig::default()
        };
        let mut daisy = Daisy::new(
            AgentId(7),
            Position::new(0, 0),
            DaisyColor::White,
            &config,
            0,
        );
        assert!(!daisy.age());
        assert!(!daisy.age());
        assert_eq!(daisy.remaining_lifespan, 0);
        assert!(daisy.age());
        assert_eq!(daisy.remaining_lifespan, -1);
    }

    #[test]
    fn offspring_inherits_color_and_albedo() {
        let config = WorldConfig::default();
        let mut parent = Daisy::new(
            AgentId(1),
            Position::new(1, 1),
            DaisyColor::Black,
            &config,
            0,
        );
        parent.age();
        let child = parent.offspring(AgentId(2), Position::new(2, 1), 5, 3);
        assert_eq!(child.color, DaisyColor::Black);
        assert_eq!(child.albedo, parent.albedo);
        assert_eq!(child.remaining_lifespan, 5);
        assert_eq!(child.born_at, 3);
    }
}
