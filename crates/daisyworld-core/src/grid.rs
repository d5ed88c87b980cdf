use crate::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Occupants of one cell: the permanent patch plus at most one daisy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub patch: AgentId,
    pub daisy: Option<AgentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell {position} already holds daisy {occupant}")]
    CellOccupied {
        position: Position,
        occupant: AgentId,
    },
    #[error("agent {agent} is not present at {position}")]
    NotFound { agent: AgentId, position: Position },
    #[error("patch {agent} cannot be removed from {position}")]
    PatchImmovable { agent: AgentId, position: Position },
}

/// Fixed-size toroidal lattice. Every coordinate passed in is wrapped, so no
/// cell is ever off-grid.
#[derive(Clone, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Build a grid with one patch per cell, row-major. `patch_id` is called
    /// once per cell in index order.
    pub fn new(width: usize, height: usize, mut patch_id: impl FnMut(Position) -> AgentId) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be positive");
        let cells = (0..height)
            .flat_map(|y| (0..width).map(move |x| Position::new(x, y)))
            .map(|pos| Cell {
                patch: patch_id(pos),
                daisy: None,
            })
            .collect();
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Wrap signed coordinates onto the torus.
    pub fn wrap(&self, x: i64, y: i64) -> Position {
        Position::new(
            x.rem_euclid(self.width as i64) as usize,
            y.rem_euclid(self.height as i64) as usize,
        )
    }

    pub fn index(&self, pos: Position) -> usize {
        (pos.y % self.height) * self.width + (pos.x % self.width)
    }

    pub fn position(&self, index: usize) -> Position {
        Position::new(index % self.width, index / self.width)
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).map(move |i| self.position(i))
    }

    pub fn contents(&self, pos: Position) -> Cell {
        self.cells[self.index(pos)]
    }

    pub fn is_vacant(&self, pos: Position) -> bool {
        self.contents(pos).daisy.is_none()
    }

    pub fn vacant_positions(&self) -> Vec<Position> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.daisy.is_none())
            .map(|(i, _)| self.position(i))
            .collect()
    }

    /// Put a daisy into a cell. The caller is expected to have checked
    /// vacancy; a second daisy is reported rather than overwriting.
    pub fn place(&mut self, agent: AgentId, pos: Position) -> Result<(), GridError> {
        let idx = self.index(pos);
        let position = self.position(idx);
        let cell = &mut self.cells[idx];
        if let Some(occupant) = cell.daisy {
            return Err(GridError::CellOccupied { position, occupant });
        }
        cell.daisy = Some(agent);
        Ok(())
    }

    pub fn remove(&mut self, agent: AgentId, pos: Position) -> Result<(), GridError> {
        let idx = self.index(pos);
        let position = self.position(idx);
        let cell = &mut self.cells[idx];
        if cell.patch == agent {
            return Err(GridError::PatchImmovable { agent, position });
        }
        if cell.daisy != Some(agent) {
            return Err(GridError::NotFound { agent, position });
        }
        cell.daisy = None;
        Ok(())
    }

    /// Distinct wrapped neighbours of `pos`. Moore gives up to 8 cells, von
    /// Neumann up to 4. Grids narrower than 3 cells yield fewer because
    /// wrapped duplicates are dropped.
    pub fn neighbors(&self, pos: Position, moore: bool, include_center: bool) -> Vec<Position> {
        let center = self.position(self.index(pos));
        let mut out = Vec::with_capacity(9);
        for dx in -1i64..=1 {
            for dy in -1i64..=1 {
                if dx == 0 && dy == 0 && !include_center {
                    continue;
                }
                if !moore && dx != 0 && dy != 0 {
                    continue;
                }
                let p = self.wrap(center.x as i64 + dx, center.y as i64 + dy);
                if p == center && !include_center {
                    continue;
                }
                if !out.contains(&p) {
                    out.push(p);
                }
            }
        }
        out
    }
}
