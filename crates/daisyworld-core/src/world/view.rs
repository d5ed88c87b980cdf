use super::World;
use crate::agent::{AgentId, AgentType, Daisy, DaisyColor, Patch};
use crate::grid::Position;
use serde::Serialize;

/// Borrowed view of a single live agent.
#[derive(Clone, Copy, Debug)]
pub enum AgentView<'a> {
    Patch(&'a Patch),
    Daisy(&'a Daisy),
}

impl AgentView<'_> {
    pub fn id(&self) -> AgentId {
        match self {
            AgentView::Patch(p) => p.id,
            AgentView::Daisy(d) => d.id,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            AgentView::Patch(p) => p.position,
            AgentView::Daisy(d) => d.position,
        }
    }

    pub fn agent_type(&self) -> AgentType {
        match self {
            AgentView::Patch(_) => AgentType::Patch,
            AgentView::Daisy(d) => d.agent_type(),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DaisyView {
    pub id: AgentId,
    pub color: DaisyColor,
    pub remaining_lifespan: i64,
    pub born_at: u64,
}

/// What a renderer needs to draw one cell.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CellView {
    pub position: Position,
    pub local_temperature: f64,
    pub daisy: Option<DaisyView>,
}

impl World {
    pub fn agent(&self, id: AgentId) -> Option<AgentView<'_>> {
        if let Some(daisy) = self.habitat.daisies.get(&id) {
            return Some(AgentView::Daisy(daisy));
        }
        self.habitat
            .patch_index(id)
            .ok()
            .map(|idx| AgentView::Patch(&self.habitat.patches[idx]))
    }

    pub fn patches(&self) -> impl Iterator<Item = &Patch> + '_ {
        self.habitat.patches.iter()
    }

    /// Live daisies in id order.
    pub fn daisies(&self) -> impl Iterator<Item = &Daisy> + '_ {
        self.habitat.daisies.values()
    }

    pub fn patch_at(&self, position: Position) -> &Patch {
        &self.habitat.patches[self.habitat.grid.index(position)]
    }

    pub fn daisy_at(&self, position: Position) -> Option<&Daisy> {
        self.habitat
            .grid
            .contents(position)
            .daisy
            .and_then(|id| self.habitat.daisies.get(&id))
    }

    pub fn cell(&self, position: Position) -> CellView {
        let patch = self.patch_at(position);
        CellView {
            position: patch.position,
            local_temperature: patch.local_temperature,
            daisy: self.daisy_at(position).map(|d| DaisyView {
                id: d.id,
                color: d.color,
                remaining_lifespan: d.remaining_lifespan,
                born_at: d.born_at,
            }),
        }
    }

    /// Every cell in row-major order.
    pub fn cells(&self) -> Vec<CellView> {
        self.habitat
            .grid
            .positions()
            .map(|pos| self.cell(pos))
            .collect()
    }
}
