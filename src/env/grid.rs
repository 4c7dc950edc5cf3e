use super::{Location, PatchGeometry};
use crate::agent::CellAgent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Arena index of an agent. Cross-agent links (parent, bound target) are stored
/// as ids and resolved through the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Agent arena plus patch occupancy.
///
/// An agent that is being stepped is checked out with [`PatchGrid::take`]: it
/// leaves the arena but keeps its occupancy entry, so co-occupants still see it
/// in `agents_at`. Volume queries only sum agents that are checked in.
#[derive(Debug)]
pub struct PatchGrid {
    geometry: PatchGeometry,
    agents: BTreeMap<AgentId, CellAgent>,
    occupancy: BTreeMap<Location, Vec<AgentId>>,
    next_id: u32,
    max_agents: usize,
}

impl PatchGrid {
    pub fn new(geometry: PatchGeometry) -> Self {
        PatchGrid { geometry, agents: BTreeMap::new(), occupancy: BTreeMap::new(), next_id: 1, max_agents: usize::MAX }
    }

    /// Caps the number of agents that may share a patch.
    pub fn with_max_agents(mut self, max_agents: usize) -> Self {
        self.max_agents = max_agents;
        self
    }

    pub fn geometry(&self) -> &PatchGeometry {
        &self.geometry
    }

    /// Reserves a fresh agent id.
    pub fn next_id(&mut self) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn agents(&self) -> impl Iterator<Item = &CellAgent> {
        self.agents.values()
    }

    pub fn get(&self, id: AgentId) -> Option<&CellAgent> {
        self.agents.get(&id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut CellAgent> {
        self.agents.get_mut(&id)
    }

    /// True while the agent is registered, including while it is checked out.
    pub fn is_registered(&self, id: AgentId, loc: Location) -> bool {
        self.occupancy.get(&loc).is_some_and(|ids| ids.contains(&id))
    }

    /// Places a new agent at its own location.
    pub fn add(&mut self, agent: CellAgent) {
        let id = agent.id();
        self.next_id = self.next_id.max(id.0 + 1);
        self.occupancy.entry(agent.location()).or_default().push(id);
        self.agents.insert(id, agent);
    }

    /// Removes an agent and its occupancy entry.
    pub fn remove(&mut self, id: AgentId) -> Option<CellAgent> {
        let agent = self.agents.remove(&id)?;
        self.release(id, agent.location());
        Some(agent)
    }

    /// Checks an agent out of the arena for stepping.
    pub fn take(&mut self, id: AgentId) -> Option<CellAgent> {
        self.agents.remove(&id)
    }

    /// Checks a stepped agent back in.
    pub fn restore(&mut self, agent: CellAgent) {
        self.agents.insert(agent.id(), agent);
    }

    /// Drops the occupancy entry of a checked-out agent that is being removed.
    pub fn release(&mut self, id: AgentId, loc: Location) {
        if let Some(ids) = self.occupancy.get_mut(&loc) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.occupancy.remove(&loc);
            }
        }
    }

    /// Moves an agent's occupancy entry; the caller updates the agent's own location.
    pub fn relocate(&mut self, id: AgentId, from: Location, to: Location) {
        self.release(id, from);
        self.occupancy.entry(to).or_default().push(id);
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.core.location = to;
        }
    }

    pub fn agents_at(&self, loc: Location) -> &[AgentId] {
        self.occupancy.get(&loc).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn neighbors(&self, loc: Location) -> Vec<Location> {
        self.geometry.neighbors(loc)
    }

    /// Ids at `loc` and every neighboring patch.
    pub fn agents_around(&self, loc: Location) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self.agents_at(loc).to_vec();
        for n in self.neighbors(loc) {
            ids.extend_from_slice(self.agents_at(n));
        }
        ids
    }

    /// Summed volume of checked-in agents at `loc`.
    pub fn total_volume(&self, loc: Location) -> f64 {
        self.agents_at(loc)
            .iter()
            .filter_map(|id| self.agents.get(id))
            .map(|a| a.volume())
            .sum()
    }

    /// True if a cell of `volume` fits into `loc`, given `extra` volume already
    /// committed there by a checked-out agent.
    pub fn fits(&self, loc: Location, volume: f64, extra: f64, max_height: f64) -> bool {
        if !self.geometry.contains(loc) || self.agents_at(loc).len() >= self.max_agents {
            return false;
        }
        let total = self.total_volume(loc) + extra + volume;
        total <= self.geometry.volume() && total / self.geometry.area() <= max_height
    }
}
