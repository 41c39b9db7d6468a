use super::{Road, RoadAttributes};
use crate::{ConfigurationError, RoadId, RoadSet, RouteError, SimResult};
use itertools::Itertools;
use pathfinding::prelude::dijkstra;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::ops::Index;

/// The road network: every road, indexed by ID and by name.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoadMap {
    /// The roads in the network.
    roads: RoadSet,
    /// Maps road names to IDs.
    names: HashMap<String, RoadId>,
}

impl RoadMap {
    /// Creates an empty road map.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a road to the network.
    pub fn add_road(&mut self, attributes: &RoadAttributes) -> Result<RoadId, ConfigurationError> {
        if self.names.contains_key(attributes.name) {
            return Err(ConfigurationError::DuplicateRoad(attributes.name.to_owned()));
        }
        let id = self
            .roads
            .insert_with_key(|id| Road::new(id, attributes));
        if self.roads[id].length() <= 0.0 {
            self.roads.remove(id);
            return Err(ConfigurationError::DegenerateRoad(attributes.name.to_owned()));
        }
        self.names.insert(attributes.name.to_owned(), id);
        Ok(id)
    }

    /// Specifies that the end of the `from` road connects to the start of the `to` road.
    pub fn connect(&mut self, from: RoadId, to: RoadId) -> Result<(), ConfigurationError> {
        if !self.roads.contains_key(to) {
            return Err(ConfigurationError::ForeignRoad);
        }
        let road = self
            .roads
            .get_mut(from)
            .ok_or(ConfigurationError::ForeignRoad)?;
        road.add_link_out(to);
        Ok(())
    }

    /// Looks up a road ID by name.
    pub fn road_id(&self, name: &str) -> Option<RoadId> {
        self.names.get(name).copied()
    }

    /// Looks up a road ID by name, failing if there is no such road.
    pub fn resolve(&self, name: &str) -> Result<RoadId, ConfigurationError> {
        self.road_id(name)
            .ok_or_else(|| ConfigurationError::UnknownRoad(name.to_owned()))
    }

    /// Gets the road with the given ID.
    pub fn get(&self, id: RoadId) -> Option<&Road> {
        self.roads.get(id)
    }

    /// Gets the road with the given name.
    pub fn get_by_name(&self, name: &str) -> Option<&Road> {
        self.road_id(name).map(|id| &self.roads[id])
    }

    /// Returns an iterator over all the roads, in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &Road> {
        self.roads.values()
    }

    /// The number of roads in the network.
    pub fn len(&self) -> usize {
        self.roads.len()
    }

    /// Whether the network has no roads.
    pub fn is_empty(&self) -> bool {
        self.roads.is_empty()
    }

    /// Resolves the road that follows `from` on a route, failing if
    /// the two roads were never connected.
    pub fn next_road(&self, from: RoadId, to: RoadId) -> Result<RoadId, RouteError> {
        if self.roads[from].leads_to(to) {
            Ok(to)
        } else {
            Err(RouteError {
                from: self.roads[from].name().to_owned(),
                to: self.roads.get(to).map_or("?", |r| r.name()).to_owned(),
            })
        }
    }

    /// Resolves a route given as road names into road IDs, without checking
    /// that consecutive roads are connected.
    pub fn resolve_route<S: AsRef<str>>(
        &self,
        route: &[S],
    ) -> Result<Vec<RoadId>, ConfigurationError> {
        if route.is_empty() {
            return Err(ConfigurationError::EmptyRoute);
        }
        route.iter().map(|name| self.resolve(name.as_ref())).collect()
    }

    /// Resolves a route given as road names and checks that each road leads
    /// onto the next.
    pub fn check_route<S: AsRef<str>>(&self, route: &[S]) -> SimResult<Vec<RoadId>> {
        let ids = self.resolve_route(route)?;
        for (from, to) in ids.iter().copied().tuple_windows() {
            self.next_road(from, to)?;
        }
        Ok(ids)
    }

    /// Finds the shortest route from the start of `from` to the end of `to`,
    /// measured by the total length of the roads travelled.
    pub fn shortest_route(&self, from: RoadId, to: RoadId) -> Option<Vec<RoadId>> {
        if !self.roads.contains_key(from) || !self.roads.contains_key(to) {
            return None;
        }
        let (route, _) = dijkstra(
            &from,
            |id| {
                self.roads[*id]
                    .successors()
                    .iter()
                    .map(|next| (*next, millimetres(self.roads[*next].length())))
                    .collect::<SmallVec<[_; 4]>>()
            },
            |id| *id == to,
        )?;
        Some(route)
    }

    /// Gets a mutable reference to a road.
    pub(crate) fn get_mut(&mut self, id: RoadId) -> &mut Road {
        &mut self.roads[id]
    }
}

impl Index<RoadId> for RoadMap {
    type Output = Road;

    fn index(&self, id: RoadId) -> &Road {
        &self.roads[id]
    }
}

/// Converts a length into an integer path cost.
fn millimetres(length: f64) -> u64 {
    (length * 1000.0).round() as u64
}
