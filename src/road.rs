pub use map::RoadMap;

use crate::math::Point2d;
use crate::{RoadId, TrafficLightId, VehicleId, VehicleSet};
use cgmath::MetricSpace;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::VecDeque;

mod map;

/// A road represents a single, straight lane of traffic.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Road {
    /// The road ID.
    id: RoadId,
    /// The unique name of the road.
    name: String,
    /// The point where vehicles enter the road.
    start: Point2d,
    /// The point where vehicles leave the road.
    end: Point2d,
    /// The length of the road in m.
    length: f64,
    /// The roads that succeed this one.
    links_out: SmallVec<[RoadId; 4]>,
    /// Whether vehicles may leave the road.
    green_light: bool,
    /// The traffic light controlling the end of the road.
    light: Option<TrafficLightId>,
    /// The vehicles on the road, the most advanced one first.
    vehicles: VecDeque<VehicleId>,
}

/// The attributes of a road.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoadAttributes<'a> {
    /// The unique name of the road.
    pub name: &'a str,
    /// The start point in world space, in m.
    pub start: Point2d,
    /// The end point in world space, in m.
    pub end: Point2d,
}

impl Road {
    /// Creates a new road.
    pub(crate) fn new(id: RoadId, attribs: &RoadAttributes) -> Self {
        Self {
            id,
            name: attribs.name.to_owned(),
            start: attribs.start,
            end: attribs.end,
            length: attribs.start.distance(attribs.end),
            links_out: SmallVec::new(),
            green_light: true,
            light: None,
            vehicles: VecDeque::new(),
        }
    }

    /// Gets the road's ID.
    pub fn id(&self) -> RoadId {
        self.id
    }

    /// Gets the road's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The point where vehicles enter the road.
    pub fn start(&self) -> Point2d {
        self.start
    }

    /// The point where vehicles leave the road.
    pub fn end(&self) -> Point2d {
        self.end
    }

    /// Gets the length of the road in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The roads a vehicle may continue onto from this one.
    pub fn successors(&self) -> &[RoadId] {
        &self.links_out
    }

    /// Whether the road leads directly onto the given road.
    pub fn leads_to(&self, road_id: RoadId) -> bool {
        self.links_out.contains(&road_id)
    }

    /// Whether vehicles may currently leave the road.
    /// Roads without a traffic light are always green.
    pub fn green_light(&self) -> bool {
        self.green_light
    }

    /// The traffic light controlling the end of this road, if any.
    pub fn traffic_light(&self) -> Option<TrafficLightId> {
        self.light
    }

    /// The traffic light holding vehicles on this road, if it is currently red.
    pub fn red_light(&self) -> Option<TrafficLightId> {
        self.light.filter(|_| !self.green_light)
    }

    /// The vehicles on the road, ordered from the most advanced to the last.
    pub fn vehicles(&self) -> impl ExactSizeIterator<Item = VehicleId> + '_ {
        self.vehicles.iter().copied()
    }

    /// The vehicle immediately ahead of the given one, if there is one.
    pub fn leader_of(&self, vehicle_id: VehicleId) -> Option<VehicleId> {
        let idx = self.vehicles.iter().position(|id| *id == vehicle_id)?;
        idx.checked_sub(1).map(|idx| self.vehicles[idx])
    }

    /// Adds a successor road.
    pub(crate) fn add_link_out(&mut self, road_id: RoadId) {
        if !self.leads_to(road_id) {
            self.links_out.push(road_id);
        }
    }

    /// Links the road to the traffic light controlling it.
    pub(crate) fn set_traffic_light(&mut self, light: TrafficLightId) {
        self.light = Some(light);
    }

    /// Sets whether vehicles may leave the road.
    pub(crate) fn set_green_light(&mut self, green: bool) {
        self.green_light = green;
    }

    /// Inserts the vehicle with the given ID into the road, behind every vehicle
    /// that is at least as far along the road.
    pub(crate) fn insert_vehicle(&mut self, vehicles: &VehicleSet, id: VehicleId) {
        let veh_pos = vehicles[id].pos();
        let idx = self
            .vehicles
            .iter()
            .map(|id| vehicles[*id].pos())
            .position(|pos| pos < veh_pos)
            .unwrap_or(self.vehicles.len());
        self.vehicles.insert(idx, id);
    }

    /// Removes the vehicle with the given ID from the road.
    /// This is normally the vehicle at the head of the queue.
    pub(crate) fn remove_vehicle(&mut self, id: VehicleId) {
        if self.vehicles.front() == Some(&id) {
            self.vehicles.pop_front();
        } else if let Some(idx) = self.vehicles.iter().position(|v| *v == id) {
            log::warn!("vehicle {:?} left road `{}` ahead of its leader", id, self.name);
            self.vehicles.remove(idx);
        }
    }
}
