//! Map state for matched plates.
//!
//! The observer sits at the center of a `width` x `height` map. Front
//! detections land above the center and back detections below it, with the
//! lateral offset mirrored for the back camera. Re-detections do not jump:
//! they schedule a linear move that `advance` plays out one step per tick.

use crate::types::Orientation;
use log::{debug, info};
use std::collections::HashMap;

pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;
pub const DEFAULT_ANIMATION_STEPS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    fn lerp(self, to: Point, ratio: f64) -> Point {
        Point {
            x: self.x + ratio * (to.x - self.x),
            y: self.y + ratio * (to.y - self.y),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapGeometry {
    pub width: f64,
    pub height: f64,
    pub pixels_per_meter: f64,
    pub lateral_scale: f64,
    /// Icon side as a share of the shorter map side.
    pub icon_fraction: f64,
    pub icon_size: f64,
}

impl MapGeometry {
    /// Icon is a quarter of the shorter side, as the map is drawn.
    pub fn new(width: f64, height: f64) -> Self {
        MapGeometry::with_icon_fraction(width, height, 0.25)
    }

    pub fn with_icon_fraction(width: f64, height: f64, icon_fraction: f64) -> Self {
        MapGeometry {
            width,
            height,
            pixels_per_meter: 1000.0,
            lateral_scale: 10.0,
            icon_fraction,
            icon_size: width.min(height) * icon_fraction,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn project(&self, distance: f64, bearing_offset: f64, orientation: Orientation) -> Point {
        let center = self.center();
        let (y, lateral) = match orientation {
            Orientation::Front => (center.y - distance * self.pixels_per_meter, bearing_offset),
            Orientation::Back => (center.y + distance * self.pixels_per_meter, -bearing_offset),
        };
        self.clamp(Point::new(center.x + lateral * self.lateral_scale, y))
    }

    /// Keeps the whole icon on the map.
    pub fn clamp(&self, p: Point) -> Point {
        let half = self.icon_size / 2.0;
        Point::new(
            p.x.min(self.width - half).max(half),
            p.y.min(self.height - half).max(half),
        )
    }
}

impl Default for MapGeometry {
    fn default() -> Self {
        MapGeometry::new(800.0, 600.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Motion {
    from: Point,
    to: Point,
    step: u32,
    steps: u32,
}

#[derive(Debug)]
struct TrackedEntity {
    position: Point,
    target: Point,
    last_seen: f64,
    orientation: Orientation,
    motion: Option<Motion>,
}

/// Copy of one entity, safe to hand to the presentation side.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub identity: String,
    pub position: Point,
    pub target: Point,
    pub last_seen: f64,
    pub orientation: Orientation,
    pub moving: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerUpdate {
    Created(EntitySnapshot),
    /// A new target was set; the entity will move there over the next ticks.
    Retargeted(EntitySnapshot),
    Moved(EntitySnapshot),
    Removed(String),
}

pub struct SpatialTracker {
    geometry: MapGeometry,
    animation_steps: u32,
    entities: HashMap<String, TrackedEntity>,
}

impl SpatialTracker {
    pub fn new(geometry: MapGeometry) -> Self {
        SpatialTracker::with_steps(geometry, DEFAULT_ANIMATION_STEPS)
    }

    pub fn with_steps(geometry: MapGeometry, animation_steps: u32) -> Self {
        SpatialTracker {
            geometry,
            animation_steps,
            entities: HashMap::new(),
        }
    }

    pub fn geometry(&self) -> &MapGeometry {
        &self.geometry
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn upsert(
        &mut self,
        identity: &str,
        distance: f64,
        bearing_offset: f64,
        orientation: Orientation,
        now: f64,
    ) -> TrackerUpdate {
        let target = self.geometry.project(distance, bearing_offset, orientation);
        let steps = self.animation_steps;

        match self.entities.get_mut(identity) {
            Some(entity) => {
                entity.last_seen = now;
                entity.orientation = orientation;
                entity.target = target;
                if steps == 0 {
                    entity.position = target;
                    entity.motion = None;
                } else {
                    entity.motion = Some(Motion {
                        from: entity.position,
                        to: target,
                        step: 0,
                        steps,
                    });
                }
                debug!("{} retargeted to ({:.1}, {:.1})", identity, target.x, target.y);
                TrackerUpdate::Retargeted(snapshot_of(identity, entity))
            }
            None => {
                info!(
                    "Tracking {} ({}) at ({:.1}, {:.1})",
                    identity, orientation, target.x, target.y
                );
                let entity = TrackedEntity {
                    position: target,
                    target,
                    last_seen: now,
                    orientation,
                    motion: None,
                };
                let snapshot = snapshot_of(identity, &entity);
                self.entities.insert(identity.to_string(), entity);
                TrackerUpdate::Created(snapshot)
            }
        }
    }

    /// Moves every animating entity one step toward its target.
    pub fn advance(&mut self) -> Vec<TrackerUpdate> {
        let mut moved = Vec::new();
        for (identity, entity) in self.entities.iter_mut() {
            let motion = match entity.motion.as_mut() {
                Some(motion) => motion,
                None => continue,
            };
            motion.step += 1;
            if motion.step >= motion.steps {
                entity.position = motion.to;
                entity.motion = None;
            } else {
                let ratio = motion.step as f64 / motion.steps as f64;
                entity.position = motion.from.lerp(motion.to, ratio);
            }
            moved.push(TrackerUpdate::Moved(snapshot_of(identity, entity)));
        }
        moved
    }

    /// Drops entities not seen for `timeout` seconds.
    pub fn expire(&mut self, now: f64, timeout: f64) -> Vec<TrackerUpdate> {
        let mut gone: Vec<String> = self
            .entities
            .iter()
            .filter(|(_, e)| now - e.last_seen >= timeout)
            .map(|(identity, _)| identity.clone())
            .collect();
        gone.sort();
        for identity in &gone {
            self.entities.remove(identity);
            info!("{} no longer detected, removing", identity);
        }
        gone.into_iter().map(TrackerUpdate::Removed).collect()
    }

    /// Changes the map size and pulls every entity back inside it.
    pub fn resize(&mut self, width: f64, height: f64) {
        let geometry = MapGeometry {
            width,
            height,
            icon_size: width.min(height) * self.geometry.icon_fraction,
            ..self.geometry.clone()
        };
        for entity in self.entities.values_mut() {
            entity.position = geometry.clamp(entity.position);
            entity.target = geometry.clamp(entity.target);
            if let Some(motion) = entity.motion.as_mut() {
                motion.from = geometry.clamp(motion.from);
                motion.to = entity.target;
            }
        }
        self.geometry = geometry;
    }

    /// Current entities ordered by identity.
    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        let mut all: Vec<EntitySnapshot> = self
            .entities
            .iter()
            .map(|(identity, entity)| snapshot_of(identity, entity))
            .collect();
        all.sort_by(|a, b| a.identity.cmp(&b.identity));
        all
    }
}

fn snapshot_of(identity: &str, entity: &TrackedEntity) -> EntitySnapshot {
    EntitySnapshot {
        identity: identity.to_string(),
        position: entity.position,
        target: entity.target,
        last_seen: entity.last_seen,
        orientation: entity.orientation,
        moving: entity.motion.is_some(),
    }
}
