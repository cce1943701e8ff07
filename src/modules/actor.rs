//! Actor operations in the editor world.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::ModuleError;

/// World-space location or offset, in centimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vector {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vector {
    /// Creates a vector.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl std::ops::Add for Vector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// Rotation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rotator {
    /// Pitch in degrees.
    pub pitch: f64,
    /// Yaw in degrees.
    pub yaw: f64,
    /// Roll in degrees.
    pub roll: f64,
}

impl fmt::Display for Rotator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(Pitch={:.1}, Yaw={:.1}, Roll={:.1})",
            self.pitch, self.yaw, self.roll
        )
    }
}

/// Description of an actor placed in the level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorInfo {
    /// Unique object name, e.g. `PointLight_0`.
    pub name: String,
    /// Label shown in the outliner.
    pub label: String,
    /// Full class path.
    pub class: String,
    /// World location.
    pub location: Vector,
    /// World rotation.
    pub rotation: Rotator,
    /// Outliner folder, empty for the root.
    pub folder: String,
}

/// Actor operations in the editor world.
pub trait ActorModule: Send + Sync {
    /// Spawns an actor of `class_path` at the given transform.
    ///
    /// # Errors
    ///
    /// Fails if the class cannot be resolved or the subsystem is unavailable.
    fn spawn_actor(
        &self,
        class_path: &str,
        location: Vector,
        rotation: Rotator,
    ) -> Result<ActorInfo, ModuleError>;

    /// Deletes an actor by name, label or level path; returns the deleted actor.
    ///
    /// # Errors
    ///
    /// Fails if no actor matches the identifier.
    fn delete_actor(&self, identifier: &str) -> Result<ActorInfo, ModuleError>;

    /// Duplicates an actor, translating the copy by `offset`.
    ///
    /// # Errors
    ///
    /// Fails if no actor matches the identifier.
    fn duplicate_actor(&self, identifier: &str, offset: Vector) -> Result<ActorInfo, ModuleError>;

    /// Lists actors in the current level, optionally only those of one class.
    ///
    /// # Errors
    ///
    /// Fails if the level cannot be queried.
    fn get_actors_in_level(&self, class_filter: Option<&str>)
        -> Result<Vec<ActorInfo>, ModuleError>;
}

#[derive(Debug, Default)]
struct Level {
    actors: IndexMap<String, ActorInfo>,
    next_suffix: HashMap<String, u32>,
}

impl Level {
    fn find_key(&self, identifier: &str) -> Option<String> {
        let identifier = identifier
            .strip_prefix("PersistentLevel.")
            .unwrap_or(identifier);
        if self.actors.contains_key(identifier) {
            return Some(identifier.to_string());
        }
        self.actors
            .values()
            .find(|actor| actor.label == identifier)
            .map(|actor| actor.name.clone())
    }

    fn place(&mut self, class_path: &str, location: Vector, rotation: Rotator) -> ActorInfo {
        let short = class_short_name(class_path);
        let suffix = self.next_suffix.entry(short.to_string()).or_insert(0);
        let name = format!("{short}_{suffix}");
        let label = if *suffix == 0 {
            short.to_string()
        } else {
            format!("{short}{suffix}")
        };
        *suffix += 1;

        let actor = ActorInfo {
            name: name.clone(),
            label,
            class: class_path.to_string(),
            location,
            rotation,
            folder: String::new(),
        };
        self.actors.insert(name, actor.clone());
        actor
    }
}

/// `/Script/Engine.PointLight` → `PointLight`.
fn class_short_name(class_path: &str) -> &str {
    class_path
        .rsplit(['.', '/'])
        .next()
        .unwrap_or(class_path)
}

fn resolve_class(class_path: &str) -> Result<(), ModuleError> {
    let rooted = class_path.starts_with("/Script/") || class_path.starts_with("/Game/");
    let short = class_short_name(class_path);
    if !rooted || !class_path.contains('.') || short.is_empty() {
        return Err(ModuleError::NotFound {
            kind: "Class",
            name: class_path.to_string(),
        });
    }
    Ok(())
}

/// Headless stand-in for the editor world.
///
/// Keeps actors in memory with editor-like naming (`Class_N`) so the server
/// runs, and tools can be exercised, without an editor process.
#[derive(Debug, Default)]
pub struct InMemoryActorModule {
    level: Mutex<Level>,
}

impl InMemoryActorModule {
    /// Creates an empty level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActorModule for InMemoryActorModule {
    fn spawn_actor(
        &self,
        class_path: &str,
        location: Vector,
        rotation: Rotator,
    ) -> Result<ActorInfo, ModuleError> {
        resolve_class(class_path)?;
        Ok(self.level.lock().place(class_path, location, rotation))
    }

    fn delete_actor(&self, identifier: &str) -> Result<ActorInfo, ModuleError> {
        let mut level = self.level.lock();
        let key = level.find_key(identifier).ok_or_else(|| ModuleError::NotFound {
            kind: "Actor",
            name: identifier.to_string(),
        })?;
        level
            .actors
            .shift_remove(&key)
            .ok_or_else(|| ModuleError::NotFound {
                kind: "Actor",
                name: identifier.to_string(),
            })
    }

    fn duplicate_actor(&self, identifier: &str, offset: Vector) -> Result<ActorInfo, ModuleError> {
        let mut level = self.level.lock();
        let source = level
            .find_key(identifier)
            .and_then(|key| level.actors.get(&key).cloned())
            .ok_or_else(|| ModuleError::NotFound {
                kind: "Actor",
                name: identifier.to_string(),
            })?;
        Ok(level.place(&source.class, source.location + offset, source.rotation))
    }

    fn get_actors_in_level(
        &self,
        class_filter: Option<&str>,
    ) -> Result<Vec<ActorInfo>, ModuleError> {
        let level = self.level.lock();
        Ok(level
            .actors
            .values()
            .filter(|actor| class_filter.map_or(true, |class| actor.class == class))
            .cloned()
            .collect())
    }
}
