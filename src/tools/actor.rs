//! Actor tools: spawn, delete, duplicate and list actors in the level.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{Tool, ToolCallResult};
use crate::modules::{ActorModule, Rotator, Vector};

/// Decodes the arguments object into a typed struct, or an `isError` result.
fn parse_args<T: DeserializeOwned>(arguments: &Map<String, Value>) -> Result<T, ToolCallResult> {
    serde_json::from_value(Value::Object(arguments.clone()))
        .map_err(|e| ToolCallResult::error(format!("Invalid arguments: {e}")))
}

fn vector_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "properties": {
            "x": { "type": "number" },
            "y": { "type": "number" },
            "z": { "type": "number" }
        }
    })
}

/// `spawn_actor`: places a new actor of a class in the editor world.
pub struct SpawnActorTool {
    actors: Arc<dyn ActorModule>,
}

impl SpawnActorTool {
    /// Creates the tool over an actor module.
    #[must_use]
    pub fn new(actors: Arc<dyn ActorModule>) -> Self {
        Self { actors }
    }
}

#[derive(Deserialize)]
struct SpawnActorArgs {
    actor_class: String,
    #[serde(default)]
    location: Vector,
    #[serde(default)]
    rotation: Rotator,
}

impl Tool for SpawnActorTool {
    fn name(&self) -> &str {
        "spawn_actor"
    }

    fn description(&self) -> &str {
        "Spawn an actor in the editor world from a class path. Returns the spawned \
         actor's name, label, class, location and rotation."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "actor_class": {
                    "type": "string",
                    "description": "Full class path, e.g. \"/Script/Engine.StaticMeshActor\" or \"/Script/Engine.PointLight\""
                },
                "location": vector_schema("World location {x, y, z}. Optional, defaults to the origin."),
                "rotation": {
                    "type": "object",
                    "description": "World rotation {pitch, yaw, roll} in degrees. Optional, defaults to zero.",
                    "properties": {
                        "pitch": { "type": "number" },
                        "yaw": { "type": "number" },
                        "roll": { "type": "number" }
                    }
                }
            },
            "required": ["actor_class"]
        })
    }

    fn execute(&self, arguments: &Map<String, Value>) -> ToolCallResult {
        let args: SpawnActorArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(result) => return result,
        };

        match self
            .actors
            .spawn_actor(&args.actor_class, args.location, args.rotation)
        {
            Ok(actor) => ToolCallResult::text(format!(
                "Actor spawned successfully.\nName: {}\nLabel: {}\nClass: {}\nLocation: {}\nRotation: {}",
                actor.name, actor.label, actor.class, actor.location, actor.rotation
            )),
            Err(e) => ToolCallResult::error(format!("Failed to spawn actor: {e}")),
        }
    }
}

/// `delete_actor`: removes an actor from the editor world.
pub struct DeleteActorTool {
    actors: Arc<dyn ActorModule>,
}

impl DeleteActorTool {
    /// Creates the tool over an actor module.
    #[must_use]
    pub fn new(actors: Arc<dyn ActorModule>) -> Self {
        Self { actors }
    }
}

#[derive(Deserialize)]
struct ActorRefArgs {
    actor_name: String,
}

impl Tool for DeleteActorTool {
    fn name(&self) -> &str {
        "delete_actor"
    }

    fn description(&self) -> &str {
        "Delete an actor from the editor world by name, label or path."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "actor_name": {
                    "type": "string",
                    "description": "Actor name, label, or path (e.g. \"StaticMeshActor_0\" or \"PersistentLevel.StaticMeshActor_0\")"
                }
            },
            "required": ["actor_name"]
        })
    }

    fn execute(&self, arguments: &Map<String, Value>) -> ToolCallResult {
        let args: ActorRefArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(result) => return result,
        };

        match self.actors.delete_actor(&args.actor_name) {
            Ok(actor) => ToolCallResult::text(format!("Actor deleted successfully: {}", actor.name)),
            Err(e) => ToolCallResult::error(format!("Failed to delete actor: {e}")),
        }
    }
}

/// `duplicate_actor`: copies an actor with an optional offset.
pub struct DuplicateActorTool {
    actors: Arc<dyn ActorModule>,
}

impl DuplicateActorTool {
    /// Creates the tool over an actor module.
    #[must_use]
    pub fn new(actors: Arc<dyn ActorModule>) -> Self {
        Self { actors }
    }
}

#[derive(Deserialize)]
struct DuplicateActorArgs {
    actor_name: String,
    #[serde(default)]
    offset: Vector,
}

impl Tool for DuplicateActorTool {
    fn name(&self) -> &str {
        "duplicate_actor"
    }

    fn description(&self) -> &str {
        "Duplicate an actor in the editor world. The copy is translated by the \
         optional offset and keeps the source's class and rotation."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "actor_name": {
                    "type": "string",
                    "description": "Actor name, label, or path of the actor to duplicate"
                },
                "offset": vector_schema("Translation applied to the duplicate {x, y, z}. Optional.")
            },
            "required": ["actor_name"]
        })
    }

    fn execute(&self, arguments: &Map<String, Value>) -> ToolCallResult {
        let args: DuplicateActorArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(result) => return result,
        };

        match self.actors.duplicate_actor(&args.actor_name, args.offset) {
            Ok(actor) => ToolCallResult::text(format!(
                "Actor duplicated successfully.\nName: {}\nLabel: {}\nClass: {}\nLocation: {}",
                actor.name, actor.label, actor.class, actor.location
            )),
            Err(e) => ToolCallResult::error(format!("Failed to duplicate actor: {e}")),
        }
    }
}

/// `get_actors_in_level`: lists actors, optionally filtered by class.
pub struct GetActorsInLevelTool {
    actors: Arc<dyn ActorModule>,
}

impl GetActorsInLevelTool {
    /// Creates the tool over an actor module.
    #[must_use]
    pub fn new(actors: Arc<dyn ActorModule>) -> Self {
        Self { actors }
    }
}

#[derive(Deserialize)]
struct GetActorsArgs {
    #[serde(default)]
    class_filter: Option<String>,
}

impl Tool for GetActorsInLevelTool {
    fn name(&self) -> &str {
        "get_actors_in_level"
    }

    fn description(&self) -> &str {
        "Get a list of all actors in the current level. Optionally filter by class."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "class_filter": {
                    "type": "string",
                    "description": "Optional class path to filter actors (e.g. '/Script/Engine.StaticMeshActor')"
                }
            }
        })
    }

    fn execute(&self, arguments: &Map<String, Value>) -> ToolCallResult {
        let args: GetActorsArgs = match parse_args(arguments) {
            Ok(args) => args,
            Err(result) => return result,
        };
        let filter = args.class_filter.as_deref().filter(|f| !f.is_empty());

        match self.actors.get_actors_in_level(filter) {
            Ok(actors) => {
                let mut text = format!("Found {} actors in level:\n", actors.len());
                for actor in &actors {
                    let _ = writeln!(
                        text,
                        "- {} [{}] Class={} Loc={} Folder={}",
                        actor.label, actor.name, actor.class, actor.location, actor.folder
                    );
                }
                ToolCallResult::text(text)
            }
            Err(e) => ToolCallResult::error(format!("Failed to get actors: {e}")),
        }
    }
}
