use crate::world::position::{BlockPos, Vec3};
use crate::world::raycast::Aabb;

pub type AttachedData = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub u32);

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockState {
    pub kind: String,
    pub variant: u8,
    pub material: String,
    /// Negative hardness marks indestructible blocks.
    pub hardness: f32,
    pub resistance: f32,
    pub replaceable: bool,
    /// Stops an aim ray. Portals and similar fields are looked through.
    pub selectable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityCategory {
    Creature,
    Actor,
    DroppedItem,
    Projectile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: Option<String>,
    pub category: EntityCategory,
    pub position: Vec3,
    pub bounds: Aabb,
    pub height: f32,
    pub width: f32,
    pub health: f32,
    pub alive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityPlacement {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("no block at {0}")]
    NoBlock(BlockPos),
    #[error("no entity {0:?}")]
    NoEntity(EntityId),
    #[error("unknown block kind '{0}'")]
    UnknownBlockKind(String),
    #[error("unknown entity kind '{0}'")]
    UnknownEntityKind(String),
    #[error("cell {0} is occupied")]
    Occupied(BlockPos),
}

pub trait WorldView {
    fn block(&self, pos: BlockPos) -> Option<BlockState>;
    fn block_data(&self, pos: BlockPos) -> Option<AttachedData>;
    fn entity(&self, id: EntityId) -> Option<EntitySnapshot>;
    /// Measured to the bounding box, not the feet.
    fn entities_near(&self, center: Vec3, radius: f64) -> Vec<EntitySnapshot>;
    fn entity_data(&self, id: EntityId) -> Option<AttachedData>;
    fn knows_block_kind(&self, kind: &str) -> bool;
    fn knows_entity_kind(&self, kind: &str) -> bool;
}

/// Mutating access. Every call is all-or-nothing: an `Err` leaves the world
/// unchanged.
pub trait WorldStore: WorldView {
    fn remove_block(&mut self, pos: BlockPos) -> Result<(), WorldError>;
    fn remove_entity(&mut self, id: EntityId) -> Result<(), WorldError>;
    fn materialize_block(
        &mut self,
        pos: BlockPos,
        kind: &str,
        variant: u8,
        data: &AttachedData,
    ) -> Result<(), WorldError>;
    fn spawn_entity(
        &mut self,
        kind: &str,
        data: &AttachedData,
        placement: EntityPlacement,
    ) -> Result<EntityId, WorldError>;
}

pub trait PlacementPermission {
    fn can_modify(&self, actor: ActorId, pos: BlockPos) -> bool;
}

impl<F> PlacementPermission for F
where
    F: Fn(ActorId, BlockPos) -> bool,
{
    fn can_modify(&self, actor: ActorId, pos: BlockPos) -> bool {
        self(actor, pos)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PlacementPermission for AllowAll {
    fn can_modify(&self, _actor: ActorId, _pos: BlockPos) -> bool {
        true
    }
}

/// Executes rule side-effect hooks. Command text is passed through verbatim.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str, actor: ActorId);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingCommandRunner;

impl CommandRunner for LoggingCommandRunner {
    fn run(&self, command: &str, actor: ActorId) {
        tracing::info!(%actor, command, "carry hook");
    }
}
