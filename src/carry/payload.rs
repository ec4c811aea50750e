//! Captured objects and the single carry slot they live in.

use serde::{Deserialize, Serialize};

use crate::world::position::BlockPos;
use crate::world::view::{
    AttachedData, EntityId, EntityPlacement, WorldError, WorldStore, WorldView,
};

const BURDEN_STEP: usize = 500;
pub const MAX_BURDEN: u8 = 4;

const POSITION_KEYS: [&str; 3] = ["x", "y", "z"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "payload", rename_all = "snake_case")]
pub enum CarriedPayload {
    Static {
        kind: String,
        variant: u8,
        #[serde(default)]
        data: AttachedData,
    },
    Mobile {
        kind: String,
        #[serde(default)]
        data: AttachedData,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PayloadKind {
    #[default]
    None,
    Static,
    Mobile,
}

impl CarriedPayload {
    pub fn kind(&self) -> &str {
        match self {
            CarriedPayload::Static { kind, .. } | CarriedPayload::Mobile { kind, .. } => kind,
        }
    }

    pub fn data(&self) -> &AttachedData {
        match self {
            CarriedPayload::Static { data, .. } | CarriedPayload::Mobile { data, .. } => data,
        }
    }

    pub fn payload_kind(&self) -> PayloadKind {
        match self {
            CarriedPayload::Static { .. } => PayloadKind::Static,
            CarriedPayload::Mobile { .. } => PayloadKind::Mobile,
        }
    }

    /// Slowdown level while carrying, derived from how much state was
    /// captured. Agents always weigh at least one level more than their data.
    pub fn burden_level(&self) -> u8 {
        let size = serde_json::Value::Object(self.data().clone())
            .to_string()
            .len();
        let steps = (size / BURDEN_STEP).min(usize::from(MAX_BURDEN)) as u8;
        match self {
            CarriedPayload::Static { .. } => steps.clamp(1, MAX_BURDEN),
            CarriedPayload::Mobile { .. } => (steps + 1).min(MAX_BURDEN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("carry slot already holds a payload")]
    AlreadyCarrying,
    #[error("kind '{0}' cannot be identified")]
    UnknownKind(String),
    #[error(transparent)]
    World(#[from] WorldError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CarrySlot(Option<CarriedPayload>);

impl CarrySlot {
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn payload(&self) -> Option<&CarriedPayload> {
        self.0.as_ref()
    }

    pub fn payload_kind(&self) -> PayloadKind {
        self.0
            .as_ref()
            .map_or(PayloadKind::None, CarriedPayload::payload_kind)
    }

    /// Fills an empty slot. An occupied slot is never overwritten.
    pub fn fill(&mut self, payload: CarriedPayload) -> Result<(), CodecError> {
        if self.0.is_some() {
            return Err(CodecError::AlreadyCarrying);
        }
        self.0 = Some(payload);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTarget {
    Block(BlockPos),
    Entity(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Destination {
    pub cell: BlockPos,
    pub facing: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoredObject {
    Block(BlockPos),
    Entity(EntityId),
}

pub fn capture<W>(target: CaptureTarget, world: &W, slot: &CarrySlot) -> Result<CarriedPayload, CodecError>
where
    W: WorldView + ?Sized,
{
    if !slot.is_empty() {
        return Err(CodecError::AlreadyCarrying);
    }
    match target {
        CaptureTarget::Block(pos) => {
            let state = world.block(pos).ok_or(WorldError::NoBlock(pos))?;
            if !world.knows_block_kind(&state.kind) {
                return Err(CodecError::UnknownKind(state.kind));
            }
            Ok(CarriedPayload::Static {
                kind: state.kind,
                variant: state.variant,
                data: world.block_data(pos).unwrap_or_default(),
            })
        }
        CaptureTarget::Entity(id) => {
            let entity = world.entity(id).ok_or(WorldError::NoEntity(id))?;
            let kind = entity
                .kind
                .filter(|kind| world.knows_entity_kind(kind))
                .ok_or_else(|| CodecError::UnknownKind(format!("entity {}", id.0)))?;
            let data = world.entity_data(id).ok_or(WorldError::NoEntity(id))?;
            Ok(CarriedPayload::Mobile { kind, data })
        }
    }
}

/// Rebuilds `payload` at `destination`. Either the object appears with its
/// captured state or the world is left as it was.
pub fn restore<W>(
    payload: &CarriedPayload,
    world: &mut W,
    destination: Destination,
) -> Result<RestoredObject, CodecError>
where
    W: WorldStore + ?Sized,
{
    match payload {
        CarriedPayload::Static {
            kind,
            variant,
            data,
        } => {
            if !world.knows_block_kind(kind) {
                return Err(CodecError::UnknownKind(kind.clone()));
            }
            let data = relocated(data, destination.cell);
            world.materialize_block(destination.cell, kind, *variant, &data)?;
            Ok(RestoredObject::Block(destination.cell))
        }
        CarriedPayload::Mobile { kind, data } => {
            if !world.knows_entity_kind(kind) {
                return Err(CodecError::UnknownKind(kind.clone()));
            }
            let placement = EntityPlacement {
                position: destination.cell.floor_center(),
                yaw: destination.facing,
                pitch: 0.0,
            };
            let id = world.spawn_entity(kind, data, placement)?;
            Ok(RestoredObject::Entity(id))
        }
    }
}

fn relocated(data: &AttachedData, cell: BlockPos) -> AttachedData {
    let mut data = data.clone();
    for (key, value) in POSITION_KEYS.iter().zip([cell.x, cell.y, cell.z]) {
        if let Some(slot) = data.get_mut(*key) {
            *slot = serde_json::Value::from(value);
        }
    }
    data
}
