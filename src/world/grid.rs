use std::collections::{BTreeMap, HashMap};

use crate::world::position::{BlockPos, Vec3};
use crate::world::raycast::Aabb;
use crate::world::view::{
    AttachedData, BlockState, EntityCategory, EntityId, EntityPlacement, EntitySnapshot,
    WorldError, WorldStore, WorldView,
};

#[derive(Debug, Clone, PartialEq)]
pub struct BlockKind {
    pub material: String,
    pub hardness: f32,
    pub resistance: f32,
    pub replaceable: bool,
    pub selectable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityKind {
    pub width: f32,
    pub height: f32,
    pub max_health: f32,
}

#[derive(Debug, Clone)]
struct StoredBlock {
    kind: String,
    variant: u8,
    data: Option<AttachedData>,
}

#[derive(Debug, Clone)]
struct StoredEntity {
    kind: Option<String>,
    category: EntityCategory,
    position: Vec3,
    yaw: f32,
    pitch: f32,
    health: f32,
    alive: bool,
    data: AttachedData,
}

#[derive(Debug, Clone, Default)]
pub struct GridWorld {
    block_kinds: HashMap<String, BlockKind>,
    entity_kinds: HashMap<String, EntityKind>,
    blocks: HashMap<BlockPos, StoredBlock>,
    entities: BTreeMap<EntityId, StoredEntity>,
    next_entity: u32,
}

const HEALTH_KEY: &str = "Health";

impl GridWorld {
    pub fn new() -> Self {
        Self {
            next_entity: 1,
            ..Self::default()
        }
    }

    pub fn with_default_kinds() -> Self {
        let mut world = Self::new();
        for (name, material, hardness, resistance, replaceable, selectable) in [
            ("tile.stone", "rock", 1.5, 30.0, false, true),
            ("tile.dirt", "ground", 0.5, 2.5, false, true),
            ("tile.bedrock", "rock", -1.0, 6_000_000.0, false, true),
            ("tile.tallgrass", "plants", 0.0, 0.0, true, true),
            ("tile.chest", "wood", 2.5, 12.5, false, true),
            ("tile.furnace", "rock", 3.5, 17.5, false, true),
            ("tile.portal", "portal", -1.0, 0.0, false, false),
        ] {
            world.register_block_kind(
                name,
                BlockKind {
                    material: material.to_string(),
                    hardness,
                    resistance,
                    replaceable,
                    selectable,
                },
            );
        }
        for (name, width, height, max_health) in [
            ("Pig", 0.9, 0.9, 10.0),
            ("Villager", 0.6, 1.8, 20.0),
            ("Player", 0.6, 1.8, 20.0),
            ("Item", 0.25, 0.25, 5.0),
            ("Arrow", 0.5, 0.5, 1.0),
        ] {
            world.register_entity_kind(
                name,
                EntityKind {
                    width,
                    height,
                    max_health,
                },
            );
        }
        world
    }

    pub fn register_block_kind(&mut self, name: &str, kind: BlockKind) {
        self.block_kinds.insert(name.to_string(), kind);
    }

    pub fn register_entity_kind(&mut self, name: &str, kind: EntityKind) {
        self.entity_kinds.insert(name.to_string(), kind);
    }

    pub fn unregister_block_kind(&mut self, name: &str) {
        self.block_kinds.remove(name);
    }

    /// Places a block unconditionally. Unknown kinds are stored anyway so
    /// tests can model content that is later removed.
    pub fn set_block(&mut self, pos: BlockPos, kind: &str, variant: u8, data: AttachedData) {
        let data = if data.is_empty() { None } else { Some(data) };
        self.blocks.insert(
            pos,
            StoredBlock {
                kind: kind.to_string(),
                variant,
                data,
            },
        );
    }

    pub fn spawn(
        &mut self,
        kind: &str,
        category: EntityCategory,
        position: Vec3,
        health: f32,
        data: AttachedData,
    ) -> EntityId {
        self.insert_entity(Some(kind.to_string()), category, position, health, data)
    }

    pub fn spawn_unnamed(&mut self, category: EntityCategory, position: Vec3) -> EntityId {
        self.insert_entity(None, category, position, 1.0, AttachedData::new())
    }

    pub fn kill(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.alive = false;
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    pub fn entity_facing(&self, id: EntityId) -> Option<(f32, f32)> {
        self.entities.get(&id).map(|entity| (entity.yaw, entity.pitch))
    }

    fn insert_entity(
        &mut self,
        kind: Option<String>,
        category: EntityCategory,
        position: Vec3,
        health: f32,
        data: AttachedData,
    ) -> EntityId {
        let id = EntityId(self.next_entity.max(1));
        self.next_entity = id.0.saturating_add(1);
        self.entities.insert(
            id,
            StoredEntity {
                kind,
                category,
                position,
                yaw: 0.0,
                pitch: 0.0,
                health,
                alive: true,
                data,
            },
        );
        id
    }

    fn entity_size(&self, kind: Option<&str>) -> (f32, f32) {
        kind.and_then(|name| self.entity_kinds.get(name))
            .map(|kind| (kind.width, kind.height))
            .unwrap_or((0.5, 0.5))
    }

    fn snapshot(&self, id: EntityId, entity: &StoredEntity) -> EntitySnapshot {
        let (width, height) = self.entity_size(entity.kind.as_deref());
        EntitySnapshot {
            id,
            kind: entity.kind.clone(),
            category: entity.category,
            position: entity.position,
            bounds: Aabb::around_feet(entity.position, f64::from(width), f64::from(height)),
            height,
            width,
            health: entity.health,
            alive: entity.alive,
        }
    }
}

impl WorldView for GridWorld {
    fn block(&self, pos: BlockPos) -> Option<BlockState> {
        let stored = self.blocks.get(&pos)?;
        let kind = self.block_kinds.get(&stored.kind);
        Some(BlockState {
            kind: stored.kind.clone(),
            variant: stored.variant,
            material: kind.map(|k| k.material.clone()).unwrap_or_default(),
            hardness: kind.map_or(0.0, |k| k.hardness),
            resistance: kind.map_or(0.0, |k| k.resistance),
            replaceable: kind.map_or(false, |k| k.replaceable),
            selectable: kind.map_or(true, |k| k.selectable),
        })
    }

    fn block_data(&self, pos: BlockPos) -> Option<AttachedData> {
        self.blocks.get(&pos)?.data.clone()
    }

    fn entity(&self, id: EntityId) -> Option<EntitySnapshot> {
        self.entities
            .get(&id)
            .map(|entity| self.snapshot(id, entity))
    }

    fn entities_near(&self, center: Vec3, radius: f64) -> Vec<EntitySnapshot> {
        self.entities
            .iter()
            .map(|(id, entity)| self.snapshot(*id, entity))
            .filter(|snapshot| snapshot.bounds.distance_to(center) <= radius)
            .collect()
    }

    fn entity_data(&self, id: EntityId) -> Option<AttachedData> {
        let entity = self.entities.get(&id)?;
        let mut data = entity.data.clone();
        data.insert(HEALTH_KEY.to_string(), serde_json::json!(entity.health));
        Some(data)
    }

    fn knows_block_kind(&self, kind: &str) -> bool {
        self.block_kinds.contains_key(kind)
    }

    fn knows_entity_kind(&self, kind: &str) -> bool {
        self.entity_kinds.contains_key(kind)
    }
}

impl WorldStore for GridWorld {
    fn remove_block(&mut self, pos: BlockPos) -> Result<(), WorldError> {
        self.blocks
            .remove(&pos)
            .map(|_| ())
            .ok_or(WorldError::NoBlock(pos))
    }

    fn remove_entity(&mut self, id: EntityId) -> Result<(), WorldError> {
        self.entities
            .remove(&id)
            .map(|_| ())
            .ok_or(WorldError::NoEntity(id))
    }

    fn materialize_block(
        &mut self,
        pos: BlockPos,
        kind: &str,
        variant: u8,
        data: &AttachedData,
    ) -> Result<(), WorldError> {
        if !self.knows_block_kind(kind) {
            return Err(WorldError::UnknownBlockKind(kind.to_string()));
        }
        if let Some(existing) = self.block(pos) {
            if !existing.replaceable {
                return Err(WorldError::Occupied(pos));
            }
        }
        self.set_block(pos, kind, variant, data.clone());
        Ok(())
    }

    fn spawn_entity(
        &mut self,
        kind: &str,
        data: &AttachedData,
        placement: EntityPlacement,
    ) -> Result<EntityId, WorldError> {
        let defaults = self
            .entity_kinds
            .get(kind)
            .copied()
            .ok_or_else(|| WorldError::UnknownEntityKind(kind.to_string()))?;
        let health = data
            .get(HEALTH_KEY)
            .and_then(serde_json::Value::as_f64)
            .map_or(defaults.max_health, |health| health as f32);
        let mut stored = data.clone();
        stored.remove(HEALTH_KEY);
        let id = self.insert_entity(
            Some(kind.to_string()),
            EntityCategory::Creature,
            placement.position,
            health,
            stored,
        );
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.yaw = placement.yaw;
            entity.pitch = placement.pitch;
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chest_data() -> AttachedData {
        let mut data = AttachedData::new();
        data.insert("Items".to_string(), json!([{"id": 264, "Count": 3}]));
        data
    }

    #[test]
    fn block_state_reflects_registered_kind() {
        let mut world = GridWorld::with_default_kinds();
        let pos = BlockPos::new(1, 2, 3);
        world.set_block(pos, "tile.chest", 4, chest_data());
        let state = world.block(pos).expect("block");
        assert_eq!(state.material, "wood");
        assert_eq!(state.variant, 4);
        assert!(!state.replaceable);
        assert_eq!(world.block_data(pos), Some(chest_data()));
    }

    #[test]
    fn materialize_refuses_occupied_cells_without_mutation() {
        let mut world = GridWorld::with_default_kinds();
        let pos = BlockPos::new(0, 0, 0);
        world.set_block(pos, "tile.stone", 0, AttachedData::new());
        let err = world
            .materialize_block(pos, "tile.chest", 0, &chest_data())
            .unwrap_err();
        assert_eq!(err, WorldError::Occupied(pos));
        assert_eq!(world.block(pos).expect("stone").kind, "tile.stone");
    }

    #[test]
    fn materialize_replaces_replaceable_blocks() {
        let mut world = GridWorld::with_default_kinds();
        let pos = BlockPos::new(0, 0, 0);
        world.set_block(pos, "tile.tallgrass", 0, AttachedData::new());
        world
            .materialize_block(pos, "tile.chest", 2, &chest_data())
            .expect("materialize");
        assert_eq!(world.block(pos).expect("chest").kind, "tile.chest");
    }

    #[test]
    fn entity_data_roundtrips_through_spawn() {
        let mut world = GridWorld::with_default_kinds();
        let mut data = AttachedData::new();
        data.insert("Saddle".to_string(), json!(true));
        let pig = world.spawn("Pig", EntityCategory::Creature, Vec3::ZERO, 7.0, data);
        let captured = world.entity_data(pig).expect("data");
        let placement = EntityPlacement {
            position: Vec3::new(3.5, 1.0, 3.5),
            yaw: 90.0,
            pitch: 0.0,
        };
        let respawned = world
            .spawn_entity("Pig", &captured, placement)
            .expect("spawn");
        assert_eq!(world.entity_data(respawned), Some(captured));
        assert_eq!(world.entity(respawned).expect("pig").health, 7.0);
        assert_eq!(world.entity_facing(respawned), Some((90.0, 0.0)));
    }

    #[test]
    fn spawning_unknown_kind_fails() {
        let mut world = GridWorld::with_default_kinds();
        let placement = EntityPlacement {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
        };
        assert_eq!(
            world.spawn_entity("Dragon", &AttachedData::new(), placement),
            Err(WorldError::UnknownEntityKind("Dragon".to_string()))
        );
        assert_eq!(world.entity_count(), 0);
    }
}
