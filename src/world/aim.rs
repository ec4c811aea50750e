use crate::world::pose::Pose;
use crate::world::raycast::{cast_blocks, BlockHit};
use crate::world::view::{BlockState, EntityId, EntitySnapshot, WorldView};

#[derive(Debug, Clone, PartialEq)]
pub enum AimTarget {
    Block { hit: BlockHit, state: BlockState },
    Entity { entity: EntitySnapshot, distance: f64 },
}

/// Recomputes the aimed-at target for `pose` against `world`.
/// `ignore` is the aiming actor's own entity so it cannot hit itself.
pub fn resolve_aim<W>(
    pose: &Pose,
    partial_tick: f32,
    reach: f64,
    ignore: Option<EntityId>,
    world: &W,
) -> Option<AimTarget>
where
    W: WorldView + ?Sized,
{
    let eye = pose.eye(partial_tick);
    let look = pose.look(partial_tick);

    let block = cast_blocks(eye, look, reach, |pos| {
        world.block(pos).map_or(false, |state| state.selectable)
    })
    .and_then(|hit| {
        world
            .block(hit.pos)
            .map(|state| AimTarget::Block { hit, state })
    });
    let block_distance = match &block {
        Some(AimTarget::Block { hit, .. }) => hit.distance,
        _ => reach,
    };

    let mut nearest: Option<(EntitySnapshot, f64)> = None;
    for entity in world.entities_near(eye, reach) {
        if Some(entity.id) == ignore {
            continue;
        }
        let Some(distance) = entity.bounds.ray_intersect(eye, look) else {
            continue;
        };
        if distance > block_distance {
            continue;
        }
        let closer = nearest
            .as_ref()
            .map_or(true, |(_, best)| distance < *best);
        if closer {
            nearest = Some((entity, distance));
        }
    }

    match nearest {
        Some((entity, distance)) => Some(AimTarget::Entity { entity, distance }),
        None => block,
    }
}
