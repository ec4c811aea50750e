use std::collections::HashMap;
use std::time::Duration;

use crate::world::time::Millis;
use crate::world::view::ActorId;

pub const DEFAULT_PICKUP_COOLDOWN: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct PickupCooldown {
    window: Duration,
    last_pickup: HashMap<ActorId, Millis>,
}

impl Default for PickupCooldown {
    fn default() -> Self {
        Self::new(DEFAULT_PICKUP_COOLDOWN)
    }
}

impl PickupCooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_pickup: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_cooling(&self, actor: ActorId, now: Millis) -> bool {
        self.last_pickup
            .get(&actor)
            .map_or(false, |last| now.saturating_elapsed_since(*last) < self.window)
    }

    pub fn stamp(&mut self, actor: ActorId, now: Millis) {
        self.last_pickup.insert(actor, now);
    }

    pub fn last_pickup(&self, actor: ActorId) -> Option<Millis> {
        self.last_pickup.get(&actor).copied()
    }

    pub fn len(&self) -> usize {
        self.last_pickup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_pickup.is_empty()
    }
}
