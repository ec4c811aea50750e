//! Server-side pickup and placement.
//!
//! Pickups are resolved from the pose the client reported for the moment of
//! interaction, never from the live pose, so latency cannot change what was
//! picked up. Placements use the live pose. Every rejection leaves the world,
//! the carry slot and the cooldown exactly as they were.

use std::sync::Arc;

use crate::carry::cooldown::PickupCooldown;
use crate::carry::payload::{
    capture, restore, CaptureTarget, CodecError, Destination, PayloadKind, RestoredObject,
};
use crate::carry::session::SessionRegistry;
use crate::config::CarrySettings;
use crate::scripting::rule::{BlockProbe, EntityProbe, HookTrigger, OverrideRule, RuleId};
use crate::scripting::store::OverrideStore;
use crate::world::aim::{resolve_aim, AimTarget};
use crate::world::pose::{AimPacket, PacketPoseError, Pose};
use crate::world::position::BlockPos;
use crate::world::time::{Clock, SystemClock};
use crate::world::view::{
    ActorId, AttachedData, CommandRunner, EntityCategory, EntityId, LoggingCommandRunner,
    PlacementPermission, WorldStore,
};

const LOCK_KEY: &str = "Lock";

#[derive(Debug, Clone, PartialEq)]
pub struct ActorState {
    pub id: ActorId,
    /// The actor's own body in the world, never a valid target.
    pub entity: Option<EntityId>,
    pub pose: Pose,
    pub trigger_held: bool,
    pub hand_empty: bool,
    pub creative: bool,
    pub resource_level: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("already carrying")]
    AlreadyCarrying,
    #[error("carry trigger not held or hand not empty")]
    NotReady,
    #[error("aim packet unusable: {0}")]
    IncompletePose(PacketPoseError),
    #[error("nothing in reach")]
    NoTarget,
    #[error("target cannot be carried")]
    ExcludedTarget,
    #[error("target is indestructible")]
    Indestructible,
    #[error("target is locked")]
    Locked,
    #[error("target is gone")]
    Gone,
    #[error("pickup on cooldown")]
    OnCooldown,
    #[error("conditions of rule {0} not met")]
    ConditionsUnmet(RuleId),
    #[error("codec failure: {0}")]
    Codec(CodecError),
    #[error("nothing carried")]
    NotCarrying,
    #[error("no surface to place on")]
    NoSurface,
    #[error("cell {0} is occupied")]
    Occupied(BlockPos),
    #[error("placement at {0} not permitted")]
    PermissionDenied(BlockPos),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickupOutcome {
    PickedUp {
        kind: PayloadKind,
        rule: Option<RuleId>,
    },
    Rejected(Rejection),
}

impl PickupOutcome {
    /// Also true while carrying or cooling down.
    pub fn suppresses_default(&self) -> bool {
        matches!(
            self,
            PickupOutcome::PickedUp { .. }
                | PickupOutcome::Rejected(Rejection::AlreadyCarrying)
                | PickupOutcome::Rejected(Rejection::OnCooldown)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaceOutcome {
    Placed {
        object: RestoredObject,
        rule: Option<RuleId>,
    },
    Rejected(Rejection),
}

impl PlaceOutcome {
    pub fn suppresses_default(&self) -> bool {
        matches!(self, PlaceOutcome::Placed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarryTick {
    pub kind: PayloadKind,
    pub burden: u8,
}

struct Capture {
    target: CaptureTarget,
    rule: Option<Arc<OverrideRule>>,
}

pub struct InteractionResolver {
    store: Arc<OverrideStore>,
    sessions: Arc<SessionRegistry>,
    cooldown: PickupCooldown,
    clock: Arc<dyn Clock>,
    runner: Arc<dyn CommandRunner>,
    reach: f64,
}

impl InteractionResolver {
    pub fn new(
        store: Arc<OverrideStore>,
        sessions: Arc<SessionRegistry>,
        settings: &CarrySettings,
    ) -> Self {
        Self {
            store,
            sessions,
            cooldown: PickupCooldown::new(settings.cooldown()),
            clock: Arc::new(SystemClock::new()),
            runner: Arc::new(LoggingCommandRunner),
            reach: settings.reach,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn cooldown(&self) -> &PickupCooldown {
        &self.cooldown
    }

    pub fn handle_pickup<W>(
        &mut self,
        actor: &ActorState,
        packet: &AimPacket,
        world: &mut W,
    ) -> PickupOutcome
    where
        W: WorldStore + ?Sized,
    {
        match self.try_pickup(actor, packet, world) {
            Ok((kind, rule)) => {
                tracing::info!(actor = %actor.id, ?kind, rule = ?rule.map(|r| r.to_string()), "picked up");
                PickupOutcome::PickedUp { kind, rule }
            }
            Err(reason) => {
                log_rejection(actor.id, "pickup", &reason);
                PickupOutcome::Rejected(reason)
            }
        }
    }

    fn try_pickup<W>(
        &mut self,
        actor: &ActorState,
        packet: &AimPacket,
        world: &mut W,
    ) -> Result<(PayloadKind, Option<RuleId>), Rejection>
    where
        W: WorldStore + ?Sized,
    {
        if self.sessions.payload_kind(actor.id) != PayloadKind::None {
            return Err(Rejection::AlreadyCarrying);
        }
        if !actor.trigger_held || !actor.hand_empty {
            return Err(Rejection::NotReady);
        }
        let reported = packet
            .reported_pose()
            .map_err(Rejection::IncompletePose)?;
        let aimed = resolve_aim(
            &reported.pose,
            reported.partial_tick,
            self.reach,
            actor.entity,
            &*world,
        )
        .ok_or(Rejection::NoTarget)?;

        let chosen = self.classify(aimed, &*world)?;
        if let Some(rule) = &chosen.rule {
            if !self.store.conditions_satisfied(rule, actor.resource_level) {
                return Err(Rejection::ConditionsUnmet(rule.id));
            }
        }

        let now = self.clock.now();
        if self.cooldown.is_cooling(actor.id, now) {
            return Err(Rejection::OnCooldown);
        }

        let rule_id = chosen.rule.as_ref().map(|rule| rule.id);
        let kind = self
            .sessions
            .update(actor.id, |session| -> Result<PayloadKind, CodecError> {
                let payload = capture(chosen.target, &*world, session.slot())?;
                match chosen.target {
                    CaptureTarget::Block(pos) => world.remove_block(pos)?,
                    CaptureTarget::Entity(id) => world.remove_entity(id)?,
                }
                let kind = payload.payload_kind();
                session.slot_mut().fill(payload)?;
                session.bind_rule(rule_id);
                Ok(kind)
            })
            .map_err(Rejection::Codec)?;

        self.cooldown.stamp(actor.id, now);
        if let Some(rule) = &chosen.rule {
            self.run_hook(rule, HookTrigger::Capture, actor.id);
        }
        Ok((kind, rule_id))
    }

    fn classify<W>(&self, aimed: AimTarget, world: &W) -> Result<Capture, Rejection>
    where
        W: WorldStore + ?Sized,
    {
        match aimed {
            AimTarget::Block { hit, state } => {
                if state.hardness < 0.0 {
                    return Err(Rejection::Indestructible);
                }
                let data = world.block_data(hit.pos);
                if is_locked(data.as_ref()) {
                    return Err(Rejection::Locked);
                }
                let rule = self.store.find_for_static_object(&BlockProbe {
                    kind: &state.kind,
                    variant: state.variant,
                    material: &state.material,
                    hardness: state.hardness,
                    resistance: state.resistance,
                    data: data.as_ref(),
                });
                Ok(Capture {
                    target: CaptureTarget::Block(hit.pos),
                    rule,
                })
            }
            AimTarget::Entity { entity, .. } => {
                if entity.category != EntityCategory::Creature {
                    return Err(Rejection::ExcludedTarget);
                }
                if !entity.alive {
                    return Err(Rejection::Gone);
                }
                let data = world.entity_data(entity.id);
                let rule = entity.kind.as_deref().and_then(|kind| {
                    self.store.find_for_mobile_agent(&EntityProbe {
                        kind,
                        height: entity.height,
                        width: entity.width,
                        health: entity.health,
                        data: data.as_ref(),
                    })
                });
                Ok(Capture {
                    target: CaptureTarget::Entity(entity.id),
                    rule,
                })
            }
        }
    }

    pub fn handle_place<W, P>(
        &mut self,
        actor: &ActorState,
        world: &mut W,
        permission: &P,
    ) -> PlaceOutcome
    where
        W: WorldStore + ?Sized,
        P: PlacementPermission + ?Sized,
    {
        match self.try_place(actor, world, permission) {
            Ok((object, rule)) => {
                tracing::info!(actor = %actor.id, ?object, "placed");
                PlaceOutcome::Placed { object, rule }
            }
            Err(reason) => {
                log_rejection(actor.id, "place", &reason);
                PlaceOutcome::Rejected(reason)
            }
        }
    }

    fn try_place<W, P>(
        &mut self,
        actor: &ActorState,
        world: &mut W,
        permission: &P,
    ) -> Result<(RestoredObject, Option<RuleId>), Rejection>
    where
        W: WorldStore + ?Sized,
        P: PlacementPermission + ?Sized,
    {
        let payload = self
            .sessions
            .inspect(actor.id, |session| session.payload().cloned())
            .flatten()
            .ok_or(Rejection::NotCarrying)?;

        let Some(AimTarget::Block { hit, state }) =
            resolve_aim(&actor.pose, 1.0, self.reach, actor.entity, &*world)
        else {
            return Err(Rejection::NoSurface);
        };
        let cell = if state.replaceable {
            hit.pos
        } else {
            hit.neighbor().ok_or(Rejection::NoSurface)?
        };
        if let Some(existing) = world.block(cell) {
            if !existing.replaceable {
                return Err(Rejection::Occupied(cell));
            }
        }
        if !permission.can_modify(actor.id, cell) {
            return Err(Rejection::PermissionDenied(cell));
        }

        let destination = Destination {
            cell,
            facing: 180.0 + actor.pose.yaw,
        };
        let object = restore(&payload, world, destination).map_err(Rejection::Codec)?;
        let rule = self.sessions.update(actor.id, |session| {
            let rule = session.bound_rule();
            session.clear();
            rule
        });
        if let Some(rule) = rule.and_then(|id| self.store.get(id)) {
            self.run_hook(&rule, HookTrigger::Place, actor.id);
        }
        Ok((object, rule))
    }

    pub fn tick(&self, actor: &ActorState) -> Option<CarryTick> {
        let (kind, burden, rule) = self.sessions.inspect(actor.id, |session| {
            session.payload().map(|payload| {
                (
                    payload.payload_kind(),
                    payload.burden_level(),
                    session.bound_rule(),
                )
            })
        })??;
        if let Some(rule) = rule.and_then(|id| self.store.get(id)) {
            self.run_hook(&rule, HookTrigger::Tick, actor.id);
        }
        Some(CarryTick {
            kind,
            burden: if actor.creative { 0 } else { burden },
        })
    }

    fn run_hook(&self, rule: &OverrideRule, trigger: HookTrigger, actor: ActorId) {
        if let Some(command) = rule.hook(trigger) {
            tracing::debug!(%actor, rule = %rule.id, ?trigger, "running carry hook");
            self.runner.run(command, actor);
        }
    }
}

fn is_locked(data: Option<&AttachedData>) -> bool {
    data.and_then(|data| data.get(LOCK_KEY))
        .and_then(serde_json::Value::as_str)
        .map_or(false, |lock| !lock.is_empty())
}

fn log_rejection(actor: ActorId, action: &str, reason: &Rejection) {
    match reason {
        Rejection::Codec(err) => tracing::warn!(%actor, action, error = %err, "carry codec failure"),
        _ => tracing::debug!(%actor, action, %reason, "carry rejected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::reader::RuleSource;
    use crate::world::grid::GridWorld;
    use crate::world::position::Vec3;
    use crate::world::time::{ManualClock, Millis};
    use crate::world::view::{AllowAll, WorldView};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingRunner {
        commands: Mutex<Vec<String>>,
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, command: &str, _actor: ActorId) {
            self.commands
                .lock()
                .expect("runner lock")
                .push(command.to_string());
        }
    }

    struct Fixture {
        world: GridWorld,
        resolver: InteractionResolver,
        store: Arc<OverrideStore>,
        clock: Arc<ManualClock>,
        runner: Arc<RecordingRunner>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(OverrideStore::default());
        let clock = Arc::new(ManualClock::new(Millis(10_000)));
        let runner = Arc::new(RecordingRunner::default());
        let resolver = InteractionResolver::new(
            Arc::clone(&store),
            Arc::new(SessionRegistry::new()),
            &CarrySettings::default(),
        )
        .with_clock(clock.clone())
        .with_runner(runner.clone());
        Fixture {
            world: GridWorld::with_default_kinds(),
            resolver,
            store,
            clock,
            runner,
        }
    }

    const ACTOR: ActorId = ActorId(1);

    fn actor(yaw: f32) -> ActorState {
        ActorState {
            id: ACTOR,
            entity: None,
            pose: Pose::standing(Vec3::new(0.5, 64.0, 0.5), yaw, 0.0),
            trigger_held: true,
            hand_empty: true,
            creative: false,
            resource_level: 0.0,
        }
    }

    fn aim(actor: &ActorState) -> AimPacket {
        AimPacket::from_pose(&actor.pose, 1.0)
    }

    fn chest_data() -> AttachedData {
        let mut data = AttachedData::new();
        data.insert("Items".to_string(), json!([{"id": 264, "Count": 3, "Slot": 0}]));
        data.insert("Lock".to_string(), json!(""));
        data
    }

    fn pickup(fx: &mut Fixture, actor: &ActorState) -> PickupOutcome {
        let packet = aim(actor);
        fx.resolver.handle_pickup(actor, &packet, &mut fx.world)
    }

    #[test]
    fn picks_up_aimed_block_and_suppresses_default() {
        let mut fx = fixture();
        let chest = BlockPos::new(0, 65, 2);
        fx.world.set_block(chest, "tile.chest", 3, chest_data());
        let outcome = pickup(&mut fx, &actor(0.0));
        assert_eq!(
            outcome,
            PickupOutcome::PickedUp {
                kind: PayloadKind::Static,
                rule: None
            }
        );
        assert!(outcome.suppresses_default());
        assert!(fx.world.block(chest).is_none());
        assert_eq!(fx.resolver.sessions().payload_kind(ACTOR), PayloadKind::Static);
    }

    #[test]
    fn reported_pose_decides_the_target_not_the_live_pose() {
        let mut fx = fixture();
        fx.world
            .set_block(BlockPos::new(0, 65, 2), "tile.chest", 0, AttachedData::new());
        fx.world
            .set_block(BlockPos::new(0, 65, -2), "tile.furnace", 0, AttachedData::new());
        let live = actor(180.0);
        let packet = aim(&actor(0.0));
        let outcome = fx.resolver.handle_pickup(&live, &packet, &mut fx.world);
        assert!(matches!(outcome, PickupOutcome::PickedUp { .. }));
        assert!(fx.world.block(BlockPos::new(0, 65, 2)).is_none());
        assert!(fx.world.block(BlockPos::new(0, 65, -2)).is_some());
        assert_eq!(live.pose, actor(180.0).pose);
    }

    #[test]
    fn incomplete_packet_leaves_no_trace() {
        let mut fx = fixture();
        let chest = BlockPos::new(0, 65, 2);
        fx.world.set_block(chest, "tile.chest", 0, chest_data());
        let live = actor(0.0);
        let before = live.clone();
        let mut packet = aim(&live);
        packet.position = None;
        let outcome = fx.resolver.handle_pickup(&live, &packet, &mut fx.world);
        assert_eq!(
            outcome,
            PickupOutcome::Rejected(Rejection::IncompletePose(PacketPoseError::MissingField(
                "position"
            )))
        );
        assert!(!outcome.suppresses_default());
        assert_eq!(live, before);
        assert!(fx.world.block(chest).is_some());
        assert_eq!(fx.resolver.sessions().payload_kind(ACTOR), PayloadKind::None);
        assert_eq!(fx.resolver.cooldown().last_pickup(ACTOR), None);

        let mut no_raycast = aim(&live);
        no_raycast.requires_raycast = false;
        assert_eq!(
            fx.resolver.handle_pickup(&live, &no_raycast, &mut fx.world),
            PickupOutcome::Rejected(Rejection::IncompletePose(PacketPoseError::NoRaycast))
        );
        assert!(matches!(pickup(&mut fx, &live), PickupOutcome::PickedUp { .. }));
    }

    #[test]
    fn second_pickup_within_window_is_rejected() {
        let mut fx = fixture();
        fx.world
            .set_block(BlockPos::new(0, 65, 2), "tile.chest", 0, AttachedData::new());
        fx.world
            .set_block(BlockPos::new(0, 65, 5), "tile.stone", 0, AttachedData::new());
        fx.world
            .set_block(BlockPos::new(0, 65, -2), "tile.furnace", 0, AttachedData::new());

        assert!(matches!(pickup(&mut fx, &actor(0.0)), PickupOutcome::PickedUp { .. }));
        fx.clock.advance(Duration::from_millis(100));
        let placed = fx
            .resolver
            .handle_place(&actor(0.0), &mut fx.world, &AllowAll);
        assert!(matches!(placed, PlaceOutcome::Placed { .. }));

        fx.clock.advance(Duration::from_millis(300));
        let second = pickup(&mut fx, &actor(180.0));
        assert_eq!(second, PickupOutcome::Rejected(Rejection::OnCooldown));
        assert!(second.suppresses_default());
        assert!(fx.world.block(BlockPos::new(0, 65, -2)).is_some());
        assert_eq!(fx.resolver.cooldown().last_pickup(ACTOR), Some(Millis(10_000)));

        fx.clock.advance(Duration::from_millis(100));
        assert!(matches!(pickup(&mut fx, &actor(180.0)), PickupOutcome::PickedUp { .. }));
    }

    #[test]
    fn carrying_actor_cannot_pick_up_again() {
        let mut fx = fixture();
        fx.world
            .set_block(BlockPos::new(0, 65, 2), "tile.chest", 0, AttachedData::new());
        fx.world
            .set_block(BlockPos::new(0, 65, 3), "tile.furnace", 0, AttachedData::new());
        assert!(matches!(pickup(&mut fx, &actor(0.0)), PickupOutcome::PickedUp { .. }));
        fx.clock.advance(Duration::from_secs(5));
        let again = pickup(&mut fx, &actor(0.0));
        assert_eq!(again, PickupOutcome::Rejected(Rejection::AlreadyCarrying));
        assert!(again.suppresses_default());
        assert!(fx.world.block(BlockPos::new(0, 65, 3)).is_some());
    }

    #[test]
    fn posture_is_required() {
        let mut fx = fixture();
        fx.world
            .set_block(BlockPos::new(0, 65, 2), "tile.chest", 0, AttachedData::new());
        let mut relaxed = actor(0.0);
        relaxed.trigger_held = false;
        assert_eq!(pickup(&mut fx, &relaxed), PickupOutcome::Rejected(Rejection::NotReady));
        let mut busy = actor(0.0);
        busy.hand_empty = false;
        assert_eq!(pickup(&mut fx, &busy), PickupOutcome::Rejected(Rejection::NotReady));
    }

    #[test]
    fn guarded_blocks_are_refused() {
        let mut fx = fixture();
        fx.world
            .set_block(BlockPos::new(0, 65, 2), "tile.bedrock", 0, AttachedData::new());
        assert_eq!(
            pickup(&mut fx, &actor(0.0)),
            PickupOutcome::Rejected(Rejection::Indestructible)
        );

        let mut locked = chest_data();
        locked.insert("Lock".to_string(), json!("secret"));
        fx.world
            .set_block(BlockPos::new(0, 65, 2), "tile.chest", 0, locked);
        assert_eq!(
            pickup(&mut fx, &actor(0.0)),
            PickupOutcome::Rejected(Rejection::Locked)
        );

        fx.world.remove_block(BlockPos::new(0, 65, 2)).expect("remove");
        assert_eq!(
            pickup(&mut fx, &actor(0.0)),
            PickupOutcome::Rejected(Rejection::NoTarget)
        );
    }

    #[test]
    fn excluded_and_dead_agents_are_refused() {
        let mut fx = fixture();
        let arrow = fx.world.spawn(
            "Arrow",
            EntityCategory::Projectile,
            Vec3::new(0.5, 65.2, 2.5),
            1.0,
            AttachedData::new(),
        );
        assert_eq!(
            pickup(&mut fx, &actor(0.0)),
            PickupOutcome::Rejected(Rejection::ExcludedTarget)
        );
        fx.world.remove_entity(arrow).expect("remove");

        let pig = fx.world.spawn(
            "Pig",
            EntityCategory::Creature,
            Vec3::new(0.5, 65.0, 2.5),
            10.0,
            AttachedData::new(),
        );
        fx.world.kill(pig);
        assert_eq!(pickup(&mut fx, &actor(0.0)), PickupOutcome::Rejected(Rejection::Gone));
    }

    #[test]
    fn dropped_items_and_other_actors_are_refused() {
        let mut fx = fixture();
        assert_eq!(fx.resolver.cooldown().window(), Duration::from_millis(500));
        let others = [
            ("Item", EntityCategory::DroppedItem, Vec3::new(0.5, 65.5, 2.5)),
            ("Player", EntityCategory::Actor, Vec3::new(0.5, 64.0, 2.5)),
        ];
        for (kind, category, position) in others {
            let id = fx.world.spawn(kind, category, position, 20.0, AttachedData::new());
            assert_eq!(
                pickup(&mut fx, &actor(0.0)),
                PickupOutcome::Rejected(Rejection::ExcludedTarget)
            );
            assert_eq!(fx.world.entity_ids(), vec![id]);
            assert_eq!(
                fx.world.entity(id).map(|entity| entity.category),
                Some(category)
            );
            assert_eq!(fx.resolver.cooldown().last_pickup(ACTOR), None);
            assert_eq!(fx.resolver.sessions().payload_kind(ACTOR), PayloadKind::None);
            fx.world.remove_entity(id).expect("remove");
        }
    }

    #[test]
    fn own_body_is_never_a_target() {
        let mut fx = fixture();
        let body = fx.world.spawn(
            "Player",
            EntityCategory::Actor,
            Vec3::new(0.5, 64.0, 0.5),
            20.0,
            AttachedData::new(),
        );
        let pig = fx.world.spawn(
            "Pig",
            EntityCategory::Creature,
            Vec3::new(0.5, 65.0, 2.5),
            10.0,
            AttachedData::new(),
        );
        let mut me = actor(0.0);
        me.entity = Some(body);
        assert_eq!(
            pickup(&mut fx, &me),
            PickupOutcome::PickedUp {
                kind: PayloadKind::Mobile,
                rule: None
            }
        );
        assert!(fx.world.entity(pig).is_none());
        assert!(fx.world.entity(body).is_some());
    }

    #[test]
    fn rule_conditions_gate_pickup_and_hooks_fire() {
        let mut fx = fixture();
        fx.store.load(&[RuleSource::new(
            "scripts/chest.json",
            r#"{
                "object": {"block": {"name": "chest"}},
                "conditions": {"xp": ">5"},
                "effects": {"commandPickup": "say up", "commandLoop": "say tick", "commandPlace": "say down"}
            }"#,
        )]);
        fx.world
            .set_block(BlockPos::new(0, 65, 2), "tile.chest", 0, AttachedData::new());
        fx.world
            .set_block(BlockPos::new(0, 65, 5), "tile.stone", 0, AttachedData::new());
        let rule = RuleId::from_origin("scripts/chest.json");

        let novice = actor(0.0);
        assert_eq!(
            pickup(&mut fx, &novice),
            PickupOutcome::Rejected(Rejection::ConditionsUnmet(rule))
        );

        let mut veteran = actor(0.0);
        veteran.resource_level = 10.0;
        assert_eq!(
            pickup(&mut fx, &veteran),
            PickupOutcome::PickedUp {
                kind: PayloadKind::Static,
                rule: Some(rule)
            }
        );
        assert_eq!(fx.resolver.sessions().bound_rule(ACTOR), Some(rule));

        let tick = fx.resolver.tick(&veteran).expect("tick");
        assert_eq!(tick.burden, 1);
        veteran.creative = true;
        assert_eq!(fx.resolver.tick(&veteran).map(|tick| tick.burden), Some(0));

        let placed = fx.resolver.handle_place(&veteran, &mut fx.world, &AllowAll);
        assert_eq!(
            placed,
            PlaceOutcome::Placed {
                object: RestoredObject::Block(BlockPos::new(0, 65, 4)),
                rule: Some(rule)
            }
        );
        assert_eq!(fx.resolver.sessions().bound_rule(ACTOR), None);
        assert_eq!(fx.resolver.tick(&veteran), None);
        assert_eq!(
            *fx.runner.commands.lock().expect("runner lock"),
            vec!["say up", "say tick", "say tick", "say down"]
        );
    }

    #[test]
    fn placement_lands_in_front_of_struck_face() {
        let mut fx = fixture();
        let origin = BlockPos::new(0, 65, 2);
        fx.world.set_block(origin, "tile.chest", 2, chest_data());
        fx.world
            .set_block(BlockPos::new(0, 65, 5), "tile.stone", 0, AttachedData::new());
        assert!(matches!(pickup(&mut fx, &actor(0.0)), PickupOutcome::PickedUp { .. }));

        let outcome = fx.resolver.handle_place(&actor(0.0), &mut fx.world, &AllowAll);
        let target = BlockPos::new(0, 65, 4);
        assert_eq!(
            outcome,
            PlaceOutcome::Placed {
                object: RestoredObject::Block(target),
                rule: None
            }
        );
        assert!(outcome.suppresses_default());
        let state = fx.world.block(target).expect("chest");
        assert_eq!((state.kind.as_str(), state.variant), ("tile.chest", 2));
        assert_eq!(fx.world.block_data(target), Some(chest_data()));
        assert_eq!(fx.resolver.sessions().payload_kind(ACTOR), PayloadKind::None);
    }

    #[test]
    fn placement_replaces_struck_replaceable_block() {
        let mut fx = fixture();
        fx.world
            .set_block(BlockPos::new(0, 65, 2), "tile.chest", 0, AttachedData::new());
        assert!(matches!(pickup(&mut fx, &actor(0.0)), PickupOutcome::PickedUp { .. }));
        let grass = BlockPos::new(0, 65, 3);
        fx.world.set_block(grass, "tile.tallgrass", 0, AttachedData::new());
        let outcome = fx.resolver.handle_place(&actor(0.0), &mut fx.world, &AllowAll);
        assert!(matches!(outcome, PlaceOutcome::Placed { .. }));
        assert_eq!(fx.world.block(grass).expect("block").kind, "tile.chest");
    }

    #[test]
    fn occupied_destination_keeps_slot_and_world() {
        let mut fx = fixture();
        fx.world
            .set_block(BlockPos::new(0, 65, 2), "tile.chest", 0, chest_data());
        assert!(matches!(pickup(&mut fx, &actor(0.0)), PickupOutcome::PickedUp { .. }));

        let portal = BlockPos::new(0, 65, 3);
        fx.world.set_block(portal, "tile.portal", 0, AttachedData::new());
        fx.world
            .set_block(BlockPos::new(0, 65, 4), "tile.stone", 0, AttachedData::new());
        let blocks = fx.world.block_count();

        let outcome = fx.resolver.handle_place(&actor(0.0), &mut fx.world, &AllowAll);
        assert_eq!(outcome, PlaceOutcome::Rejected(Rejection::Occupied(portal)));
        assert!(!outcome.suppresses_default());
        assert_eq!(fx.world.block(portal).expect("portal").kind, "tile.portal");
        assert_eq!(fx.world.block_count(), blocks);
        assert_eq!(fx.resolver.sessions().payload_kind(ACTOR), PayloadKind::Static);
    }

    #[test]
    fn denied_or_missing_surface_keeps_slot() {
        let mut fx = fixture();
        fx.world
            .set_block(BlockPos::new(0, 65, 2), "tile.chest", 0, AttachedData::new());
        assert!(matches!(pickup(&mut fx, &actor(0.0)), PickupOutcome::PickedUp { .. }));

        assert_eq!(
            fx.resolver.handle_place(&actor(0.0), &mut fx.world, &AllowAll),
            PlaceOutcome::Rejected(Rejection::NoSurface)
        );

        fx.world
            .set_block(BlockPos::new(0, 65, 4), "tile.stone", 0, AttachedData::new());
        let deny = |_: ActorId, _: BlockPos| false;
        assert_eq!(
            fx.resolver.handle_place(&actor(0.0), &mut fx.world, &deny),
            PlaceOutcome::Rejected(Rejection::PermissionDenied(BlockPos::new(0, 65, 3)))
        );
        assert!(fx.world.block(BlockPos::new(0, 65, 3)).is_none());
        assert_eq!(fx.resolver.sessions().payload_kind(ACTOR), PayloadKind::Static);
    }

    #[test]
    fn removed_kind_fails_placement_without_losing_payload() {
        let mut fx = fixture();
        fx.world
            .set_block(BlockPos::new(0, 65, 2), "tile.furnace", 1, AttachedData::new());
        fx.world
            .set_block(BlockPos::new(0, 65, 5), "tile.stone", 0, AttachedData::new());
        assert!(matches!(pickup(&mut fx, &actor(0.0)), PickupOutcome::PickedUp { .. }));
        fx.world.unregister_block_kind("tile.furnace");
        assert_eq!(
            fx.resolver.handle_place(&actor(0.0), &mut fx.world, &AllowAll),
            PlaceOutcome::Rejected(Rejection::Codec(CodecError::UnknownKind(
                "tile.furnace".to_string()
            )))
        );
        assert_eq!(fx.resolver.sessions().payload_kind(ACTOR), PayloadKind::Static);
    }

    #[test]
    fn agents_are_placed_facing_the_actor() {
        let mut fx = fixture();
        fx.world.spawn(
            "Pig",
            EntityCategory::Creature,
            Vec3::new(0.5, 65.0, 2.5),
            6.0,
            AttachedData::new(),
        );
        fx.world
            .set_block(BlockPos::new(0, 65, 5), "tile.stone", 0, AttachedData::new());
        assert!(matches!(pickup(&mut fx, &actor(0.0)), PickupOutcome::PickedUp { .. }));
        let burden = fx.resolver.tick(&actor(0.0)).expect("tick").burden;
        assert_eq!(burden, 1);

        let outcome = fx.resolver.handle_place(&actor(0.0), &mut fx.world, &AllowAll);
        let PlaceOutcome::Placed {
            object: RestoredObject::Entity(id),
            ..
        } = outcome
        else {
            panic!("expected agent placement, got {:?}", outcome);
        };
        let pig = fx.world.entity(id).expect("pig");
        assert_eq!(pig.position, Vec3::new(0.5, 65.0, 4.5));
        assert_eq!(pig.health, 6.0);
        assert_eq!(fx.world.entity_facing(id), Some((180.0, 0.0)));
    }
}
