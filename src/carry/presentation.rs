use std::sync::Arc;

use crate::carry::payload::PayloadKind;
use crate::carry::session::SessionRegistry;
use crate::scripting::rule::OverrideRule;
use crate::scripting::store::OverrideStore;
use crate::world::view::ActorId;

const IDENTITY_SCALE: [f64; 3] = [1.0; 3];

#[derive(Debug, Clone, PartialEq)]
pub struct RenderTransform {
    pub translation: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: [f64; 3],
    pub left_arm_rotation: Option<[f64; 3]>,
    pub right_arm_rotation: Option<[f64; 3]>,
    pub render_left_arm: bool,
    pub render_right_arm: bool,
    pub display_kind: Option<String>,
    pub display_variant: Option<i64>,
}

impl Default for RenderTransform {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: [0.0; 3],
            scale: IDENTITY_SCALE,
            left_arm_rotation: None,
            right_arm_rotation: None,
            render_left_arm: true,
            render_right_arm: true,
            display_kind: None,
            display_variant: None,
        }
    }
}

impl RenderTransform {
    fn for_rule(rule: &OverrideRule, kind: PayloadKind) -> Self {
        let render = &rule.render;
        let display_kind = match kind {
            PayloadKind::Static => render.name_block.clone(),
            PayloadKind::Mobile => render.name_entity.clone(),
            PayloadKind::None => None,
        };
        Self {
            translation: render.translation().unwrap_or([0.0; 3]),
            rotation: render.rotation().unwrap_or([0.0; 3]),
            scale: render.scale().unwrap_or(IDENTITY_SCALE),
            left_arm_rotation: render.rotation_left_arm(),
            right_arm_rotation: render.rotation_right_arm(),
            render_left_arm: render.render_left_arm,
            render_right_arm: render.render_right_arm,
            display_kind,
            display_variant: render.variant,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CarryPresenter {
    sessions: Arc<SessionRegistry>,
    store: Arc<OverrideStore>,
}

impl CarryPresenter {
    pub fn new(sessions: Arc<SessionRegistry>, store: Arc<OverrideStore>) -> Self {
        Self { sessions, store }
    }

    pub fn payload_kind(&self, actor: ActorId) -> PayloadKind {
        self.sessions.payload_kind(actor)
    }

    pub fn is_carrying_static(&self, actor: ActorId) -> bool {
        self.payload_kind(actor) == PayloadKind::Static
    }

    pub fn is_carrying_agent(&self, actor: ActorId) -> bool {
        self.payload_kind(actor) == PayloadKind::Mobile
    }

    /// The rule bound at pickup, if it survived the latest reload.
    pub fn bound_override_rule(&self, actor: ActorId) -> Option<Arc<OverrideRule>> {
        self.sessions
            .bound_rule(actor)
            .and_then(|id| self.store.get(id))
    }

    pub fn render_transform(&self, actor: ActorId) -> Option<RenderTransform> {
        let kind = self.payload_kind(actor);
        if kind == PayloadKind::None {
            return None;
        }
        Some(
            self.bound_override_rule(actor)
                .map(|rule| RenderTransform::for_rule(&rule, kind))
                .unwrap_or_default(),
        )
    }
}
