use sha1::{Digest, Sha1};

use crate::scripting::condition::{
    matches_block_name, matches_entity_name, matches_material, matches_scalar,
    matches_structured,
};
use crate::world::view::AttachedData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub u64);

impl RuleId {
    pub fn from_origin(origin: &str) -> Self {
        let digest = Sha1::digest(origin.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        RuleId(u64::from_be_bytes(bytes))
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockSelector {
    pub name: Option<String>,
    pub variant: Option<String>,
    pub material: Option<String>,
    pub hardness: Option<String>,
    pub resistance: Option<String>,
    pub data: AttachedData,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntitySelector {
    pub name: Option<String>,
    pub height: Option<String>,
    pub width: Option<String>,
    pub health: Option<String>,
    pub data: AttachedData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleTarget {
    Block(BlockSelector),
    Entity(EntitySelector),
}

/// Gating kinds the configuration format knows about but the server has no
/// model for yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsupportedCondition {
    GameStage,
    Advancement,
    GameMode,
    Scoreboard,
    Position,
    Effects,
}

impl UnsupportedCondition {
    pub const ALL: [(UnsupportedCondition, &'static str); 6] = [
        (UnsupportedCondition::GameStage, "gamestage"),
        (UnsupportedCondition::Advancement, "advancement"),
        (UnsupportedCondition::GameMode, "gamemode"),
        (UnsupportedCondition::Scoreboard, "scoreboard"),
        (UnsupportedCondition::Position, "position"),
        (UnsupportedCondition::Effects, "effects"),
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatingCondition {
    ResourceLevel(String),
    /// Kept for the configuration shape; always satisfied.
    Unsupported {
        kind: UnsupportedCondition,
        value: String,
    },
}

impl GatingCondition {
    pub fn is_satisfied(&self, resource_level: f64) -> bool {
        match self {
            GatingCondition::ResourceLevel(predicate) => {
                matches_scalar(resource_level, Some(predicate))
            }
            GatingCondition::Unsupported { .. } => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOverrides {
    pub name_block: Option<String>,
    pub name_entity: Option<String>,
    pub variant: Option<i64>,
    pub data: AttachedData,
    pub translation: Option<String>,
    pub rotation: Option<String>,
    pub scale: Option<String>,
    pub rotation_left_arm: Option<String>,
    pub rotation_right_arm: Option<String>,
    pub render_left_arm: bool,
    pub render_right_arm: bool,
}

impl Default for RenderOverrides {
    fn default() -> Self {
        Self {
            name_block: None,
            name_entity: None,
            variant: None,
            data: AttachedData::new(),
            translation: None,
            rotation: None,
            scale: None,
            rotation_left_arm: None,
            rotation_right_arm: None,
            render_left_arm: true,
            render_right_arm: true,
        }
    }
}

impl RenderOverrides {
    pub fn translation(&self) -> Option<[f64; 3]> {
        self.translation.as_deref().and_then(parse_triple)
    }

    pub fn rotation(&self) -> Option<[f64; 3]> {
        self.rotation.as_deref().and_then(parse_triple)
    }

    /// Either a full `x,y,z` triple or one uniform factor.
    pub fn scale(&self) -> Option<[f64; 3]> {
        let text = self.scale.as_deref()?;
        parse_triple(text).or_else(|| {
            let uniform = text.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
            Some([uniform; 3])
        })
    }

    pub fn rotation_left_arm(&self) -> Option<[f64; 3]> {
        self.rotation_left_arm.as_deref().and_then(parse_triple)
    }

    pub fn rotation_right_arm(&self) -> Option<[f64; 3]> {
        self.rotation_right_arm.as_deref().and_then(parse_triple)
    }
}

fn parse_triple(text: &str) -> Option<[f64; 3]> {
    let mut out = [0.0; 3];
    let mut parts = text.split(',');
    for slot in out.iter_mut() {
        let value = parts.next()?.trim().parse::<f64>().ok()?;
        if !value.is_finite() {
            return None;
        }
        *slot = value;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookTrigger {
    Capture,
    Tick,
    Place,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EffectHooks {
    pub on_capture: Option<String>,
    pub on_tick: Option<String>,
    pub on_place: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct BlockProbe<'a> {
    pub kind: &'a str,
    pub variant: u8,
    pub material: &'a str,
    pub hardness: f32,
    pub resistance: f32,
    pub data: Option<&'a AttachedData>,
}

#[derive(Debug, Clone, Copy)]
pub struct EntityProbe<'a> {
    pub kind: &'a str,
    pub height: f32,
    pub width: f32,
    pub health: f32,
    pub data: Option<&'a AttachedData>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverrideRule {
    pub id: RuleId,
    pub origin: String,
    pub target: RuleTarget,
    pub conditions: Vec<GatingCondition>,
    pub render: RenderOverrides,
    pub effects: EffectHooks,
}

impl OverrideRule {
    pub fn is_block(&self) -> bool {
        matches!(self.target, RuleTarget::Block(_))
    }

    pub fn is_entity(&self) -> bool {
        matches!(self.target, RuleTarget::Entity(_))
    }

    pub fn matches_block(&self, probe: &BlockProbe<'_>) -> bool {
        let RuleTarget::Block(selector) = &self.target else {
            return false;
        };
        matches_block_name(probe.kind, selector.name.as_deref())
            && matches_scalar(f64::from(probe.variant), selector.variant.as_deref())
            && matches_material(probe.material, selector.material.as_deref())
            && matches_scalar(f64::from(probe.hardness), selector.hardness.as_deref())
            && matches_scalar(f64::from(probe.resistance), selector.resistance.as_deref())
            && matches_structured(probe.data, &selector.data)
    }

    pub fn matches_entity(&self, probe: &EntityProbe<'_>) -> bool {
        let RuleTarget::Entity(selector) = &self.target else {
            return false;
        };
        matches_entity_name(probe.kind, selector.name.as_deref())
            && matches_scalar(f64::from(probe.height), selector.height.as_deref())
            && matches_scalar(f64::from(probe.width), selector.width.as_deref())
            && matches_scalar(f64::from(probe.health), selector.health.as_deref())
            && matches_structured(probe.data, &selector.data)
    }

    pub fn conditions_satisfied(&self, resource_level: f64) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.is_satisfied(resource_level))
    }

    pub fn hook(&self, trigger: HookTrigger) -> Option<&str> {
        let command = match trigger {
            HookTrigger::Capture => &self.effects.on_capture,
            HookTrigger::Tick => &self.effects.on_tick,
            HookTrigger::Place => &self.effects.on_place,
        };
        command.as_deref().filter(|command| !command.trim().is_empty())
    }
}
