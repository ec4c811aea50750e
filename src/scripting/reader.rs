use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::scripting::rule::{
    BlockSelector, EffectHooks, EntitySelector, GatingCondition, OverrideRule, RenderOverrides,
    RuleId, RuleTarget, UnsupportedCondition,
};
use crate::world::view::AttachedData;

const RULE_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSource {
    pub origin: String,
    pub text: String,
}

impl RuleSource {
    pub fn new(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleSourceError {
    #[error("{path}: read failed: {message}")]
    Io { path: String, message: String },
    #[error("{origin}: parse failed: {message}")]
    Parse { origin: String, message: String },
    #[error("{origin}: missing 'object' group")]
    MissingObject { origin: String },
    #[error("{origin}: needs at least one of 'conditions', 'render' or 'effects'")]
    NoBehaviour { origin: String },
    #[error("{origin}: 'object' must name exactly one of 'block' or 'entity'")]
    AmbiguousTarget { origin: String },
    #[error("{origin}: duplicate rule origin")]
    DuplicateOrigin { origin: String },
}

#[derive(Debug, Default)]
pub struct RuleLoadReport {
    pub files: usize,
    pub rules: Vec<OverrideRule>,
    pub skipped: Vec<RuleSourceError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Text(text) => text,
            Scalar::Integer(value) => value.to_string(),
            Scalar::Float(value) => value.to_string(),
            Scalar::Flag(value) => value.to_string(),
        }
    }

    fn into_integer(self) -> Option<i64> {
        match self {
            Scalar::Integer(value) => Some(value),
            Scalar::Float(value) if value.is_finite() => Some(value.trunc() as i64),
            Scalar::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Only `true` (any case) reads as set.
    fn into_flag(self) -> bool {
        match self {
            Scalar::Flag(value) => value,
            Scalar::Text(text) => text.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

fn text(value: Option<Scalar>) -> Option<String> {
    value.map(Scalar::into_text)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRule {
    object: Option<RawObject>,
    conditions: Option<RawConditions>,
    render: Option<RawRender>,
    effects: Option<RawEffects>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawObject {
    block: Option<RawBlock>,
    entity: Option<RawEntity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBlock {
    name: Option<Scalar>,
    meta: Option<Scalar>,
    material: Option<Scalar>,
    hardness: Option<Scalar>,
    resistance: Option<Scalar>,
    nbt: Option<AttachedData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEntity {
    name: Option<Scalar>,
    health: Option<Scalar>,
    height: Option<Scalar>,
    width: Option<Scalar>,
    nbt: Option<AttachedData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConditions {
    xp: Option<Scalar>,
    gamestage: Option<Scalar>,
    advancement: Option<Scalar>,
    gamemode: Option<Scalar>,
    scoreboard: Option<Scalar>,
    position: Option<Scalar>,
    effects: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRender {
    name_block: Option<Scalar>,
    name_entity: Option<Scalar>,
    meta: Option<Scalar>,
    nbt: Option<AttachedData>,
    translation: Option<Scalar>,
    rotation: Option<Scalar>,
    scale: Option<Scalar>,
    rotation_left_arm: Option<Scalar>,
    rotation_right_arm: Option<Scalar>,
    render_left_arm: Option<Scalar>,
    render_right_arm: Option<Scalar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEffects {
    #[serde(rename = "commandPickup")]
    command_pickup: Option<String>,
    #[serde(rename = "commandLoop")]
    command_loop: Option<String>,
    #[serde(rename = "commandPlace")]
    command_place: Option<String>,
}

pub fn parse_rule(source: &RuleSource) -> Result<OverrideRule, RuleSourceError> {
    let origin = source.origin.clone();
    let raw: RawRule = serde_yaml::from_str(&source.text).map_err(|err| RuleSourceError::Parse {
        origin: origin.clone(),
        message: err.to_string(),
    })?;

    let object = raw
        .object
        .ok_or_else(|| RuleSourceError::MissingObject {
            origin: origin.clone(),
        })?;
    if raw.conditions.is_none() && raw.render.is_none() && raw.effects.is_none() {
        return Err(RuleSourceError::NoBehaviour { origin });
    }

    let target = match (object.block, object.entity) {
        (Some(block), None) => RuleTarget::Block(BlockSelector {
            name: text(block.name),
            variant: text(block.meta),
            material: text(block.material),
            hardness: text(block.hardness),
            resistance: text(block.resistance),
            data: block.nbt.unwrap_or_default(),
        }),
        (None, Some(entity)) => RuleTarget::Entity(EntitySelector {
            name: text(entity.name),
            height: text(entity.height),
            width: text(entity.width),
            health: text(entity.health),
            data: entity.nbt.unwrap_or_default(),
        }),
        _ => return Err(RuleSourceError::AmbiguousTarget { origin }),
    };

    let conditions = raw.conditions.map(gating_conditions).unwrap_or_default();
    let render = match raw.render {
        Some(render) => render_overrides(render).map_err(|message| RuleSourceError::Parse {
            origin: origin.clone(),
            message,
        })?,
        None => RenderOverrides::default(),
    };
    let effects = raw
        .effects
        .map(|effects| EffectHooks {
            on_capture: effects.command_pickup,
            on_tick: effects.command_loop,
            on_place: effects.command_place,
        })
        .unwrap_or_default();

    Ok(OverrideRule {
        id: RuleId::from_origin(&origin),
        origin,
        target,
        conditions,
        render,
        effects,
    })
}

fn gating_conditions(raw: RawConditions) -> Vec<GatingCondition> {
    let mut conditions = Vec::new();
    if let Some(xp) = text(raw.xp) {
        conditions.push(GatingCondition::ResourceLevel(xp));
    }
    let unsupported = [
        raw.gamestage,
        raw.advancement,
        raw.gamemode,
        raw.scoreboard,
        raw.position,
        raw.effects,
    ];
    for ((kind, _), value) in UnsupportedCondition::ALL.iter().zip(unsupported) {
        if let Some(value) = text(value) {
            conditions.push(GatingCondition::Unsupported { kind: *kind, value });
        }
    }
    conditions
}

fn render_overrides(raw: RawRender) -> Result<RenderOverrides, String> {
    let variant = match raw.meta {
        Some(meta) => {
            let shown = meta.clone().into_text();
            Some(
                meta.into_integer()
                    .ok_or_else(|| format!("render.meta: not an integer: {shown}"))?,
            )
        }
        None => None,
    };
    Ok(RenderOverrides {
        name_block: text(raw.name_block),
        name_entity: text(raw.name_entity),
        variant,
        data: raw.nbt.unwrap_or_default(),
        translation: text(raw.translation),
        rotation: text(raw.rotation),
        scale: text(raw.scale),
        rotation_left_arm: text(raw.rotation_left_arm),
        rotation_right_arm: text(raw.rotation_right_arm),
        render_left_arm: raw.render_left_arm.map_or(true, Scalar::into_flag),
        render_right_arm: raw.render_right_arm.map_or(true, Scalar::into_flag),
    })
}

pub fn parse_rules(sources: &[RuleSource]) -> RuleLoadReport {
    let mut report = RuleLoadReport {
        files: sources.len(),
        ..RuleLoadReport::default()
    };
    for source in sources {
        if report.rules.iter().any(|rule| rule.origin == source.origin) {
            report.skipped.push(RuleSourceError::DuplicateOrigin {
                origin: source.origin.clone(),
            });
            continue;
        }
        match parse_rule(source) {
            Ok(rule) => report.rules.push(rule),
            Err(err) => report.skipped.push(err),
        }
    }
    for err in &report.skipped {
        tracing::warn!(error = %err, "skipping carry rule");
    }
    report
}

pub fn rule_files(dir: &Path) -> Result<Vec<PathBuf>, RuleSourceError> {
    let io_error = |err: std::io::Error| RuleSourceError::Io {
        path: dir.display().to_string(),
        message: err.to_string(),
    };
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(io_error)?;
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let is_rule = path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| {
                    RULE_EXTENSIONS
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                });
        if is_rule {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn load_dir(dir: &Path) -> Result<RuleLoadReport, RuleSourceError> {
    let files = rule_files(dir)?;
    let mut sources = Vec::with_capacity(files.len());
    let mut unreadable = Vec::new();
    for path in &files {
        match std::fs::read_to_string(path) {
            Ok(text) => sources.push(RuleSource::new(path.display().to_string(), text)),
            Err(err) => unreadable.push(RuleSourceError::Io {
                path: path.display().to_string(),
                message: err.to_string(),
            }),
        }
    }
    for err in &unreadable {
        tracing::warn!(error = %err, "skipping carry rule");
    }
    let mut report = parse_rules(&sources);
    report.files = files.len();
    report.skipped.extend(unreadable);
    Ok(report)
}
