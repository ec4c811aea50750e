pub mod carry;
pub mod config;
pub mod scripting;
pub mod telemetry;
pub mod world;

pub use carry::payload::{CarriedPayload, CarrySlot, CodecError, PayloadKind};
pub use carry::presentation::{CarryPresenter, RenderTransform};
pub use carry::resolver::{
    ActorState, CarryTick, InteractionResolver, PickupOutcome, PlaceOutcome, Rejection,
};
pub use carry::session::{CarrySession, SessionRegistry};
pub use config::{AppConfig, CarrySettings, ConfigError};
pub use scripting::reader::{RuleLoadReport, RuleSource, RuleSourceError};
pub use scripting::rule::{OverrideRule, RuleId};
pub use scripting::store::OverrideStore;

pub fn run(args: &[String]) -> Result<(), String> {
    let config = AppConfig::from_args(args).map_err(|err| err.to_string())?;
    telemetry::logging::init(&config.root)?;

    let store = OverrideStore::new(config.settings.match_cache);
    let report = store
        .reload_from_dir(&config.scripts_dir)
        .map_err(|err| err.to_string())?;
    let block_rules = report.rules.iter().filter(|rule| rule.is_block()).count();
    let entity_rules = report.rules.iter().filter(|rule| rule.is_entity()).count();
    tracing::info!(
        files = report.files,
        parsed = report.rules.len(),
        skipped = report.skipped.len(),
        generation = store.generation(),
        "carry rule scan"
    );

    println!("carryon: rule scan");
    println!("- root: {}", config.root.display());
    println!("- scripts: {}", config.scripts_dir.display());
    println!(
        "- settings: cooldown={}ms, reach={}, match_cache={}",
        config.settings.cooldown_ms, config.settings.reach, config.settings.match_cache
    );
    println!(
        "- rules: files={}, parsed={}, skipped={}",
        report.files,
        report.rules.len(),
        report.skipped.len()
    );
    println!("- block rules: {}", block_rules);
    println!("- entity rules: {}", entity_rules);
    for err in &report.skipped {
        eprintln!("carryon: rule skipped {}", err);
    }
    Ok(())
}
