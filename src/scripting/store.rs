use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use lru::LruCache;

use crate::scripting::reader::{self, RuleLoadReport, RuleSource, RuleSourceError};
use crate::scripting::rule::{BlockProbe, EntityProbe, OverrideRule, RuleId};
use crate::world::view::AttachedData;

pub const DEFAULT_MATCH_CACHE: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub hits: u64,
    pub misses: u64,
}

impl MatchStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64) / (total as f64)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MatchKey {
    Block {
        kind: String,
        variant: u8,
        material: String,
        hardness: u32,
        resistance: u32,
        data: Option<String>,
    },
    Entity {
        kind: String,
        height: u32,
        width: u32,
        health: u32,
        data: Option<String>,
    },
}

fn data_key(data: Option<&AttachedData>) -> Option<String> {
    data.map(|data| serde_json::Value::Object(data.clone()).to_string())
}

impl MatchKey {
    fn block(probe: &BlockProbe<'_>) -> Self {
        MatchKey::Block {
            kind: probe.kind.to_string(),
            variant: probe.variant,
            material: probe.material.to_string(),
            hardness: probe.hardness.to_bits(),
            resistance: probe.resistance.to_bits(),
            data: data_key(probe.data),
        }
    }

    fn entity(probe: &EntityProbe<'_>) -> Self {
        MatchKey::Entity {
            kind: probe.kind.to_string(),
            height: probe.height.to_bits(),
            width: probe.width.to_bits(),
            health: probe.health.to_bits(),
            data: data_key(probe.data),
        }
    }
}

struct MatchCache {
    entries: LruCache<MatchKey, Option<usize>>,
    stats: MatchStats,
}

pub struct RuleSet {
    generation: u64,
    rules: Vec<Arc<OverrideRule>>,
    by_id: HashMap<RuleId, usize>,
    cache: Mutex<MatchCache>,
}

impl RuleSet {
    fn new(generation: u64, rules: Vec<OverrideRule>, cache_capacity: usize) -> Self {
        let mut by_id = HashMap::with_capacity(rules.len());
        let mut kept = Vec::with_capacity(rules.len());
        for rule in rules {
            if by_id.contains_key(&rule.id) {
                tracing::warn!(rule = %rule.id, origin = %rule.origin, "duplicate carry rule ignored");
                continue;
            }
            by_id.insert(rule.id, kept.len());
            kept.push(Arc::new(rule));
        }
        let capacity = NonZeroUsize::new(cache_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            generation,
            rules: kept,
            by_id,
            cache: Mutex::new(MatchCache {
                entries: LruCache::new(capacity),
                stats: MatchStats::default(),
            }),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &Arc<OverrideRule>> {
        self.rules.iter()
    }

    pub fn get(&self, id: RuleId) -> Option<Arc<OverrideRule>> {
        self.by_id.get(&id).map(|index| Arc::clone(&self.rules[*index]))
    }

    pub fn match_stats(&self) -> MatchStats {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats
    }

    pub fn find_block(&self, probe: &BlockProbe<'_>) -> Option<Arc<OverrideRule>> {
        self.find_cached(MatchKey::block(probe), |rule| rule.matches_block(probe))
    }

    pub fn find_entity(&self, probe: &EntityProbe<'_>) -> Option<Arc<OverrideRule>> {
        self.find_cached(MatchKey::entity(probe), |rule| rule.matches_entity(probe))
    }

    fn find_cached<F>(&self, key: MatchKey, matches: F) -> Option<Arc<OverrideRule>>
    where
        F: Fn(&OverrideRule) -> bool,
    {
        if self.rules.is_empty() {
            return None;
        }
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(found) = cache.entries.get(&key).copied() {
            cache.stats.hits += 1;
            return found.map(|index| Arc::clone(&self.rules[index]));
        }
        cache.stats.misses += 1;
        let found = self.rules.iter().position(|rule| matches(rule));
        cache.entries.put(key, found);
        found.map(|index| Arc::clone(&self.rules[index]))
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("generation", &self.generation)
            .field("rules", &self.rules.len())
            .finish()
    }
}

/// Holds the active rule set. Reloads build a complete new set and swap it
/// in whole, so a query sees either the old set or the new one.
#[derive(Debug)]
pub struct OverrideStore {
    active: RwLock<Arc<RuleSet>>,
    cache_capacity: usize,
}

impl Default for OverrideStore {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_CACHE)
    }
}

impl OverrideStore {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            active: RwLock::new(Arc::new(RuleSet::new(0, Vec::new(), cache_capacity))),
            cache_capacity,
        }
    }

    pub fn load(&self, sources: &[RuleSource]) -> RuleLoadReport {
        let mut report = reader::parse_rules(sources);
        let set = self.swap(std::mem::take(&mut report.rules));
        report.rules = set.rules().map(|rule| (**rule).clone()).collect();
        report
    }

    pub fn install(&self, rules: Vec<OverrideRule>) -> u64 {
        self.swap(rules).generation()
    }

    fn swap(&self, rules: Vec<OverrideRule>) -> Arc<RuleSet> {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        let generation = active.generation() + 1;
        let set = Arc::new(RuleSet::new(generation, rules, self.cache_capacity));
        *active = Arc::clone(&set);
        drop(active);
        tracing::info!(generation, rules = set.len(), "carry rules installed");
        set
    }

    pub fn reload_from_dir(&self, dir: &Path) -> Result<RuleLoadReport, RuleSourceError> {
        let mut report = reader::load_dir(dir)?;
        let set = self.swap(std::mem::take(&mut report.rules));
        report.rules = set.rules().map(|rule| (**rule).clone()).collect();
        Ok(report)
    }

    /// The currently active set. Holding it pins one generation for a
    /// sequence of queries.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot().generation()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: RuleId) -> Option<Arc<OverrideRule>> {
        self.snapshot().get(id)
    }

    pub fn find_for_static_object(&self, probe: &BlockProbe<'_>) -> Option<Arc<OverrideRule>> {
        self.snapshot().find_block(probe)
    }

    pub fn find_for_mobile_agent(&self, probe: &EntityProbe<'_>) -> Option<Arc<OverrideRule>> {
        self.snapshot().find_entity(probe)
    }

    pub fn conditions_satisfied(&self, rule: &OverrideRule, resource_level: f64) -> bool {
        rule.conditions_satisfied(resource_level)
    }
}
