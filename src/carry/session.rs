use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::carry::payload::{CarriedPayload, CarrySlot, PayloadKind};
use crate::scripting::rule::RuleId;
use crate::world::view::{ActorId, AttachedData};

pub const RULE_KEY: &str = "overrideKey";

#[derive(Debug, thiserror::Error)]
pub enum SessionRecordError {
    #[error("session record is not base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("session record is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarrySession {
    #[serde(default)]
    slot: CarrySlot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<AttachedData>,
}

impl CarrySession {
    pub fn slot(&self) -> &CarrySlot {
        &self.slot
    }

    pub fn slot_mut(&mut self) -> &mut CarrySlot {
        &mut self.slot
    }

    pub fn payload(&self) -> Option<&CarriedPayload> {
        self.slot.payload()
    }

    pub fn payload_kind(&self) -> PayloadKind {
        self.slot.payload_kind()
    }

    pub fn is_carrying(&self) -> bool {
        !self.slot.is_empty()
    }

    /// The session data block, created empty on first access.
    pub fn data(&mut self) -> &mut AttachedData {
        self.data.get_or_insert_with(AttachedData::new)
    }

    pub fn set_data(&mut self, data: AttachedData) {
        self.data = Some(data);
    }

    pub fn bound_rule(&self) -> Option<RuleId> {
        self.data
            .as_ref()?
            .get(RULE_KEY)
            .and_then(serde_json::Value::as_u64)
            .map(RuleId)
    }

    pub fn bind_rule(&mut self, rule: Option<RuleId>) {
        match rule {
            Some(rule) => {
                self.data()
                    .insert(RULE_KEY.to_string(), serde_json::Value::from(rule.0));
            }
            None => {
                if let Some(data) = self.data.as_mut() {
                    data.remove(RULE_KEY);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.slot.clear();
        self.bind_rule(None);
    }

    pub fn to_record(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    pub fn from_record(record: &str) -> Result<Self, SessionRecordError> {
        let record = record.trim();
        if record.is_empty() {
            return Ok(Self::default());
        }
        let bytes = STANDARD.decode(record)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// All carry sessions of one world. Mutated by the world thread, read by
/// presentation consumers on other threads.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<ActorId, CarrySession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update<R>(&self, actor: ActorId, f: impl FnOnce(&mut CarrySession) -> R) -> R {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(sessions.entry(actor).or_default())
    }

    pub fn inspect<R>(&self, actor: ActorId, f: impl FnOnce(&CarrySession) -> R) -> Option<R> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(&actor).map(f)
    }

    pub fn payload_kind(&self, actor: ActorId) -> PayloadKind {
        self.inspect(actor, CarrySession::payload_kind)
            .unwrap_or_default()
    }

    pub fn bound_rule(&self, actor: ActorId) -> Option<RuleId> {
        self.inspect(actor, CarrySession::bound_rule).flatten()
    }

    pub fn export(&self, actor: ActorId) -> Option<String> {
        self.inspect(actor, CarrySession::to_record)
    }

    pub fn import(&self, actor: ActorId, record: &str) -> Result<(), SessionRecordError> {
        let session = CarrySession::from_record(record)?;
        self.update(actor, |current| *current = session);
        Ok(())
    }

    pub fn remove(&self, actor: ActorId) -> Option<CarrySession> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&actor)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    fn chest() -> CarriedPayload {
        let mut data = AttachedData::new();
        data.insert("Items".to_string(), json!([{"id": 4, "Count": 3}]));
        CarriedPayload::Static {
            kind: "tile.chest".to_string(),
            variant: 2,
            data,
        }
    }

    #[test]
    fn data_is_created_lazily() {
        let mut session = CarrySession::default();
        assert_eq!(session.bound_rule(), None);
        assert!(session.data().is_empty());
        session.data().insert("k".to_string(), json!(1));
        assert_eq!(session.data().get("k"), Some(&json!(1)));
    }

    #[test]
    fn rule_binding_roundtrips_and_clears() {
        let mut session = CarrySession::default();
        let rule = RuleId::from_origin("scripts/chest.json");
        session.bind_rule(Some(rule));
        assert_eq!(session.bound_rule(), Some(rule));
        session.slot_mut().fill(chest()).expect("fill");
        session.clear();
        assert!(!session.is_carrying());
        assert_eq!(session.bound_rule(), None);
    }

    #[test]
    fn record_roundtrip_keeps_payload_and_binding() {
        let mut session = CarrySession::default();
        session.slot_mut().fill(chest()).expect("fill");
        session.bind_rule(Some(RuleId(u64::MAX)));
        let record = session.to_record();
        assert!(!record.contains('\n'));
        let back = CarrySession::from_record(&record).expect("record");
        assert_eq!(back, session);
        assert_eq!(back.bound_rule(), Some(RuleId(u64::MAX)));
    }

    #[test]
    fn blank_record_is_an_empty_session() {
        assert_eq!(
            CarrySession::from_record("  ").expect("record"),
            CarrySession::default()
        );
        assert!(matches!(
            CarrySession::from_record("***"),
            Err(SessionRecordError::Encoding(_))
        ));
        let not_json = STANDARD.encode("nope");
        assert!(matches!(
            CarrySession::from_record(&not_json),
            Err(SessionRecordError::Format(_))
        ));
    }

    #[test]
    fn registry_export_import() {
        let registry = SessionRegistry::new();
        let actor = ActorId(7);
        registry.update(actor, |session| session.slot_mut().fill(chest()))
            .expect("fill");
        let record = registry.export(actor).expect("record");
        registry.remove(actor);
        assert_eq!(registry.payload_kind(actor), PayloadKind::None);
        registry.import(actor, &record).expect("import");
        assert_eq!(registry.payload_kind(actor), PayloadKind::Static);
    }

    #[test]
    fn readers_never_see_a_torn_session() {
        let registry = Arc::new(SessionRegistry::new());
        let actor = ActorId(1);
        let reader = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..500 {
                    let seen = registry.inspect(actor, |session| {
                        (session.payload_kind(), session.bound_rule())
                    });
                    if let Some((kind, rule)) = seen {
                        assert_eq!(kind == PayloadKind::Static, rule.is_some());
                    }
                }
            })
        };
        for _ in 0..500 {
            registry.update(actor, |session| {
                session.clear();
                if session.slot_mut().fill(chest()).is_ok() {
                    session.bind_rule(Some(RuleId(1)));
                }
            });
            registry.update(actor, CarrySession::clear);
        }
        reader.join().expect("reader");
    }
}
