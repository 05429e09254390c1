//! Opaque catalog entities
//!
//! The harvester never interprets an entity beyond two values: the identity
//! used for deduplication and the score used for ranking. Everything else is
//! carried through untouched.

use crate::config::HarvestConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One catalog entity, kept as the raw JSON document the catalog returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Value);

impl Entity {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Entity {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Extracts identity and ranking score from entities
///
/// Both are addressed by JSON pointers (RFC 6901), e.g. `/id` and
/// `/rating/average`.
#[derive(Debug, Clone)]
pub struct EntityKeys {
    identity_pointer: String,
    score_pointer: String,
    default_score: f64,
}

impl EntityKeys {
    pub fn new(
        identity_pointer: impl Into<String>,
        score_pointer: impl Into<String>,
        default_score: f64,
    ) -> Self {
        Self {
            identity_pointer: identity_pointer.into(),
            score_pointer: score_pointer.into(),
            default_score,
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(
            config.identity_field.clone(),
            config.score_field.clone(),
            config.default_score,
        )
    }

    /// Returns the entity's declared identity, or None if it has none
    ///
    /// Strings are taken as they are and any other value is rendered as JSON
    /// text, so the string `"1"` and the number `1` name the same entity.
    pub fn identity(&self, entity: &Entity) -> Option<String> {
        match entity.0.pointer(&self.identity_pointer) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(value) => Some(value.to_string()),
        }
    }

    /// Returns the key entities are deduplicated by
    ///
    /// Entities without an identity fall back to their full content, so two
    /// byte-identical anonymous records still coalesce.
    pub fn dedup_key(&self, entity: &Entity) -> String {
        match self.identity(entity) {
            Some(identity) => format!("id:{}", identity),
            None => format!("content:{}", entity.0),
        }
    }

    /// Returns the ranking score, substituting the default when absent
    pub fn score(&self, entity: &Entity) -> f64 {
        entity
            .0
            .pointer(&self.score_pointer)
            .and_then(Value::as_f64)
            .filter(|score| score.is_finite())
            .unwrap_or(self.default_score)
    }
}

impl Default for EntityKeys {
    fn default() -> Self {
        Self::from_config(&HarvestConfig::default())
    }
}
