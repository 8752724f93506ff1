use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::dialogue::Text;
use super::value::Value;

/// Where the player currently is in a dialogue graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueCursor {
    pub dialogue_id: String,
    pub node_id: String,
    /// Choice ids that passed their conditions when the node settled.
    /// Empty until the engine pauses here.
    #[serde(default)]
    pub visible_choices: Vec<String>,
}

impl DialogueCursor {
    pub fn at(dialogue_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            dialogue_id: dialogue_id.into(),
            node_id: node_id.into(),
            visible_choices: Vec::new(),
        }
    }

    pub fn offers(&self, choice_id: &str) -> bool {
        self.visible_choices.iter().any(|c| c == choice_id)
    }
}

/// Per-character mutable state, seeded from the registry at new game.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CharacterState {
    pub location: Option<String>,
    pub in_party: bool,
    pub relationship: f64,
    #[serde(default)]
    pub stats: HashMap<String, f64>,
}

/// A free-form note written by the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    pub text: String,
    pub day: u32,
    pub hour: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    Info,
    Item,
}

/// A queued toast for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub text: Text,
}

/// Starting conditions for a new game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub start_location: String,
    #[serde(default = "default_day")]
    pub start_day: u32,
    #[serde(default = "default_hour")]
    pub start_hour: u32,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default = "default_map_enabled")]
    pub map_enabled: bool,
}

fn default_day() -> u32 {
    1
}

fn default_hour() -> u32 {
    8
}

fn default_map_enabled() -> bool {
    true
}

impl GameConfig {
    pub fn new(start_location: impl Into<String>) -> Self {
        Self {
            start_location: start_location.into(),
            start_day: default_day(),
            start_hour: default_hour(),
            flags: Vec::new(),
            variables: HashMap::new(),
            inventory: Vec::new(),
            map_enabled: default_map_enabled(),
        }
    }

    /// Parse a config from a RON string.
    pub fn parse_ron(input: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(input)
    }
}

/// The single mutable record of a play session.
///
/// Only the engine holds one. Transitions take it by value and return the
/// next value, so no two live references ever see different versions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldState {
    pub location: String,
    pub day: u32,
    pub hour: u32,
    pub flags: FxHashSet<String>,
    pub variables: HashMap<String, Value>,
    /// Insertion-ordered, duplicate-free.
    pub inventory: Vec<String>,
    pub quests: HashMap<String, String>,
    /// Unlock-ordered, duplicate-free.
    pub journal: Vec<String>,
    pub notes: Vec<Note>,
    /// Highest note id ever issued; ids are never reused.
    #[serde(default)]
    pub last_note_id: u64,
    pub dialogue: Option<DialogueCursor>,
    pub characters: HashMap<String, CharacterState>,
    pub item_locations: HashMap<String, String>,
    pub map_enabled: bool,

    // Transient: valid for exactly one snapshot.
    #[serde(default)]
    pub pending_notifications: Vec<Notification>,
    #[serde(default)]
    pub pending_sounds: Vec<String>,
    #[serde(default)]
    pub pending_video: Option<String>,
    #[serde(default)]
    pub pending_interlude: Option<String>,
}

impl WorldState {
    pub fn in_dialogue(&self) -> bool {
        self.dialogue.is_some()
    }

    pub fn has_item(&self, item: &str) -> bool {
        self.inventory.iter().any(|i| i == item)
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn clear_transients(&mut self) {
        self.pending_notifications.clear();
        self.pending_sounds.clear();
        self.pending_video = None;
        self.pending_interlude = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_from_ron() {
        let config = GameConfig::parse_ron(r#"(start_location: "square")"#).unwrap();
        assert_eq!(config.start_location, "square");
        assert_eq!(config.start_day, 1);
        assert_eq!(config.start_hour, 8);
        assert!(config.map_enabled);
        assert!(config.flags.is_empty());
    }

    #[test]
    fn config_with_variables() {
        let config = GameConfig::parse_ron(
            r#"(start_location: "square", start_hour: 22, variables: {"gold": 100, "title": "squire"})"#,
        )
        .unwrap();
        assert_eq!(config.start_hour, 22);
        assert_eq!(config.variables.get("gold"), Some(&Value::Number(100.0)));
        assert_eq!(config.variables.get("title"), Some(&Value::Text("squire".to_string())));
    }

    #[test]
    fn clear_transients_keeps_persistent_fields() {
        let mut state = WorldState {
            location: "square".to_string(),
            pending_sounds: vec!["bell".to_string()],
            pending_video: Some("intro".to_string()),
            pending_interlude: Some("dawn".to_string()),
            pending_notifications: vec![Notification {
                kind: NotificationKind::Info,
                text: Text::Literal("hi".to_string()),
            }],
            ..WorldState::default()
        };
        state.clear_transients();
        assert_eq!(state.location, "square");
        assert!(state.pending_sounds.is_empty());
        assert!(state.pending_notifications.is_empty());
        assert_eq!(state.pending_video, None);
        assert_eq!(state.pending_interlude, None);
    }
}
