use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use super::condition::Condition;
use crate::core::script::{parse_dialogue, ScriptError};
use super::dialogue::Dialogue;
use super::effect::Effect;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("script {file}: {source}")]
    Script { file: String, source: ScriptError },
}

// Any display string in authored content may be an `@key` into the
// active locale.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub background: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub portrait: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
    /// Dialogue started by `talk_to`.
    #[serde(default)]
    pub dialogue: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub in_party: bool,
    #[serde(default)]
    pub relationship: f64,
    #[serde(default)]
    pub stats: HashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    /// Starting location; `None` means nowhere until placed by an effect.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_takeable")]
    pub takeable: bool,
}

fn default_takeable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    pub location: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMap {
    pub id: String,
    pub name: String,
    /// Pixels travelled per in-game hour.
    pub scale: f64,
    pub markers: Vec<MapMarker>,
}

impl GameMap {
    pub fn marker(&self, location: &str) -> Option<&MapMarker> {
        self.markers.iter().find(|m| m.location == location)
    }

    /// Whole hours to travel between two marked locations, never less
    /// than one.
    pub fn travel_hours(&self, from: &str, to: &str) -> Option<u32> {
        let a = self.marker(from)?;
        let b = self.marker(to)?;
        let distance = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
        let hours = if self.scale > 0.0 {
            (distance / self.scale).floor()
        } else {
            0.0
        };
        Some((hours as u32).max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestStage {
    pub id: String,
    pub text: String,
    /// Reaching this stage completes the quest.
    #[serde(default)]
    pub completes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,
    pub name: String,
    pub stages: Vec<QuestStage>,
}

impl Quest {
    pub fn stage(&self, id: &str) -> Option<&QuestStage> {
        self.stages.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub title: String,
    pub text: String,
}

/// A non-dialogue cutscene fired on arrival, sharing the dialogue trigger
/// shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interlude {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub trigger_location: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub effects: Vec<Effect>,
}

/// A flat string table for one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locale {
    pub id: String,
    pub name: String,
    pub strings: HashMap<String, String>,
}

/// Read-only content store. Collections keep author order, which decides
/// the "first match" for triggers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub maps: Vec<GameMap>,
    #[serde(default)]
    pub quests: Vec<Quest>,
    #[serde(default)]
    pub journal: Vec<JournalEntry>,
    #[serde(default)]
    pub interludes: Vec<Interlude>,
    #[serde(default)]
    pub locales: Vec<Locale>,
    #[serde(default)]
    pub default_locale: Option<String>,
    /// Compiled from scripts, never from RON.
    #[serde(skip)]
    pub dialogues: Vec<Dialogue>,
}

impl Registry {
    /// Load a content bundle from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Registry, ContentError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a content bundle from a RON string.
    pub fn parse_ron(input: &str) -> Result<Registry, ContentError> {
        Ok(ron::from_str(input)?)
    }

    /// Compile every `.dlg` script in `dir`, using the file stem as the
    /// dialogue id. Files load in name order so replacement is stable.
    pub fn load_dialogues_dir(&mut self, dir: &Path) -> Result<(), ContentError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("dlg") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string();
            let source = std::fs::read_to_string(&path)?;
            let dialogue = parse_dialogue(&id, &source).map_err(|source| ContentError::Script {
                file: path.display().to_string(),
                source,
            })?;
            self.add_dialogue(dialogue);
        }
        Ok(())
    }

    /// Compile a single script and add it under `id`.
    pub fn add_script(&mut self, id: &str, source: &str) -> Result<(), ScriptError> {
        self.add_dialogue(parse_dialogue(id, source)?);
        Ok(())
    }

    /// Add a compiled dialogue. A dialogue with the same id is replaced in
    /// place.
    pub fn add_dialogue(&mut self, dialogue: Dialogue) {
        match self.dialogues.iter_mut().find(|d| d.id == dialogue.id) {
            Some(existing) => *existing = dialogue,
            None => self.dialogues.push(dialogue),
        }
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// Speaker names in scripts are case-insensitive.
    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id.eq_ignore_ascii_case(id))
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn quest(&self, id: &str) -> Option<&Quest> {
        self.quests.iter().find(|q| q.id == id)
    }

    pub fn journal_entry(&self, id: &str) -> Option<&JournalEntry> {
        self.journal.iter().find(|j| j.id == id)
    }

    pub fn interlude(&self, id: &str) -> Option<&Interlude> {
        self.interludes.iter().find(|i| i.id == id)
    }

    pub fn locale(&self, id: &str) -> Option<&Locale> {
        self.locales.iter().find(|l| l.id == id)
    }

    pub fn dialogue(&self, id: &str) -> Option<&Dialogue> {
        self.dialogues.iter().find(|d| d.id == id)
    }

    /// The first map carrying markers for both locations.
    pub fn map_between(&self, from: &str, to: &str) -> Option<&GameMap> {
        self.maps
            .iter()
            .find(|m| m.marker(from).is_some() && m.marker(to).is_some())
    }

    /// The first map carrying a marker for `location`, else the first map.
    pub fn map_for(&self, location: &str) -> Option<&GameMap> {
        self.maps
            .iter()
            .find(|m| m.marker(location).is_some())
            .or_else(|| self.maps.first())
    }
}
