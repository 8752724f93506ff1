//! WASM bindings for dialogue-engine: drives the web front end.

use std::collections::HashMap;
use wasm_bindgen::prelude::*;

use dialogue_engine::core::engine::DialogueEngine;
use dialogue_engine::core::persist::SaveEnvelope;
use dialogue_engine::core::snapshot::Snapshot;
use dialogue_engine::schema::content::Registry;
use dialogue_engine::schema::state::GameConfig;

// ---------------------------------------------------------------------------
// Embedded demo content, compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const TAVERN_CONTENT: &str = include_str!("../../content/tavern/content.ron");
    pub const TAVERN_SCRIPTS: &[(&str, &str)] = &[
        ("innkeeper", include_str!("../../content/tavern/innkeeper.dlg")),
        ("cellar", include_str!("../../content/tavern/cellar.dlg")),
    ];
    pub const TAVERN_START: &str = "common_room";
}

// ---------------------------------------------------------------------------
// JSON helpers for communication across the WASM boundary
// ---------------------------------------------------------------------------
fn to_json(snapshot: &Snapshot) -> Result<String, JsError> {
    serde_json::to_string(snapshot).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

fn build_engine(registry: Registry, seed: u64) -> Result<DialogueEngine, JsError> {
    DialogueEngine::builder()
        .seed(seed)
        .with_registry(registry)
        .build()
        .map_err(|e| JsError::new(&format!("Engine build error: {e}")))
}

// ---------------------------------------------------------------------------
// DialogueSession: the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct DialogueSession {
    engine: DialogueEngine,
}

#[wasm_bindgen]
impl DialogueSession {
    /// Create a session over the embedded tavern content.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> Result<DialogueSession, JsError> {
        let mut registry = Registry::parse_ron(data::TAVERN_CONTENT)
            .map_err(|e| JsError::new(&format!("Content parse error: {e}")))?;
        for (id, source) in data::TAVERN_SCRIPTS {
            registry
                .add_script(id, source)
                .map_err(|e| JsError::new(&format!("Script {id}: {e}")))?;
        }
        Ok(DialogueSession {
            engine: build_engine(registry, seed)?,
        })
    }

    /// Create a session over caller-supplied content.
    ///
    /// `scripts_json` maps dialogue ids to script source:
    /// ```json
    /// { "innkeeper": "NODE greet\nHOBB: Evening." }
    /// ```
    pub fn from_content(
        content_ron: &str,
        scripts_json: &str,
        seed: u64,
    ) -> Result<DialogueSession, JsError> {
        let mut registry = Registry::parse_ron(content_ron)
            .map_err(|e| JsError::new(&format!("Content parse error: {e}")))?;
        let scripts: HashMap<String, String> = serde_json::from_str(scripts_json)
            .map_err(|e| JsError::new(&format!("Invalid scripts JSON: {e}")))?;
        let mut ids: Vec<&String> = scripts.keys().collect();
        ids.sort();
        for id in ids {
            registry
                .add_script(id, &scripts[id])
                .map_err(|e| JsError::new(&format!("Script {id}: {e}")))?;
        }
        Ok(DialogueSession {
            engine: build_engine(registry, seed)?,
        })
    }

    /// Start a new game. `config_json` may be empty to start at the
    /// embedded content's default location; otherwise it is a JSON
    /// `GameConfig`.
    pub fn new_game(&mut self, config_json: &str) -> Result<String, JsError> {
        let config = if config_json.trim().is_empty() {
            GameConfig::new(data::TAVERN_START)
        } else {
            serde_json::from_str(config_json)
                .map_err(|e| JsError::new(&format!("Invalid config JSON: {e}")))?
        };
        to_json(&self.engine.new_game(&config))
    }

    pub fn talk_to(&mut self, character_id: &str) -> Result<String, JsError> {
        to_json(&self.engine.talk_to(character_id))
    }

    pub fn select_choice(&mut self, choice_id: &str) -> Result<String, JsError> {
        to_json(&self.engine.select_choice(choice_id))
    }

    pub fn continue_dialogue(&mut self) -> Result<String, JsError> {
        to_json(&self.engine.continue_dialogue())
    }

    pub fn take_item(&mut self, item_id: &str) -> Result<String, JsError> {
        to_json(&self.engine.take_item(item_id))
    }

    pub fn travel_to(&mut self, location_id: &str) -> Result<String, JsError> {
        to_json(&self.engine.travel_to(location_id))
    }

    pub fn write_note(&mut self, text: &str) -> Result<String, JsError> {
        to_json(&self.engine.write_note(text))
    }

    pub fn delete_note(&mut self, note_id: u64) -> Result<String, JsError> {
        to_json(&self.engine.delete_note(note_id))
    }

    pub fn set_locale(&mut self, locale_id: &str) -> Result<String, JsError> {
        to_json(&self.engine.set_locale(locale_id))
    }

    /// Return the save envelope as JSON, stamped with the browser clock.
    pub fn save_game(&self) -> Result<String, JsError> {
        let mut envelope = self.engine.save_game();
        envelope.timestamp = (js_sys::Date::now() / 1000.0) as u64;
        envelope
            .to_json()
            .map_err(|e| JsError::new(&format!("Save error: {e}")))
    }

    /// Restore from a save envelope JSON string.
    pub fn load_game(&mut self, save_json: &str) -> Result<String, JsError> {
        let envelope = SaveEnvelope::from_json(save_json)
            .map_err(|e| JsError::new(&format!("Invalid save JSON: {e}")))?;
        to_json(&self.engine.load_game(&envelope))
    }

    pub fn snapshot(&mut self) -> Result<String, JsError> {
        to_json(&self.engine.snapshot())
    }

    /// Return JSON array of available locale ids.
    pub fn locales(&self) -> String {
        let ids: Vec<&str> = self
            .engine
            .registry()
            .locales
            .iter()
            .map(|l| l.id.as_str())
            .collect();
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
    }
}
