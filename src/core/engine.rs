/// The dialogue engine: player actions in, snapshots out.
///
/// Owns the registry, the single world state and the dice. Every action
/// takes the state out, threads it through the transition functions and
/// puts the result back before publishing a snapshot.
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::core::conditions;
use crate::core::dice::{Dice, SeededDice};
use crate::core::effects;
use crate::core::persist::SaveEnvelope;
use crate::core::snapshot::{self, Snapshot};
use crate::schema::content::{ContentError, Registry};
use crate::schema::dialogue::{Dialogue, Node, Text};
use crate::schema::effect::Effect;
use crate::schema::state::{
    CharacterState, DialogueCursor, GameConfig, Note, Notification, NotificationKind, WorldState,
};

/// Consecutive non-pausing steps before a dialogue is assumed to loop.
pub const MAX_SILENT_STEPS: usize = 256;

/// The top-level engine. Built via `DialogueEngine::builder()`.
pub struct DialogueEngine {
    registry: Registry,
    state: WorldState,
    locale: Option<String>,
    dice: Box<dyn Dice>,
}

/// Builder for constructing a `DialogueEngine`.
pub struct DialogueEngineBuilder {
    seed: u64,
    locale: Option<String>,
    content_path: Option<PathBuf>,
    dialogues_dir: Option<PathBuf>,
    /// Directly provided content (for testing without files).
    registry: Option<Registry>,
    /// Directly provided dice (for testing with pinned rolls).
    dice: Option<Box<dyn Dice>>,
}

impl DialogueEngine {
    pub fn builder() -> DialogueEngineBuilder {
        DialogueEngineBuilder {
            seed: 0,
            locale: None,
            content_path: None,
            dialogues_dir: None,
            registry: None,
            dice: None,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Start a fresh session from `config` and fire arrival triggers at
    /// the start location.
    pub fn new_game(&mut self, config: &GameConfig) -> Snapshot {
        info!("└─ action: new_game at \"{}\"", config.start_location);
        let mut state = WorldState {
            location: config.start_location.clone(),
            day: config.start_day,
            hour: config.start_hour.min(23),
            flags: config.flags.iter().cloned().collect(),
            variables: config.variables.clone(),
            map_enabled: config.map_enabled,
            ..WorldState::default()
        };
        for item in &config.inventory {
            if !state.has_item(item) {
                state.inventory.push(item.clone());
            }
        }
        for character in &self.registry.characters {
            state.characters.insert(
                character.id.clone(),
                CharacterState {
                    location: character.location.clone(),
                    in_party: character.in_party,
                    relationship: character.relationship,
                    stats: character.stats.clone(),
                },
            );
        }
        for item in &self.registry.items {
            if let Some(location) = &item.location {
                if !state.has_item(&item.id) {
                    state.item_locations.insert(item.id.clone(), location.clone());
                }
            }
        }

        self.state = check_triggers(state, &self.registry, self.dice.as_mut());
        self.publish()
    }

    /// Open the character's dialogue. Ignored mid-dialogue or when the
    /// character has none.
    pub fn talk_to(&mut self, character_id: &str) -> Snapshot {
        info!("└─ action: talk_to(\"{character_id}\")");
        self.drop_stale_cursor();
        if self.state.in_dialogue() {
            warn!("talk_to(\"{character_id}\") ignored: already in a dialogue");
            return self.publish();
        }
        let Some(dialogue) = self
            .registry
            .character(character_id)
            .and_then(|c| c.dialogue.as_deref())
            .and_then(|id| self.registry.dialogue(id))
        else {
            warn!("talk_to(\"{character_id}\") ignored: no dialogue for that character");
            return self.publish();
        };

        let before = self.state.location.clone();
        let state = std::mem::take(&mut self.state);
        self.state = enter(state, dialogue, &self.registry, self.dice.as_mut());
        self.after_flow(&before);
        self.publish()
    }

    /// Take a visible choice at the current node.
    pub fn select_choice(&mut self, choice_id: &str) -> Snapshot {
        info!("└─ action: select_choice(\"{choice_id}\")");
        self.drop_stale_cursor();
        let Some((cursor, node)) = current_node(&self.state, &self.registry) else {
            warn!("select_choice(\"{choice_id}\") ignored: not in a dialogue");
            return self.publish();
        };
        let Some(choice) = node.choice(choice_id).filter(|_| cursor.offers(choice_id)) else {
            warn!("select_choice(\"{choice_id}\") ignored: no such visible choice");
            return self.publish();
        };

        let dice = self.dice.as_mut();
        let before = self.state.location.clone();
        let mut state = std::mem::take(&mut self.state);
        state = effects::apply_all(state, &choice.effects, &self.registry, dice);
        if !redirected_by(&choice.effects, &self.registry) {
            state = goto(state, choice.next.as_deref());
        }
        self.state = settle(state, &self.registry, dice);
        self.after_flow(&before);
        self.publish()
    }

    /// Move past a node that is waiting without choices.
    pub fn continue_dialogue(&mut self) -> Snapshot {
        info!("└─ action: continue_dialogue");
        self.drop_stale_cursor();
        let Some((cursor, node)) = current_node(&self.state, &self.registry) else {
            warn!("continue_dialogue ignored: not in a dialogue");
            return self.publish();
        };
        if !cursor.visible_choices.is_empty() {
            warn!("continue_dialogue ignored: node \"{}\" is waiting on a choice", node.id);
            return self.publish();
        }

        let dice = self.dice.as_mut();
        let before = self.state.location.clone();
        let state = std::mem::take(&mut self.state);
        let state = follow(state, node, &self.registry, dice);
        self.state = settle(state, &self.registry, dice);
        self.after_flow(&before);
        self.publish()
    }

    /// Pick up an item lying at the current location.
    pub fn take_item(&mut self, item_id: &str) -> Snapshot {
        info!("└─ action: take_item(\"{item_id}\")");
        let Some(item) = self.registry.item(item_id) else {
            warn!("take_item(\"{item_id}\") ignored: unknown item");
            return self.publish();
        };
        let here = self.state.item_locations.get(item_id) == Some(&self.state.location);
        if !here || !item.takeable {
            warn!("take_item(\"{item_id}\") ignored: not here or not takeable");
            return self.publish();
        }

        let state = std::mem::take(&mut self.state);
        let mut state = effects::apply(
            state,
            &Effect::AddItem(item.id.clone()),
            &self.registry,
            self.dice.as_mut(),
        );
        state.pending_notifications.push(Notification {
            kind: NotificationKind::Item,
            text: Text::from_content(&item.name),
        });
        self.state = state;
        self.publish()
    }

    /// Travel over the map. Costs `max(1, floor(distance / scale))` hours,
    /// brings the party along and ends any dialogue.
    pub fn travel_to(&mut self, location_id: &str) -> Snapshot {
        info!("└─ action: travel_to(\"{location_id}\")");
        if !self.state.map_enabled {
            warn!("travel_to(\"{location_id}\") ignored: map disabled");
            return self.publish();
        }
        if self.registry.location(location_id).is_none() {
            warn!("travel_to(\"{location_id}\") ignored: unknown location");
            return self.publish();
        }
        if self.state.location == location_id {
            return self.publish();
        }
        let Some(hours) = self
            .registry
            .map_between(&self.state.location, location_id)
            .and_then(|m| m.travel_hours(&self.state.location, location_id))
        else {
            warn!("travel_to(\"{location_id}\") ignored: no map connects it");
            return self.publish();
        };

        let mut journey = vec![
            Effect::EndDialogue,
            Effect::AdvanceTime { hours },
            Effect::ChangeLocation(location_id.to_string()),
        ];
        let mut party: Vec<&String> = self
            .state
            .characters
            .iter()
            .filter(|(_, c)| c.in_party)
            .map(|(id, _)| id)
            .collect();
        party.sort();
        journey.extend(party.into_iter().map(|id| Effect::SetCharacterLocation {
            character: id.clone(),
            location: location_id.to_string(),
        }));

        let dice = self.dice.as_mut();
        let state = std::mem::take(&mut self.state);
        let state = effects::apply_all(state, &journey, &self.registry, dice);
        self.state = check_triggers(state, &self.registry, dice);
        self.publish()
    }

    /// Append a player note stamped with the current day and hour.
    pub fn write_note(&mut self, text: &str) -> Snapshot {
        info!("└─ action: write_note");
        let text = text.trim();
        if text.is_empty() {
            warn!("write_note ignored: empty text");
            return self.publish();
        }
        let highest = self.state.notes.iter().map(|n| n.id).max().unwrap_or(0);
        let id = highest.max(self.state.last_note_id) + 1;
        self.state.last_note_id = id;
        self.state.notes.push(Note {
            id,
            text: text.to_string(),
            day: self.state.day,
            hour: self.state.hour,
        });
        self.publish()
    }

    pub fn delete_note(&mut self, note_id: u64) -> Snapshot {
        info!("└─ action: delete_note({note_id})");
        let before = self.state.notes.len();
        self.state.notes.retain(|n| n.id != note_id);
        if self.state.notes.len() == before {
            warn!("delete_note({note_id}) ignored: no such note");
        }
        self.publish()
    }

    /// Switch display language. Unknown locales are ignored.
    pub fn set_locale(&mut self, locale_id: &str) -> Snapshot {
        info!("└─ action: set_locale(\"{locale_id}\")");
        if self.registry.locale(locale_id).is_some() {
            self.locale = Some(locale_id.to_string());
        } else {
            warn!("set_locale(\"{locale_id}\") ignored: unknown locale");
        }
        self.publish()
    }

    pub fn save_game(&self) -> SaveEnvelope {
        info!("└─ action: save_game");
        SaveEnvelope::new(self.state.clone())
    }

    /// Restore a saved state verbatim. Envelopes from another format
    /// version are ignored.
    pub fn load_game(&mut self, envelope: &SaveEnvelope) -> Snapshot {
        info!("└─ action: load_game");
        match envelope.check_version() {
            Ok(()) => self.state = envelope.state.clone(),
            Err(e) => warn!("load_game ignored: {e}"),
        }
        self.publish()
    }

    /// The current view, without acting.
    pub fn snapshot(&mut self) -> Snapshot {
        self.publish()
    }

    /// Fire arrival triggers when a finished dialogue moved the player.
    fn after_flow(&mut self, location_before: &str) {
        if !self.state.in_dialogue() && self.state.location != location_before {
            let state = std::mem::take(&mut self.state);
            self.state = check_triggers(state, &self.registry, self.dice.as_mut());
        }
    }

    /// End a dialogue whose cursor points at a node the registry no
    /// longer has, e.g. after loading a save made against other content.
    fn drop_stale_cursor(&mut self) {
        let Some(cursor) = self.state.dialogue.as_ref() else {
            return;
        };
        if current_node(&self.state, &self.registry).is_none() {
            warn!(
                "dialogue \"{}\" has no node \"{}\"; ending it",
                cursor.dialogue_id, cursor.node_id
            );
            self.state.dialogue = None;
        }
    }

    fn publish(&mut self) -> Snapshot {
        let state = std::mem::take(&mut self.state);
        let locale = self
            .locale
            .as_deref()
            .and_then(|id| self.registry.locale(id));
        let (snapshot, state) = snapshot::build(state, &self.registry, locale);
        self.state = state;
        snapshot
    }
}

impl DialogueEngineBuilder {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Initial display language. Falls back to the registry default.
    pub fn locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_string());
        self
    }

    /// Load the content bundle from a RON file.
    pub fn content_ron(mut self, path: impl AsRef<Path>) -> Self {
        self.content_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Compile every `.dlg` script in a directory.
    pub fn dialogues_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.dialogues_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Provide content directly (for testing without files).
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Provide dice directly. Overrides `seed`.
    pub fn with_dice(mut self, dice: Box<dyn Dice>) -> Self {
        self.dice = Some(dice);
        self
    }

    pub fn build(self) -> Result<DialogueEngine, ContentError> {
        let mut registry = self.registry.unwrap_or_default();

        // A bundle file replaces the content but keeps compiled dialogues.
        if let Some(ref path) = self.content_path {
            let dialogues = std::mem::take(&mut registry.dialogues);
            registry = Registry::load_from_ron(path)?;
            registry.dialogues = dialogues;
        }

        if let Some(ref dir) = self.dialogues_dir {
            registry.load_dialogues_dir(dir)?;
        }

        let locale = self
            .locale
            .or_else(|| registry.default_locale.clone())
            .filter(|id| registry.locale(id).is_some());

        info!(
            "dialogue engine ready: {} locations, {} characters, {} dialogues",
            registry.locations.len(),
            registry.characters.len(),
            registry.dialogues.len()
        );

        let seed = self.seed;
        Ok(DialogueEngine {
            registry,
            state: WorldState::default(),
            locale,
            dice: self
                .dice
                .unwrap_or_else(|| Box::new(SeededDice::new(seed))),
        })
    }
}

/// The cursor and the node it points at.
fn current_node<'r>(state: &WorldState, registry: &'r Registry) -> Option<(DialogueCursor, &'r Node)> {
    let cursor = state.dialogue.clone()?;
    let node = registry
        .dialogue(&cursor.dialogue_id)
        .and_then(|d| d.node(&cursor.node_id))?;
    Some((cursor, node))
}

/// Put the cursor on a dialogue's start node and settle there.
fn enter(
    mut state: WorldState,
    dialogue: &Dialogue,
    registry: &Registry,
    dice: &mut dyn Dice,
) -> WorldState {
    info!("dialogue \"{}\" started", dialogue.id);
    state.dialogue = Some(DialogueCursor::at(&dialogue.id, &dialogue.start_node_id));
    settle(state, registry, dice)
}

/// True when applying `effects` started a dialogue or ended the current
/// one. A start naming an unknown dialogue changes nothing.
fn redirected_by(effects: &[Effect], registry: &Registry) -> bool {
    effects.iter().filter(|e| e.redirects_flow()).any(|e| match e {
        Effect::StartDialogue(id) => registry.dialogue(id).is_some(),
        _ => true,
    })
}

/// Move the cursor to `next`, or end the dialogue when there is none.
fn goto(mut state: WorldState, next: Option<&str>) -> WorldState {
    match next {
        Some(next) => {
            if let Some(cursor) = state.dialogue.as_mut() {
                cursor.node_id = next.to_string();
                cursor.visible_choices.clear();
            }
        }
        None => state.dialogue = None,
    }
    state
}

/// Resolve what follows `node`: the first passing branch, else `next`,
/// else the end.
fn follow(mut state: WorldState, node: &Node, registry: &Registry, dice: &mut dyn Dice) -> WorldState {
    for branch in &node.conditional_next {
        if conditions::evaluate(&branch.condition, &state, dice) {
            state = effects::apply_all(state, &branch.effects, registry, dice);
            if redirected_by(&branch.effects, registry) {
                return state;
            }
            return goto(state, branch.next.as_deref());
        }
    }
    goto(state, node.next.as_deref())
}

/// Enter the node under the cursor and keep going until something needs
/// the player: visible choices, text to read, or the end of the dialogue.
///
/// Choice conditions are evaluated here and nowhere else; the ids that
/// pass are pinned on the cursor for the snapshot and `select_choice`.
fn settle(mut state: WorldState, registry: &Registry, dice: &mut dyn Dice) -> WorldState {
    let mut steps = 0;
    loop {
        let Some(cursor) = state.dialogue.clone() else {
            info!("dialogue ended");
            return state;
        };
        let Some(node) = registry
            .dialogue(&cursor.dialogue_id)
            .and_then(|d| d.node(&cursor.node_id))
        else {
            warn!(
                "dialogue \"{}\" has no node \"{}\"; ending it",
                cursor.dialogue_id, cursor.node_id
            );
            state.dialogue = None;
            return state;
        };

        state = effects::apply_all(state, &node.effects, registry, dice);

        let redirected = redirected_by(&node.effects, registry);
        if !redirected {
            let visible: Vec<String> = node
                .choices
                .iter()
                .filter(|c| conditions::all_pass(&c.conditions, &state, dice))
                .map(|c| c.id.clone())
                .collect();
            if !visible.is_empty() || node.text.is_some() {
                if let Some(cursor) = state.dialogue.as_mut() {
                    cursor.visible_choices = visible;
                }
                return state;
            }
        }

        steps += 1;
        if steps >= MAX_SILENT_STEPS {
            warn!(
                "dialogue \"{}\" passed {MAX_SILENT_STEPS} nodes without pausing; ending it",
                cursor.dialogue_id
            );
            state.dialogue = None;
            return state;
        }
        if !redirected {
            state = follow(state, node, registry, dice);
        }
    }
}

/// Fire the first matching interlude, then, if idle, the first matching
/// dialogue for the current location.
fn check_triggers(mut state: WorldState, registry: &Registry, dice: &mut dyn Dice) -> WorldState {
    let location = state.location.clone();

    let interlude = registry.interludes.iter().find(|i| {
        i.trigger_location.as_deref() == Some(location.as_str())
            && conditions::all_pass(&i.conditions, &state, dice)
    });
    if let Some(interlude) = interlude {
        info!("interlude \"{}\" triggered at \"{location}\"", interlude.id);
        state = effects::apply_all(state, &interlude.effects, registry, dice);
        state.pending_interlude = Some(interlude.id.clone());
        if state.in_dialogue() && redirected_by(&interlude.effects, registry) {
            state = settle(state, registry, dice);
        }
    }

    if state.in_dialogue() {
        return state;
    }
    let dialogue = registry.dialogues.iter().find(|d| {
        d.trigger_location_id.as_deref() == Some(location.as_str())
            && conditions::all_pass(&d.conditions, &state, dice)
    });
    match dialogue {
        Some(dialogue) => enter(state, dialogue, registry, dice),
        None => state,
    }
}
