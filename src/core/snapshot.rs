/// Snapshot builder: the renderer's read-only view of one moment.
///
/// `build` consumes the world state and hands it back with the transient
/// fields drained, so a queued sound or notification is reported exactly
/// once.
use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::text::TextResolver;
use crate::schema::content::{Locale, Registry};
use crate::schema::effect::Effect;
use crate::schema::state::{NotificationKind, WorldState};
use crate::schema::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub background: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakerView {
    pub id: String,
    pub name: String,
    pub portrait: Option<String>,
    pub voice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceView {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DialogueView {
    pub dialogue_id: String,
    pub node_id: String,
    /// `None` for narration.
    pub speaker: Option<SpeakerView>,
    pub text: Option<String>,
    /// Only the choices whose conditions passed when the node settled.
    pub choices: Vec<ChoiceView>,
    /// True when the node waits for `continue_dialogue`.
    pub can_continue: bool,
    /// Last music cue among the node's effects.
    pub music: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub portrait: Option<String>,
    pub relationship: f64,
    pub has_dialogue: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub takeable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestView {
    pub id: String,
    pub name: String,
    pub stage_id: String,
    pub stage_text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalView {
    pub id: String,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteView {
    pub id: u64,
    pub text: String,
    pub day: u32,
    pub hour: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerView {
    pub location_id: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub id: String,
    pub name: String,
    pub markers: Vec<MarkerView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationView {
    pub kind: NotificationKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterludeView {
    pub id: String,
    pub title: String,
    pub text: String,
    pub image: Option<String>,
}

/// Everything a renderer needs. Collections come out in a fixed order
/// (registry order or sorted) so equal states give equal snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub locale: Option<String>,
    pub day: u32,
    pub hour: u32,
    pub location: Option<LocationView>,
    pub dialogue: Option<DialogueView>,
    pub characters_here: Vec<CharacterView>,
    pub party: Vec<CharacterView>,
    pub inventory: Vec<ItemView>,
    pub items_here: Vec<ItemView>,
    pub quests: Vec<QuestView>,
    pub journal: Vec<JournalView>,
    pub notes: Vec<NoteView>,
    pub map: Option<MapView>,
    pub map_enabled: bool,
    pub flags: Vec<String>,
    pub variables: BTreeMap<String, Value>,
    pub notifications: Vec<NotificationView>,
    pub sounds: Vec<String>,
    pub video: Option<String>,
    pub interlude: Option<InterludeView>,
}

/// Build the snapshot for `state` and return the state with its
/// transient fields cleared. Depends on nothing but its arguments.
pub fn build(
    mut state: WorldState,
    registry: &Registry,
    locale: Option<&Locale>,
) -> (Snapshot, WorldState) {
    let snapshot = {
        let resolve = TextResolver::new(locale, &state.variables);

        let location = registry.location(&state.location).map(|l| LocationView {
            id: l.id.clone(),
            name: resolve.content(&l.name),
            description: resolve.content(&l.description),
            background: l.background.clone(),
        });

        let dialogue = dialogue_view(&state, registry, &resolve);

        let mut characters_here = Vec::new();
        let mut party = Vec::new();
        for character in &registry.characters {
            let Some(cs) = state.characters.get(&character.id) else {
                continue;
            };
            let view = CharacterView {
                id: character.id.clone(),
                name: resolve.content(&character.name),
                description: resolve.content(&character.description),
                portrait: character.portrait.clone(),
                relationship: cs.relationship,
                has_dialogue: character.dialogue.is_some(),
            };
            if cs.in_party {
                party.push(view);
            } else if cs.location.as_deref() == Some(state.location.as_str()) {
                characters_here.push(view);
            }
        }

        let item_view = |id: &str| {
            registry.item(id).map(|item| ItemView {
                id: item.id.clone(),
                name: resolve.content(&item.name),
                description: resolve.content(&item.description),
                icon: item.icon.clone(),
                takeable: item.takeable,
            })
        };
        let inventory = state
            .inventory
            .iter()
            .filter_map(|id| item_view(id.as_str()))
            .collect();
        let items_here = registry
            .items
            .iter()
            .filter(|item| {
                state.item_locations.get(&item.id).map(String::as_str)
                    == Some(state.location.as_str())
            })
            .filter_map(|item| item_view(item.id.as_str()))
            .collect();

        let quests = registry
            .quests
            .iter()
            .filter_map(|quest| {
                let stage_id = state.quests.get(&quest.id)?;
                let stage = quest.stage(stage_id);
                Some(QuestView {
                    id: quest.id.clone(),
                    name: resolve.content(&quest.name),
                    stage_id: stage_id.clone(),
                    stage_text: stage.map(|s| resolve.content(&s.text)).unwrap_or_default(),
                    completed: stage.is_some_and(|s| s.completes),
                })
            })
            .collect();

        let journal = state
            .journal
            .iter()
            .filter_map(|id| registry.journal_entry(id))
            .map(|entry| JournalView {
                id: entry.id.clone(),
                title: resolve.content(&entry.title),
                text: resolve.content(&entry.text),
            })
            .collect();

        let notes = state
            .notes
            .iter()
            .map(|n| NoteView {
                id: n.id,
                text: n.text.clone(),
                day: n.day,
                hour: n.hour,
            })
            .collect();

        let map = registry.map_for(&state.location).map(|m| MapView {
            id: m.id.clone(),
            name: resolve.content(&m.name),
            markers: m
                .markers
                .iter()
                .map(|marker| MarkerView {
                    location_id: marker.location.clone(),
                    label: registry
                        .location(&marker.location)
                        .map(|l| resolve.content(&l.name))
                        .unwrap_or_else(|| marker.location.clone()),
                    x: marker.x,
                    y: marker.y,
                    current: marker.location == state.location,
                })
                .collect(),
        });

        let mut flags: Vec<String> = state.flags.iter().cloned().collect();
        flags.sort();

        let notifications = state
            .pending_notifications
            .iter()
            .map(|n| NotificationView {
                kind: n.kind,
                text: resolve.text(&n.text),
            })
            .collect();

        let interlude = state.pending_interlude.as_deref().map(|id| {
            match registry.interlude(id) {
                Some(i) => InterludeView {
                    id: i.id.clone(),
                    title: resolve.content(&i.title),
                    text: resolve.content(&i.text),
                    image: i.image.clone(),
                },
                None => InterludeView {
                    id: id.to_string(),
                    title: String::new(),
                    text: String::new(),
                    image: None,
                },
            }
        });

        Snapshot {
            locale: locale.map(|l| l.id.clone()),
            day: state.day,
            hour: state.hour,
            location,
            dialogue,
            characters_here,
            party,
            inventory,
            items_here,
            quests,
            journal,
            notes,
            map,
            map_enabled: state.map_enabled,
            flags,
            variables: state
                .variables
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            notifications,
            sounds: state.pending_sounds.clone(),
            video: state.pending_video.clone(),
            interlude,
        }
    };

    state.clear_transients();
    (snapshot, state)
}

fn dialogue_view(
    state: &WorldState,
    registry: &Registry,
    resolve: &TextResolver<'_>,
) -> Option<DialogueView> {
    let cursor = state.dialogue.as_ref()?;
    let node = registry
        .dialogue(&cursor.dialogue_id)
        .and_then(|d| d.node(&cursor.node_id))?;

    let speaker = node.speaker.as_deref().map(|id| {
        let character = registry.character(id);
        SpeakerView {
            id: id.to_string(),
            name: character
                .map(|c| resolve.content(&c.name))
                .unwrap_or_else(|| id.to_string()),
            portrait: node
                .portrait
                .clone()
                .or_else(|| character.and_then(|c| c.portrait.clone())),
            voice: node
                .voice
                .clone()
                .or_else(|| character.and_then(|c| c.voice.clone())),
        }
    });

    let choices: Vec<ChoiceView> = node
        .choices
        .iter()
        .filter(|c| cursor.offers(&c.id))
        .map(|c| ChoiceView {
            id: c.id.clone(),
            text: resolve.text(&c.text),
        })
        .collect();

    let music = node.effects.iter().rev().find_map(|e| match e {
        Effect::PlayMusic(track) => Some(track.clone()),
        _ => None,
    });

    Some(DialogueView {
        dialogue_id: cursor.dialogue_id.clone(),
        node_id: cursor.node_id.clone(),
        speaker,
        text: node.text.as_ref().map(|t| resolve.text(t)),
        can_continue: choices.is_empty(),
        choices,
        music,
    })
}
