/// Effect applier: world-state transitions.
///
/// Every function takes the state by value and hands back the next state.
/// Unknown ids are logged and leave the state untouched; catching them is
/// the content validator's job, not the player's problem.
use log::{debug, warn};

use crate::core::dice::Dice;
use crate::schema::content::Registry;
use crate::schema::effect::Effect;
use crate::schema::state::{CharacterState, DialogueCursor, Notification, NotificationKind, WorldState};
use crate::schema::value::Value;

/// Apply a single effect.
pub fn apply(
    mut state: WorldState,
    effect: &Effect,
    registry: &Registry,
    dice: &mut dyn Dice,
) -> WorldState {
    debug!("└─ effect: {effect:?}");
    match effect {
        Effect::SetFlag(flag) => {
            state.flags.insert(flag.clone());
        }
        Effect::ClearFlag(flag) => {
            state.flags.remove(flag);
        }
        Effect::SetVariable { name, value } => {
            state.variables.insert(name.clone(), value.clone());
        }
        Effect::AddVariable { name, amount } => {
            let next = match state.variables.get(name) {
                Some(Value::Number(n)) => n + amount,
                _ => *amount,
            };
            state.variables.insert(name.clone(), Value::Number(next));
        }
        Effect::AddItem(item) => {
            if !state.has_item(item) {
                state.inventory.push(item.clone());
            }
            state.item_locations.remove(item);
        }
        Effect::RemoveItem(item) => {
            state.inventory.retain(|i| i != item);
        }
        Effect::MoveItem { item, location } => {
            state.inventory.retain(|i| i != item);
            state.item_locations.insert(item.clone(), location.clone());
        }
        Effect::ChangeLocation(location) => {
            state.location = location.clone();
        }
        Effect::AdvanceTime { hours } => {
            let total = u64::from(state.day) * 24 + u64::from(state.hour) + u64::from(*hours);
            state.day = (total / 24) as u32;
            state.hour = (total % 24) as u32;
        }
        Effect::SetQuestStage { quest, stage } => {
            state.quests.insert(quest.clone(), stage.clone());
        }
        Effect::UnlockJournal(entry) => {
            if !state.journal.contains(entry) {
                state.journal.push(entry.clone());
            }
        }
        Effect::StartDialogue(id) => match registry.dialogue(id) {
            Some(dialogue) => {
                state.dialogue = Some(DialogueCursor::at(&dialogue.id, &dialogue.start_node_id));
            }
            None => warn!("StartDialogue(\"{id}\"): no such dialogue"),
        },
        Effect::EndDialogue => {
            state.dialogue = None;
        }
        Effect::SetCharacterLocation {
            character,
            location,
        } => {
            with_character(&mut state, character, |c| c.location = Some(location.clone()));
        }
        Effect::SetCharacterParty {
            character,
            in_party,
        } => {
            with_character(&mut state, character, |c| c.in_party = *in_party);
        }
        Effect::SetRelationship { character, value } => {
            with_character(&mut state, character, |c| c.relationship = *value);
        }
        Effect::AddRelationship { character, amount } => {
            with_character(&mut state, character, |c| c.relationship += amount);
        }
        Effect::SetStat {
            character,
            stat,
            value,
        } => {
            with_character(&mut state, character, |c| {
                c.stats.insert(stat.clone(), *value);
            });
        }
        Effect::AddStat {
            character,
            stat,
            amount,
        } => {
            with_character(&mut state, character, |c| {
                *c.stats.entry(stat.clone()).or_insert(0.0) += amount;
            });
        }
        Effect::EnableMap => state.map_enabled = true,
        Effect::DisableMap => state.map_enabled = false,
        // Surfaced by the snapshot from the current node, not stored.
        Effect::PlayMusic(_) => {}
        Effect::PlaySound(sound) => state.pending_sounds.push(sound.clone()),
        Effect::PlayVideo(video) => state.pending_video = Some(video.clone()),
        Effect::PlayInterlude(interlude) => state.pending_interlude = Some(interlude.clone()),
        Effect::Notify(text) => state.pending_notifications.push(Notification {
            kind: NotificationKind::Info,
            text: text.clone(),
        }),
        Effect::RollDice { variable, min, max } => {
            let draw = dice.roll(*min, *max);
            debug!("   rolled {draw} into \"{variable}\"");
            state.variables.insert(variable.clone(), Value::from(draw));
        }
    }
    state
}

/// Apply effects left to right; each sees the result of the previous one.
pub fn apply_all(
    state: WorldState,
    effects: &[Effect],
    registry: &Registry,
    dice: &mut dyn Dice,
) -> WorldState {
    effects
        .iter()
        .fold(state, |state, effect| apply(state, effect, registry, dice))
}

fn with_character<F>(state: &mut WorldState, id: &str, update: F)
where
    F: FnOnce(&mut CharacterState),
{
    match state.characters.get_mut(id) {
        Some(character) => update(character),
        None => warn!("character effect on unknown character \"{id}\""),
    }
}
