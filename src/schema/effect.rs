use serde::{Deserialize, Serialize};

use super::dialogue::Text;
use super::value::Value;

/// A state transition. Node effects run on entry, choice effects on
/// selection, branch and interlude effects when taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    SetFlag(String),
    ClearFlag(String),
    SetVariable { name: String, value: Value },
    /// Overwrites a non-numeric existing value with `amount`.
    AddVariable { name: String, amount: f64 },
    AddItem(String),
    RemoveItem(String),
    MoveItem { item: String, location: String },
    ChangeLocation(String),
    AdvanceTime { hours: u32 },
    SetQuestStage { quest: String, stage: String },
    UnlockJournal(String),
    StartDialogue(String),
    EndDialogue,
    SetCharacterLocation { character: String, location: String },
    SetCharacterParty { character: String, in_party: bool },
    SetRelationship { character: String, value: f64 },
    AddRelationship { character: String, amount: f64 },
    SetStat { character: String, stat: String, value: f64 },
    AddStat { character: String, stat: String, amount: f64 },
    EnableMap,
    DisableMap,
    /// Renderer-owned; never stored in world state.
    PlayMusic(String),
    PlaySound(String),
    PlayVideo(String),
    PlayInterlude(String),
    Notify(Text),
    RollDice { variable: String, min: i64, max: i64 },
}

impl Effect {
    /// True for effects that move or clear the dialogue cursor.
    pub fn redirects_flow(&self) -> bool {
        matches!(self, Self::StartDialogue(_) | Self::EndDialogue)
    }
}
