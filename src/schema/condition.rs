use serde::{Deserialize, Serialize};

use super::value::Value;

/// A predicate over world state. Used to gate choices, conditional
/// branches, dialogue triggers and interludes.
///
/// The vocabulary is closed: a new kind of check means a new variant here
/// and one arm in `core::conditions::evaluate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    HasFlag(String),
    NotFlag(String),
    HasItem(String),
    NotItem(String),
    VariableEquals { name: String, value: Value },
    VariableGreaterThan { name: String, value: f64 },
    VariableLessThan { name: String, value: f64 },
    AtLocation(String),
    QuestAtStage { quest: String, stage: String },
    CharacterAt { character: String, location: String },
    CharacterInParty(String),
    RelationshipAbove { character: String, value: f64 },
    RelationshipBelow { character: String, value: f64 },
    /// Inclusive start, exclusive end. Wraps past midnight when
    /// `start > end`.
    TimeBetween { start: u32, end: u32 },
    ItemAt { item: String, location: String },
    /// Draws uniformly in `[min, max]`; passes when the draw reaches
    /// `threshold`. The draw is not stored.
    DiceRoll { min: i64, max: i64, threshold: i64 },
}

impl Condition {
    /// The script keyword that introduces this condition after
    /// `REQUIRE` or `IF`.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::HasFlag(_) => "hasFlag",
            Self::NotFlag(_) => "notFlag",
            Self::HasItem(_) => "hasItem",
            Self::NotItem(_) => "notItem",
            Self::VariableEquals { .. } => "variableEquals",
            Self::VariableGreaterThan { .. } => "variableGreaterThan",
            Self::VariableLessThan { .. } => "variableLessThan",
            Self::AtLocation(_) => "atLocation",
            Self::QuestAtStage { .. } => "questAtStage",
            Self::CharacterAt { .. } => "characterAt",
            Self::CharacterInParty(_) => "characterInParty",
            Self::RelationshipAbove { .. } => "relationshipAbove",
            Self::RelationshipBelow { .. } => "relationshipBelow",
            Self::TimeBetween { .. } => "timeBetween",
            Self::ItemAt { .. } => "itemAt",
            Self::DiceRoll { .. } => "diceRoll",
        }
    }
}
