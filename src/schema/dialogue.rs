use serde::{Deserialize, Serialize};

use super::condition::Condition;
use super::effect::Effect;

/// Display text as authored: either literal text or a key into the
/// active locale's string table. Both forms may carry `{variable}`
/// placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Text {
    Literal(String),
    Key(String),
}

impl Text {
    /// Interpret a content string: a leading `@` marks a localization key.
    pub fn from_content(raw: &str) -> Self {
        match raw.strip_prefix('@') {
            Some(key) if !key.is_empty() => Self::Key(key.to_string()),
            _ => Self::Literal(raw.to_string()),
        }
    }
}

/// A player-selectable branch out of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub text: Text,
    pub conditions: Vec<Condition>,
    pub effects: Vec<Effect>,
    /// Absent only when an effect ends or redirects the dialogue.
    pub next: Option<String>,
}

/// One entry of a node's conditional-next list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub condition: Condition,
    pub effects: Vec<Effect>,
    pub next: Option<String>,
}

/// One beat of a dialogue graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    /// Lowercased character id; `None` is the narrator.
    pub speaker: Option<String>,
    pub text: Option<Text>,
    pub voice: Option<String>,
    pub portrait: Option<String>,
    pub effects: Vec<Effect>,
    pub choices: Vec<Choice>,
    pub next: Option<String>,
    pub conditional_next: Vec<Branch>,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            speaker: None,
            text: None,
            voice: None,
            portrait: None,
            effects: Vec::new(),
            choices: Vec::new(),
            next: None,
            conditional_next: Vec::new(),
        }
    }

    /// Silent nodes are passed through without pausing.
    pub fn is_silent(&self) -> bool {
        self.text.is_none() && self.choices.is_empty()
    }

    pub fn choice(&self, id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == id)
    }
}

/// A compiled dialogue script. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialogue {
    pub id: String,
    pub start_node_id: String,
    pub nodes: Vec<Node>,
    pub trigger_location_id: Option<String>,
    pub conditions: Vec<Condition>,
}

impl Dialogue {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn start_node(&self) -> Option<&Node> {
        self.node(&self.start_node_id)
    }
}
