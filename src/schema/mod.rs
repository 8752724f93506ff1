pub mod condition;
pub mod content;
pub mod dialogue;
pub mod effect;
pub mod state;
pub mod value;
