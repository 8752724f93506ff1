pub mod conditions;
pub mod dice;
pub mod effects;
pub mod engine;
pub mod persist;
pub mod script;
pub mod snapshot;
pub mod text;
