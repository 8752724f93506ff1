/// Condition evaluator: boolean predicates over world state.
use crate::core::dice::Dice;
use crate::schema::condition::Condition;
use crate::schema::state::WorldState;
use crate::schema::value::Value;

/// Evaluate a single condition. Only `DiceRoll` touches `dice`; nothing
/// here mutates world state.
pub fn evaluate(condition: &Condition, state: &WorldState, dice: &mut dyn Dice) -> bool {
    match condition {
        Condition::HasFlag(flag) => state.flags.contains(flag),
        Condition::NotFlag(flag) => !state.flags.contains(flag),
        Condition::HasItem(item) => state.has_item(item),
        Condition::NotItem(item) => !state.has_item(item),
        Condition::VariableEquals { name, value } => match (state.variable(name), value) {
            (Some(Value::Number(a)), Value::Number(b)) => a == b,
            (Some(Value::Text(a)), Value::Text(b)) => a == b,
            _ => false,
        },
        Condition::VariableGreaterThan { name, value } => {
            numeric(state, name).is_some_and(|n| n > *value)
        }
        Condition::VariableLessThan { name, value } => {
            numeric(state, name).is_some_and(|n| n < *value)
        }
        Condition::AtLocation(location) => state.location == *location,
        Condition::QuestAtStage { quest, stage } => {
            state.quests.get(quest).is_some_and(|s| s == stage)
        }
        Condition::CharacterAt {
            character,
            location,
        } => state
            .characters
            .get(character)
            .and_then(|c| c.location.as_ref())
            .is_some_and(|l| l == location),
        Condition::CharacterInParty(character) => {
            state.characters.get(character).is_some_and(|c| c.in_party)
        }
        Condition::RelationshipAbove { character, value } => state
            .characters
            .get(character)
            .is_some_and(|c| c.relationship > *value),
        Condition::RelationshipBelow { character, value } => state
            .characters
            .get(character)
            .is_some_and(|c| c.relationship < *value),
        Condition::TimeBetween { start, end } => hour_in_window(state.hour, *start, *end),
        Condition::ItemAt { item, location } => {
            state.item_locations.get(item).is_some_and(|l| l == location)
        }
        Condition::DiceRoll {
            min,
            max,
            threshold,
        } => dice.roll(*min, *max) >= *threshold,
    }
}

/// True when every condition passes. An empty list passes.
pub fn all_pass(conditions: &[Condition], state: &WorldState, dice: &mut dyn Dice) -> bool {
    conditions.iter().all(|c| evaluate(c, state, dice))
}

fn numeric(state: &WorldState, name: &str) -> Option<f64> {
    state.variable(name).and_then(Value::as_number)
}

fn hour_in_window(hour: u32, start: u32, end: u32) -> bool {
    if start <= end {
        start <= hour && hour < end
    } else {
        hour >= start || hour < end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dice::FixedDice;
    use crate::schema::state::CharacterState;

    fn state() -> WorldState {
        let mut state = WorldState {
            location: "square".to_string(),
            day: 1,
            hour: 8,
            ..WorldState::default()
        };
        state.flags.insert("met_mara".to_string());
        state.inventory.push("lantern".to_string());
        state.variables.insert("gold".to_string(), Value::Number(100.0));
        state.variables.insert("title".to_string(), Value::from("squire"));
        state.quests.insert("toll".to_string(), "asked".to_string());
        state.characters.insert(
            "mara".to_string(),
            CharacterState {
                location: Some("square".to_string()),
                in_party: true,
                relationship: 5.0,
                ..CharacterState::default()
            },
        );
        state.item_locations.insert("statue".to_string(), "square".to_string());
        state
    }

    fn check(condition: Condition) -> bool {
        evaluate(&condition, &state(), &mut FixedDice::default())
    }

    #[test]
    fn flags_and_items() {
        assert!(check(Condition::HasFlag("met_mara".to_string())));
        assert!(!check(Condition::NotFlag("met_mara".to_string())));
        assert!(check(Condition::NotFlag("other".to_string())));
        assert!(check(Condition::HasItem("lantern".to_string())));
        assert!(check(Condition::NotItem("key".to_string())));
        assert!(!check(Condition::HasItem("key".to_string())));
    }

    #[test]
    fn variable_equality_respects_type() {
        assert!(check(Condition::VariableEquals {
            name: "gold".to_string(),
            value: Value::Number(100.0),
        }));
        assert!(check(Condition::VariableEquals {
            name: "title".to_string(),
            value: Value::from("squire"),
        }));
        assert!(!check(Condition::VariableEquals {
            name: "gold".to_string(),
            value: Value::from("100"),
        }));
        assert!(!check(Condition::VariableEquals {
            name: "unset".to_string(),
            value: Value::Number(0.0),
        }));
    }

    #[test]
    fn numeric_comparisons_are_strict() {
        let gt = |v: f64| {
            check(Condition::VariableGreaterThan {
                name: "gold".to_string(),
                value: v,
            })
        };
        let lt = |v: f64| {
            check(Condition::VariableLessThan {
                name: "gold".to_string(),
                value: v,
            })
        };
        assert!(gt(99.0));
        assert!(!gt(100.0));
        assert!(lt(101.0));
        assert!(!lt(100.0));
        assert!(!check(Condition::VariableGreaterThan {
            name: "title".to_string(),
            value: -1.0,
        }));
    }

    #[test]
    fn quest_without_progress_never_matches() {
        assert!(check(Condition::QuestAtStage {
            quest: "toll".to_string(),
            stage: "asked".to_string(),
        }));
        assert!(!check(Condition::QuestAtStage {
            quest: "missing".to_string(),
            stage: "asked".to_string(),
        }));
    }

    #[test]
    fn characters_and_relationships() {
        assert!(check(Condition::CharacterAt {
            character: "mara".to_string(),
            location: "square".to_string(),
        }));
        assert!(check(Condition::CharacterInParty("mara".to_string())));
        assert!(!check(Condition::CharacterInParty("bram".to_string())));
        assert!(check(Condition::RelationshipAbove {
            character: "mara".to_string(),
            value: 4.0,
        }));
        assert!(!check(Condition::RelationshipAbove {
            character: "mara".to_string(),
            value: 5.0,
        }));
        assert!(!check(Condition::RelationshipBelow {
            character: "mara".to_string(),
            value: 5.0,
        }));
    }

    #[test]
    fn time_window_wraps_midnight() {
        assert!(hour_in_window(8, 8, 12));
        assert!(!hour_in_window(12, 8, 12));
        assert!(hour_in_window(23, 22, 4));
        assert!(hour_in_window(0, 22, 4));
        assert!(hour_in_window(22, 22, 4));
        assert!(!hour_in_window(4, 22, 4));
        assert!(!hour_in_window(12, 22, 4));
        assert!(check(Condition::TimeBetween { start: 6, end: 9 }));
    }

    #[test]
    fn location_and_item_placement() {
        assert!(check(Condition::AtLocation("square".to_string())));
        assert!(!check(Condition::AtLocation("gate".to_string())));
        assert!(check(Condition::ItemAt {
            item: "statue".to_string(),
            location: "square".to_string(),
        }));
        assert!(!check(Condition::ItemAt {
            item: "lantern".to_string(),
            location: "square".to_string(),
        }));
    }

    #[test]
    fn dice_roll_compares_against_threshold_without_state_change() {
        let before = state();
        let mut dice = FixedDice::new([12, 9]);
        let roll = Condition::DiceRoll {
            min: 1,
            max: 20,
            threshold: 10,
        };
        assert!(evaluate(&roll, &before, &mut dice));
        assert!(!evaluate(&roll, &before, &mut dice));
        assert_eq!(before, state());
    }

    #[test]
    fn all_pass_is_conjunction() {
        let mut dice = FixedDice::default();
        let s = state();
        assert!(all_pass(&[], &s, &mut dice));
        assert!(all_pass(
            &[
                Condition::HasFlag("met_mara".to_string()),
                Condition::AtLocation("square".to_string()),
            ],
            &s,
            &mut dice
        ));
        assert!(!all_pass(
            &[
                Condition::HasFlag("met_mara".to_string()),
                Condition::AtLocation("gate".to_string()),
            ],
            &s,
            &mut dice
        ));
    }
}
