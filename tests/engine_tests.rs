/// Engine integration tests: full sessions over the fixture content.
use dialogue_engine::core::dice::FixedDice;
use dialogue_engine::core::engine::DialogueEngine;
use dialogue_engine::core::persist::{SaveEnvelope, SAVE_VERSION};
use dialogue_engine::schema::state::{GameConfig, NotificationKind};
use dialogue_engine::schema::value::Value;

fn build_engine(draws: &[i64]) -> DialogueEngine {
    DialogueEngine::builder()
        .content_ron("tests/fixtures/content.ron")
        .dialogues_dir("tests/fixtures/dialogues")
        .with_dice(Box::new(FixedDice::new(draws.to_vec())))
        .build()
        .unwrap()
}

fn config() -> GameConfig {
    let mut config = GameConfig::new("square");
    config
        .variables
        .insert("gold".to_string(), Value::Number(100.0));
    config
}

#[test]
fn toll_scenario_end_to_end() {
    let mut engine = build_engine(&[]);
    let start = engine.new_game(&config());
    assert_eq!((start.day, start.hour), (1, 8));
    assert!(start.dialogue.is_none());

    let arrived = engine.travel_to("gate");
    assert_eq!((arrived.day, arrived.hour), (1, 18));
    assert_eq!(arrived.location.as_ref().map(|l| l.name.as_str()), Some("North Gate"));

    // The arrival interlude and the gate dialogue fire together.
    assert_eq!(arrived.interlude.as_ref().map(|i| i.id.as_str()), Some("first_gate"));
    let view = arrived.dialogue.unwrap();
    assert_eq!(view.dialogue_id, "guard");
    assert_eq!(view.node_id, "start");
    assert_eq!(view.text.as_deref(), Some("Halt. The toll is five gold, traveller."));
    assert_eq!(view.speaker.as_ref().map(|s| s.name.as_str()), Some("Gate Guard"));
    let choices: Vec<&str> = view.choices.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(choices, vec!["pay", "leave"]);
    assert_eq!(view.choices[1].text, "Walk away");

    let paid = engine.select_choice("pay");
    let view = paid.dialogue.unwrap();
    assert_eq!(view.node_id, "after");
    assert_eq!(view.text.as_deref(), Some("Move along. You have 95 gold left."));
    assert_eq!(paid.variables.get("gold"), Some(&Value::Number(95.0)));
    assert_eq!(paid.sounds, vec!["gate_creak".to_string()]);
    assert_eq!(paid.notifications.len(), 1);
    assert_eq!(paid.notifications[0].text, "Quest complete: The Toll");
    assert!(paid.quests[0].completed);
    assert_eq!(paid.journal[0].id, "gate_rules");

    let done = engine.continue_dialogue();
    assert!(done.dialogue.is_none());
    assert!(done.sounds.is_empty());
    assert!(done.notifications.is_empty());
}

#[test]
fn party_travels_with_player() {
    let mut engine = build_engine(&[]);
    let start = engine.new_game(&config());
    assert_eq!(start.party.len(), 1);
    assert_eq!(start.characters_here.len(), 1);
    assert_eq!(start.characters_here[0].id, "mara");

    engine.travel_to("gate");
    let pip = &engine.state().characters["pip"];
    assert_eq!(pip.location.as_deref(), Some("gate"));
    let mara = &engine.state().characters["mara"];
    assert_eq!(mara.location.as_deref(), Some("square"));
}

#[test]
fn travel_no_ops() {
    let mut engine = build_engine(&[]);
    let start = engine.new_game(&config());

    // Same place, unknown place, place with no map marker.
    assert_eq!(engine.travel_to("square"), start);
    assert_eq!(engine.travel_to("atlantis"), start);
    assert_eq!(engine.travel_to("cellar"), start);

    let mut disabled = config();
    disabled.map_enabled = false;
    let start = engine.new_game(&disabled);
    assert_eq!(engine.travel_to("gate"), start);
}

#[test]
fn travel_rolls_over_midnight() {
    let mut engine = build_engine(&[]);
    let mut late = config();
    late.start_hour = 20;
    engine.new_game(&late);
    let arrived = engine.travel_to("gate");
    assert_eq!((arrived.day, arrived.hour), (2, 6));
}

#[test]
fn leaving_by_location_fires_arrival_triggers() {
    let mut engine = build_engine(&[]);
    engine.new_game(&config());
    engine.travel_to("gate");

    let left = engine.select_choice("leave");
    assert!(left.dialogue.is_none());
    assert_eq!(left.location.as_ref().map(|l| l.id.as_str()), Some("square"));

    // Coming back: the interlude has been seen, the guard still asks.
    let back = engine.travel_to("gate");
    assert!(back.interlude.is_none());
    assert_eq!(back.dialogue.map(|d| d.dialogue_id), Some("guard".to_string()));
}

#[test]
fn hidden_choices_cannot_be_selected() {
    let mut engine = build_engine(&[]);
    let mut poor = config();
    poor.variables.insert("gold".to_string(), Value::Number(3.0));
    engine.new_game(&poor);
    let arrived = engine.travel_to("gate");
    let choices: Vec<String> = arrived
        .dialogue
        .unwrap()
        .choices
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(choices, vec!["leave".to_string()]);

    let before = engine.snapshot();
    assert_eq!(engine.select_choice("pay"), before);
    assert_eq!(engine.select_choice("bluff"), before);
    assert_eq!(engine.select_choice("nonsense"), before);
    assert_eq!(engine.state().variable("gold"), Some(&Value::Number(3.0)));
}

#[test]
fn branch_fallthrough_order() {
    // No flag, no key: falls through both branches to `offer`.
    let mut engine = build_engine(&[]);
    engine.new_game(&config());
    let hello = engine.talk_to("mara");
    let view = hello.dialogue.unwrap();
    assert_eq!(view.node_id, "hello");
    assert!(view.can_continue);
    assert_eq!(view.music.as_deref(), Some("market"));
    assert_eq!(engine.continue_dialogue().dialogue.unwrap().node_id, "offer");

    // Both branches pass: the first one wins.
    let mut both = config();
    both.flags.push("paid_toll".to_string());
    both.inventory.push("key".to_string());
    engine.new_game(&both);
    engine.talk_to("mara");
    assert_eq!(engine.continue_dialogue().dialogue.unwrap().node_id, "gossip");

    // Only the second passes.
    let mut keyed = config();
    keyed.inventory.push("key".to_string());
    engine.new_game(&keyed);
    engine.talk_to("mara");
    assert_eq!(engine.continue_dialogue().dialogue.unwrap().node_id, "satisfied");
}

#[test]
fn continue_is_ignored_while_choices_are_visible() {
    let mut engine = build_engine(&[]);
    engine.new_game(&config());
    engine.talk_to("mara");
    let offer = engine.continue_dialogue();
    assert_eq!(engine.continue_dialogue(), offer);
}

#[test]
fn choice_effects_and_end() {
    let mut engine = build_engine(&[]);
    engine.new_game(&config());
    engine.talk_to("mara");
    engine.continue_dialogue();
    let taken = engine.select_choice("take");
    assert!(taken.dialogue.is_none());
    assert_eq!(taken.inventory.len(), 1);
    assert_eq!(taken.inventory[0].name, "Iron Key");
    assert!(taken.items_here.iter().all(|i| i.id != "lantern"));
    assert_eq!(
        engine.state().item_locations.get("lantern").map(String::as_str),
        Some("cellar")
    );
    assert_eq!(engine.state().characters["mara"].relationship, 1.0);
}

#[test]
fn dice_decide_silent_branches() {
    let mut engine = build_engine(&[5]);
    engine.new_game(&config());
    engine.talk_to("mara");
    engine.continue_dialogue();
    let lucky = engine.select_choice("roll");
    assert_eq!(lucky.dialogue.unwrap().node_id, "lucky");
    assert_eq!(lucky.variables.get("luck"), Some(&Value::Number(5.0)));
    assert_eq!(lucky.variables.get("gold"), Some(&Value::Number(101.0)));
    assert!(lucky.flags.contains(&"lucky".to_string()));

    let mut engine = build_engine(&[2]);
    engine.new_game(&config());
    engine.talk_to("mara");
    engine.continue_dialogue();
    let unlucky = engine.select_choice("roll");
    assert_eq!(unlucky.dialogue.unwrap().node_id, "unlucky");
    assert!(!unlucky.flags.contains(&"lucky".to_string()));
}

#[test]
fn take_item_rules() {
    let mut engine = build_engine(&[]);
    let start = engine.new_game(&config());
    let here: Vec<&str> = start.items_here.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(here, vec!["lantern", "fountain"]);

    let fixed = engine.snapshot();
    assert_eq!(engine.take_item("fountain"), fixed);
    assert_eq!(engine.take_item("key"), fixed);

    let taken = engine.take_item("lantern");
    assert_eq!(taken.inventory[0].id, "lantern");
    assert_eq!(taken.notifications.len(), 1);
    assert_eq!(taken.notifications[0].kind, NotificationKind::Item);
    assert_eq!(taken.notifications[0].text, "Lantern");

    // Taking twice changes nothing.
    let again = engine.take_item("lantern");
    assert_eq!(again.inventory.len(), 1);
    assert!(again.notifications.is_empty());
}

#[test]
fn notes_are_numbered_and_stamped() {
    let mut engine = build_engine(&[]);
    engine.new_game(&config());
    engine.write_note("Guard wants money");
    engine.travel_to("gate");
    let s = engine.write_note("  Mara sells lanterns  ");
    assert_eq!(s.notes.len(), 2);
    assert_eq!((s.notes[0].id, s.notes[0].hour), (1, 8));
    assert_eq!((s.notes[1].id, s.notes[1].hour), (2, 18));
    assert_eq!(s.notes[1].text, "Mara sells lanterns");

    let s = engine.delete_note(1);
    assert_eq!(s.notes.len(), 1);
    let s = engine.write_note("third");
    assert_eq!(s.notes[1].id, 3);
    assert_eq!(engine.write_note("   ").notes.len(), 2);

    // Deleting the newest note does not free its id.
    engine.delete_note(3);
    let s = engine.write_note("fourth");
    let ids: Vec<u64> = s.notes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![2, 4]);
}

#[test]
fn note_ids_survive_save_and_load() {
    let mut engine = build_engine(&[]);
    engine.new_game(&config());
    engine.write_note("one");
    engine.write_note("two");
    engine.delete_note(2);
    let json = engine.save_game().to_json().unwrap();

    engine.new_game(&config());
    engine.load_game(&SaveEnvelope::from_json(&json).unwrap());
    let s = engine.write_note("three");
    let ids: Vec<u64> = s.notes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[test]
fn locale_switching() {
    let mut engine = build_engine(&[]);
    let en = engine.new_game(&config());
    assert_eq!(en.locale.as_deref(), Some("en"));
    assert_eq!(en.location.unwrap().name, "Market Square");

    let de = engine.set_locale("de");
    assert_eq!(de.locale.as_deref(), Some("de"));
    assert_eq!(de.location.unwrap().name, "Marktplatz");

    // Keys missing from the active locale show raw.
    let gate = engine.travel_to("gate");
    assert_eq!(gate.location.unwrap().name, "Nordtor");
    let view = gate.dialogue.unwrap();
    assert_eq!(view.speaker.unwrap().name, "@char.guard");
    assert_eq!(view.text.as_deref(), Some("@guard.halt"));

    let kept = engine.set_locale("fr");
    assert_eq!(kept.locale.as_deref(), Some("de"));
}

#[test]
fn save_load_round_trip() {
    let mut engine = build_engine(&[]);
    engine.new_game(&config());
    engine.write_note("before the gate");
    let at_gate = engine.travel_to("gate");

    let envelope = engine.save_game();
    assert_eq!(envelope.version, SAVE_VERSION);
    let json = envelope.to_json().unwrap();

    engine.select_choice("pay");
    engine.continue_dialogue();

    let restored = SaveEnvelope::from_json(&json).unwrap();
    let loaded = engine.load_game(&restored);
    assert_eq!(engine.state(), &envelope.state);

    // Transients were reported on arrival, not saved.
    let mut expected = at_gate.clone();
    expected.interlude = None;
    expected.notifications.clear();
    expected.sounds.clear();
    expected.video = None;
    assert_eq!(loaded, expected);

    // The restored session plays on exactly as the original would have.
    let paid = engine.select_choice("pay");
    assert_eq!(paid.dialogue.unwrap().node_id, "after");
    assert_eq!(paid.variables.get("gold"), Some(&Value::Number(95.0)));
}

#[test]
fn foreign_save_version_is_ignored() {
    let mut engine = build_engine(&[]);
    engine.new_game(&config());
    let mut envelope = engine.save_game();
    envelope.version = SAVE_VERSION + 1;
    envelope.state.location = "gate".to_string();

    let snapshot = engine.load_game(&envelope);
    assert_eq!(snapshot.location.map(|l| l.id), Some("square".to_string()));
}

#[test]
fn fresh_game_resets_everything() {
    let mut engine = build_engine(&[]);
    engine.new_game(&config());
    engine.travel_to("gate");
    engine.select_choice("pay");

    let fresh = engine.new_game(&config());
    assert!(fresh.dialogue.is_none());
    assert!(fresh.quests.is_empty());
    assert!(fresh.journal.is_empty());
    assert_eq!(fresh.variables.get("gold"), Some(&Value::Number(100.0)));
}
