/// Script compilation and content loading integration tests.
use dialogue_engine::core::script::{parse_dialogue, ScriptError};
use dialogue_engine::schema::condition::Condition;
use dialogue_engine::schema::content::{ContentError, Registry};
use dialogue_engine::schema::dialogue::Text;
use dialogue_engine::schema::effect::Effect;
use std::path::Path;

#[test]
fn fixture_scripts_compile() {
    let mut registry = Registry::default();
    registry
        .load_dialogues_dir(Path::new("tests/fixtures/dialogues"))
        .unwrap();
    assert_eq!(registry.dialogues.len(), 2);

    let guard = registry.dialogue("guard").unwrap();
    assert_eq!(guard.trigger_location_id.as_deref(), Some("gate"));
    assert_eq!(guard.conditions, vec![Condition::NotFlag("paid_toll".to_string())]);
    assert_eq!(guard.start_node_id, "start");

    let start = guard.start_node().unwrap();
    assert_eq!(start.speaker.as_deref(), Some("guard"));
    assert_eq!(start.text, Some(Text::Key("guard.halt".to_string())));
    assert_eq!(start.choices.len(), 3);
    assert_eq!(
        start.choices[0].text,
        Text::Literal("Pay the toll (5 gold)".to_string())
    );
    assert_eq!(
        start.choices[2].effects,
        vec![Effect::ChangeLocation("square".to_string()), Effect::EndDialogue]
    );

    let mara = registry.dialogue("mara").unwrap();
    assert_eq!(mara.start_node_id, "hello");
    let hello = mara.start_node().unwrap();
    assert_eq!(hello.conditional_next.len(), 2);
    assert_eq!(hello.next.as_deref(), Some("offer"));
    let offer = mara.node("offer").unwrap();
    assert_eq!(
        offer.text,
        Some(Text::Literal("Take one, it's on the house.".to_string()))
    );
    assert!(mara.node("luck").unwrap().is_silent());
}

#[test]
fn content_bundle_loads() {
    let registry = Registry::load_from_ron(Path::new("tests/fixtures/content.ron")).unwrap();
    assert_eq!(registry.locations.len(), 3);
    assert_eq!(registry.locales.len(), 2);
    assert_eq!(registry.interludes[0].conditions, vec![Condition::NotFlag("seen_gate".to_string())]);
    assert!(registry.character("Guard").is_some());
}

#[test]
fn broken_script_names_file_and_line() {
    let dir = std::env::temp_dir().join(format!("dialogue_engine_scripts_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("ok.dlg"), "NODE a\nNARRATOR: Fine.\n").unwrap();
    std::fs::write(dir.join("broken.dlg"), "NODE a\nNARRATOR: Fine.\nCHOICE go\n").unwrap();
    std::fs::write(dir.join("notes.txt"), "not a script").unwrap();

    let mut registry = Registry::default();
    let err = registry.load_dialogues_dir(&dir).unwrap_err();
    std::fs::remove_dir_all(&dir).unwrap();

    match err {
        ContentError::Script { file, source } => {
            assert!(file.ends_with("broken.dlg"));
            assert_eq!(source.line(), Some(3));
        }
        other => panic!("expected a script error, got {other}"),
    }
}

#[test]
fn syntax_error_display() {
    let err = parse_dialogue("d", "NODE a\nGUARD: Halt: who goes there").unwrap_err();
    assert_eq!(
        err,
        ScriptError::Syntax {
            line: 2,
            message: "text containing ':' must be quoted".to_string(),
            source_line: "GUARD: Halt: who goes there".to_string(),
        }
    );
}

#[test]
fn whole_unit_fails_on_one_bad_line() {
    let source = "NODE a\nNARRATOR: One.\nGOTO b\nNODE b\nNARRATOR: Two.\nADVANCE time soon\n";
    assert_eq!(parse_dialogue("d", source).unwrap_err().line(), Some(6));
}

#[test]
fn later_script_replaces_earlier_one() {
    let mut registry = Registry::default();
    registry.add_script("d", "NODE first\nNARRATOR: One.").unwrap();
    registry.add_script("d", "NODE second\nNARRATOR: Two.").unwrap();
    assert_eq!(registry.dialogues.len(), 1);
    assert_eq!(registry.dialogue("d").unwrap().start_node_id, "second");
}
