/// Tavern example: a short scripted playthrough of the inn content.
///
/// Talk to the innkeeper, take the rat quest, grab a candle, go down to the
/// cellar and try your luck. Prints each snapshot as the renderer would
/// see it.
///
/// Run with: cargo run --example tavern
use dialogue_engine::core::engine::DialogueEngine;
use dialogue_engine::core::snapshot::Snapshot;
use dialogue_engine::schema::content::Registry;
use dialogue_engine::schema::state::GameConfig;
use dialogue_engine::schema::value::Value;

const CONTENT: &str = include_str!("../content/tavern/content.ron");
const INNKEEPER: &str = include_str!("../content/tavern/innkeeper.dlg");
const CELLAR: &str = include_str!("../content/tavern/cellar.dlg");

fn main() {
    let mut registry = Registry::parse_ron(CONTENT).expect("Failed to parse tavern content");
    registry
        .add_script("innkeeper", INNKEEPER)
        .expect("Failed to compile innkeeper script");
    registry
        .add_script("cellar", CELLAR)
        .expect("Failed to compile cellar script");

    let mut engine = DialogueEngine::builder()
        .seed(2026)
        .with_registry(registry)
        .build()
        .expect("Failed to build engine");

    let mut config = GameConfig::new("common_room");
    config.start_hour = 19;
    config
        .variables
        .insert("name".to_string(), Value::from("traveller"));

    println!("=== The Crooked Lantern ===\n");

    show("new game", &engine.new_game(&config));
    show("talk to Hobb", &engine.talk_to("hobb"));
    show("continue", &engine.continue_dialogue());
    show("offer help", &engine.select_choice("help"));
    show("continue", &engine.continue_dialogue());
    show("take the candle", &engine.take_item("candle"));
    show("write a note", &engine.write_note("Third step creaks."));

    let below = engine.travel_to("cellar");
    show("go to the cellar", &below);
    if below.dialogue.is_some() {
        show("stamp and shout", &engine.select_choice("fight"));
        show("continue", &engine.continue_dialogue());
    }

    let save = engine.save_game();
    println!(
        "--- saved (version {}, {} bytes of JSON) ---\n",
        save.version,
        save.to_json().map(|j| j.len()).unwrap_or(0)
    );

    show("back upstairs", &engine.travel_to("common_room"));
    show("talk to Hobb", &engine.talk_to("hobb"));
    show("continue", &engine.continue_dialogue());
}

fn show(action: &str, snapshot: &Snapshot) {
    println!("> {action}");
    let place = snapshot
        .location
        .as_ref()
        .map(|l| l.name.as_str())
        .unwrap_or("nowhere");
    println!("  [day {} {:02}:00, {place}]", snapshot.day, snapshot.hour);

    if let Some(interlude) = &snapshot.interlude {
        println!("  ~ {} ~ {}", interlude.title, interlude.text);
    }
    if let Some(dialogue) = &snapshot.dialogue {
        let speaker = dialogue
            .speaker
            .as_ref()
            .map(|s| s.name.as_str())
            .unwrap_or("Narrator");
        if let Some(text) = &dialogue.text {
            println!("  {speaker}: {text}");
        }
        for choice in &dialogue.choices {
            println!("    [{}] {}", choice.id, choice.text);
        }
        if dialogue.can_continue {
            println!("    (continue)");
        }
    }
    for notification in &snapshot.notifications {
        println!("  ! {}", notification.text);
    }
    for sound in &snapshot.sounds {
        println!("  * sound: {sound}");
    }
    if !snapshot.inventory.is_empty() {
        let items: Vec<&str> = snapshot.inventory.iter().map(|i| i.name.as_str()).collect();
        println!("  inventory: {}", items.join(", "));
    }
    for quest in &snapshot.quests {
        let status = if quest.completed { "done" } else { "active" };
        println!("  quest {} ({status}): {}", quest.name, quest.stage_text);
    }
    println!();
}
