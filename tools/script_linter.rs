/// Script Linter: compiles dialogue scripts and checks their node graphs.
///
/// Usage: script_linter <scripts_dir | script.dlg>

use dialogue_engine::core::script::parse_dialogue;
use dialogue_engine::schema::dialogue::{Dialogue, Node};
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: script_linter <scripts_dir | script.dlg>");
        process::exit(0);
    }

    let target = Path::new(&args[1]);
    let files = if target.is_file() {
        vec![target.to_path_buf()]
    } else if target.is_dir() {
        collect_scripts(target)
    } else {
        eprintln!("ERROR: Path '{}' does not exist", args[1]);
        process::exit(1);
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut compiled = 0;

    for path in &files {
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown");
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                errors.push(format!("{}: {e}", path.display()));
                continue;
            }
        };
        match parse_dialogue(id, &source) {
            Ok(dialogue) => {
                compiled += 1;
                for warning in lint_dialogue(&dialogue) {
                    warnings.push(format!("{}: {warning}", path.display()));
                }
            }
            Err(e) => errors.push(format!("{}: {e}", path.display())),
        }
    }

    println!("Compiled {compiled} of {} scripts", files.len());
    println!("\n=== Script Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }
    for warning in &warnings {
        println!("WARNING: {warning}");
    }
    for error in &errors {
        println!("ERROR: {error}");
    }
    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if !errors.is_empty() {
        process::exit(1);
    }
}

fn collect_scripts(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_scripts(&path));
            } else if path.extension().and_then(|s| s.to_str()) == Some("dlg") {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

/// Node ids a node can hand control to.
fn targets(node: &Node) -> impl Iterator<Item = &String> {
    node.next
        .iter()
        .chain(node.choices.iter().filter_map(|c| c.next.as_ref()))
        .chain(node.conditional_next.iter().filter_map(|b| b.next.as_ref()))
}

/// Dangling node targets and nodes no path from the start reaches.
fn lint_dialogue(dialogue: &Dialogue) -> Vec<String> {
    let mut warnings = Vec::new();

    for node in &dialogue.nodes {
        for target in targets(node) {
            if dialogue.node(target).is_none() {
                warnings.push(format!(
                    "node '{}' jumps to missing node '{target}'",
                    node.id
                ));
            }
        }
        let empty = node.text.is_none()
            && node.choices.is_empty()
            && node.next.is_none()
            && node.conditional_next.is_empty()
            && node.effects.is_empty();
        if empty {
            warnings.push(format!("node '{}' is empty", node.id));
        }
    }

    let mut reachable = vec![dialogue.start_node_id.as_str()];
    let mut pending = vec![dialogue.start_node_id.as_str()];
    while let Some(id) = pending.pop() {
        let Some(node) = dialogue.node(id) else {
            continue;
        };
        for target in targets(node) {
            if !reachable.contains(&target.as_str()) {
                reachable.push(target.as_str());
                pending.push(target.as_str());
            }
        }
    }

    for node in &dialogue.nodes {
        if !reachable.contains(&node.id.as_str()) {
            warnings.push(format!("node '{}' is never reached", node.id));
        }
    }

    warnings
}
