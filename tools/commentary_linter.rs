/// Commentary Linter — validates commentary rule coverage and quality.
///
/// Usage: commentary_linter <commentary_path> [--no-builtin]
///
/// The path may be a single RON file or a directory searched recursively.
/// Files are merged over the built-in commentary unless `--no-builtin`.

use markov_match::core::commentary::{Commentary, Slot, CALM_RULE, RESTART_RULE};
use markov_match::schema::event::EventKind;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: commentary_linter <commentary_path> [--no-builtin]");
        process::exit(0);
    }

    let commentary_dir = &args[1];
    let with_builtin = !args[2..].iter().any(|a| a == "--no-builtin");

    let mut commentary = if with_builtin {
        match Commentary::builtin() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Built-in commentary is broken: {}", e);
                process::exit(1);
            }
        }
    } else {
        Commentary::default()
    };

    let path = Path::new(commentary_dir);
    if path.is_file() {
        match Commentary::load_from_ron(path) {
            Ok(c) => commentary.merge(c),
            Err(e) => {
                eprintln!("ERROR: Failed to load commentary file: {}", e);
                process::exit(1);
            }
        }
    } else if path.is_dir() {
        load_commentary_recursive(path, &mut commentary);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", commentary_dir);
        process::exit(1);
    }

    println!("Loaded {} commentary rules", commentary.rules.len());

    let (errors, warnings) = lint_commentary(&commentary);

    println!("\n=== Commentary Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
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

fn load_commentary_recursive(dir: &Path, commentary: &mut Commentary) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                load_commentary_recursive(&path, commentary);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                match Commentary::load_from_ron(&path) {
                    Ok(c) => {
                        println!("  Loaded: {}", path.display());
                        commentary.merge(c);
                    }
                    Err(e) => {
                        eprintln!("  ERROR loading {}: {}", path.display(), e);
                    }
                }
            }
        }
    }
}

fn lint_commentary(commentary: &Commentary) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Every event kind should be narratable
    for name in EventKind::NAMES.into_iter().chain([RESTART_RULE]) {
        if !commentary.rules.contains_key(name) {
            warnings.push(format!("No rule for event '{}'; it will go unnarrated", name));
        }
    }

    match commentary.rules.get(CALM_RULE) {
        None => warnings.push(format!(
            "No '{}' rule; quiet minutes will have no narrative",
            CALM_RULE
        )),
        Some(rule) => {
            for alt in &rule.alternatives {
                if alt.template.mentions(Slot::Team)
                    || alt.template.mentions(Slot::Opponent)
                    || alt.template.mentions(Slot::Player)
                {
                    errors.push(format!(
                        "Rule '{}' has an alternative naming a team or player, which a quiet minute cannot fill",
                        CALM_RULE
                    ));
                }
            }
        }
    }

    let mut names: Vec<&String> = commentary.rules.keys().collect();
    names.sort();
    for name in names {
        let rule = &commentary.rules[name];

        if name != CALM_RULE && name != RESTART_RULE && !EventKind::NAMES.iter().any(|n| *n == name.as_str()) {
            warnings.push(format!("Rule '{}' does not match any event and is never used", name));
        }

        if rule.alternatives.is_empty() {
            errors.push(format!("Rule '{}' has no alternatives", name));
            continue;
        }

        if rule.alternatives.iter().all(|alt| alt.weight == 0) {
            errors.push(format!("Rule '{}' has only zero-weight alternatives", name));
        }

        // Events without a roster carry no player
        if rule
            .alternatives
            .iter()
            .all(|alt| alt.template.mentions(Slot::Player))
        {
            errors.push(format!(
                "Rule '{}' has no alternative without {{player}}",
                name
            ));
        }

        if name == "pass_streak" {
            continue;
        }
        if rule
            .alternatives
            .iter()
            .any(|alt| alt.template.mentions(Slot::Passes))
        {
            errors.push(format!("Rule '{}' uses {{passes}} outside pass_streak", name));
        }
    }

    (errors, warnings)
}
