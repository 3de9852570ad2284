/// Autoplay — drives one match minute by minute, like a polling client.
///
/// Usage: autoplay [--seed <n>] [--home <name>] [--away <name>]
///                 [--strength <home>,<away>] [--minutes <n>]
///                 [--commentary <path>] [--table <path>]
///                 [--tick-ms <ms>] [--stop-at <minute>] [--ron]
///                 [--secret <key>] [--token <token>] [--dump-table <path>]
///
/// Each tick issues one request carrying the previous token, prints the
/// narrative, and stops at the end of regulation or at `--stop-at`.

use markov_match::core::pipeline::{MatchStream, StreamError};
use markov_match::core::markov;
use markov_match::core::request::{parse_seed, MinuteRequest};
use markov_match::schema::summary::MinuteSummary;
use std::path::Path;
use std::time::Duration;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && (args[1] == "--help" || args[1] == "-h") {
        print_usage();
        return;
    }

    let mut request = MinuteRequest::new(42);
    let mut home = "Home".to_string();
    let mut away = "Away".to_string();
    let mut builder = MatchStream::builder();
    let mut tick = Duration::ZERO;
    let mut stop_at: Option<u16> = None;
    let mut ron_output = false;
    let mut dump_table: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" if i + 1 < args.len() => {
                i += 1;
                match parse_seed(&args[i]) {
                    Ok(seed) => request.seed = seed,
                    Err(e) => {
                        eprintln!("Bad --seed: {}", e);
                        std::process::exit(1);
                    }
                }
            }
            "--home" if i + 1 < args.len() => {
                i += 1;
                home = args[i].clone();
            }
            "--away" if i + 1 < args.len() => {
                i += 1;
                away = args[i].clone();
            }
            "--strength" if i + 1 < args.len() => {
                i += 1;
                match parse_pair(&args[i]) {
                    Some((h, a)) => request = request.strength(h, a),
                    None => {
                        eprintln!("Bad --strength '{}', expected e.g. 60,40", args[i]);
                        std::process::exit(1);
                    }
                }
            }
            "--minutes" if i + 1 < args.len() => {
                i += 1;
                match args[i].parse::<u16>() {
                    Ok(minutes) if minutes > 0 => builder = builder.regulation_minutes(minutes),
                    _ => {
                        eprintln!("Bad --minutes '{}', expected 1..=65535", args[i]);
                        std::process::exit(1);
                    }
                }
            }
            "--secret" if i + 1 < args.len() => {
                i += 1;
                builder = builder.token_secret(&args[i]);
            }
            "--token" if i + 1 < args.len() => {
                i += 1;
                request.token = Some(args[i].clone());
            }
            "--dump-table" if i + 1 < args.len() => {
                i += 1;
                dump_table = Some(args[i].clone());
            }
            "--commentary" if i + 1 < args.len() => {
                i += 1;
                builder = builder.commentary_path(&args[i]);
            }
            "--table" if i + 1 < args.len() => {
                i += 1;
                builder = builder.table_path(&args[i]);
            }
            "--tick-ms" if i + 1 < args.len() => {
                i += 1;
                match args[i].parse() {
                    Ok(ms) => tick = Duration::from_millis(ms),
                    Err(_) => {
                        eprintln!("Bad --tick-ms '{}'", args[i]);
                        std::process::exit(1);
                    }
                }
            }
            "--stop-at" if i + 1 < args.len() => {
                i += 1;
                match args[i].parse() {
                    Ok(minute) => stop_at = Some(minute),
                    Err(_) => {
                        eprintln!("Bad --stop-at '{}'", args[i]);
                        std::process::exit(1);
                    }
                }
            }
            "--ron" => ron_output = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }
    request = request.teams(&home, &away);

    let stream = match builder.build() {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = dump_table {
        match markov::save_table(stream.table(), Path::new(&path)) {
            Ok(()) => {
                println!("Wrote transition table v{} to {}", stream.model_version(), path);
                return;
            }
            Err(e) => {
                eprintln!("ERROR: {}", e);
                std::process::exit(1);
            }
        }
    }

    println!(
        "{} v {} (seed {}, {} minutes)\n",
        home,
        away,
        request.seed,
        stream.regulation_minutes()
    );

    let mut last: Option<MinuteSummary> = None;
    loop {
        match stream.next_minute(&request) {
            Ok(response) => {
                let summary = response.minute_summary;
                if ron_output {
                    match ron::ser::to_string_pretty(&summary, ron::ser::PrettyConfig::default()) {
                        Ok(text) => println!("{}", text),
                        Err(e) => eprintln!("ERROR: {}", e),
                    }
                } else {
                    print_minute(&summary);
                }
                request.token = Some(summary.token.clone());
                let minute = summary.minute;
                last = Some(summary);

                if stop_at.is_some_and(|stop| minute >= stop) {
                    println!("\nStopped at minute {}.", minute);
                    break;
                }
            }
            Err(StreamError::RegulationEnded { .. }) => {
                println!("\nFull time.");
                break;
            }
            Err(e) => {
                eprintln!("ERROR: {}", e);
                std::process::exit(1);
            }
        }
        if !tick.is_zero() {
            std::thread::sleep(tick);
        }
    }

    if let Some(summary) = last {
        print_totals(&home, &away, &summary);
    }
}

fn print_minute(summary: &MinuteSummary) {
    for line in &summary.narrative {
        println!("{:>3}'  {}", summary.minute, line);
    }
}

fn print_totals(home: &str, away: &str, summary: &MinuteSummary) {
    println!("\n=== {} {}-{} {} ===", home, summary.score_total.home, summary.score_total.away, away);
    println!(
        "Possession      {:>3}% - {:>3}%",
        summary.possession_pct.home, summary.possession_pct.away
    );
    println!(
        "Shots           {:>4} - {:<4}",
        summary.shots_total.home, summary.shots_total.away
    );
    println!(
        "On target       {:>4} - {:<4}",
        summary.shots_on_target_total.home, summary.shots_on_target_total.away
    );
    println!(
        "Final third     {:>4} - {:<4}",
        summary.entries_final_third_total.home, summary.entries_final_third_total.away
    );
    println!(
        "Fouls           {:>4} - {:<4}",
        summary.fouls_total.home, summary.fouls_total.away
    );
    println!("\nToken: {}", summary.token);
}

fn parse_pair(raw: &str) -> Option<(u8, u8)> {
    let (h, a) = raw.split_once(',')?;
    Some((h.trim().parse().ok()?, a.trim().parse().ok()?))
}

fn print_usage() {
    println!("Usage: autoplay [--seed <n>] [--home <name>] [--away <name>]");
    println!("                [--strength <home>,<away>] [--minutes <n>]");
    println!("                [--commentary <path>] [--table <path>]");
    println!("                [--tick-ms <ms>] [--stop-at <minute>] [--ron]");
    println!("                [--secret <key>] [--token <token>] [--dump-table <path>]");
    println!();
    println!("--token resumes a match from a token issued with the same seed and secret.");
    println!("--dump-table writes the active transition table as RON and exits.");
}
