/// Stream integration tests: whole matches driven through the token chain.

use markov_match::core::pipeline::{MatchStream, StreamError};
use markov_match::core::request::MinuteRequest;
use markov_match::schema::event::EventKind;
use markov_match::schema::side::PerSide;
use markov_match::schema::summary::MinuteResponse;
use std::collections::HashMap;

/// Play a match from kickoff until the stream refuses to continue.
fn play_out(stream: &MatchStream, seed: u64) -> (Vec<MinuteResponse>, StreamError) {
    let mut request = MinuteRequest::new(seed).teams("Rovers", "United");
    let mut minutes = Vec::new();
    loop {
        match stream.next_minute(&request) {
            Ok(response) => {
                request.token = Some(response.minute_summary.token.clone());
                minutes.push(response);
            }
            Err(err) => return (minutes, err),
        }
    }
}

#[test]
fn first_minute_from_seed_42() {
    let stream = MatchStream::builder().build().unwrap();
    let response = stream.next_minute(&MinuteRequest::new(42)).unwrap();
    let summary = &response.minute_summary;

    assert_eq!(summary.minute, 1);
    let state = stream.decode_token(&summary.token, 42).unwrap();
    assert_eq!(state.minute, 1);

    // Whatever happened, the score matches the goals in the event list.
    let goals = summary
        .events
        .iter()
        .filter(|e| matches!(e.kind, EventKind::Goal { .. }))
        .count() as u16;
    assert_eq!(summary.score_total.home + summary.score_total.away, goals);
}

#[test]
fn same_seed_and_token_give_identical_json() {
    let stream = MatchStream::builder().build().unwrap();
    let first = stream.next_minute(&MinuteRequest::new(99)).unwrap();

    let next = MinuteRequest::new(99).token(first.minute_summary.token.clone());
    let a = serde_json::to_string(&stream.next_minute(&next).unwrap()).unwrap();
    let b = serde_json::to_string(&stream.next_minute(&next).unwrap()).unwrap();
    assert_eq!(a, b);

    // A separately built stream behaves the same.
    let other = MatchStream::builder().build().unwrap();
    let c = serde_json::to_string(&other.next_minute(&next).unwrap()).unwrap();
    assert_eq!(a, c);
}

#[test]
fn full_match_reaches_regulation_then_ends() {
    let stream = MatchStream::builder().build().unwrap();
    let (minutes, err) = play_out(&stream, 2024);

    assert_eq!(minutes.len(), 90);
    let last = &minutes[89].minute_summary;
    assert_eq!(stream.decode_token(&last.token, 2024).unwrap().minute, 90);
    assert!(matches!(
        err,
        StreamError::RegulationEnded {
            minute: 90,
            regulation_minutes: 90
        }
    ));
    assert_eq!(err.code(), "regulation_ended");
}

#[test]
fn minutes_increase_by_one() {
    let stream = MatchStream::builder().build().unwrap();
    let (minutes, _) = play_out(&stream, 5);
    for (i, response) in minutes.iter().enumerate() {
        assert_eq!(response.minute_summary.minute as usize, i + 1);
        for event in &response.minute_summary.events {
            assert_eq!(event.minute as usize, i + 1);
        }
    }
}

#[test]
fn scores_never_decrease_and_match_deltas() {
    let stream = MatchStream::builder().build().unwrap();
    for seed in [1, 17, 42, 1000] {
        let (minutes, _) = play_out(&stream, seed);
        let mut running = PerSide::new(0u16, 0u16);
        for response in &minutes {
            let summary = &response.minute_summary;
            assert!(summary.score_total.home >= running.home);
            assert!(summary.score_total.away >= running.away);
            assert_eq!(summary.score_total.home - running.home, summary.score.home);
            assert_eq!(summary.score_total.away - running.away, summary.score.away);
            running = summary.score_total;
        }
    }
}

#[test]
fn possession_pct_sums_to_100() {
    let stream = MatchStream::builder().build().unwrap();
    let (minutes, _) = play_out(&stream, 31337);
    for response in &minutes {
        let summary = &response.minute_summary;
        let pct = summary.possession_pct;
        assert!((99..=101).contains(&(pct.home + pct.away)));
        assert_eq!(
            summary.possession_seconds.home + summary.possession_seconds.away,
            60
        );
    }
    let totals = minutes[89].minute_summary.possession_seconds_total;
    assert_eq!(totals.home + totals.away, 90 * 60);
}

#[test]
fn every_minute_has_narrative() {
    let stream = MatchStream::builder().build().unwrap();
    let (minutes, _) = play_out(&stream, 8);
    for response in &minutes {
        assert!(!response.minute_summary.narrative.is_empty());
    }
}

#[test]
fn second_half_kickoff() {
    let stream = MatchStream::builder().build().unwrap();
    let (minutes, _) = play_out(&stream, 77);

    let first = &minutes[0].minute_summary.events[0];
    assert_eq!(
        first.kind,
        EventKind::Kickoff {
            half: 1,
            restart: false
        }
    );

    let restart = &minutes[45].minute_summary;
    assert_eq!(restart.start_state, "kickoff");
    let second = restart
        .events
        .iter()
        .find(|e| matches!(e.kind, EventKind::Kickoff { half: 2, restart: false }))
        .unwrap();
    assert_eq!(second.team, first.team.opponent());
}

#[test]
fn different_seeds_give_different_matches() {
    let stream = MatchStream::builder().build().unwrap();
    let fingerprint = |seed: u64| -> Vec<String> {
        let (minutes, _) = play_out(&stream, seed);
        minutes
            .iter()
            .flat_map(|m| m.minute_summary.events.iter().map(|e| e.description.clone()))
            .collect()
    };
    assert_ne!(fingerprint(1), fingerprint(2));
    assert_ne!(fingerprint(42), fingerprint(43));
}

#[test]
fn goal_rate_is_plausible() {
    let stream = MatchStream::builder().build().unwrap();
    let mut goals = 0u32;
    let mut shots = 0u32;
    let matches = 40u64;
    for seed in 0..matches {
        let (minutes, _) = play_out(&stream, seed);
        let last = &minutes[89].minute_summary;
        goals += u32::from(last.score_total.home + last.score_total.away);
        shots += u32::from(last.shots_total.home + last.shots_total.away);
    }
    let per_match = goals as f64 / matches as f64;
    assert!((0.5..6.0).contains(&per_match), "{per_match} goals per match");
    assert!(shots as u64 > matches * 5);
}

#[test]
fn stronger_side_scores_more_over_many_matches() {
    let stream = MatchStream::builder().build().unwrap();
    let mut goals = PerSide::new(0u32, 0u32);
    for seed in 0..40 {
        let mut request = MinuteRequest::new(seed).strength(95, 5);
        let mut last = None;
        while let Ok(response) = stream.next_minute(&request) {
            request.token = Some(response.minute_summary.token.clone());
            last = Some(response);
        }
        let score = last.unwrap().minute_summary.score_total;
        goals.home += u32::from(score.home);
        goals.away += u32::from(score.away);
    }
    assert!(goals.home > goals.away, "{goals:?}");
}

#[test]
fn shorter_regulation_is_carried_in_token() {
    let short = MatchStream::builder().regulation_minutes(10).build().unwrap();
    let (minutes, err) = play_out(&short, 3);
    assert_eq!(minutes.len(), 10);
    assert_eq!(minutes[0].regulation_minutes, 10);
    assert!(matches!(err, StreamError::RegulationEnded { minute: 10, .. }));

    // A default stream honours the length fixed at kickoff.
    let default = MatchStream::builder().build().unwrap();
    let token = minutes[9].minute_summary.token.clone();
    let err = default
        .next_minute(&MinuteRequest::new(3).token(token))
        .unwrap_err();
    assert!(matches!(err, StreamError::RegulationEnded { minute: 10, .. }));
}

#[test]
fn rosters_name_players() {
    let stream = MatchStream::builder().build().unwrap();
    let home: Vec<String> = ["Ada", "Bea", "Cai"].iter().map(|s| s.to_string()).collect();
    let away: Vec<String> = ["Dov", "Eli"].iter().map(|s| s.to_string()).collect();

    let mut request = MinuteRequest::new(12).rosters(home.clone(), away.clone());
    let mut named = 0;
    while let Ok(response) = stream.next_minute(&request) {
        for event in &response.minute_summary.events {
            if let Some(player) = &event.player {
                named += 1;
                assert!(event.kind.takes_player());
                let roster = if event.team == markov_match::schema::side::Side::Home {
                    &home
                } else {
                    &away
                };
                assert!(roster.contains(player));
            }
        }
        request.token = Some(response.minute_summary.token.clone());
    }
    assert!(named > 0);
}

#[test]
fn query_parameters_drive_the_stream() {
    let stream = MatchStream::builder().build().unwrap();
    let mut params: HashMap<String, String> = [("home", "Rovers"), ("away", "United"), ("seed", "42")]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let request = MinuteRequest::from_query(&params).unwrap();
    let first = stream.next_minute(&request).unwrap();

    params.insert("token".to_string(), first.minute_summary.token.clone());
    let request = MinuteRequest::from_query(&params).unwrap();
    let second = stream.next_minute(&request).unwrap();
    assert_eq!(second.minute_summary.minute, 2);
}

#[test]
fn dumped_table_reloads_into_an_identical_stream() {
    use markov_match::core::markov;
    use std::path::Path;

    let stream = MatchStream::builder().build().unwrap();
    let _ = std::fs::create_dir_all("target");
    let path = "target/stream_tests_dumped_table.ron";
    markov::save_table(stream.table(), Path::new(path)).unwrap();

    let reloaded = MatchStream::builder().table_path(path).build().unwrap();
    let request = MinuteRequest::new(21).teams("Rovers", "United");
    assert_eq!(
        stream.next_minute(&request).unwrap(),
        reloaded.next_minute(&request).unwrap()
    );
    let _ = std::fs::remove_file(path);
}
