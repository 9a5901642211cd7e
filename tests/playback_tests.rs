use dialogue_engine::{
    DialogueScheduler, EndReason, Phase, PlaybackConfig, PlaybackTrace, PortraitHandle,
    SpeakerInfo, SpeakerLibrary, TraceEvent,
};

mod common;
use common::{bob_and_amy, run_advancing, MockDirectory};

const SCRIPT: &str = "[NAME=Bob] Hi there\n[NAME=Amy][SPEAKERSPRITE=happy] Oh, hello!";

fn instant(min_time_before_skip: f32) -> PlaybackConfig {
    PlaybackConfig {
        type_out_text: false,
        min_time_before_skip,
        ..PlaybackConfig::default()
    }
}

#[test]
fn end_to_end_two_line_script() {
    let mut scheduler = DialogueScheduler::new(instant(0.25), bob_and_amy(), PlaybackTrace::new());
    assert!(scheduler.start_session(Some(SCRIPT)));
    assert_eq!(scheduler.session().unwrap().lines().len(), 2);

    let ticks = run_advancing(&mut scheduler, 0.125, 100).expect("session should finish");
    assert_eq!(ticks, 4);
    assert_eq!(scheduler.last_end_reason(), Some(EndReason::Completed));

    let trace = scheduler.presenter();
    assert_eq!(trace.prompts_shown(), 2);
    assert_eq!(trace.sessions_ended(), 1);

    let speakers = trace.speakers();
    assert_eq!(speakers[0].display_name, "Bob");
    assert_eq!(speakers[0].portrait, Some(PortraitHandle::new("bob/default")));
    assert_eq!(speakers[1].display_name, "Amy");
    assert_eq!(speakers[1].portrait, Some(PortraitHandle::new("amy/happy")));

    let kinds: Vec<&str> = trace
        .events()
        .iter()
        .map(|event| match event {
            TraceEvent::SessionBegan => "began",
            TraceEvent::SessionEnded => "ended",
            TraceEvent::SpeakerChanged(_) => "speaker",
            TraceEvent::Reveal { .. } => "reveal",
            TraceEvent::Chatter { .. } => "chatter",
            TraceEvent::AdvancePrompt { visible: true } => "prompt_on",
            TraceEvent::AdvancePrompt { visible: false } => "prompt_off",
            TraceEvent::TriggerBegan { .. } => "trigger_began",
            TraceEvent::TriggerEnded { .. } => "trigger_ended",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "began",
            "speaker",
            "reveal",
            "prompt_on",
            "prompt_off",
            "speaker",
            "reveal",
            "prompt_on",
            "prompt_off",
            "ended",
        ]
    );

    let (_, directory, _) = scheduler.into_parts();
    assert_eq!(directory.lookups(), vec!["Bob".to_string(), "Amy".to_string()]);
}

#[test]
fn typed_reveal_events_are_monotonic_per_line() {
    let config = PlaybackConfig {
        characters_per_second: 32.0,
        min_time_before_skip: 0.0,
        ..PlaybackConfig::default()
    };
    let mut scheduler = DialogueScheduler::new(config, bob_and_amy(), PlaybackTrace::new());
    scheduler.start_session(Some(SCRIPT));

    // Let each line type out fully before advancing.
    let mut ticks = 0;
    while scheduler.is_running() && ticks < 10_000 {
        if scheduler.phase() == Phase::AwaitingAdvance {
            scheduler.request_advance();
        }
        scheduler.tick(1.0 / 64.0);
        ticks += 1;
    }
    assert!(!scheduler.is_running());

    let mut last: Option<(usize, usize)> = None;
    let mut finals = Vec::new();
    for event in scheduler.presenter().events() {
        if let TraceEvent::Reveal {
            line,
            revealed,
            total,
            visible,
        } = event
        {
            assert!(revealed <= total);
            assert_eq!(visible.chars().count(), *revealed);
            if let Some((last_line, last_revealed)) = last {
                if last_line == *line {
                    assert!(*revealed >= last_revealed);
                }
            }
            if revealed == total {
                finals.push(visible.clone());
            }
            last = Some((*line, *revealed));
        }
    }
    assert_eq!(finals, vec!["Hi there".to_string(), "Oh, hello!".to_string()]);
}

#[test]
fn guard_enforcement_boundary() {
    for (advance_at, expect_full) in [(0.125f32, false), (0.25, true), (0.5, true)] {
        let config = PlaybackConfig {
            characters_per_second: 4.0,
            min_time_before_skip: 0.25,
            ..PlaybackConfig::default()
        };
        let mut scheduler =
            DialogueScheduler::new(config, SpeakerLibrary::new(), PlaybackTrace::new());
        scheduler.start_session(Some("A long enough line"));
        scheduler.tick(0.0);
        scheduler.request_advance();
        scheduler.tick(advance_at);

        let session = scheduler.session().expect("still running");
        let full = session.revealed_character_count() == "A long enough line".len();
        assert_eq!(full, expect_full, "advance at {advance_at}");
    }
}

#[test]
fn skip_all_abandons_remaining_lines() {
    let library = SpeakerLibrary::from_speakers(vec![SpeakerInfo::new("Bob")]).unwrap();
    let mut trace = PlaybackTrace::without_reveals();
    {
        let mut scheduler = DialogueScheduler::new(instant(0.0), &library, &mut trace);
        scheduler.start_session(Some("[NAME=Bob] one\n[NAME=Bob] two\n[NAME=Bob] three"));
        scheduler.request_advance();
        scheduler.tick(0.125);
        assert_eq!(scheduler.session().unwrap().current_index(), 1);

        scheduler.request_skip_all();
        scheduler.tick(0.125);
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.last_end_reason(), Some(EndReason::SkippedAll));
    }

    assert_eq!(trace.speakers().len(), 2);
    assert_eq!(trace.sessions_ended(), 1);
    assert_eq!(trace.events().last(), Some(&TraceEvent::SessionEnded));
    assert!(trace
        .events()
        .iter()
        .all(|event| !matches!(event, TraceEvent::Reveal { .. })));
}

#[test]
fn new_session_ends_previous_exactly_once_before_beginning() {
    let mut scheduler = DialogueScheduler::new(instant(0.0), MockDirectory::default(), PlaybackTrace::new());
    scheduler.start_session(Some("first"));
    scheduler.start_session(Some("second"));
    scheduler.start_session(Some("third"));

    let markers: Vec<_> = scheduler
        .presenter()
        .events()
        .iter()
        .filter(|event| matches!(event, TraceEvent::SessionBegan | TraceEvent::SessionEnded))
        .cloned()
        .collect();
    assert_eq!(
        markers,
        vec![
            TraceEvent::SessionBegan,
            TraceEvent::SessionEnded,
            TraceEvent::SessionBegan,
            TraceEvent::SessionEnded,
            TraceEvent::SessionBegan,
        ]
    );
    assert_eq!(scheduler.last_end_reason(), Some(EndReason::Replaced));
}

#[test]
fn trace_serializes_to_json() {
    let mut scheduler = DialogueScheduler::new(instant(0.0), bob_and_amy(), PlaybackTrace::new());
    scheduler.start_session(Some(SCRIPT));
    run_advancing(&mut scheduler, 0.125, 10);

    let json = scheduler.presenter().to_json().expect("trace serializes");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    let events = value.as_array().expect("array of events");
    assert_eq!(events[0]["kind"], "session_began");
    assert_eq!(events[1]["kind"], "speaker_changed");
    assert_eq!(events[1]["display_name"], "Bob");
    assert_eq!(events[1]["name_color"], "#000000");
}
