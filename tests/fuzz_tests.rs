#[cfg(feature = "arbitrary")]
mod fuzz {
    use arbitrary::{Arbitrary, Unstructured};
    use dialogue_engine::{
        parse, parse_with_diagnostics, DialogueLine, DialogueScheduler, Phase, PlaybackConfig,
        PlaybackTrace, SpeakerLibrary, TraceEvent,
    };

    fn fill_deterministic(buf: &mut [u8], seed: u64) {
        let mut state = seed;
        for byte in buf.iter_mut() {
            // xorshift64*
            state ^= state >> 12;
            state ^= state << 25;
            state ^= state >> 27;
            state = state.wrapping_mul(0x2545_F491_4F6C_DD1D);
            *byte = (state & 0xFF) as u8;
        }
    }

    const ALPHABET: &[u8] = b"[]=NAMESPKRIT ab\r\n";

    #[test]
    fn fuzz_parse_tag_heavy_scripts() {
        let mut raw = [0u8; 512];
        for i in 0..256u64 {
            fill_deterministic(&mut raw, 0xD1A1_06E5 ^ i);
            let script: String = raw
                .iter()
                .map(|byte| ALPHABET[*byte as usize % ALPHABET.len()] as char)
                .collect();

            let parsed = parse_with_diagnostics(&script);
            assert_eq!(parsed.lines, parse(&script));
            for line in &parsed.lines {
                assert!(!line.text.is_empty());
                assert!(!line.text.starts_with(char::is_whitespace));
                assert!(!line.text.ends_with(char::is_whitespace));
                assert!(line.extra_tags.keys().all(|key| key != "NAME"));
            }
        }
    }

    #[test]
    fn fuzz_parse_arbitrary_strings() {
        let mut raw = [0u8; 1024 * 16];
        for i in 0..64u64 {
            fill_deterministic(&mut raw, 0x5C21_97u64 ^ i);
            let mut u = Unstructured::new(&raw);
            let Ok(script) = String::arbitrary(&mut u) else {
                continue;
            };
            for line in parse(&script) {
                assert!(!line.text.is_empty());
            }
        }
    }

    #[test]
    fn fuzz_scheduler_invariants() {
        let mut raw = [0u8; 1024 * 16];
        for i in 0..64u64 {
            fill_deterministic(&mut raw, 0xF00D_5EEDu64 ^ i);
            let mut u = Unstructured::new(&raw);
            let Ok(lines) = Vec::<DialogueLine>::arbitrary(&mut u) else {
                continue;
            };
            let config = PlaybackConfig {
                characters_per_second: f32::from(u.int_in_range(0u8..=60).unwrap_or(20)),
                min_time_before_skip: f32::from(u.int_in_range(0u8..=4).unwrap_or(1)) / 8.0,
                ..PlaybackConfig::default()
            };
            let mut scheduler =
                DialogueScheduler::new(config, SpeakerLibrary::new(), PlaybackTrace::new());
            if !scheduler.start_lines(lines) {
                assert!(scheduler.presenter().events().is_empty());
                continue;
            }

            let mut last_revealed = 0usize;
            let mut last_index = 0usize;
            for _ in 0..512 {
                match u.int_in_range(0u8..=15).unwrap_or(0) {
                    0 => scheduler.request_skip_all(),
                    1..=4 => scheduler.request_advance(),
                    _ => {}
                }
                scheduler.tick(1.0 / 16.0);

                let Some(session) = scheduler.session() else {
                    break;
                };
                let index = session.current_index();
                assert!(index >= last_index);
                let total = session.current_line().map_or(0, DialogueLine::char_count);
                assert!(session.revealed_character_count() <= total);
                if index == last_index {
                    assert!(session.revealed_character_count() >= last_revealed);
                }
                if session.phase() == Phase::AwaitingAdvance {
                    assert_eq!(session.revealed_character_count(), total);
                }
                last_index = index;
                last_revealed = session.revealed_character_count();
            }
            scheduler.end_now();

            let trace = scheduler.presenter();
            assert_eq!(trace.sessions_ended(), 1);
            assert_eq!(
                trace.count(|event| matches!(event, TraceEvent::SessionBegan)),
                1
            );
            assert_eq!(trace.events().last(), Some(&TraceEvent::SessionEnded));
        }
    }
}
