#![allow(dead_code)]

use std::cell::RefCell;
use std::io;
use std::sync::{Arc, Mutex};

use dialogue_engine::{
    ids_match, DialoguePresenter, DialogueScheduler, SpeakerDirectory, SpeakerInfo,
};

/// Minimal directory that records every lookup it receives.
#[derive(Default)]
pub struct MockDirectory {
    speakers: Vec<SpeakerInfo>,
    lookups: RefCell<Vec<String>>,
}

impl MockDirectory {
    pub fn with(speakers: Vec<SpeakerInfo>) -> Self {
        Self {
            speakers,
            lookups: RefCell::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.borrow().clone()
    }
}

impl SpeakerDirectory for MockDirectory {
    fn speaker(&self, id: &str) -> Option<&SpeakerInfo> {
        self.lookups.borrow_mut().push(id.to_string());
        self.speakers
            .iter()
            .find(|speaker| ids_match(&speaker.id, id))
    }
}

pub fn bob_and_amy() -> MockDirectory {
    MockDirectory::with(vec![
        SpeakerInfo::new("Bob").with_default_sprite("bob/default"),
        SpeakerInfo::new("Amy")
            .with_default_sprite("amy/default")
            .with_sprite("happy", "amy/happy"),
    ])
}

/// Ticks until the session ends, requesting an advance before every tick.
/// Returns the number of ticks taken, or `None` if the limit was reached.
pub fn run_advancing<D, P>(
    scheduler: &mut DialogueScheduler<D, P>,
    dt: f32,
    max_ticks: usize,
) -> Option<usize>
where
    D: SpeakerDirectory,
    P: DialoguePresenter,
{
    for tick in 0..max_ticks {
        if !scheduler.is_running() {
            return Some(tick);
        }
        scheduler.request_advance();
        scheduler.tick(dt);
    }
    (!scheduler.is_running()).then_some(max_ticks)
}

/// In-memory sink for formatted log output.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log buffer")).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `run` with a thread-local subscriber and returns what it logged at
/// `WARN` and above.
pub fn capture_logs<R>(run: impl FnOnce() -> R) -> (R, String) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, run);
    (result, capture.contents())
}
