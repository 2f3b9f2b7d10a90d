//! Terminal Surface
//!
//! Renders the pet on stdout. The bottom row is the live row: the newest
//! unfinished reply animates there, rewritten in place with a carriage
//! return. Everything else (notices, echoes, finished replies) is printed
//! above it as a complete line, and the live row is redrawn underneath.
//!
//! Older replies that are still waiting do not animate; each one gets its
//! own line once its text arrives, so overlapping replies never overwrite
//! each other.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tomo_conductor::{HealthReading, PetDisplay, TextTarget, MAX_HEALTH};

const BAR_WIDTH: usize = 20;

const CLEAR_ROW: &str = "\r\x1b[2K";

struct Screen {
    out: Box<dyn Write + Send>,
    next_reply: u64,
    /// Reply currently drawn on the live row, with its last frame
    live: Option<(u64, String)>,
}

impl Screen {
    fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            next_reply: 0,
            live: None,
        }
    }

    /// Print a complete line above the live row
    fn line(&mut self, text: &str) {
        let _ = match &self.live {
            Some((_, frame)) => write!(self.out, "{CLEAR_ROW}{text}\n{frame}"),
            None => writeln!(self.out, "{text}"),
        };
        let _ = self.out.flush();
    }

    fn open_reply(&mut self) -> u64 {
        self.next_reply += 1;
        self.next_reply
    }

    /// Animation frame for reply `id`; only the newest reply is drawn
    fn frame(&mut self, id: u64, text: &str) {
        if self.live.as_ref().is_some_and(|(live, _)| *live > id) {
            return;
        }
        let _ = write!(self.out, "{CLEAR_ROW}{text}");
        let _ = self.out.flush();
        self.live = Some((id, text.to_string()));
    }

    /// Final text for reply `id`
    fn finish(&mut self, id: u64, text: &str) {
        if self.live.as_ref().is_some_and(|(live, _)| *live == id) {
            self.live = None;
            let _ = writeln!(self.out, "{CLEAR_ROW}{text}");
            let _ = self.out.flush();
        } else {
            self.line(text);
        }
    }
}

/// [`PetDisplay`] for an interactive terminal
#[derive(Clone)]
pub struct TerminalDisplay {
    screen: Arc<Mutex<Screen>>,
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    fn with_output(out: Box<dyn Write + Send>) -> Self {
        Self {
            screen: Arc::new(Mutex::new(Screen::new(out))),
        }
    }

    /// Print a daemon notice (not part of the conversation)
    pub fn notice(&self, text: &str) {
        self.screen.lock().line(&format!("  · {text}"));
    }
}

fn health_bar(health: &HealthReading) -> String {
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let filled = (health.clamped() as usize * BAR_WIDTH) / MAX_HEALTH as usize;
    format!(
        "[{}{}] {health}",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled)
    )
}

impl PetDisplay for TerminalDisplay {
    fn show_animation(&self, animation: &str) {
        self.screen.lock().line(&format!("  ♪ {animation}"));
    }

    fn show_health(&self, health: &HealthReading) {
        self.screen.lock().line(&format!("  ♥ {}", health_bar(health)));
    }

    fn show_greeting(&self, greeting: &str) {
        self.screen.lock().line(greeting);
    }

    fn set_upload_prompt(&self, visible: bool) {
        if visible {
            self.notice("send a photo with /feed <path>");
        }
    }

    fn show_user_input(&self, text: &str) {
        self.screen.lock().line(text);
    }

    fn open_reply(&self) -> Arc<dyn TextTarget> {
        let id = self.screen.lock().open_reply();
        Arc::new(ReplyLine {
            id,
            screen: self.screen.clone(),
            finished: Mutex::new(false),
        })
    }
}

struct ReplyLine {
    id: u64,
    screen: Arc<Mutex<Screen>>,
    finished: Mutex<bool>,
}

impl TextTarget for ReplyLine {
    fn set_text(&self, text: &str) {
        if !*self.finished.lock() {
            self.screen.lock().frame(self.id, text);
        }
    }

    fn finish(&self, text: &str) {
        let mut finished = self.finished.lock();
        if !*finished {
            *finished = true;
            self.screen.lock().finish(self.id, text);
        }
    }
}
