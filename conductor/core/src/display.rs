//! Rendering Sinks
//!
//! The core never draws anything itself. It tells a [`PetDisplay`] which
//! animation to show, what the health bar reads and when a reply line opens,
//! and each surface renders that however it likes (terminal, web view, test
//! recorder).

use std::sync::Arc;

use crate::health::HealthReading;

/// A single line of text the core can rewrite (a reply slot)
pub trait TextTarget: Send + Sync {
    /// Replace the line's content
    fn set_text(&self, text: &str);

    /// Show the line's final content; nothing is written to it afterwards
    fn finish(&self, text: &str) {
        self.set_text(text);
    }
}

/// Everything a surface must be able to show
pub trait PetDisplay: Send + Sync {
    /// Show an animation by reference (steady loop or transition clip)
    fn show_animation(&self, animation: &str);

    /// Update the health bar
    fn show_health(&self, health: &HealthReading);

    /// Show the greeting that opens a session
    fn show_greeting(&self, greeting: &str);

    /// Show or hide the "upload an image" prompt
    fn set_upload_prompt(&self, visible: bool);

    /// Echo what the user said into the conversation history
    fn show_user_input(&self, text: &str);

    /// Open a new reply line under the conversation history
    fn open_reply(&self) -> Arc<dyn TextTarget>;
}
