//! Test-only doubles for the bus and platform seams.

mod bus;
mod telegram;

pub use bus::{PublishedMessage, RecordingBus, subject_matches};
pub use telegram::{RecordedCall, RecordingTelegramApi};
