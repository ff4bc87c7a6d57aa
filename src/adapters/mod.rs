//! Adapter implementations of the port traits.
//!
//! - `live`: real disk and real processes.
//! - `recording`: wraps another adapter and captures every interaction.
//! - `replaying`: serves interactions back from a cassette.

pub mod live;
pub mod recording;
pub mod replaying;
