//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the application core and an
//! external system (local disk, spawned processes). Implementations live in
//! `src/adapters/`.

pub mod filesystem;
pub mod shell;

pub use filesystem::FileSystem;
pub use shell::{ShellExecutor, ShellOutput};
