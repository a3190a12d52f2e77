//! CLI command implementations

pub mod check;
pub mod find;
pub mod watch;

pub use check::check;
pub use find::find;
pub use watch::{watch, WatchOptions};
