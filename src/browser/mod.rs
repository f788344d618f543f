//! Browser session management
//!
//! Launches (or attaches to) Chrome, keeps a single working tab, and waits for
//! the user to log in until the tree widget is present and initialised.

pub mod config;
pub mod session;

pub use config::{ConnectionOptions, LaunchOptions, WaitOptions};
pub use session::HarvestSession;
