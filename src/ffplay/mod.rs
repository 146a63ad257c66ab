//! ffplay module - spawns and controls the external ffplay player.
//!
//! Architecture:
//! - `handle.rs` - `Launcher`/`PlayerProcess` traits, exit status and launch errors
//! - `process.rs` - ffplay binary detection, argument template and process handle

mod handle;
mod process;

pub use handle::{LaunchError, Launcher, PlayerExit, PlayerProcess};
pub use process::{find_ffplay, FfplayLauncher, FfplayOptions, DEFAULT_PROTOCOL_WHITELIST};
