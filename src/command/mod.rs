//! Command registry with keybinding dispatch

mod keybinding;
mod registry;

pub use keybinding::{KeyBinding, Modifiers};
pub use registry::{Command, CommandRegistry};
