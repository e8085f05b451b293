pub mod actions;
pub mod commands;
pub mod error;
pub mod input;
pub mod registry;
pub mod tools;

pub use commands::{CommandLog, Entry, LoggedAction};
pub use error::CommandError;
pub use input::InputEvent;
pub use registry::CommandKind;
pub use tools::{DrawTool, EditRequest, SelectTool, Tool, ToolContext, ToolKind};
