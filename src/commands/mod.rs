//! Bot command parsing and handling.

pub mod handler;
pub mod parser;

pub use handler::CommandHandler;
pub use parser::{parse_command, Command, CommandParseError};
