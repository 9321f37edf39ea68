pub mod client;
pub mod command;
pub mod types;

pub use client::{BackupTool, KopiaClient};
pub use command::ToolCommand;
