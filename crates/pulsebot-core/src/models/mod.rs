//! Data models for Pulsebot

mod alert;
mod command;

pub use alert::*;
pub use command::*;
