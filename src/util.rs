pub mod command;
pub mod format;
pub mod object;
