use thiserror::Error;

pub mod listing;
pub mod object;

#[derive(Debug, Error)]
pub enum BrowseError {
    #[error("{0}")]
    Transport(String),
    #[error("transfer cancelled by user")]
    Cancelled,
    #[error("{0}")]
    Validation(String),
}

impl BrowseError {
    pub fn is_transport(&self) -> bool {
        matches!(self, BrowseError::Transport(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BrowseError::Cancelled)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, BrowseError::Validation(_))
    }
}
