//! Error types for view lifecycle binding

use mosaic_events::EventError;
use std::fmt;
use thiserror::Error;

/// What a view needed at mount time but could not find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPrecondition {
    /// The host has no root element for the view's ID
    RootElement,
    /// Neither the context nor the host supplied initial data
    InitialData,
}

impl fmt::Display for MissingPrecondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingPrecondition::RootElement => write!(f, "root element not found"),
            MissingPrecondition::InitialData => write!(f, "initial data not available"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Cannot mount {view}: {missing}")]
    MountPrecondition {
        view: String,
        missing: MissingPrecondition,
    },

    #[error("View {0} has already been disposed")]
    Disposed(String),

    #[error(transparent)]
    Event(#[from] EventError),
}

pub type Result<T> = std::result::Result<T, ViewError>;
