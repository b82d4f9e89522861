pub mod almanac;
pub mod cli;
pub mod config;
pub mod generate;
pub mod render;
pub mod stats;
pub mod timespan;

pub use crate::generate::ReportEngine;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StratusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Unrecognized report mode: {0}")]
    UnrecognizedMode(String),

    #[error("Destination unavailable: {0}")]
    Destination(String),

    #[error("Template error: {0}")]
    Template(String),
}

pub type Result<T> = std::result::Result<T, StratusError>;
