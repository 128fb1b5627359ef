pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod metadata;
pub mod release;
pub mod tracker;
pub mod ui;

pub use error::{ReleaseError, Result};
