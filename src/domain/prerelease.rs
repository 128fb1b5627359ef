//! Pre-release stages for semantic versions
//!
//! Only the three git-flow stages are recognised, and a stage always carries
//! a counter (`alpha.1`, `beta.3`, `rc.2`).

use crate::error::{ReleaseError, Result};
use std::fmt;
use std::str::FromStr;

/// Pre-release stage, ordered `Alpha < Beta < Rc`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Alpha pre-release
    Alpha,
    /// Beta pre-release
    Beta,
    /// Release candidate
    Rc,
}

impl Stage {
    /// The stage that follows this one, if any
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Alpha => Some(Stage::Beta),
            Stage::Beta => Some(Stage::Rc),
            Stage::Rc => None,
        }
    }
}

impl FromStr for Stage {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "alpha" => Ok(Stage::Alpha),
            "beta" => Ok(Stage::Beta),
            "rc" => Ok(Stage::Rc),
            other => Err(ReleaseError::format(other)),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Alpha => write!(f, "alpha"),
            Stage::Beta => write!(f, "beta"),
            Stage::Rc => write!(f, "rc"),
        }
    }
}

/// Stage plus counter, e.g. "beta.2"
///
/// Field order matters: the derived ordering compares the stage first and
/// the counter second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreRelease {
    pub stage: Stage,
    pub counter: u32,
}

impl PreRelease {
    pub fn new(stage: Stage, counter: u32) -> Self {
        PreRelease { stage, counter }
    }

    /// First iteration of a stage
    pub fn first(stage: Stage) -> Self {
        PreRelease { stage, counter: 1 }
    }

    /// Same stage, counter + 1 (saturating at `u32::MAX`)
    pub fn increment(&self) -> Self {
        PreRelease {
            stage: self.stage,
            counter: self.counter.saturating_add(1),
        }
    }
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.stage, self.counter)
    }
}
