//! Top-level run mode selector.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Which components a run invokes.
///
/// - `Inject`: replay `tx*`/`lo*` statement files.
/// - `Copy`: move withdrawals into the blocks database.
/// - `Migrate`: apply schema sets for blocks, transactions, logs.
/// - `All`: inject, copy, then migrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    All,
    Inject,
    Copy,
    Migrate,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Inject => "inject",
            Self::Copy => "copy",
            Self::Migrate => "migrate",
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(String);

impl Display for ParseModeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported mode `{}`; expected all|inject|copy|migrate",
            self.0
        )
    }
}

impl Error for ParseModeError {}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "inject" => Ok(Self::Inject),
            "copy" => Ok(Self::Copy),
            "migrate" => Ok(Self::Migrate),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}
