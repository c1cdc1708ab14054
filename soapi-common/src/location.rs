//! Physical playback locations
//!
//! Exactly one location is selected per run. The kebab-case name is what users
//! type on the command line and in `config.toml`; the wire id is what the
//! remote controller sends in the trigger call.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Location selector for the remote trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Location {
    SouthVader,
    NorthVader,
    TheL,
    SouthStairs,
    NorthStairs,
}

impl Location {
    /// Every selectable location, in help-text order
    pub const ALL: [Location; 5] = [
        Location::SouthVader,
        Location::NorthVader,
        Location::TheL,
        Location::SouthStairs,
        Location::NorthStairs,
    ];

    /// User-facing name (`south-vader`)
    pub fn name(&self) -> &'static str {
        match self {
            Location::SouthVader => "south-vader",
            Location::NorthVader => "north-vader",
            Location::TheL => "the-l",
            Location::SouthStairs => "south-stairs",
            Location::NorthStairs => "north-stairs",
        }
    }

    /// Identifier sent to the actuation endpoint (`SOUTH_VADER`)
    pub fn wire_id(&self) -> &'static str {
        match self {
            Location::SouthVader => "SOUTH_VADER",
            Location::NorthVader => "NORTH_VADER",
            Location::TheL => "THE_L",
            Location::SouthStairs => "SOUTH_STAIRS",
            Location::NorthStairs => "NORTH_STAIRS",
        }
    }

    /// Short alias accepted alongside the full name (`sv`)
    pub fn short_alias(&self) -> &'static str {
        match self {
            Location::SouthVader => "sv",
            Location::NorthVader => "nv",
            Location::TheL => "l",
            Location::SouthStairs => "ss",
            Location::NorthStairs => "ns",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Location {
    type Err = Error;

    /// Accepts the kebab name, the wire id, or the short alias, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Location::ALL
            .into_iter()
            .find(|loc| loc.name() == normalized || loc.short_alias() == normalized)
            .ok_or_else(|| {
                let names: Vec<&str> = Location::ALL.iter().map(|l| l.name()).collect();
                Error::InvalidInput(format!(
                    "unknown location '{}' (expected one of: {})",
                    s,
                    names.join(", ")
                ))
            })
    }
}
