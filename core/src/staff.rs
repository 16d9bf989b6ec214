//! Staff directory types.
//!
//! Staff profiles are read-only from the engine's perspective — the intake
//! and admin flows that create them are outside this core.

use crate::complaint::ParseEnumError;
use crate::types::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Profession {
    Electrician,
    Plumber,
    Cleaner,
    Mechanic,
    Other,
}

impl Profession {
    pub const ALL: &'static [Profession] = &[
        Self::Electrician,
        Self::Plumber,
        Self::Cleaner,
        Self::Mechanic,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electrician => "Electrician",
            Self::Plumber => "Plumber",
            Self::Cleaner => "Cleaner",
            Self::Mechanic => "Mechanic",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Profession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profession {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|p| p.as_str() == s)
            .copied()
            .ok_or_else(|| ParseEnumError {
                field: "profession",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffProfile {
    pub staff_id: UserId,
    pub full_name: String,
    pub profession: Profession,
    pub city: String,
}
