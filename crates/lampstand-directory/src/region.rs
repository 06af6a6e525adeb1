use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::DirectoryError;

/// Australian state or territory a directory entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Nsw,
    Vic,
    Qld,
    Sa,
    Wa,
    Tas,
    Nt,
    Act,
}

impl Region {
    pub const ALL: [Self; 8] = [
        Self::Nsw,
        Self::Vic,
        Self::Qld,
        Self::Sa,
        Self::Wa,
        Self::Tas,
        Self::Nt,
        Self::Act,
    ];

    /// Short postal code, e.g. `NSW`.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Nsw => "NSW",
            Self::Vic => "VIC",
            Self::Qld => "QLD",
            Self::Sa => "SA",
            Self::Wa => "WA",
            Self::Tas => "TAS",
            Self::Nt => "NT",
            Self::Act => "ACT",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Nsw => "New South Wales",
            Self::Vic => "Victoria",
            Self::Qld => "Queensland",
            Self::Sa => "South Australia",
            Self::Wa => "Western Australia",
            Self::Tas => "Tasmania",
            Self::Nt => "Northern Territory",
            Self::Act => "Australian Capital Territory",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Self::ALL
            .into_iter()
            .find(|region| region.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| DirectoryError::UnknownRegion(code.to_string()))
    }
}
