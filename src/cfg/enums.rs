// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

/// Payload-class capacity floor selector (spec. "small/medium/large").
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum PayloadClass {
    #[serde(rename = "small")]
    Small = 0,
    #[serde(rename = "medium")]
    Medium = 1,
    #[serde(rename = "large")]
    Large = 2,
}

impl PayloadClass {
    pub const ALL: [PayloadClass; 3] =
        [PayloadClass::Small, PayloadClass::Medium, PayloadClass::Large];

    pub fn as_index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PayloadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PayloadClass::Small => "small",
            PayloadClass::Medium => "medium",
            PayloadClass::Large => "large",
        })
    }
}

/// Bundle forwarding priority, used by the Overbooking Manager's bumping
/// queues.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Priority {
    #[serde(rename = "bulk")]
    Bulk = 0,
    #[serde(rename = "standard")]
    Standard = 1,
    #[serde(rename = "urgent")]
    Urgent = 2,
}

/// Yes/No enumeration, mirroring the ION admin-CLI boolean style
/// ("Yes"/"No" toggles such as `enforce_schedule`/`purge`).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    #[serde(
        rename = "Yes",
        alias = "yes",
        alias = "YES",
        alias = "true",
        alias = "True",
        alias = "1"
    )]
    Yes,
    #[serde(
        rename = "No",
        alias = "no",
        alias = "NO",
        alias = "false",
        alias = "False",
        alias = "0"
    )]
    No,
}

impl fmt::Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            YesNo::Yes => "Yes",
            YesNo::No => "No",
        })
    }
}

impl From<bool> for YesNo {
    fn from(b: bool) -> Self {
        if b { YesNo::Yes } else { YesNo::No }
    }
}

impl YesNo {
    pub fn as_bool(self) -> bool {
        matches!(self, YesNo::Yes)
    }
}
