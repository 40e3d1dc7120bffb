//! RunMode - worker に状態変更を許すかどうか

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a run may submit transactions or only report.
///
/// Serialized as `"redeem"` / `"check"`, matching the `mode` field of the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunMode {
    #[serde(rename = "redeem")]
    Redeem,
    #[serde(rename = "check")]
    CheckOnly,
}

impl RunMode {
    pub fn from_check_flag(check_only: bool) -> Self {
        if check_only {
            Self::CheckOnly
        } else {
            Self::Redeem
        }
    }

    pub fn is_check_only(self) -> bool {
        matches!(self, Self::CheckOnly)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Redeem => "redeem",
            Self::CheckOnly => "check",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
