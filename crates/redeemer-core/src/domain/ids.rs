//! Run identifiers.
//!
//! # ULID ベースの RunId
//! 1 回の run（start イベントと terminal イベントの組）を相関させるための ID です。
//! - **時刻でソート可能**: run の開始順に並ぶ
//! - **調整不要**: プロセス再起動をまたいでも衝突しない

use std::fmt;

use serde::{Serialize, Serializer};
use ulid::Ulid;

/// Identifier of one run (one worker invocation and its parse).
///
/// Displayed and serialized as `run-<ULID>`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(Ulid);

impl RunId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for RunId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

impl Serialize for RunId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
