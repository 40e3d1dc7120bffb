//! Domain model (modes, run results, events, schedule state, ids).
//!
//! このモジュールは I/O を持たない値型だけを定義します。
//! - mode: RunMode（redeem / check）
//! - result: ParsedOutput, RunResult
//! - errors: RunErrorKind（失敗の分類）
//! - events: Event, EventRecord（外部に見える唯一の出力）
//! - state: ScheduleState, SchedulePhase
//! - ids: RunId

pub mod errors;
pub mod events;
pub mod ids;
pub mod mode;
pub mod result;
pub mod state;

pub use self::errors::RunErrorKind;
pub use self::events::{Event, EventRecord, RunError, StartedMode};
pub use self::ids::RunId;
pub use self::mode::RunMode;
pub use self::result::{ParsedOutput, RunResult};
pub use self::state::{SchedulePhase, ScheduleState};
