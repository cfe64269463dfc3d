//! External job requests, process supervision and presentation-loop callbacks.

mod dispatch;
mod process;
mod request;

pub use dispatch::{UiDispatcher, UiScheduler, UiTask};
pub use process::{JobHandle, JobState, ProcessManager, SpawnError};
pub use request::{JobCommand, JobKind, JobParams, JobRequest, PreparedJob, RequestError};
