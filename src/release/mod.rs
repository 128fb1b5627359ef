//! Release state machine.
//!
//! The current branch is classified once and matched to a flow. A flow is a
//! list of [Step]s run by [driver::run]; a step may queue the branch of the
//! flow a user choice selects, or stop at the pause point.
//!
//! - `driver` - steps, plan and session
//! - `flows` - what each step does
//! - `guards` - clean / up-to-date / tag-absent checks
//! - `push` - multi-remote push ordering and support branches
//! - `machine` - start, continue and push entry points

pub mod driver;
pub mod flows;
pub mod guards;
pub mod machine;
pub mod push;

pub use driver::{ReleaseContext, ReleasePlan, Session, Step, StepResult};
pub use machine::{continue_release, push_remote_repositories, start_release};
