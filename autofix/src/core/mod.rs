//! Pure pipeline logic.
//!
//! Nothing here touches the filesystem or spawns processes. The only clock read
//! is [`branch::branch_name_now`]; everything else is deterministic in its
//! inputs.

pub mod apply;
pub mod branch;
pub mod remote;
pub mod report;
pub mod types;
