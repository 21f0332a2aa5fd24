//! Data models for the Zikroullah application.
//!
//! Field names serialize in camelCase to match the JSON the web client sends and reads.

mod group;
mod responses;
mod tally;
mod user;

pub use group::*;
pub use responses::*;
pub use tally::*;
pub use user::*;
