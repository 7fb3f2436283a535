//! Process-wide timer primitives.
//!
//! These run below the actor layer: each active timer owns one runtime task
//! and invokes its fire callback there, through a caller-supplied
//! [`ProtectedCall`](crate::ProtectedCall). Actors never hand user callbacks to
//! these primitives directly; see [`Timers`](crate::Timers).
//!
//! Dropping a handle never stops its timer.

mod forever;
mod once;
mod once_forever;

pub use forever::{ForeverTimer, forever};
pub use once::{OnceTimer, once};
pub use once_forever::{OnceForeverTimer, once_forever};

#[cfg(test)]
mod tests;
