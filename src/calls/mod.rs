//! Call lifecycle over SEPP signaling.
//!
//! One [`Call`] drives one call over one signaling connection: it sends the
//! offer, waits for the server's answer, then fans the call's events out to
//! the registered handlers until the call is terminated or closed.
//!
//! # Architecture
//!
//! - [`CallInfo`] & [`CallOptions`]: where, as whom and how the call is placed
//! - [`CallState`]: state machine tracking the call lifecycle
//! - [`Call`]: handshake, dispatch and termination
//!
//! # Protocol Overview
//!
//! ```text
//! client                      server
//!   call_start  ------------->
//!               <-------------  memberlist (optional, ignored)
//!               <-------------  call_accepted | call_rejected
//!   ...         <-------------  sdp_update, memberlist, source_update
//!   call_terminate ---------->
//!               <-------------  call_terminated
//! ```

mod call;
mod error;
mod info;
mod state;

pub use call::Call;
pub use error::CallError;
pub use info::{CallDetails, CallInfo, CallOptions};
pub use state::{CallId, CallState, CallTransition, InvalidTransition};
