//! Transport surfaces of a stage agent.
//!
//! Both surfaces call [`StageAgent::handle`](crate::agents::StageAgent::handle)
//! and nothing else.

pub mod http;
pub mod message;

pub use http::{serve, stage_router, StageHealth, SUCCESS_HEADER};
pub use message::{Mailbox, MailboxError};
