//! Core domain types
//!
//! These types describe one conversion job: the scheduler directives, the
//! runtime environment, the external tool and the arguments handed to it.
//! They are shared between the Lua loader (which builds them), the launcher
//! (which executes them) and the CLI (which displays them).

pub mod environment;
pub mod invocation;
pub mod job;
pub mod log;
