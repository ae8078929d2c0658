//! pdbjob Lua Infrastructure
//!
//! Loads job definitions written in Lua. Definitions are evaluated in a
//! sandbox without I/O, then converted into core domain types.

pub mod parser;
pub mod sandbox;

pub use parser::{load_job_definition, parse_job_definition};
pub use sandbox::{JOB_MODULE_STUBS, create_sandbox};
