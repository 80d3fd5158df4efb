//! Bounded sandboxed execution for untrusted snippets
//!
//! Runs attacker-supplied code in an isolated worker process under a hard
//! wall-clock deadline, and reduces whatever comes back to a chat-safe,
//! length-bounded string. The worker itself is an external executable; this
//! crate owns its lifecycle, the deadline, and the output contract.

pub mod blacklist;
pub mod normalize;
pub mod output;

mod invoker;
mod runner;
mod worker;

pub use invoker::{run_timed, InvokeError, TimedInvoker, WorkerOutput};
pub use runner::SandboxRunner;
pub use worker::WorkerCommand;
