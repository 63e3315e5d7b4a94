#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Transaction orchestration for the package console
//!
//! A [`Command`] resolves its arguments with the [`Resolver`], issues one
//! request and hands it to the [`TransactionDriver`], which renders events
//! as they arrive, lets the [`RemediationCoordinator`] recover from missing
//! keys, and returns once the service reports a terminal event.
//!
//! All per-process state lives in the [`TransactionContext`]: the bus, the
//! console, the prompt and the [`CancellationCoordinator`] every open
//! handle is registered with.

mod cancel;
mod command;
mod context;
mod driver;
pub mod logging;
mod output;
mod progress;
mod prompt;
mod remediation;
mod resolver;

pub use cancel::{CancelToken, CancellationCoordinator, Interrupt};
pub use command::{Command, SearchKind};
pub use context::{TransactionContext, TransactionContextBuilder};
pub use driver::{Outcome, TransactionDriver};
pub use output::{Capture, Console};
pub use progress::{filled_cells, Direction, ProgressRenderer, PulseState};
pub use prompt::{
    parse_confirm, parse_number, run_blocking, Prompt, ScriptedPrompt, TermPrompt,
};
pub use remediation::{RemediationCoordinator, RemediationState};
pub use resolver::Resolver;
