#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Allow-list policy for execgate
//!
//! [`PolicyStore`] holds the compiled rules and swaps them atomically on
//! reload. [`CommandValidator`] decides whether a request may run.

mod parse;
mod rule;
mod store;
mod validator;

pub use parse::parse_command_line;
pub use rule::{ArgMismatch, ArgPattern, PolicyRule, ProgramMatcher};
pub use store::{PolicySet, PolicyStore};
pub use validator::{validate_against, CommandValidator, ValidationOutcome};
