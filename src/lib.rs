//! # cacao-caldera
//!
//! Convert CACAO security playbooks into Caldera abilities, adversary
//! profiles and fact sources.
//!
//! A playbook is a workflow graph of typed steps with branching, looping and
//! sub-playbook embedding. The converter walks that graph once from its start
//! step and emits:
//!
//! - one ability per command of every `single` step, packaged for linux,
//!   darwin and windows, plus sentinel abilities for `start` and `end` steps
//! - an adversary profile listing the abilities in workflow order
//! - a fact source seeded from playbook variables and argument bindings
//!
//! Conditions are never evaluated: every branch of every condition step is
//! converted.
//!
//! ## Quick Start
//!
//! ```bash
//! cacao-caldera convert playbooks/incident-response.json --output-dir caldera/
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::unnecessary_map_or)]
#![allow(clippy::use_self)]

pub mod caldera;
pub mod config;
pub mod convert;
pub mod error;
pub mod playbook;

pub use caldera::{Ability, ArtifactEmitter, FsEmitter, MemoryEmitter, Profile, Sources};
pub use config::Config;
pub use convert::{ConversionReport, ConvertSettings, Converter, IdGenerator, Session};
pub use error::{ConvertError, ConvertResult, LoadError};
pub use playbook::{FsGraphLoader, GraphLoader, Playbook, Step, StepKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "cacao-caldera";
