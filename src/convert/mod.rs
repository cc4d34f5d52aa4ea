//! Playbook to Caldera conversion.
//!
//! The [`Converter`] walks a playbook's workflow graph, dispatching each
//! step to its handler. Handlers translate commands into abilities and
//! derive facts from argument bindings; embedded playbooks are converted
//! recursively and contribute their facts to the embedding playbook.

mod batch;
mod engine;
mod facts;
mod handlers;
mod ids;
mod translator;

pub use batch::{convert_batch, BatchConfig, BatchOutcome};
pub use engine::{ConversionReport, ConvertSettings, Converter, GraphArena, Session};
pub use facts::{resolve_token, variable_facts, FactDeriver, VARIABLE_MARKER};
pub use ids::{IdGenerator, ID_TEMPLATE};
pub use translator::{CommandKind, CommandTranslator, Translation, REFERENCE_COMMAND};
