//! CACAO playbook model and loading.
//!
//! Playbooks are JSON documents describing a workflow graph of typed steps
//! with branching, looping and sub-playbook embedding.

mod parser;
mod schema;

pub use parser::{
    discover_playbooks, parse_playbook, parse_playbook_str, FsGraphLoader, GraphLoader,
    MapGraphLoader,
};
pub use schema::{CommandData, Playbook, Step, StepKind, Variable};
