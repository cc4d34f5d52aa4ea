//! Caldera artifacts and their emission.
//!
//! Abilities are emitted as they are built during traversal; profiles and
//! sources once a top-level playbook finishes converting.

mod emitter;
mod types;

pub use emitter::{ArtifactEmitter, FsEmitter, MemoryEmitter};
pub use types::{
    Ability, ConversionManifest, Executor, Fact, FactMatch, Parser, Platform, Profile,
    Relationship, Requirement, Sources, TraitFact, PLACEHOLDER_TACTIC, PLACEHOLDER_TECHNIQUE_ID,
};
