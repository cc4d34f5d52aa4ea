//! Step handlers.
//!
//! One handler per step variant. Control-flow variants convert their branch
//! targets in declaration order without evaluating any condition; only
//! `start`, `end` and `single` steps produce abilities.

use std::sync::Arc;

use indexmap::IndexMap;

use super::engine::{Converter, Session};
use super::facts::{variable_facts, FactDeriver};
use super::translator::{CommandTranslator, Translation};
use crate::caldera::{Ability, ArtifactEmitter};
use crate::error::{ConvertError, ConvertResult, LoadError};
use crate::playbook::{CommandData, GraphLoader, Step};

impl<L: GraphLoader, E: ArtifactEmitter> Converter<L, E> {
    /// Emit the start sentinel and reseed the session's facts from the
    /// playbook variables, replacing anything accumulated so far.
    pub(crate) fn handle_start(&mut self, session: &mut Session, step_id: &str) -> ConvertResult<()> {
        let graph = Arc::clone(&session.graph);
        let ability = Ability::new(
            self.ids.generate(),
            "Start Step",
            format!("Start Step for Playbook: {}", graph.name),
        )
        .with_tactic("Start");

        session.produced.insert(step_id.to_string(), vec![ability.id.clone()]);
        session.facts = variable_facts(&graph);
        self.emit(session, &ability)
    }

    /// Emit the end sentinel.
    pub(crate) fn handle_end(&mut self, session: &mut Session, step_id: &str) -> ConvertResult<()> {
        let ability = Ability::new(
            self.ids.generate(),
            "End Step",
            format!("End Step for Playbook: {}", session.graph.name),
        )
        .with_tactic("End");

        session.produced.insert(step_id.to_string(), vec![ability.id.clone()]);
        self.emit(session, &ability)
    }

    /// Translate each command into an ability, or record the id it references.
    pub(crate) fn handle_single(
        &mut self,
        session: &mut Session,
        step_id: &str,
        step: &Step,
        commands: &[CommandData],
    ) -> ConvertResult<()> {
        let graph = Arc::clone(&session.graph);
        let deriver = FactDeriver::new(&graph.name, &self.settings);
        let timeout = step.timeout.unwrap_or(self.settings.default_timeout);
        let mut translator =
            CommandTranslator::new(step, deriver.requirements(step), deriver.parsers(step), timeout);

        let mut produced = Vec::with_capacity(commands.len());
        for command in commands {
            match translator.translate(command, &mut self.ids) {
                Translation::Ability(ability) => {
                    produced.push(ability.id.clone());
                    self.emit(session, &ability)?;
                }
                Translation::Reference(id) => produced.push(id),
                Translation::DanglingReference => {
                    tracing::warn!(step = step_id, "Reference command names no ability; skipped");
                }
            }
        }

        session.produced.insert(step_id.to_string(), produced);
        Ok(())
    }

    /// Fully convert the embedded playbook and merge its facts into this
    /// session after the facts of the step's own bindings.
    ///
    /// Abilities of the embedded playbook are emitted but do not become part
    /// of this step's produced ids.
    pub(crate) fn handle_playbook(
        &mut self,
        session: &mut Session,
        step_id: &str,
        step: &Step,
        playbook_id: &str,
    ) -> ConvertResult<()> {
        let embedded = self.arena.get_or_load(playbook_id, &self.loader).map_err(|source| {
            match source {
                LoadError::NotFound(_) => ConvertError::MissingPlaybook {
                    step: step_id.to_string(),
                    reference: playbook_id.to_string(),
                    source,
                },
                other => ConvertError::GraphLoad(other),
            }
        })?;

        if session.lineage.contains(&embedded.id) {
            let mut chain = session.lineage.clone();
            chain.push(embedded.id.clone());
            return Err(ConvertError::EmbeddingCycle { chain });
        }

        let graph = Arc::clone(&session.graph);
        let binding_facts = FactDeriver::new(&graph.name, &self.settings).binding_facts(step);
        session.facts.extend(binding_facts);

        tracing::debug!(step = step_id, playbook = %embedded.id, "Entering embedded playbook");
        let mut nested = session.nested(embedded, &mut self.ids);
        self.traverse(&mut nested)?;

        session.abilities_emitted += nested.abilities_emitted;
        session.facts.append(&mut nested.facts);
        Ok(())
    }

    pub(crate) fn handle_parallel(
        &mut self,
        session: &mut Session,
        next_steps: &[String],
    ) -> ConvertResult<()> {
        for step_id in next_steps {
            self.convert(session, step_id)?;
        }
        Ok(())
    }

    /// Both branches are converted; the condition is never evaluated.
    pub(crate) fn handle_if_condition(
        &mut self,
        session: &mut Session,
        on_true: &[String],
        on_false: &[String],
    ) -> ConvertResult<()> {
        for step_id in on_true.iter().chain(on_false) {
            self.convert(session, step_id)?;
        }
        Ok(())
    }

    pub(crate) fn handle_while_condition(
        &mut self,
        session: &mut Session,
        on_true: &[String],
        on_false: &str,
    ) -> ConvertResult<()> {
        for step_id in on_true {
            self.convert(session, step_id)?;
        }
        self.convert(session, on_false)
    }

    /// Every case is converted, in declaration order.
    pub(crate) fn handle_switch_condition(
        &mut self,
        session: &mut Session,
        cases: &IndexMap<String, Vec<String>>,
    ) -> ConvertResult<()> {
        for step_id in cases.values().flatten() {
            self.convert(session, step_id)?;
        }
        Ok(())
    }
}
