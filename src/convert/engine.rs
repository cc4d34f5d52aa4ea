//! Workflow traversal engine.
//!
//! A [`Converter`] walks a playbook's workflow graph from its start step,
//! dispatching every reachable step to its handler exactly once. The
//! visited set lives in the per-traversal [`Session`], so a [`Playbook`]
//! itself is never mutated and may be shared between traversals.
//!
//! After a step's handler runs, its `on_completion`, `on_success` and
//! `on_failure` targets are converted in that order. Each is followed
//! independently of the others.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;

use super::ids::IdGenerator;
use crate::caldera::{
    Ability, ArtifactEmitter, ConversionManifest, Fact, Profile, Relationship, Sources,
};
use crate::error::{ConvertError, ConvertResult, LoadError};
use crate::playbook::{GraphLoader, Playbook, StepKind};

/// Knobs that shape the generated abilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSettings {
    /// Module tag of generated requirements
    pub requirement_module: String,
    /// Module tag of generated parsers
    pub parser_module: String,
    /// Executor timeout for steps that declare none
    pub default_timeout: u64,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self {
            requirement_module: "plugins.stockpile.app.requirements.basic".to_string(),
            parser_module: "plugins.stockpile.app.parsers.basic".to_string(),
            default_timeout: 60,
        }
    }
}

/// State of one traversal of one playbook.
#[derive(Debug)]
pub struct Session {
    pub(crate) graph: Arc<Playbook>,
    pub(crate) visited: HashSet<String>,
    pub(crate) dispatch_order: Vec<String>,
    pub(crate) produced: HashMap<String, Vec<String>>,
    pub(crate) facts: Vec<Fact>,
    pub(crate) relationships: Vec<Relationship>,
    pub(crate) abilities_emitted: usize,
    /// Ids of the playbooks embedding this one, outermost first, ending with this one
    pub(crate) lineage: Vec<String>,
    adversary_id: String,
    sources_id: String,
    objective_id: String,
}

impl Session {
    /// Start a session for a top-level playbook.
    pub fn new(graph: Arc<Playbook>, ids: &mut IdGenerator) -> Self {
        let lineage = vec![graph.id.clone()];
        Self::with_lineage(graph, lineage, ids)
    }

    /// Start a session for a playbook embedded by this one.
    pub(crate) fn nested(&self, graph: Arc<Playbook>, ids: &mut IdGenerator) -> Self {
        let mut lineage = self.lineage.clone();
        lineage.push(graph.id.clone());
        Self::with_lineage(graph, lineage, ids)
    }

    fn with_lineage(graph: Arc<Playbook>, lineage: Vec<String>, ids: &mut IdGenerator) -> Self {
        Self {
            graph,
            visited: HashSet::new(),
            dispatch_order: Vec::new(),
            produced: HashMap::new(),
            facts: Vec::new(),
            relationships: Vec::new(),
            abilities_emitted: 0,
            lineage,
            adversary_id: ids.generate(),
            sources_id: ids.generate(),
            objective_id: ids.generate(),
        }
    }

    /// The playbook being traversed.
    pub fn graph(&self) -> &Playbook {
        &self.graph
    }

    /// Whether a step has been dispatched.
    pub fn is_visited(&self, step_id: &str) -> bool {
        self.visited.contains(step_id)
    }

    /// Step ids in the order they were dispatched.
    pub fn dispatch_order(&self) -> &[String] {
        &self.dispatch_order
    }

    /// Ability ids a step produced.
    pub fn produced(&self, step_id: &str) -> &[String] {
        self.produced.get(step_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Accumulated facts, including those of embedded playbooks.
    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Number of abilities emitted, including those of embedded playbooks.
    pub fn abilities_emitted(&self) -> usize {
        self.abilities_emitted
    }

    /// Produced ability ids of every visited step, in workflow order.
    pub fn atomic_ordering(&self) -> Vec<String> {
        self.graph
            .workflow
            .keys()
            .filter_map(|id| self.produced.get(id))
            .flatten()
            .cloned()
            .collect()
    }

    /// The adversary profile of this playbook.
    pub fn profile(&self) -> Profile {
        Profile {
            adversary_id: self.adversary_id.clone(),
            name: self.graph.name.clone(),
            description: self.graph.description.clone().unwrap_or_default(),
            atomic_ordering: self.atomic_ordering(),
            objective: self.objective_id.clone(),
            tags: Vec::new(),
        }
    }

    /// The fact sources of this playbook.
    pub fn sources(&self) -> Sources {
        Sources {
            id: self.sources_id.clone(),
            name: format!("{} sources", self.graph.name),
            facts: self.facts.clone(),
            relationships: self.relationships.clone(),
        }
    }

    /// What this traversal produced.
    pub fn manifest(&self) -> ConversionManifest {
        let steps: IndexMap<String, Vec<String>> = self
            .graph
            .workflow
            .keys()
            .filter(|id| self.visited.contains(*id))
            .map(|id| (id.clone(), self.produced(id).to_vec()))
            .collect();

        ConversionManifest {
            id: self.graph.id.clone(),
            name: self.graph.name.clone(),
            adversary_id: self.adversary_id.clone(),
            sources_id: self.sources_id.clone(),
            objective_id: self.objective_id.clone(),
            workflow_start: self.graph.workflow_start.clone(),
            steps,
            facts: self.facts.clone(),
            relationships: self.relationships.clone(),
        }
    }
}

/// Embedded playbooks loaded so far, keyed by the reference they were loaded with.
#[derive(Debug, Default)]
pub struct GraphArena {
    graphs: HashMap<String, Arc<Playbook>>,
}

impl GraphArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the playbook for `reference`, loading it on first use.
    pub fn get_or_load<L: GraphLoader + ?Sized>(
        &mut self,
        reference: &str,
        loader: &L,
    ) -> Result<Arc<Playbook>, LoadError> {
        if let Some(graph) = self.graphs.get(reference) {
            return Ok(Arc::clone(graph));
        }
        let graph = Arc::new(loader.load(reference)?);
        self.graphs.insert(reference.to_string(), Arc::clone(&graph));
        Ok(graph)
    }

    /// Number of loaded playbooks.
    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

/// Summary of one converted top-level playbook.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub playbook_id: String,
    pub profile: Profile,
    pub sources: Sources,
    pub dispatch_order: Vec<String>,
    pub abilities_emitted: usize,
}

/// Converts playbooks into Caldera artifacts.
#[derive(Debug)]
pub struct Converter<L, E> {
    pub(crate) loader: L,
    pub(crate) emitter: E,
    pub(crate) ids: IdGenerator,
    pub(crate) arena: GraphArena,
    pub(crate) settings: ConvertSettings,
}

impl<L: GraphLoader, E: ArtifactEmitter> Converter<L, E> {
    /// Create a converter with ids seeded from the operating system.
    pub fn new(loader: L, emitter: E, settings: ConvertSettings) -> ConvertResult<Self> {
        Ok(Self::with_ids(loader, emitter, settings, IdGenerator::from_entropy()?))
    }

    /// Create a converter with the given id generator.
    pub fn with_ids(loader: L, emitter: E, settings: ConvertSettings, ids: IdGenerator) -> Self {
        Self { loader, emitter, ids, arena: GraphArena::new(), settings }
    }

    /// The emitter artifacts are handed to.
    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    /// Consume the converter, returning its emitter.
    pub fn into_emitter(self) -> E {
        self.emitter
    }

    /// Embedded playbooks loaded so far.
    pub fn arena(&self) -> &GraphArena {
        &self.arena
    }

    /// Load a top-level playbook and start a session for it.
    pub fn open(&mut self, reference: &str) -> ConvertResult<Session> {
        let graph = Arc::new(self.loader.load_root(reference)?);
        Ok(Session::new(graph, &mut self.ids))
    }

    /// Convert a top-level playbook, emitting its abilities, sources and profile.
    pub fn convert_playbook(&mut self, reference: &str) -> ConvertResult<ConversionReport> {
        let mut session = self.open(reference)?;
        self.traverse(&mut session)?;

        let profile = session.profile();
        let sources = session.sources();
        self.emitter.emit_sources(&sources)?;
        self.emitter.emit_profile(&profile)?;

        tracing::info!(
            playbook = %session.graph.id,
            abilities = session.abilities_emitted,
            facts = session.facts.len(),
            "Converted playbook"
        );

        Ok(ConversionReport {
            playbook_id: session.graph.id.clone(),
            profile,
            sources,
            dispatch_order: session.dispatch_order,
            abilities_emitted: session.abilities_emitted,
        })
    }

    /// Walk a session's playbook from its start step and emit its manifest.
    pub fn traverse(&mut self, session: &mut Session) -> ConvertResult<()> {
        let start = session.graph.workflow_start.clone();
        tracing::debug!(playbook = %session.graph.id, start = %start, "Traversing workflow");
        self.convert(session, &start)?;
        self.emitter.emit_manifest(&session.manifest())
    }

    /// Convert one step and everything reachable from it.
    ///
    /// Steps already visited in this session return immediately, so each
    /// step's handler runs at most once however many edges lead to it.
    pub fn convert(&mut self, session: &mut Session, step_id: &str) -> ConvertResult<()> {
        let graph = Arc::clone(&session.graph);
        let step = graph.step(step_id).ok_or_else(|| ConvertError::MissingStep {
            playbook: graph.id.clone(),
            step: step_id.to_string(),
        })?;

        if !session.visited.insert(step_id.to_string()) {
            tracing::trace!(step = step_id, "Already converted");
            return Ok(());
        }
        session.dispatch_order.push(step_id.to_string());
        tracing::debug!(step = step_id, kind = step.kind.as_str(), "Converting step");

        match &step.kind {
            StepKind::Start => self.handle_start(session, step_id)?,
            StepKind::End => self.handle_end(session, step_id)?,
            StepKind::Single { commands } => self.handle_single(session, step_id, step, commands)?,
            StepKind::Playbook { playbook_id } => {
                self.handle_playbook(session, step_id, step, playbook_id)?;
            }
            StepKind::Parallel { next_steps } => self.handle_parallel(session, next_steps)?,
            StepKind::IfCondition { on_true, on_false, .. } => {
                self.handle_if_condition(session, on_true, on_false)?;
            }
            StepKind::WhileCondition { on_true, on_false, .. } => {
                self.handle_while_condition(session, on_true, on_false)?;
            }
            StepKind::SwitchCondition { cases, .. } => self.handle_switch_condition(session, cases)?,
        }

        for next in [&step.on_completion, &step.on_success, &step.on_failure].into_iter().flatten() {
            self.convert(session, next)?;
        }

        Ok(())
    }

    /// Hand an ability to the emitter.
    pub(crate) fn emit(&mut self, session: &mut Session, ability: &Ability) -> ConvertResult<()> {
        self.emitter.emit_ability(ability)?;
        session.abilities_emitted += 1;
        tracing::debug!(ability = %ability.id, name = %ability.name, "Emitted ability");
        Ok(())
    }
}
