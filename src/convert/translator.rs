//! Command translation.
//!
//! Turns the commands of a `single` step into abilities carrying one executor
//! per supported platform. The executor program depends on the command type:
//!
//! | Command type  | linux  | darwin | windows |
//! |---------------|--------|--------|---------|
//! | `http-api`    | sh     | sh     | pwsh    |
//! | `ssh`         | sh     | sh     | pwsh    |
//! | `bash`        | bash   | bash   | bash    |
//! | `openc2-json` | native | native | native  |

use super::ids::IdGenerator;
use crate::caldera::{Ability, Executor, Parser, Platform, Requirement};
use crate::playbook::{CommandData, Step};

/// Command type tag of a reference to an existing ability.
pub const REFERENCE_COMMAND: &str = "attack-cmd";

/// Known command types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind<'a> {
    HttpApi,
    Ssh,
    Bash,
    OpenC2Json,
    /// Points at an ability that already exists
    Reference,
    /// Any other tag. Translated into an ability without executors.
    Unrecognized(&'a str),
}

impl<'a> CommandKind<'a> {
    /// Classify a command type tag.
    pub fn parse(tag: &'a str) -> Self {
        match tag {
            "http-api" => Self::HttpApi,
            "ssh" => Self::Ssh,
            "bash" => Self::Bash,
            "openc2-json" => Self::OpenC2Json,
            REFERENCE_COMMAND => Self::Reference,
            other => Self::Unrecognized(other),
        }
    }

    /// Program used on `platform`, or `None` when this kind has no executors.
    pub fn program(self, platform: Platform) -> Option<&'static str> {
        match (self, platform) {
            (Self::HttpApi | Self::Ssh, Platform::Windows) => Some("pwsh"),
            (Self::HttpApi | Self::Ssh, _) => Some("sh"),
            (Self::Bash, _) => Some("bash"),
            (Self::OpenC2Json, _) => Some("native"),
            (Self::Reference | Self::Unrecognized(_), _) => None,
        }
    }
}

/// Outcome of translating one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// A new ability to emit
    Ability(Ability),
    /// Id of an existing ability
    Reference(String),
    /// A reference command that names no ability
    DanglingReference,
}

/// Translates the commands of one step.
///
/// Requirements and parsers are derived once per step and shared by every
/// ability the step produces.
#[derive(Debug)]
pub struct CommandTranslator<'a> {
    step: &'a Step,
    requirements: Vec<Requirement>,
    parsers: Vec<Parser>,
    timeout: u64,
    built: usize,
}

impl<'a> CommandTranslator<'a> {
    pub fn new(
        step: &'a Step,
        requirements: Vec<Requirement>,
        parsers: Vec<Parser>,
        timeout: u64,
    ) -> Self {
        Self { step, requirements, parsers, timeout, built: 0 }
    }

    /// Translate one command.
    pub fn translate(&mut self, command: &CommandData, ids: &mut IdGenerator) -> Translation {
        let kind = CommandKind::parse(&command.command_type);

        if kind == CommandKind::Reference {
            return command
                .referenced_id()
                .map_or(Translation::DanglingReference, Translation::Reference);
        }

        self.built += 1;
        let mut ability = Ability::new(
            ids.generate(),
            format!("{}: {}", self.step.name, self.built),
            self.step.description.clone(),
        );
        ability.requirements = self.requirements.clone();
        ability.executors = self.executors(kind, &command.text());

        if let CommandKind::Unrecognized(tag) = kind {
            tracing::warn!(
                step = self.step.name,
                command_type = tag,
                ability = ability.id,
                "Unrecognized command type; ability has no executors"
            );
        }

        Translation::Ability(ability)
    }

    /// One executor per platform, all running the same command.
    fn executors(&self, kind: CommandKind<'_>, command: &str) -> Vec<Executor> {
        Platform::ALL
            .iter()
            .filter_map(|&platform| {
                kind.program(platform).map(|program| Executor {
                    platform,
                    name: program.to_string(),
                    command: command.to_string(),
                    timeout: self.timeout,
                    payloads: Vec::new(),
                    uploads: Vec::new(),
                    cleanup: Vec::new(),
                    parsers: self.parsers.clone(),
                })
            })
            .collect()
    }
}
