//! Playbook schema definitions.
//!
//! Defines the CACAO v1.0 document structure consumed by the converter. Only
//! the fields the converter reads are modelled; everything else in the
//! document is ignored on load.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A playbook: a named workflow graph with declared variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playbook {
    /// Playbook identifier (for example `playbook--<uuid>`)
    pub id: String,

    /// Display name, used as the prefix of every derived fact
    pub name: String,

    /// Description of what this playbook does
    #[serde(default)]
    pub description: Option<String>,

    /// Declared variables keyed by name, in authoring order
    #[serde(default)]
    pub playbook_variables: IndexMap<String, Variable>,

    /// Id of the first step
    pub workflow_start: String,

    /// Steps keyed by id, in authoring order
    #[serde(default)]
    pub workflow: IndexMap<String, Step>,
}

/// A variable declaration.
///
/// CACAO declares variables as objects carrying a `value`; older fixtures
/// give the initial value as a bare string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Variable {
    Value(String),
    Declared {
        #[serde(default, rename = "type")]
        var_type: Option<String>,
        #[serde(default)]
        value: Option<JsonValue>,
        #[serde(default)]
        description: Option<String>,
    },
}

impl Variable {
    /// Initial value of the variable, or an empty string.
    pub fn initial_value(&self) -> String {
        match self {
            Self::Value(value) => value.clone(),
            Self::Declared { value: Some(JsonValue::String(value)), .. } => value.clone(),
            Self::Declared { value: Some(JsonValue::Null) | None, .. } => String::new(),
            Self::Declared { value: Some(other), .. } => other.to_string(),
        }
    }
}

/// A workflow step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Name of the step
    #[serde(default)]
    pub name: String,

    /// Description of this step
    #[serde(default)]
    pub description: String,

    /// Timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Step to convert once this one completes
    #[serde(default)]
    pub on_completion: Option<String>,

    /// Step to convert on success
    #[serde(default)]
    pub on_success: Option<String>,

    /// Step to convert on failure
    #[serde(default)]
    pub on_failure: Option<String>,

    /// Input argument bindings
    #[serde(default)]
    pub in_args: Option<Vec<String>>,

    /// Output argument bindings
    #[serde(default)]
    pub out_args: Option<Vec<String>>,

    /// Variant-specific payload
    #[serde(flatten)]
    pub kind: StepKind,
}

/// Workflow step variants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StepKind {
    Start,
    End,
    Single {
        #[serde(default)]
        commands: Vec<CommandData>,
    },
    Playbook {
        playbook_id: String,
    },
    Parallel {
        #[serde(default)]
        next_steps: Vec<String>,
    },
    IfCondition {
        #[serde(default)]
        condition: Option<String>,
        #[serde(default)]
        on_true: Vec<String>,
        #[serde(default)]
        on_false: Vec<String>,
    },
    WhileCondition {
        #[serde(default)]
        condition: Option<String>,
        #[serde(default)]
        on_true: Vec<String>,
        on_false: String,
    },
    SwitchCondition {
        #[serde(default)]
        switch: Option<String>,
        #[serde(default)]
        cases: IndexMap<String, Vec<String>>,
    },
}

impl StepKind {
    /// The CACAO type tag of this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Single { .. } => "single",
            Self::Playbook { .. } => "playbook",
            Self::Parallel { .. } => "parallel",
            Self::IfCondition { .. } => "if-condition",
            Self::WhileCondition { .. } => "while-condition",
            Self::SwitchCondition { .. } => "switch-condition",
        }
    }
}

/// A command entry of a `single` step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandData {
    /// Command type tag (`http-api`, `ssh`, `bash`, ...)
    #[serde(rename = "type")]
    pub command_type: String,

    /// Inline command text
    #[serde(default)]
    pub command: Option<String>,

    /// Encoded command; for `attack-cmd` an object carrying the ability `id`
    #[serde(default)]
    pub command_b64: Option<JsonValue>,

    /// Command syntax version
    #[serde(default)]
    pub version: Option<String>,
}

impl CommandData {
    /// Raw command text, preferring `command` over `command_b64`.
    pub fn text(&self) -> String {
        if let Some(ref command) = self.command {
            return command.clone();
        }
        match self.command_b64 {
            Some(JsonValue::String(ref encoded)) => encoded.clone(),
            Some(ref other) => other.to_string(),
            None => String::new(),
        }
    }

    /// Id of the ability a reference command points at.
    pub fn referenced_id(&self) -> Option<String> {
        match self.command_b64 {
            Some(JsonValue::Object(ref object)) => {
                object.get("id").and_then(JsonValue::as_str).map(str::to_string)
            }
            Some(JsonValue::String(ref id)) => Some(id.clone()),
            _ => self.command.clone(),
        }
    }
}

impl Playbook {
    /// Get the number of steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.workflow.len()
    }

    /// Look up a step by id.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.workflow.get(id)
    }

    /// Get variable names.
    #[must_use]
    pub fn variable_names(&self) -> Vec<&str> {
        self.playbook_variables.keys().map(String::as_str).collect()
    }
}
