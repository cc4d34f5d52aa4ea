//! Fact and requirement derivation from argument bindings.

use super::ConvertSettings;
use crate::caldera::{Fact, FactMatch, Parser, Requirement, TraitFact};
use crate::playbook::{Playbook, Step};

/// Marker wrapping a variable reference on both ends, as in `$$host$$`.
pub const VARIABLE_MARKER: &str = "$$";

/// Strip the variable markers from a token, or return it unchanged.
pub fn resolve_token(token: &str) -> &str {
    token
        .strip_prefix(VARIABLE_MARKER)
        .and_then(|inner| inner.strip_suffix(VARIABLE_MARKER))
        .unwrap_or(token)
}

/// Derives facts scoped to one playbook's name.
#[derive(Debug, Clone, Copy)]
pub struct FactDeriver<'a> {
    graph_name: &'a str,
    settings: &'a ConvertSettings,
}

impl<'a> FactDeriver<'a> {
    pub fn new(graph_name: &'a str, settings: &'a ConvertSettings) -> Self {
        Self { graph_name, settings }
    }

    /// One `<graph name>.<resolved name>` fact per token.
    ///
    /// Absent bindings derive nothing.
    pub fn derive(&self, tokens: Option<&[String]>) -> Vec<FactMatch> {
        tokens
            .unwrap_or_default()
            .iter()
            .map(|token| FactMatch::source(format!("{}.{}", self.graph_name, resolve_token(token))))
            .collect()
    }

    /// Requirements built from a step's inputs; empty when it has none.
    pub fn requirements(&self, step: &Step) -> Vec<Requirement> {
        let relationship_match = self.derive(step.in_args.as_deref());
        if relationship_match.is_empty() {
            return Vec::new();
        }
        vec![Requirement { module: self.settings.requirement_module.clone(), relationship_match }]
    }

    /// Parsers built from a step's outputs; empty when it has none.
    pub fn parsers(&self, step: &Step) -> Vec<Parser> {
        let parserconfigs = self.derive(step.out_args.as_deref());
        if parserconfigs.is_empty() {
            return Vec::new();
        }
        vec![Parser { module: self.settings.parser_module.clone(), parserconfigs }]
    }

    /// Facts contributed by a step's own bindings, inputs first.
    pub fn binding_facts(&self, step: &Step) -> Vec<Fact> {
        self.derive(step.in_args.as_deref())
            .into_iter()
            .chain(self.derive(step.out_args.as_deref()))
            .map(Fact::Match)
            .collect()
    }
}

/// Seed facts for every declared playbook variable, in declaration order.
pub fn variable_facts(playbook: &Playbook) -> Vec<Fact> {
    playbook
        .playbook_variables
        .iter()
        .map(|(name, variable)| {
            Fact::Trait(TraitFact {
                trait_name: resolve_token(name).to_string(),
                value: Some(variable.initial_value()),
                score: 1,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playbook::{parse_playbook_str, StepKind};

    fn step(in_args: Option<Vec<&str>>, out_args: Option<Vec<&str>>) -> Step {
        Step {
            name: "Step".to_string(),
            description: String::new(),
            timeout: None,
            on_completion: None,
            on_success: None,
            on_failure: None,
            in_args: in_args.map(|a| a.into_iter().map(String::from).collect()),
            out_args: out_args.map(|a| a.into_iter().map(String::from).collect()),
            kind: StepKind::End,
        }
    }

    #[test]
    fn test_resolve_token() {
        assert_eq!(resolve_token("$$X$$"), "X");
        assert_eq!(resolve_token("Y"), "Y");
        assert_eq!(resolve_token("$$"), "$$");
        assert_eq!(resolve_token("$$half"), "$$half");
    }

    #[test]
    fn test_derive_scopes_to_graph_name() {
        let settings = ConvertSettings::default();
        let deriver = FactDeriver::new("G", &settings);
        let tokens = vec!["$$X$$".to_string(), "Y".to_string()];

        assert_eq!(
            deriver.derive(Some(&tokens)),
            vec![FactMatch::source("G.X"), FactMatch::source("G.Y")]
        );
    }

    #[test]
    fn test_requirements_from_in_args() {
        let settings = ConvertSettings::default();
        let deriver = FactDeriver::new("Test Playbook Name", &settings);
        let requirements = deriver.requirements(&step(Some(vec!["test_in_arg", "$$Test_Var_3$$"]), None));

        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].module, "plugins.stockpile.app.requirements.basic");
        assert_eq!(
            requirements[0].relationship_match,
            vec![
                FactMatch::source("Test Playbook Name.test_in_arg"),
                FactMatch::source("Test Playbook Name.Test_Var_3"),
            ]
        );
    }

    #[test]
    fn test_absent_bindings_yield_nothing() {
        let settings = ConvertSettings::default();
        let deriver = FactDeriver::new("G", &settings);
        let bare = step(None, Some(Vec::new()));

        assert!(deriver.requirements(&bare).is_empty());
        assert!(deriver.parsers(&bare).is_empty());
        assert!(deriver.binding_facts(&bare).is_empty());
    }

    #[test]
    fn test_parsers_from_out_args() {
        let settings = ConvertSettings::default();
        let deriver = FactDeriver::new("G", &settings);
        let parsers = deriver.parsers(&step(None, Some(vec!["$$Test_Var_2$$", "$$Test_Var_1$$"])));

        assert_eq!(parsers[0].module, "plugins.stockpile.app.parsers.basic");
        assert_eq!(
            parsers[0].parserconfigs,
            vec![FactMatch::source("G.Test_Var_2"), FactMatch::source("G.Test_Var_1")]
        );
    }

    #[test]
    fn test_variable_facts() {
        let playbook = parse_playbook_str(
            r#"{
                "id": "p", "name": "P", "workflow_start": "s",
                "playbook_variables": { "$$Test_Var_1$$": "", "$$Test_Var_2$$": { "value": "x" } },
                "workflow": { "s": { "type": "start" } }
            }"#,
        )
        .unwrap();

        assert_eq!(
            variable_facts(&playbook),
            vec![
                Fact::Trait(TraitFact { trait_name: "Test_Var_1".into(), value: Some(String::new()), score: 1 }),
                Fact::Trait(TraitFact { trait_name: "Test_Var_2".into(), value: Some("x".into()), score: 1 }),
            ]
        );
    }
}
