//! The translation agents and the registry that resolves them by name.
//!
//! An agent is only a role handed to the model: a name, a system prompt and
//! the names of the agents it may hand a conversation to. Handoffs are
//! offered to the model as `transfer_to_<name>` function tools and resolved
//! back through [`AgentRegistry`], never by trusting free text.

use serde_json::json;
use std::collections::HashMap;

use crate::errors::RunError;
use crate::providers::types::tool::Tool;

pub const TRIAGE_AGENT: &str = "triage_agent";
pub const SPANISH_AGENT: &str = "spanish_agent";
pub const ENGLISH_AGENT: &str = "english_agent";
pub const FRENCH_AGENT: &str = "french_agent";

const HANDOFF_PREFIX: &str = "transfer_to_";

const TRIAGE_INSTRUCTIONS: &str = "You are an orchestrator agent that decides which agent should handle the task \
based on the language. Choose from: spanish_agent, english_agent, or french_agent.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    name: String,
    instructions: String,
    handoffs: Vec<String>,
}

impl Agent {
    pub fn new<N, I>(name: N, instructions: I) -> Self
    where
        N: Into<String>,
        I: Into<String>,
    {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            handoffs: Vec::new(),
        }
    }

    pub fn with_handoffs<S: Into<String>>(mut self, handoffs: impl IntoIterator<Item = S>) -> Self {
        self.handoffs = handoffs.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn handoffs(&self) -> &[String] {
        &self.handoffs
    }

    /// One function tool per delegate, in delegate order.
    pub fn handoff_tools(&self) -> Vec<Tool> {
        self.handoffs.iter().map(|target| handoff_tool(target)).collect()
    }
}

pub fn handoff_tool_name(agent_name: &str) -> String {
    format!("{}{}", HANDOFF_PREFIX, agent_name)
}

fn handoff_tool(agent_name: &str) -> Tool {
    Tool::new(
        handoff_tool_name(agent_name),
        format!("Handoff to the {} agent to handle the request.", agent_name),
        json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false,
            "required": []
        }),
    )
}

/// Explicit name -> agent mapping. Agents live as long as the registry.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
    by_name: HashMap<String, usize>,
}

impl AgentRegistry {
    /// Builds a registry, rejecting duplicate names and dangling handoffs.
    pub fn new(agents: Vec<Agent>) -> Result<Self, RunError> {
        let mut by_name = HashMap::with_capacity(agents.len());
        for (idx, agent) in agents.iter().enumerate() {
            if by_name.insert(agent.name().to_string(), idx).is_some() {
                return Err(RunError::DuplicateAgent(agent.name().to_string()));
            }
        }

        for agent in &agents {
            if let Some(target) = agent.handoffs().iter().find(|t| !by_name.contains_key(*t)) {
                return Err(RunError::UnknownAgent(target.clone()));
            }
        }

        Ok(Self { agents, by_name })
    }

    /// The triage agent and its three language agents.
    pub fn translation() -> Result<Self, RunError> {
        Self::new(translation_agents())
    }

    pub fn get(&self, name: &str) -> Result<&Agent, RunError> {
        self.by_name
            .get(name)
            .map(|&idx| &self.agents[idx])
            .ok_or_else(|| RunError::UnknownAgent(name.to_string()))
    }

    pub fn triage(&self) -> Result<&Agent, RunError> {
        self.get(TRIAGE_AGENT)
    }

    /// Maps a handoff tool call made while `from` was active to its target.
    ///
    /// Only delegates declared on `from` are accepted.
    pub fn resolve_handoff(&self, from: &Agent, tool_name: &str) -> Result<&Agent, RunError> {
        let target = tool_name
            .strip_prefix(HANDOFF_PREFIX)
            .filter(|target| from.handoffs().iter().any(|h| h == *target))
            .ok_or_else(|| RunError::UnknownHandoff(tool_name.to_string()))?;
        self.get(target)
    }

    /// Agent names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.agents.iter().map(Agent::name)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

pub fn translation_agents() -> Vec<Agent> {
    vec![
        Agent::new(
            SPANISH_AGENT,
            "You are a Spanish speaker. Translate any task into Spanish.",
        ),
        Agent::new(
            ENGLISH_AGENT,
            "You are an English speaker. Translate any task into English.",
        ),
        Agent::new(
            FRENCH_AGENT,
            "You are a French speaker. Translate any task into French.",
        ),
        Agent::new(TRIAGE_AGENT, TRIAGE_INSTRUCTIONS).with_handoffs([
            SPANISH_AGENT,
            ENGLISH_AGENT,
            FRENCH_AGENT,
        ]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_registry() {
        let registry = AgentRegistry::translation().unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec![SPANISH_AGENT, ENGLISH_AGENT, FRENCH_AGENT, TRIAGE_AGENT]
        );

        let triage = registry.triage().unwrap();
        assert_eq!(triage.handoffs(), [SPANISH_AGENT, ENGLISH_AGENT, FRENCH_AGENT]);
        assert!(triage.instructions().contains("spanish_agent, english_agent, or french_agent"));

        for leaf in [SPANISH_AGENT, ENGLISH_AGENT, FRENCH_AGENT] {
            assert!(registry.get(leaf).unwrap().handoffs().is_empty());
        }
    }

    #[test]
    fn test_construction_is_repeatable() {
        assert_eq!(translation_agents(), translation_agents());
    }

    #[test]
    fn test_handoff_tools() {
        let registry = AgentRegistry::translation().unwrap();
        let tools = registry.triage().unwrap().handoff_tools();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "transfer_to_spanish_agent",
                "transfer_to_english_agent",
                "transfer_to_french_agent"
            ]
        );
        assert_eq!(
            tools[0].description,
            "Handoff to the spanish_agent agent to handle the request."
        );
        assert_eq!(tools[0].parameters["type"], "object");
        assert!(registry.get(FRENCH_AGENT).unwrap().handoff_tools().is_empty());
    }

    #[test]
    fn test_resolve_handoff() {
        let registry = AgentRegistry::translation().unwrap();
        let triage = registry.triage().unwrap();

        let target = registry
            .resolve_handoff(triage, "transfer_to_french_agent")
            .unwrap();
        assert_eq!(target.name(), FRENCH_AGENT);

        assert_eq!(
            registry.resolve_handoff(triage, "transfer_to_german_agent"),
            Err(RunError::UnknownHandoff("transfer_to_german_agent".to_string()))
        );
        assert_eq!(
            registry.resolve_handoff(triage, "french_agent"),
            Err(RunError::UnknownHandoff("french_agent".to_string()))
        );

        // leaves declare no delegates, so nothing resolves from them
        let spanish = registry.get(SPANISH_AGENT).unwrap();
        assert!(registry
            .resolve_handoff(spanish, "transfer_to_french_agent")
            .is_err());
    }

    #[test]
    fn test_unknown_agent_lookup() {
        let registry = AgentRegistry::translation().unwrap();
        assert_eq!(
            registry.get("german_agent"),
            Err(RunError::UnknownAgent("german_agent".to_string()))
        );
    }

    #[test]
    fn test_registry_rejects_invalid_sets() {
        let dup = AgentRegistry::new(vec![Agent::new("a", "x"), Agent::new("a", "y")]);
        assert_eq!(dup.unwrap_err(), RunError::DuplicateAgent("a".to_string()));

        let dangling = AgentRegistry::new(vec![Agent::new("a", "x").with_handoffs(["b"])]);
        assert_eq!(dangling.unwrap_err(), RunError::UnknownAgent("b".to_string()));
    }
}
