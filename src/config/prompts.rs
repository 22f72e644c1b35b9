//! Prompt templates for Sitewise.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub agent: AgentPrompts,
    pub synthesis: SynthesisPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// System prompts describing each agent's role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    /// Prompt for agents that answer over a collection of document tools.
    pub document: String,
    /// Prompt for the outer agent that routes between document agents.
    pub router: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            document: r#"You are an agent designed to answer queries over a set of given papers.
Please always use the tools provided to answer a question. Do not rely on prior knowledge.
When an answer comes from a specific page, include the document name and page number."#
                .to_string(),

            router: r#"You are an assistant for developers planning onshore wind projects
in Nova Scotia.

You can delegate to specialist agents:
- 'enviro_agent' knows the environmental assessment reports
- 'planner_agent' knows the planning application documents
- 'search_internet' (when available) searches the web for species and places in Nova Scotia

Guidelines:
- Pick the agent whose documents are most likely to contain the answer
- Use both agents when the question spans environment and planning
- Pass the user's question to the agent as a complete, self-contained request
- Only use 'search_internet' when the documents do not contain enough information
- Keep document names and page numbers from the agents' answers in your final response"#
                .to_string(),
        }
    }
}

/// Templates used to synthesize answers from retrieved chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisPrompts {
    pub system: String,
    /// Answer a query from retrieved chunks. Variables: {{context}}, {{query}}.
    pub text_qa: String,
    /// Summarize a group of texts against a query. Variables: {{context}}, {{query}}.
    pub tree_summarize: String,
}

impl Default for SynthesisPrompts {
    fn default() -> Self {
        Self {
            system: "You answer questions strictly from the supplied document excerpts."
                .to_string(),

            text_qa: r#"Context information is below.
---------------------
{{context}}
---------------------
Using only the context information above and no prior knowledge, answer the query.
Mention page numbers when the context provides them.
Query: {{query}}
Answer: "#
                .to_string(),

            tree_summarize: r#"Context information from multiple sources is below.
---------------------
{{context}}
---------------------
Using only the information from these sources and no prior knowledge, answer the query.
Query: {{query}}
Answer: "#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let agent_path = custom_path.join("agent.toml");
            if agent_path.exists() {
                let content = std::fs::read_to_string(&agent_path)?;
                prompts.agent = toml::from_str(&content)?;
            }

            let synthesis_path = custom_path.join("synthesis.toml");
            if synthesis_path.exists() {
                let content = std::fs::read_to_string(&synthesis_path)?;
                prompts.synthesis = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is a single pass over the template, so placeholders inside
    /// substituted values are left as written. Unknown placeholders are kept.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            result.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            match after.find("}}") {
                Some(close) => {
                    let key = &after[..close];
                    match vars.get(key) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(key);
                            result.push_str("}}");
                        }
                    }
                    rest = &after[close + 2..];
                }
                None => {
                    result.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }

        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.agent.document.contains("always use the tools"));
        assert!(prompts.synthesis.text_qa.contains("{{context}}"));
        assert!(prompts.synthesis.tree_summarize.contains("{{query}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_render_does_not_expand_inside_values() {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "Page 4: moose yard.".to_string());
        vars.insert("query".to_string(), "What does {{context}} mean?".to_string());

        // Every iteration order of the map must give the same result
        for _ in 0..8 {
            let rendered =
                Prompts::render("Context: {{context}}\nQuery: {{query}} {{unknown}} {{", &vars);
            assert_eq!(
                rendered,
                "Context: Page 4: moose yard.\nQuery: What does {{context}} mean? {{unknown}} {{"
            );
        }
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut prompts = Prompts::default();
        prompts.variables.insert("region".to_string(), "Cape Breton".to_string());
        prompts.variables.insert("query".to_string(), "ignored".to_string());

        let mut vars = HashMap::new();
        vars.insert("query".to_string(), "bat habitat".to_string());

        let rendered = prompts.render_with_custom("{{query}} in {{region}}", &vars);
        assert_eq!(rendered, "bat habitat in Cape Breton");
    }

    #[test]
    fn test_custom_agent_prompts_loaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("agent.toml"),
            "document = \"Only answer from the reports.\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.agent.document, "Only answer from the reports.");
        assert!(prompts.agent.router.contains("enviro_agent"));
    }
}
