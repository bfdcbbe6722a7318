//! Final prompt composition.

use crate::utils::toml_config::PromptConfig;

/// Role preamble plus the instruction to admit ignorance.
pub const DEFAULT_TEMPLATE: &str = "Role:\n    You are a respectful assistant, always willing to help out those in need.\nUse the following context to answer the question. If you don't know the answer, simply say \"I don't know\"";

/// Joins the instruction template, retrieved context and question.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    template: String,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl PromptComposer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn from_config(config: &PromptConfig) -> Self {
        Self::new(config.template.clone())
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// `template + "\n" + context + "\n" + question`.
    ///
    /// The template's "I don't know" directive is left to the model; nothing
    /// here inspects the context.
    pub fn compose(&self, context: &str, question: &str) -> String {
        let mut prompt =
            String::with_capacity(self.template.len() + context.len() + question.len() + 2);
        prompt.push_str(&self.template);
        prompt.push('\n');
        prompt.push_str(context);
        prompt.push('\n');
        prompt.push_str(question);
        prompt
    }
}
