//! Prompt template for grounded answers.

use crate::error::{RagError, Result};

const CONTEXT_SLOT: &str = "{context}";
const QUESTION_SLOT: &str = "{question}";
const MIN_WORDS_SLOT: &str = "{min_words}";

/// The default answer prompt.
///
/// `{min_words}` is filled in once when the template is built; `{context}`
/// and `{question}` on every render.
pub const DEFAULT_TEMPLATE: &str = "
Human: Use the following pieces of context to provide a
concise answer to the question at the end but use at least {min_words} words
to summarize with detailed explanations. If you don't know the answer,
just say that you don't know.
<context>
{context}
</context>

Question: {question}

Assistant:";

/// A prompt template with `{context}` and `{question}` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Create a template from custom text, substituting `{min_words}` if present.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if either the `{context}` or the
    /// `{question}` slot is missing.
    pub fn new(template: impl Into<String>, min_words: usize) -> Result<Self> {
        let template = template.into().replace(MIN_WORDS_SLOT, &min_words.to_string());
        for slot in [CONTEXT_SLOT, QUESTION_SLOT] {
            if !template.contains(slot) {
                return Err(RagError::Config(format!("prompt template is missing {slot}")));
            }
        }
        Ok(Self { template })
    }

    /// The default template asking for at least `min_words` words.
    pub fn with_min_words(min_words: usize) -> Self {
        Self { template: DEFAULT_TEMPLATE.replace(MIN_WORDS_SLOT, &min_words.to_string()) }
    }

    /// Fill the slots. The context is inserted before the question so a
    /// question containing `{context}` is left verbatim.
    pub fn render(&self, context: &str, question: &str) -> String {
        let (head, tail) =
            self.template.split_once(QUESTION_SLOT).unwrap_or((self.template.as_str(), ""));
        format!(
            "{}{question}{}",
            head.replace(CONTEXT_SLOT, context),
            tail.replace(CONTEXT_SLOT, context)
        )
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::with_min_words(250)
    }
}
