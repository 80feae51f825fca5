//! Prompt templates for the two generation paths.

use serde::{Deserialize, Serialize};

pub const NO_DOCUMENT: &str = "(No document uploaded)";
pub const NO_CONTEXT: &str = "(No context)";

/// Prompt carrying every ingested document.
pub fn full_document_prompt(document: &str, question: &str) -> String {
    let document = if document.trim().is_empty() { NO_DOCUMENT } else { document };
    format!(
        "Here is the complete document:\n\n{document}\n\nBased on the document above, answer this question:\nQuestion: {question}\n\nAnswer:"
    )
}

/// Prompt carrying only the retrieved context.
pub fn retrieved_context_prompt(context: &str, question: &str) -> String {
    let context = if context.trim().is_empty() { NO_CONTEXT } else { context };
    format!("Use ONLY this context to answer:\n\n<context>\n{context}\n</context>\n\nQuestion: {question}\n\nAnswer:")
}

/// The pair of prompts sent for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompts {
    pub standard: String,
    pub rag: String,
}

impl Prompts {
    pub fn new(question: &str, full_document: &str, retrieved_context: &str) -> Self {
        Self {
            standard: full_document_prompt(full_document, question),
            rag: retrieved_context_prompt(retrieved_context, question),
        }
    }
}
