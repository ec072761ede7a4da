//! The `Prompter` trait -- how the setup asks the user questions.
//!
//! The CLI implements it over stdin/stdout; tests script the answers. The
//! trait is object-safe so the runner can hold a `&mut dyn Prompter`.

use thiserror::Error;

/// Errors from the interactive channel itself (not from the user's answer).
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The prompter produced an index outside the question's choices.
    #[error("question {question:?}: answer {index} is out of range (0..{len})")]
    OutOfRange {
        question: String,
        index: usize,
        len: usize,
    },
}

/// One selectable option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub description: Option<String>,
}

impl Choice {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A question with a fixed list of choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Stable identifier (`scope`, `conflicts`, `testHook`, ...).
    pub id: String,
    pub text: String,
    pub choices: Vec<Choice>,
    /// Index of the pre-selected choice for single-choice questions.
    pub default: Option<usize>,
    /// Pre-selected indices for multi-choice questions.
    pub default_many: Vec<usize>,
}

impl Question {
    pub fn new(id: impl Into<String>, text: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            choices,
            default: None,
            default_many: Vec::new(),
        }
    }

    pub fn with_default(mut self, index: Option<usize>) -> Self {
        self.default = index;
        self
    }

    pub fn with_defaults(mut self, indices: Vec<usize>) -> Self {
        self.default_many = indices;
        self
    }

    /// A two-way yes/no question. Index 0 is yes.
    pub fn yes_no(id: impl Into<String>, text: impl Into<String>, default: Option<bool>) -> Self {
        Self::new(id, text, vec![Choice::new("yes"), Choice::new("no")])
            .with_default(default.map(|yes| if yes { 0 } else { 1 }))
    }

    /// Reject an index the question does not offer.
    pub fn check(&self, index: usize) -> Result<usize, PromptError> {
        if index < self.choices.len() {
            Ok(index)
        } else {
            Err(PromptError::OutOfRange {
                question: self.id.clone(),
                index,
                len: self.choices.len(),
            })
        }
    }
}

/// What came back from a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    Answered(T),
    /// The user gave no answer; the caller falls back to its default.
    Unanswered,
    /// The user asked to stop the setup.
    Aborted,
}

/// Interactive channel used by the step runner.
pub trait Prompter {
    /// Ask for exactly one of `question.choices`.
    fn select(&mut self, question: &Question) -> Result<Reply<usize>, PromptError>;

    /// Ask for any subset of `question.choices`.
    fn multi_select(&mut self, question: &Question) -> Result<Reply<Vec<usize>>, PromptError>;

    /// Tell the user something that needs no answer.
    fn notify(&mut self, message: &str);
}

const _: () = {
    fn _assert_object_safe(_: &dyn Prompter) {}
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_no_defaults() {
        assert_eq!(Question::yes_no("q", "?", Some(true)).default, Some(0));
        assert_eq!(Question::yes_no("q", "?", Some(false)).default, Some(1));
        assert_eq!(Question::yes_no("q", "?", None).default, None);
    }

    #[test]
    fn check_rejects_out_of_range() {
        let q = Question::yes_no("testHook", "?", None);
        assert_eq!(q.check(1).unwrap(), 1);
        let err = q.check(2).unwrap_err();
        assert!(err.to_string().contains("testHook"));
    }
}
