//! Line-based [`Prompter`] over a reader and a writer (stdin/stdout in the
//! binary).
//!
//! Answers are choice numbers (`1`, `2`, ...) or an unambiguous prefix of a
//! choice label (`y`, `local`, `merge`). An empty line takes the default;
//! `q` or end of input aborts the setup.

use std::io::{self, BufRead, Write};

use rigger_core::prompt::{PromptError, Prompter, Question, Reply};

pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

enum Line {
    Text(String),
    Empty,
    Quit,
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self) -> io::Result<Line> {
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Ok(Line::Quit);
        }
        let text = buf.trim();
        Ok(match text {
            "" => Line::Empty,
            "q" | "quit" => Line::Quit,
            _ => Line::Text(text.to_string()),
        })
    }

    fn show(&mut self, question: &Question, defaults: &[usize]) -> io::Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "{}", question.text)?;
        for (i, choice) in question.choices.iter().enumerate() {
            let marker = if defaults.contains(&i) { " (default)" } else { "" };
            match &choice.description {
                Some(d) => writeln!(self.output, "  {}) {}{marker}  {d}", i + 1, choice.label)?,
                None => writeln!(self.output, "  {}) {}{marker}", i + 1, choice.label)?,
            }
        }
        Ok(())
    }

    fn ask(&mut self, hint: &str) -> io::Result<Line> {
        write!(self.output, "{hint} ")?;
        self.output.flush()?;
        self.read_line()
    }
}

/// The part of a label before any `:`, lower-cased.
fn short_label(label: &str) -> String {
    label
        .split(':')
        .next()
        .unwrap_or(label)
        .trim()
        .to_lowercase()
}

/// Parse one answer token as a 0-based choice index.
fn parse_choice(question: &Question, token: &str) -> Option<usize> {
    if let Ok(n) = token.parse::<usize>() {
        return (1..=question.choices.len()).contains(&n).then(|| n - 1);
    }
    let token = token.to_lowercase();
    let matches: Vec<usize> = question
        .choices
        .iter()
        .enumerate()
        .filter(|(_, c)| short_label(&c.label).starts_with(&token))
        .map(|(i, _)| i)
        .collect();
    match matches.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn select(&mut self, question: &Question) -> Result<Reply<usize>, PromptError> {
        let defaults: Vec<usize> = question.default.into_iter().collect();
        self.show(question, &defaults)?;
        let hint = format!("choose 1-{} (enter for default, q to quit):", question.choices.len());

        loop {
            match self.ask(&hint)? {
                Line::Empty => return Ok(Reply::Unanswered),
                Line::Quit => return Ok(Reply::Aborted),
                Line::Text(text) => match parse_choice(question, &text) {
                    Some(i) => return Ok(Reply::Answered(i)),
                    None => writeln!(self.output, "  not a valid choice: {text}")?,
                },
            }
        }
    }

    fn multi_select(&mut self, question: &Question) -> Result<Reply<Vec<usize>>, PromptError> {
        self.show(question, &question.default_many)?;
        let hint = "choose numbers separated by commas, `none`, enter for default, q to quit:";

        loop {
            match self.ask(hint)? {
                Line::Empty => return Ok(Reply::Unanswered),
                Line::Quit => return Ok(Reply::Aborted),
                Line::Text(text) if text.eq_ignore_ascii_case("none") || text == "-" => {
                    return Ok(Reply::Answered(Vec::new()));
                }
                Line::Text(text) => {
                    let parsed: Option<Vec<usize>> = text
                        .split([',', ' '])
                        .filter(|t| !t.is_empty())
                        .map(|t| parse_choice(question, t))
                        .collect();
                    match parsed {
                        Some(mut indices) => {
                            indices.sort_unstable();
                            indices.dedup();
                            return Ok(Reply::Answered(indices));
                        }
                        None => writeln!(self.output, "  not a valid selection: {text}")?,
                    }
                }
            }
        }
    }

    fn notify(&mut self, message: &str) {
        if let Err(e) = writeln!(self.output, "{message}") {
            tracing::debug!(error = %e, "failed to write notice");
        }
    }
}

#[cfg(test)]
mod tests {
    use rigger_core::prompt::Choice;

    use super::*;

    fn prompter(input: &str) -> TerminalPrompter<&[u8], Vec<u8>> {
        TerminalPrompter::new(input.as_bytes(), Vec::new())
    }

    fn scope_question() -> Question {
        Question::new(
            "scope",
            "Where?",
            vec![
                Choice::new("local: this project only"),
                Choice::new("global: every project"),
            ],
        )
        .with_default(Some(0))
    }

    #[test]
    fn number_selects_choice() {
        let mut p = prompter("2\n");
        assert_eq!(p.select(&scope_question()).unwrap(), Reply::Answered(1));
        let shown = String::from_utf8(p.output).unwrap();
        assert!(shown.contains("1) local: this project only (default)"));
    }

    #[test]
    fn label_prefix_selects_choice() {
        let mut p = prompter("glob\n");
        assert_eq!(p.select(&scope_question()).unwrap(), Reply::Answered(1));

        let mut p = prompter("y\n");
        let q = Question::yes_no("t", "ok?", None);
        assert_eq!(p.select(&q).unwrap(), Reply::Answered(0));
    }

    #[test]
    fn empty_line_is_unanswered_and_eof_aborts() {
        assert_eq!(prompter("\n").select(&scope_question()).unwrap(), Reply::Unanswered);
        assert_eq!(prompter("").select(&scope_question()).unwrap(), Reply::Aborted);
        assert_eq!(prompter("q\n").select(&scope_question()).unwrap(), Reply::Aborted);
    }

    #[test]
    fn invalid_answer_asks_again() {
        let mut p = prompter("7\nlocal\n");
        assert_eq!(p.select(&scope_question()).unwrap(), Reply::Answered(0));
        let shown = String::from_utf8(p.output).unwrap();
        assert!(shown.contains("not a valid choice: 7"));
    }

    #[test]
    fn multi_select_parses_lists() {
        let q = Question::new(
            "gitHooks",
            "Which?",
            vec![Choice::new("a"), Choice::new("b"), Choice::new("c")],
        );
        assert_eq!(
            prompter("3, 1 3\n").multi_select(&q).unwrap(),
            Reply::Answered(vec![0, 2])
        );
        assert_eq!(prompter("none\n").multi_select(&q).unwrap(), Reply::Answered(vec![]));
        assert_eq!(prompter("\n").multi_select(&q).unwrap(), Reply::Unanswered);
    }

    #[test]
    fn notify_writes_line() {
        let mut p = prompter("");
        p.notify("hello");
        assert_eq!(String::from_utf8(p.output).unwrap(), "hello\n");
    }
}
