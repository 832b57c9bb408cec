//! Line-mode question loop.

use std::io::Write;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use rustyline::history::History;
use tracing::debug;

use crate::app::{AppError, RagService};

const PROMPT: &str = "Enter your question: ";
const QUIT_COMMANDS: [&str; 3] = ["quit", "exit", "q"];

/// Questions answered when no subcommand is given.
pub const EXAMPLE_QUESTIONS: [&str; 3] = [
    "What is the concept of agent loop in autonomous agents?",
    "What are the key components of LLM-powered agents?",
    "Explain the concept of diffusion models for video generation.",
];

pub fn is_quit_command(line: &str) -> bool {
    let line = line.trim();
    QUIT_COMMANDS.iter().any(|q| line.eq_ignore_ascii_case(q))
}

/// Answer one question and print it.
pub async fn answer_one(
    service: &dyn RagService,
    question: &str,
    out: &mut dyn Write,
) -> Result<String, AppError> {
    writeln!(out, "Question: {question}\n")?;
    let answer = service.ask(question).await?;
    writeln!(out, "Answer: {answer}\n")?;
    Ok(answer)
}

/// Read questions from `next_line` until a quit command or end of input.
///
/// Blank lines are skipped. Returns the number of questions answered.
pub async fn run_session(
    service: &dyn RagService,
    mut next_line: impl FnMut() -> Result<Option<String>, AppError>,
    out: &mut dyn Write,
) -> Result<usize, AppError> {
    writeln!(out, "Interactive mode - type 'quit' to exit\n")?;
    let mut answered = 0;
    while let Some(line) = next_line()? {
        if is_quit_command(&line) {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        answer_one(service, question, out).await?;
        writeln!(out, "{}\n", "-".repeat(80))?;
        answered += 1;
    }
    writeln!(out, "Goodbye!")?;
    debug!(answered, "interactive session ended");
    Ok(answered)
}

/// [`run_session`] over a terminal line editor.
pub async fn interactive(service: &dyn RagService) -> Result<usize, AppError> {
    let mut editor = DefaultEditor::new()?;
    let mut stdout = std::io::stdout();
    run_session(service, || read_line(&mut editor, PROMPT), &mut stdout).await
}

/// Read one line, `None` on Ctrl-C or Ctrl-D.
pub fn read_line(editor: &mut DefaultEditor, prompt: &str) -> Result<Option<String>, AppError> {
    match tokio::task::block_in_place(|| editor.readline(prompt)) {
        Ok(line) => {
            remember(editor.history_mut(), &line);
            Ok(Some(line))
        }
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Add a non-blank line to the editor history. Failures are logged and ignored.
fn remember(history: &mut impl History, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    if let Err(err) = history.add(line) {
        debug!(error = %err, "failed to record line history");
    }
}
