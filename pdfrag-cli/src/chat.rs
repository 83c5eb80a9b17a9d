//! Interactive question loop.

use anyhow::{Context, Result};
use pdfrag::{RagError, TaskRunner};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::error;

const PROMPT: &str = "? ";

/// Read questions until `exit`, Ctrl-D or Ctrl-C at the prompt.
///
/// A failed answer is reported and the loop keeps going.
pub async fn run(runner: &TaskRunner) -> Result<()> {
    let mut editor = DefaultEditor::new().context("failed to start line editor")?;
    eprintln!("Ask a question about your documents. Type 'exit' to quit.");

    loop {
        let line = tokio::task::block_in_place(|| editor.readline(PROMPT));
        let query = match line {
            Ok(line) => line.trim().to_string(),
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => break,
            Err(e) => return Err(e).context("failed to read input"),
        };
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") {
            break;
        }
        let _ = editor.add_history_entry(query.as_str());

        match crate::ask(runner, query).await {
            Ok(()) => {}
            Err(e) if matches!(e.downcast_ref::<RagError>(), Some(RagError::Cancelled)) => {
                eprintln!("cancelled");
            }
            Err(e) => error!(error = %e, "question failed"),
        }
    }
    Ok(())
}
