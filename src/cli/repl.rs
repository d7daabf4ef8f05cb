//! Interactive shell for the Quill front-end.
//!
//! Lines are read with `rustyline` and fed through the usual
//! `Lexer -> Parser -> TypeChecker` pipeline. A line ending in `:` or `\`
//! starts a multiline buffer that is submitted once an empty line closes the
//! open block, so indented bodies can be typed naturally.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use super::commands::check_source;
use super::{CliResult, ExitStatus};

const PROMPT: &str = "quill> ";
const CONTINUATION_PROMPT: &str = "   ..> ";

pub fn run_repl() -> CliResult<ExitStatus> {
    println!("Quill {} interactive shell", env!("CARGO_PKG_VERSION"));
    println!("Type :quit to exit.");

    let mut editor = DefaultEditor::new()?;
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { PROMPT } else { CONTINUATION_PROMPT };
        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim_end();

                if buffer.is_empty() {
                    if trimmed.is_empty() {
                        continue;
                    }
                    if trimmed == ":quit" || trimmed == ":q" {
                        break;
                    }
                }

                // Multiline: an open block or explicit continuation keeps
                // reading until a blank line submits the buffer.
                if !buffer.is_empty() {
                    if trimmed.is_empty() {
                        let input = std::mem::take(&mut buffer);
                        run_input(&mut editor, &input);
                        continue;
                    }
                    buffer.push_str(&line);
                    buffer.push('\n');
                    continue;
                }

                if trimmed.ends_with(':') || trimmed.ends_with('\\') {
                    buffer.push_str(&line);
                    buffer.push('\n');
                    continue;
                }

                run_input(&mut editor, trimmed);
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C clears any pending multiline input.
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    Ok(ExitStatus::Success)
}

fn run_input(editor: &mut DefaultEditor, input: &str) {
    let _ = editor.add_history_entry(input);
    match check_source(input, "<repl>") {
        Ok(ExitStatus::Success) => println!("ok"),
        Ok(ExitStatus::HadErrors) => {}
        Err(err) => eprintln!("error: {}", err),
    }
}
