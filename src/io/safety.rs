//! Safety gate: confirmation before destructive steps, and backup naming.
//!
//! Every service path that wipes a directory or deletes rows asks a
//! [`Confirmer`] first. The binary uses [`TerminalConfirmer`]; automation uses
//! [`AssumeYes`]; tests script answers with [`ScriptedConfirmer`].

use crate::{Error, Result};
use chrono::Utc;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::sync::Mutex;

/// Asks the operator to approve a destructive action.
pub trait Confirmer: Send + Sync {
    /// Presents `message` and returns the operator's answer.
    ///
    /// `default` is returned for an empty answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt cannot be written or read.
    fn confirm(&self, message: &str, default: bool) -> Result<bool>;
}

/// Parses a yes/no answer.
///
/// Returns `Some(default)` for an empty answer and `None` for anything that
/// is not `y`, `yes`, `n` or `no` (case-insensitive).
#[must_use]
pub fn parse_answer(answer: &str, default: bool) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

type PromptIo = (Box<dyn BufRead + Send>, Box<dyn Write + Send>);

/// Interactive confirmer reading answers line by line.
///
/// Prompts as `<message> (Y/n) ` or `<message> (y/N) ` and repeats until a
/// recognised answer arrives. End of input counts as the default answer.
pub struct TerminalConfirmer {
    io: Mutex<PromptIo>,
}

impl std::fmt::Debug for TerminalConfirmer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalConfirmer").finish_non_exhaustive()
    }
}

impl TerminalConfirmer {
    /// Prompts on stderr and reads stdin.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stderr())
    }

    /// Prompts on `output` and reads `input`.
    pub fn new(input: impl BufRead + Send + 'static, output: impl Write + Send + 'static) -> Self {
        Self {
            io: Mutex::new((Box::new(input), Box::new(output))),
        }
    }
}

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        let options = if default { "Y/n" } else { "y/N" };
        let mut io = self.io.lock().map_err(|e| Error::OperationFailed {
            operation: "confirm".to_string(),
            cause: e.to_string(),
        })?;
        let (input, output) = &mut *io;

        let prompt_err = |e: std::io::Error| Error::OperationFailed {
            operation: "confirm".to_string(),
            cause: e.to_string(),
        };

        loop {
            write!(output, "{message} ({options}) ").map_err(prompt_err)?;
            output.flush().map_err(prompt_err)?;

            let mut line = String::new();
            if input.read_line(&mut line).map_err(prompt_err)? == 0 {
                writeln!(output).map_err(prompt_err)?;
                return Ok(default);
            }

            if let Some(answer) = parse_answer(&line, default) {
                return Ok(answer);
            }
        }
    }
}

/// Confirmer that approves everything without prompting.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirmer for AssumeYes {
    fn confirm(&self, message: &str, _default: bool) -> Result<bool> {
        tracing::debug!(message, "auto-confirmed");
        Ok(true)
    }
}

/// Confirmer replaying a fixed list of answers and recording every prompt.
#[derive(Debug, Default)]
pub struct ScriptedConfirmer {
    answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirmer {
    /// Creates a confirmer that answers with `answers`, in order.
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts presented so far.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&self, message: &str, _default: bool) -> Result<bool> {
        let lock_err = |e: String| Error::OperationFailed {
            operation: "confirm".to_string(),
            cause: e,
        };
        self.prompts
            .lock()
            .map_err(|e| lock_err(e.to_string()))?
            .push(message.to_string());
        self.answers
            .lock()
            .map_err(|e| lock_err(e.to_string()))?
            .pop_front()
            .ok_or_else(|| lock_err(format!("no scripted answer left for {message:?}")))
    }
}

/// Builds a backup name: `<snake_case name>_<UTC YYYYMMDDHHMMSS>`.
#[must_use]
pub fn backup_name(name: &str) -> String {
    format!("{}_{}", snake_case(name), Utc::now().format("%Y%m%d%H%M%S"))
}

/// Converts `name` to `snake_case`, replacing anything that is not
/// alphanumeric with a single underscore.
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase() && prev_lower && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        }
    }
    out.trim_end_matches('_').to_string()
}
