//! Workflow commands are specially formatted lines written to stdout that the runner interprets, e.g.
//! `::debug::message` or `::error::message`. Step outputs are appended to the file the runner names in
//! `GITHUB_OUTPUT`; runners that predate the file fall back to the `set-output` command.

use crate::{Step, OUTPUT_FILE_ENV};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

/// Represents the ways reporting back to the runner can fail.
#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("could not write workflow command; {0}")]
    Io(#[from] std::io::Error),

    #[error("could not serialize value for output '{0}'; {1}")]
    Serialization(String, serde_json::Error),

    #[error("unable to find runner file at path '{0}'")]
    MissingFile(String),

    #[error("unexpected input: '{0}' should not contain the delimiter '{1}'")]
    DelimiterCollision(String, String),
}

/// Escapes a command message. The runner splits commands on newlines so these have to be percent-encoded.
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Escapes a command property value, which additionally may not contain the property separators.
pub fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

/// Turns any serializable value into the string form the runner expects: strings are passed through as is,
/// null becomes empty and everything else is rendered as JSON.
pub fn to_command_value<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    match serde_json::to_value(value)? {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(value) => Ok(value),
        other => Ok(other.to_string()),
    }
}

/// Formats a single workflow command line, without the trailing newline.
pub fn format_command(command: &str, properties: &[(&str, &str)], message: &str) -> String {
    let mut line = format!("::{command}");

    if !properties.is_empty() {
        let properties: Vec<String> = properties
            .iter()
            .map(|(key, value)| format!("{key}={}", escape_property(value)))
            .collect();
        line.push(' ');
        line.push_str(&properties.join(","));
    }

    line.push_str("::");
    line.push_str(&escape_data(message));
    line
}

/// Formats a `key<<delimiter` block in the layout the runner expects in its output file.
fn format_file_entry(key: &str, value: &str, delimiter: &str) -> Result<String, CommandError> {
    if key.contains(delimiter) {
        return Err(CommandError::DelimiterCollision(
            "name".into(),
            delimiter.into(),
        ));
    }

    if value.contains(delimiter) {
        return Err(CommandError::DelimiterCollision(
            "value".into(),
            delimiter.into(),
        ));
    }

    Ok(format!("{key}<<{delimiter}\n{value}\n{delimiter}\n"))
}

impl<W: Write> Step<W> {
    pub fn issue_command(
        &mut self,
        command: &str,
        properties: &[(&str, &str)],
        message: &str,
    ) -> Result<(), CommandError> {
        writeln!(self.out, "{}", format_command(command, properties, message))?;
        Ok(())
    }

    /// Writes a debug message. The runner only shows these when step debugging is turned on.
    pub fn debug(&mut self, message: &str) -> Result<(), CommandError> {
        self.issue_command("debug", &[], message)
    }

    /// Writes a plain line to the step log.
    pub fn info(&mut self, message: &str) -> Result<(), CommandError> {
        writeln!(self.out, "{message}")?;
        Ok(())
    }

    pub fn warning(&mut self, message: &str) -> Result<(), CommandError> {
        self.issue_command("warning", &[], message)
    }

    pub fn error(&mut self, message: &str) -> Result<(), CommandError> {
        self.issue_command("error", &[], message)
    }

    /// Reports a step output. Values that are not strings are serialized as JSON.
    pub fn set_output<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        value: &T,
    ) -> Result<(), CommandError> {
        let value = to_command_value(value)
            .map_err(|e| CommandError::Serialization(name.to_string(), e))?;

        let Some(path) = self.get_env(OUTPUT_FILE_ENV).map(str::to_string) else {
            return self.issue_command("set-output", &[("name", name)], &value);
        };

        if !std::path::Path::new(&path).exists() {
            return Err(CommandError::MissingFile(path));
        }

        let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
        let entry = format_file_entry(name, &value, &delimiter)?;

        let mut file = OpenOptions::new().append(true).open(&path)?;
        file.write_all(entry.as_bytes())?;
        debug!(output = name, path = %path, "Wrote step output");

        // The runner expects the command stream to end on a fresh line after an output is written.
        writeln!(self.out)?;
        Ok(())
    }

    /// Marks the step as failed. The message is shown to the user as the reason for the failure and the process
    /// should exit with [`Step::exit_code`].
    pub fn set_failed(&mut self, message: &str) -> Result<(), CommandError> {
        self.failed = true;
        self.error(message)
    }
}
