use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    pub required: bool,
    /// The value used when the runner does not supply the input.
    pub default: Option<String>,
    pub documentation: String,
}

impl Parameter {
    pub fn new(key: &str, required: bool, documentation: &str) -> Self {
        Self {
            key: key.to_string(),
            required,
            default: None,
            documentation: documentation.to_string(),
        }
    }

    pub fn default_value(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Documentation {
    /// Inputs the step reads from the runner on startup.
    pub inputs: Vec<Parameter>,

    /// Outputs the step reports back to the runner.
    pub outputs: Vec<Parameter>,

    /// Anything the step wants to explain to the user.
    pub body: String,
}

impl Documentation {
    /// Renders the documentation as plain text suitable for a terminal.
    pub fn render(&self) -> String {
        let mut text = String::new();

        if !self.body.is_empty() {
            let _ = writeln!(text, "{}\n", self.body.trim_end());
        }

        let _ = writeln!(text, "Inputs:");
        for input in &self.inputs {
            let mut qualifiers = Vec::new();
            if input.required {
                qualifiers.push("required".to_string());
            }
            if let Some(default) = &input.default {
                qualifiers.push(format!("default: {default:?}"));
            }

            let _ = write!(text, "  {}", input.key);
            if !qualifiers.is_empty() {
                let _ = write!(text, " ({})", qualifiers.join(", "));
            }
            let _ = writeln!(text, "\n      {}", input.documentation);
        }

        if !self.outputs.is_empty() {
            let _ = writeln!(text, "\nOutputs:");
            for output in &self.outputs {
                let _ = writeln!(text, "  {}\n      {}", output.key, output.documentation);
            }
        }

        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn render_lists_inputs_and_outputs() {
        let docs = Documentation {
            inputs: vec![
                Parameter::new("count", true, "How many copies to run."),
                Parameter::new("cluster", false, "Where to run them.").default_value("default"),
            ],
            outputs: vec![Parameter::new("task-arn", false, "Launched tasks.")],
            body: "Runs things.".into(),
        };

        let expected = "Runs things.\n\nInputs:\n  count (required)\n      How many copies to run.\n  \
cluster (default: \"default\")\n      Where to run them.\n\nOutputs:\n  task-arn\n      Launched tasks.\n";

        assert_eq!(docs.render(), expected);
    }
}
