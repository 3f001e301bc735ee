use crate::{Step, INPUT_ENV_PREFIX};
use std::io::Write;

/// Represents different input failure possibilities. These errors are meant to be consumed by step authors.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("Input required and not supplied: {0}")]
    RequiredInputMissing(String),

    #[error("invalid {input}: '{value}'; {description}")]
    InvalidInput {
        input: String,
        value: String,
        description: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputOptions {
    /// Fail with [`InputError::RequiredInputMissing`] if the runner did not supply the input.
    pub required: bool,
    /// Strip leading and trailing whitespace from the value.
    pub trim_whitespace: bool,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            required: false,
            trim_whitespace: true,
        }
    }
}

impl InputOptions {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }
}

/// Returns the environment key the runner stores an input under: spaces become underscores and the whole name is
/// upper-cased. Hyphens are left alone, so `task-definition-arn` is read from `INPUT_TASK-DEFINITION-ARN`.
pub fn input_env_key(name: &str) -> String {
    format!("{INPUT_ENV_PREFIX}{}", name.replace(' ', "_").to_uppercase())
}

impl<W: Write> Step<W> {
    /// Reads a single step input. Inputs that are not supplied read as an empty string unless they are required.
    pub fn input(&self, name: &str, options: InputOptions) -> Result<String, InputError> {
        let value = self.get_env(&input_env_key(name)).unwrap_or_default();

        if options.required && value.is_empty() {
            return Err(InputError::RequiredInputMissing(name.to_string()));
        }

        if options.trim_whitespace {
            return Ok(value.trim().to_string());
        }

        Ok(value.to_string())
    }

    /// Reads an optional input, mapping an empty value to `None`.
    pub fn optional_input(&self, name: &str) -> Option<String> {
        match self.input(name, InputOptions::default()) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn step(vars: &[(&str, &str)]) -> Step<Vec<u8>> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Step::new(env, Vec::new())
    }

    #[rstest]
    #[case::hyphenated("task-definition-arn", "INPUT_TASK-DEFINITION-ARN")]
    #[case::spaces("my input", "INPUT_MY_INPUT")]
    #[case::already_upper("COUNT", "INPUT_COUNT")]
    fn test_input_env_key(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(input_env_key(name), expected);
    }

    #[test]
    fn required_input_missing() {
        let step = step(&[]);
        let result = step.input("count", InputOptions::required());

        assert_eq!(
            result,
            Err(InputError::RequiredInputMissing("count".to_string()))
        );
        assert_eq!(
            result.unwrap_err().to_string(),
            "Input required and not supplied: count"
        );
    }

    #[test]
    fn required_input_empty_is_missing() {
        let step = step(&[("INPUT_COUNT", "")]);

        assert!(step.input("count", InputOptions::required()).is_err());
    }

    #[test]
    fn input_is_trimmed_by_default() {
        let step = step(&[("INPUT_CLUSTER", "  build-cluster \n")]);

        assert_eq!(
            step.input("cluster", InputOptions::default()).unwrap(),
            "build-cluster"
        );
        assert_eq!(
            step.input(
                "cluster",
                InputOptions {
                    trim_whitespace: false,
                    ..Default::default()
                }
            )
            .unwrap(),
            "  build-cluster \n"
        );
    }

    #[test]
    fn optional_input_maps_blank_to_none() {
        let step = step(&[("INPUT_STARTED-BY", "   "), ("INPUT_CLUSTER", "prod")]);

        assert_eq!(step.optional_input("started-by"), None);
        assert_eq!(step.optional_input("cluster"), Some("prod".to_string()));
        assert_eq!(step.optional_input("wait-for-finish"), None);
    }
}
