use crate::scheduler::RunTaskRequest;
use serde::Serialize;
use std::io::Write;
use step_sdk::documentation::{Documentation, Parameter};
use step_sdk::{InputError, InputOptions, Step};

pub const DEFAULT_CLUSTER: &str = "default";

/// The label attached to started tasks when the pipeline does not supply its own.
pub const DEFAULT_STARTED_BY: &str = "amazon-ecs-run-task-for-github-actions";

pub const DEFAULT_WAIT_MINUTES: u64 = 30;

/// Hard ceiling for the wait budget; larger values are clamped without complaint.
pub const MAX_WAIT_MINUTES: u64 = 360;

pub const TASK_DEFINITION_INPUT: &str = "task-definition-arn";
pub const CLUSTER_INPUT: &str = "cluster";
pub const COUNT_INPUT: &str = "count";
pub const STARTED_BY_INPUT: &str = "started-by";
pub const WAIT_FOR_FINISH_INPUT: &str = "wait-for-finish";
pub const WAIT_FOR_MINUTES_INPUT: &str = "wait-for-minutes";

pub const TASK_ARN_OUTPUT: &str = "task-arn";

/// Whether the step blocks until the started tasks stop, and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WaitPolicy {
    pub enabled: bool,
    /// Wait budget in minutes; never above [`MAX_WAIT_MINUTES`].
    pub minutes: u64,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            minutes: DEFAULT_WAIT_MINUTES,
        }
    }
}

/// Everything the step was asked to do, read once from the runner on startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunTaskInputs {
    pub task_definition: String,
    pub cluster: String,
    pub count: i32,
    pub started_by: String,
    pub wait: WaitPolicy,
}

impl RunTaskInputs {
    pub fn from_step<W: Write>(step: &Step<W>) -> Result<Self, InputError> {
        let task_definition = step.input(TASK_DEFINITION_INPUT, InputOptions::required())?;
        let count = parse_count(&step.input(COUNT_INPUT, InputOptions::required())?)?;

        let wait = WaitPolicy {
            enabled: parse_wait_flag(&step.input(WAIT_FOR_FINISH_INPUT, InputOptions::default())?),
            minutes: parse_wait_minutes(
                &step.input(WAIT_FOR_MINUTES_INPUT, InputOptions::default())?,
            ),
        };

        Ok(Self {
            task_definition,
            cluster: step
                .optional_input(CLUSTER_INPUT)
                .unwrap_or_else(|| DEFAULT_CLUSTER.to_string()),
            count,
            started_by: step
                .optional_input(STARTED_BY_INPUT)
                .unwrap_or_else(|| DEFAULT_STARTED_BY.to_string()),
            wait,
        })
    }

    pub fn request(&self) -> RunTaskRequest {
        RunTaskRequest {
            cluster: self.cluster.clone(),
            task_definition: self.task_definition.clone(),
            count: self.count,
            started_by: self.started_by.clone(),
        }
    }
}

pub fn parse_count(raw: &str) -> Result<i32, InputError> {
    raw.parse().map_err(|_| InputError::InvalidInput {
        input: COUNT_INPUT.to_string(),
        value: raw.to_string(),
        description: "must be an integer".to_string(),
    })
}

/// Only the literal string "true", in any casing, turns waiting on. Everything else, including "yes", "1" and
/// an empty value, leaves it off.
pub fn parse_wait_flag(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true")
}

/// Reads the integer a value starts with, ignoring whatever follows it: "45abc" is 45 and "12.5" is 12. Digits
/// beyond the range of an i64 saturate.
fn leading_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let (negative, rest) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }

    let value = rest[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

/// Reads the wait budget in minutes from the integer the value starts with. Values without a leading positive
/// integer fall back to [`DEFAULT_WAIT_MINUTES`]; values above [`MAX_WAIT_MINUTES`] are clamped.
pub fn parse_wait_minutes(raw: &str) -> u64 {
    match leading_integer(raw) {
        Some(minutes) if minutes > 0 => clamp_wait_minutes(minutes as u64),
        _ => DEFAULT_WAIT_MINUTES,
    }
}

pub fn clamp_wait_minutes(minutes: u64) -> u64 {
    minutes.min(MAX_WAIT_MINUTES)
}

pub fn documentation() -> Documentation {
    Documentation {
        inputs: vec![
            Parameter::new(
                TASK_DEFINITION_INPUT,
                true,
                "Family and revision (family:revision) or full ARN of the task definition to run.",
            ),
            Parameter::new(
                CLUSTER_INPUT,
                false,
                "Short name or full ARN of the cluster to run the task on.",
            )
            .default_value(DEFAULT_CLUSTER),
            Parameter::new(COUNT_INPUT, true, "The number of copies of the task to start."),
            Parameter::new(
                STARTED_BY_INPUT,
                false,
                "Label attached to the started tasks; useful for finding them again later.",
            )
            .default_value(DEFAULT_STARTED_BY),
            Parameter::new(
                WAIT_FOR_FINISH_INPUT,
                false,
                "Set to 'true' to wait for the tasks to stop and fail the step if any container exited non-zero.",
            )
            .default_value("false"),
            Parameter::new(
                WAIT_FOR_MINUTES_INPUT,
                false,
                "How long to wait for the tasks to stop, in minutes. Capped at 360.",
            )
            .default_value(&DEFAULT_WAIT_MINUTES.to_string()),
        ],
        outputs: vec![Parameter::new(
            TASK_ARN_OUTPUT,
            false,
            "JSON list of the ARNs of the started tasks.",
        )],
        body: "Runs a task on an Amazon ECS cluster and optionally waits for it to finish.".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
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
    #[case::lowercase("true", true)]
    #[case::uppercase("TRUE", true)]
    #[case::mixed("TrUe", true)]
    #[case::false_literal("false", false)]
    #[case::empty("", false)]
    #[case::yes("yes", false)]
    #[case::one("1", false)]
    #[case::padded_prefix("truee", false)]
    fn test_parse_wait_flag(#[case] raw: &str, #[case] expected: bool) {
        assert_eq!(parse_wait_flag(raw), expected);
    }

    #[rstest]
    #[case::default_when_empty("", 30)]
    #[case::default_when_garbage("soon", 30)]
    #[case::default_when_zero("0", 30)]
    #[case::default_when_negative("-5", 30)]
    #[case::within_bounds("45", 45)]
    #[case::at_ceiling("360", 360)]
    #[case::clamped("500", 360)]
    #[case::trailing_garbage("45abc", 45)]
    #[case::fraction("12.5", 12)]
    #[case::explicit_sign("+20", 20)]
    #[case::fraction_below_one("0.5", 30)]
    #[case::huge("99999999999999999999", 360)]
    fn test_parse_wait_minutes(#[case] raw: &str, #[case] expected: u64) {
        assert_eq!(parse_wait_minutes(raw), expected);
    }

    #[test]
    fn count_must_be_an_integer() {
        assert_eq!(parse_count("3"), Ok(3));

        let err = parse_count("three").unwrap_err();
        assert_eq!(err.to_string(), "invalid count: 'three'; must be an integer");
    }

    #[test]
    fn defaults_are_filled_in() {
        let step = step(&[
            ("INPUT_TASK-DEFINITION-ARN", "arn:aws:ecs:us-east-1:012345678910:task-definition/app:3"),
            ("INPUT_COUNT", "2"),
        ]);

        let inputs = RunTaskInputs::from_step(&step).unwrap();

        assert_eq!(
            inputs,
            RunTaskInputs {
                task_definition: "arn:aws:ecs:us-east-1:012345678910:task-definition/app:3".into(),
                cluster: DEFAULT_CLUSTER.into(),
                count: 2,
                started_by: DEFAULT_STARTED_BY.into(),
                wait: WaitPolicy::default(),
            }
        );
    }

    #[test]
    fn all_inputs_supplied() {
        let step = step(&[
            ("INPUT_TASK-DEFINITION-ARN", "app:3"),
            ("INPUT_CLUSTER", "build"),
            ("INPUT_COUNT", " 1 "),
            ("INPUT_STARTED-BY", "release-pipeline"),
            ("INPUT_WAIT-FOR-FINISH", "True"),
            ("INPUT_WAIT-FOR-MINUTES", "500"),
        ]);

        let inputs = RunTaskInputs::from_step(&step).unwrap();

        assert_eq!(inputs.cluster, "build");
        assert_eq!(inputs.count, 1);
        assert_eq!(inputs.started_by, "release-pipeline");
        assert_eq!(
            inputs.wait,
            WaitPolicy {
                enabled: true,
                minutes: 360
            }
        );
        assert_eq!(
            inputs.request(),
            RunTaskRequest {
                cluster: "build".into(),
                task_definition: "app:3".into(),
                count: 1,
                started_by: "release-pipeline".into(),
            }
        );
    }

    #[rstest]
    #[case::no_task_definition(&[("INPUT_COUNT", "1")], "Input required and not supplied: task-definition-arn")]
    #[case::no_count(&[("INPUT_TASK-DEFINITION-ARN", "app:3")], "Input required and not supplied: count")]
    #[case::bad_count(
        &[("INPUT_TASK-DEFINITION-ARN", "app:3"), ("INPUT_COUNT", "2.5")],
        "invalid count: '2.5'; must be an integer"
    )]
    fn missing_or_invalid_inputs(#[case] vars: &[(&str, &str)], #[case] expected: &str) {
        let step = step(vars);

        let err = RunTaskInputs::from_step(&step).unwrap_err();
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn documentation_lists_every_input() {
        let docs = documentation();
        let keys: Vec<&str> = docs.inputs.iter().map(|input| input.key.as_str()).collect();

        assert_eq!(
            keys,
            vec![
                "task-definition-arn",
                "cluster",
                "count",
                "started-by",
                "wait-for-finish",
                "wait-for-minutes"
            ]
        );
        assert_eq!(docs.outputs[0].key, TASK_ARN_OUTPUT);
    }
}
