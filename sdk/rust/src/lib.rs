pub mod command;
pub mod documentation;
pub mod input;

pub use command::CommandError;
pub use input::{InputError, InputOptions};

use std::collections::HashMap;
use std::io::{Stdout, Write};

/// The prefix the runner uses when handing step inputs over through the environment.
pub const INPUT_ENV_PREFIX: &str = "INPUT_";

/// Path of the file the runner reads step outputs from.
pub const OUTPUT_FILE_ENV: &str = "GITHUB_OUTPUT";

/// Step is the contact point between a step's logic and the runner executing it. It holds a snapshot of the
/// environment the runner started the step with and the stream workflow commands are written to.
///
/// Steps are expected to read all of their inputs up front, do their work and then report outputs or failure
/// back through the same handle. The handle remembers whether the step was marked failed so the binary can
/// translate that into the process exit code.
#[derive(Debug)]
pub struct Step<W: Write> {
    env: HashMap<String, String>,
    out: W,
    failed: bool,
}

impl Step<Stdout> {
    /// Creates a step bound to the current process environment and stdout.
    pub fn from_env() -> Self {
        Step::new(std::env::vars().collect(), std::io::stdout())
    }
}

impl<W: Write> Step<W> {
    pub fn new(env: HashMap<String, String>, out: W) -> Self {
        Self {
            env,
            out,
            failed: false,
        }
    }

    /// Does a more thorough evaluation of env vars by making sure not only they are set, but also making sure
    /// they're not an empty string.
    pub(crate) fn get_env(&self, key: &str) -> Option<&str> {
        self.env
            .get(key)
            .map(|value| value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Returns true once [`Step::set_failed`] has been called.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// The exit code the process should terminate with; the runner treats any non-zero code as a failed step.
    pub fn exit_code(&self) -> i32 {
        if self.failed {
            1
        } else {
            0
        }
    }

    /// Consumes the step and hands back the underlying command stream.
    pub fn into_inner(self) -> W {
        self.out
    }
}
