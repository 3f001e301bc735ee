mod inputs;

pub use self::inputs::*;

use crate::conf;
use crate::scheduler::{
    DescribeTasksRequest, TaskFailure, RunTaskRequest, Scheduler, SchedulerError,
    TaskDescription, WaitRequest,
};
use std::io::Write;
use step_sdk::{CommandError, InputError, Step};
use tracing::{debug, error, info, instrument, warn};

/// Represents the ways a run can fail. The display text of each variant is exactly what the user sees as the
/// reason the step failed.
#[derive(thiserror::Error, Debug)]
pub enum RunTaskError {
    #[error(transparent)]
    Input(#[from] InputError),

    /// The scheduler could not start at least one of the requested instances; only the first failure is reported.
    #[error("{0}")]
    LaunchFailed(TaskFailure),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// At least one container exited with a non-zero code. Holds every such container's reason.
    #[error("{}", .0.join("\n"))]
    ContainersFailed(Vec<String>),

    #[error(transparent)]
    Report(#[from] CommandError),
}

/// Ask the scheduler to start the task and return the identifiers of the started instances, in the order the
/// scheduler returned them. Any launch failure aborts the run.
#[instrument(skip(step, scheduler), fields(cluster = %request.cluster, task_definition = %request.task_definition))]
pub async fn launch<W: Write>(
    step: &mut Step<W>,
    scheduler: &dyn Scheduler,
    request: RunTaskRequest,
) -> Result<Vec<String>, RunTaskError> {
    step.debug(&format!(
        "Running task with {}",
        serde_json::to_string(&request).unwrap_or_default()
    ))?;

    let response = scheduler.run_task(request).await?;

    step.debug(&format!(
        "Run task response {}",
        serde_json::to_string(&response).unwrap_or_default()
    ))?;

    if let Some(failure) = response.failures.into_iter().next() {
        return Err(RunTaskError::LaunchFailed(failure));
    }

    info!(task_arns = ?response.task_arns, "Started tasks");
    Ok(response.task_arns)
}

/// Block until every given task has stopped. The wait is entirely up to the scheduler's waiter; no retries are
/// layered on top.
#[instrument(skip(step, scheduler, waiter))]
pub async fn await_stop<W: Write>(
    step: &mut Step<W>,
    scheduler: &dyn Scheduler,
    cluster: &str,
    task_arns: &[String],
    wait_minutes: u64,
    waiter: &conf::Waiter,
) -> Result<(), RunTaskError> {
    let wait_minutes = clamp_wait_minutes(wait_minutes);
    let max_wait = waiter.budget(wait_minutes);

    step.debug("Waiting for tasks to stop")?;
    debug!(wait_minutes, max_wait_seconds = max_wait.as_secs(), "Waiting for tasks to stop");

    scheduler
        .wait_until_stopped(WaitRequest {
            cluster: cluster.to_string(),
            task_arns: task_arns.to_vec(),
            max_wait,
        })
        .await?;

    match scheduler.console_url(cluster) {
        Some(url) => step.info(&format!(
            "All tasks have stopped. Watch progress in the Amazon ECS console: {url}"
        ))?,
        None => step.info("All tasks have stopped.")?,
    }

    Ok(())
}

/// Returns the reasons of every container that did not exit cleanly, in the order the containers were described.
/// A container without an exit code never finished and counts as failed; a missing reason is reported as an empty
/// line.
pub fn failed_reasons(tasks: &[TaskDescription]) -> Vec<String> {
    let containers: Vec<_> = tasks.iter().flat_map(|task| &task.containers).collect();

    let exit_codes: Vec<Option<i32>> = containers.iter().map(|c| c.exit_code).collect();
    let reasons: Vec<String> = containers
        .iter()
        .map(|c| c.reason.clone().unwrap_or_default())
        .collect();

    exit_codes
        .iter()
        .zip(reasons)
        .filter(|(exit_code, _)| **exit_code != Some(0))
        .map(|(_, reason)| reason)
        .collect()
}

/// Check how the given tasks' containers exited and fail if any of them exited non-zero. Tasks the scheduler
/// could not describe are reported as warnings.
#[instrument(skip(step, scheduler))]
pub async fn judge_outcome<W: Write>(
    step: &mut Step<W>,
    scheduler: &dyn Scheduler,
    cluster: &str,
    task_arns: &[String],
) -> Result<(), RunTaskError> {
    let response = scheduler
        .describe_tasks(DescribeTasksRequest {
            cluster: cluster.to_string(),
            task_arns: task_arns.to_vec(),
        })
        .await?;

    // Only container exit codes decide the outcome.
    for failure in &response.failures {
        warn!(failure = %failure, "Could not describe task");
        step.warning(&format!("Could not describe task: {failure}"))?;
    }

    let tasks = response.tasks;
    for task in &tasks {
        for container in &task.containers {
            debug!(
                task_arn = task.task_arn.as_deref().unwrap_or_default(),
                container = container.name.as_deref().unwrap_or_default(),
                exit_code = ?container.exit_code,
                "Container stopped"
            );
        }
    }

    let failures = failed_reasons(&tasks);
    if !failures.is_empty() {
        return Err(RunTaskError::ContainersFailed(failures));
    }

    step.info("All tasks have exited successfully.")?;
    Ok(())
}

/// Runs the whole step: start the task, report the started tasks and, if asked to, wait for them and judge how
/// they exited. The started tasks are reported as soon as they are known so they are available even if waiting
/// fails later on.
pub async fn run<W: Write>(
    step: &mut Step<W>,
    scheduler: &dyn Scheduler,
    inputs: &RunTaskInputs,
    waiter: &conf::Waiter,
) -> Result<Vec<String>, RunTaskError> {
    let task_arns = launch(step, scheduler, inputs.request()).await?;

    step.set_output(TASK_ARN_OUTPUT, &task_arns)?;

    if !inputs.wait.enabled {
        return Ok(task_arns);
    }

    await_stop(
        step,
        scheduler,
        &inputs.cluster,
        &task_arns,
        inputs.wait.minutes,
        waiter,
    )
    .await?;
    judge_outcome(step, scheduler, &inputs.cluster, &task_arns).await?;

    Ok(task_arns)
}

/// Marks the step failed with the error's message. The full error goes to the debug channel only.
pub fn fail<W: Write, E: std::fmt::Debug + std::fmt::Display>(
    step: &mut Step<W>,
    err: &E,
) -> Result<(), CommandError> {
    error!(err = %err, "Step failed");
    step.set_failed(&err.to_string())?;
    step.debug(&format!("{err:?}"))
}

/// Reads the step inputs and runs the step, translating any failure into a failed step. Returns the exit code the
/// process should finish with.
pub async fn execute<W: Write>(
    step: &mut Step<W>,
    scheduler: &dyn Scheduler,
    waiter: &conf::Waiter,
) -> Result<i32, CommandError> {
    let result = match RunTaskInputs::from_step(step) {
        Ok(inputs) => {
            debug!(inputs = ?inputs, "Read step inputs");
            run(step, scheduler, &inputs, waiter).await
        }
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        fail(step, &e)?;
    }

    Ok(step.exit_code())
}
