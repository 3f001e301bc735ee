pub mod ecs;

use crate::conf;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumString};

/// Represents different scheduler failure possibilities.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SchedulerError {
    /// Failed to start scheduler due to misconfigured settings, usually from a misconfigured settings file.
    #[error("could not init scheduler; {0}")]
    FailedSchedulerPrecondition(String),

    /// The scheduler answered a request with an error, e.g. an unknown cluster or a malformed task definition.
    #[error("{0}")]
    Api(String),

    /// The waiter gave up before every task reached the stopped state or failed while polling. Both cases are
    /// reported the same way.
    #[error("{0}")]
    Wait(String),
}

/// A resource the scheduler could not act on, e.g. an instance it could not start or a task it could not find.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    /// The resource the failure is about; usually the container instance or the task definition.
    pub arn: Option<String>,
    pub reason: Option<String>,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is {}",
            self.arn.as_deref().unwrap_or("<unknown resource>"),
            self.reason.as_deref().unwrap_or("<no reason given>")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTaskRequest {
    /// The cluster to run the task on.
    pub cluster: String,
    /// Family and revision (`family:revision`) or full ARN of the task definition to run.
    pub task_definition: String,
    /// How many copies of the task to start.
    pub count: i32,
    /// Label attached to every started task so it can be traced back to whoever started it.
    pub started_by: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTaskResponse {
    /// Identifiers of the tasks that were started, in the order the scheduler returned them.
    pub task_arns: Vec<String>,
    pub failures: Vec<TaskFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitRequest {
    pub cluster: String,
    pub task_arns: Vec<String>,
    /// The total time the waiter may poll for before giving up.
    pub max_wait: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeTasksRequest {
    pub cluster: String,
    pub task_arns: Vec<String>,
}

/// The final state of one container belonging to a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOutcome {
    pub name: Option<String>,
    /// Missing while the container is still running or if it never started.
    pub exit_code: Option<i32>,
    /// Short human readable explanation of why the container stopped.
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescription {
    pub task_arn: Option<String>,
    pub containers: Vec<ContainerOutcome>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DescribeTasksResponse {
    pub tasks: Vec<TaskDescription>,
    /// Tasks the scheduler could not describe, e.g. because they no longer exist.
    pub failures: Vec<TaskFailure>,
}

/// The scheduler trait defines what the interface between the launcher and a cluster scheduler should look like.
#[async_trait]
pub trait Scheduler: Debug + Send + Sync {
    /// Ask the scheduler to start `count` copies of a task definition. Instances the scheduler could not place are
    /// returned as failures rather than as an error.
    async fn run_task(&self, req: RunTaskRequest) -> Result<RunTaskResponse, SchedulerError>;

    /// Block until every task given has stopped or the wait budget runs out.
    async fn wait_until_stopped(&self, req: WaitRequest) -> Result<(), SchedulerError>;

    /// Get the current state of the given tasks and their containers.
    async fn describe_tasks(
        &self,
        req: DescribeTasksRequest,
    ) -> Result<DescribeTasksResponse, SchedulerError>;

    /// Link to a page where the user can follow the tasks of a cluster, if the scheduler has one.
    fn console_url(&self, cluster: &str) -> Option<String>;
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, Display, EnumString)]
pub enum Engine {
    #[default]
    Ecs,
}

pub async fn init_scheduler(
    config: &conf::Scheduler,
) -> Result<Arc<dyn Scheduler>, SchedulerError> {
    match config.engine {
        Engine::Ecs => {
            if let Some(config) = &config.ecs {
                let engine = ecs::Scheduler::new(config).await?;
                Ok(Arc::new(engine))
            } else {
                Err(SchedulerError::FailedSchedulerPrecondition(
                    "ecs engine settings not found in config".into(),
                ))
            }
        }
    }
}
