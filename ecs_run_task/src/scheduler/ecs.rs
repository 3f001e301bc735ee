use super::{
    ContainerOutcome, DescribeTasksRequest, DescribeTasksResponse, TaskFailure, RunTaskRequest, RunTaskResponse,
    SchedulerError, TaskDescription, WaitRequest,
};
use async_trait::async_trait;
use aws_config::{AppName, BehaviorVersion};
use aws_sdk_ecs::client::Waiters;
use aws_sdk_ecs::config::Region;
use aws_sdk_ecs::error::DisplayErrorContext;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Appended to the user agent of every request so the calls can be told apart in CloudTrail.
    pub app_name: String,
    /// Falls back to the SDK's region provider chain (`AWS_REGION`, profile, IMDS) when unset.
    pub region: Option<String>,
    /// Send requests to a custom endpoint instead, e.g. a local ECS emulator.
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    client: aws_sdk_ecs::Client,
    region: Option<String>,
}

impl Scheduler {
    #[instrument(fields(origin = "scheduler::ecs"))]
    pub async fn new(config: &Config) -> Result<Self, SchedulerError> {
        let app_name = AppName::new(config.app_name.clone()).map_err(|e| {
            SchedulerError::FailedSchedulerPrecondition(format!(
                "invalid app_name '{}'; {}",
                config.app_name, e
            ))
        })?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).app_name(app_name);

        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }

        if let Some(endpoint_url) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        let sdk_config = loader.load().await;
        let region = sdk_config.region().map(|region| region.to_string());

        if region.is_none() {
            return Err(SchedulerError::FailedSchedulerPrecondition(
                "no AWS region configured; set AWS_REGION or scheduler.ecs.region".into(),
            ));
        }

        debug!(region = ?region, "ECS scheduler configured");

        Ok(Self {
            client: aws_sdk_ecs::Client::new(&sdk_config),
            region,
        })
    }
}

#[async_trait]
impl super::Scheduler for Scheduler {
    #[instrument(skip(self), fields(origin = "scheduler::ecs"))]
    async fn run_task(&self, req: RunTaskRequest) -> Result<RunTaskResponse, SchedulerError> {
        let output = self
            .client
            .run_task()
            .cluster(&req.cluster)
            .task_definition(&req.task_definition)
            .count(req.count)
            .started_by(&req.started_by)
            .send()
            .await
            .map_err(|e| SchedulerError::Api(DisplayErrorContext(&e).to_string()))?;

        let task_arns = output
            .tasks()
            .iter()
            .filter_map(|task| task.task_arn().map(String::from))
            .collect();

        let failures = output
            .failures()
            .iter()
            .map(|failure| TaskFailure {
                arn: failure.arn().map(String::from),
                reason: failure.reason().map(String::from),
            })
            .collect();

        Ok(RunTaskResponse {
            task_arns,
            failures,
        })
    }

    #[instrument(skip(self), fields(origin = "scheduler::ecs"))]
    async fn wait_until_stopped(&self, req: WaitRequest) -> Result<(), SchedulerError> {
        self.client
            .wait_until_tasks_stopped()
            .cluster(&req.cluster)
            .set_tasks(Some(req.task_arns))
            .wait(req.max_wait)
            .await
            .map_err(|e| SchedulerError::Wait(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    #[instrument(skip(self), fields(origin = "scheduler::ecs"))]
    async fn describe_tasks(
        &self,
        req: DescribeTasksRequest,
    ) -> Result<DescribeTasksResponse, SchedulerError> {
        let output = self
            .client
            .describe_tasks()
            .cluster(&req.cluster)
            .set_tasks(Some(req.task_arns))
            .send()
            .await
            .map_err(|e| SchedulerError::Api(DisplayErrorContext(&e).to_string()))?;

        let tasks = output
            .tasks()
            .iter()
            .map(|task| TaskDescription {
                task_arn: task.task_arn().map(String::from),
                containers: task
                    .containers()
                    .iter()
                    .map(|container| ContainerOutcome {
                        name: container.name().map(String::from),
                        exit_code: container.exit_code(),
                        reason: container.reason().map(String::from),
                    })
                    .collect(),
            })
            .collect();

        let failures = output
            .failures()
            .iter()
            .map(|failure| TaskFailure {
                arn: failure.arn().map(String::from),
                reason: failure.reason().map(String::from),
            })
            .collect();

        Ok(DescribeTasksResponse { tasks, failures })
    }

    fn console_url(&self, cluster: &str) -> Option<String> {
        self.region.as_ref().map(|region| {
            format!(
                "https://console.aws.amazon.com/ecs/home?region={region}#/clusters/{cluster}/tasks"
            )
        })
    }
}
