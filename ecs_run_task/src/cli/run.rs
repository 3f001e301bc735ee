use super::CliHarness;
use crate::{launcher, scheduler};
use anyhow::Result;
use step_sdk::Step;
use tracing::debug;

impl CliHarness {
    pub async fn run(&self) -> Result<i32> {
        let mut step = Step::from_env();

        let scheduler = match scheduler::init_scheduler(&self.config.scheduler).await {
            Ok(scheduler) => scheduler,
            Err(e) => {
                launcher::fail(&mut step, &e)?;
                return Ok(step.exit_code());
            }
        };

        debug!(scheduler = ?scheduler, "Scheduler ready");

        let exit_code = launcher::execute(&mut step, scheduler.as_ref(), &self.config.waiter).await?;
        Ok(exit_code)
    }
}
