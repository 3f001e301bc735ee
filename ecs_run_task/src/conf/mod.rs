use crate::scheduler;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use strum::{Display, EnumString};

#[derive(RustEmbed)]
#[folder = "src/conf/"]
#[include = "*.toml"]
struct EmbeddedConfigFS;

const DEFAULT_CONFIG_FILE: &str = "default_config.toml";

/// Searched when the user does not pass a configuration path.
const CONFIG_PATH: &str = "/etc/ecs_run_task/ecs_run_task.toml";

/// Env vars with this prefix override file configuration. Nested keys are separated by a double underscore, so
/// `ECS_RUN_TASK_WAITER__MAX_WAIT_SECONDS` sets `waiter.max_wait_seconds`.
const ENV_PREFIX: &str = "ECS_RUN_TASK_";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("embedded default configuration '{0}' could not be found")]
    MissingDefaults(String),

    #[error("configuration file '{0}' does not exist")]
    MissingFile(String),

    #[error("could not parse config; {0}")]
    Parsing(String),
}

#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub general: General,
    pub scheduler: Scheduler,
    pub waiter: Waiter,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct General {
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct Scheduler {
    pub engine: scheduler::Engine,
    pub ecs: Option<scheduler::ecs::Config>,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct Waiter {
    /// The total amount of time the stopped-tasks waiter is allowed to poll for, in seconds.
    pub max_wait_seconds: u64,
    /// Use the step's wait budget instead of `max_wait_seconds`.
    pub follow_wait_minutes: bool,
}

impl Waiter {
    /// Returns how long the waiter may poll for, given the (already clamped) wait budget the step was started with.
    pub fn budget(&self, wait_minutes: u64) -> Duration {
        if self.follow_wait_minutes {
            Duration::from_secs(wait_minutes * 60)
        } else {
            Duration::from_secs(self.max_wait_seconds)
        }
    }
}

/// Returns the embedded default configuration file.
fn default_config() -> Result<String, ConfigError> {
    let file = EmbeddedConfigFS::get(DEFAULT_CONFIG_FILE)
        .ok_or_else(|| ConfigError::MissingDefaults(DEFAULT_CONFIG_FILE.into()))?;

    String::from_utf8(file.data.into_owned()).map_err(|e| ConfigError::Parsing(e.to_string()))
}

impl Config {
    /// Builds the layered configuration: embedded defaults first, then the configuration file and lastly env vars,
    /// which always override everything.
    ///
    /// A path given explicitly must exist; the default path is only read when present.
    pub fn figment(path_override: Option<&str>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::new().merge(Toml::string(&default_config()?));

        match path_override {
            Some(path) => {
                if !Path::new(path).exists() {
                    return Err(ConfigError::MissingFile(path.to_string()));
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if Path::new(CONFIG_PATH).exists() {
                    figment = figment.merge(Toml::file(CONFIG_PATH));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn parse(path_override: Option<&str>) -> Result<Config, ConfigError> {
        Self::figment(path_override)?
            .extract()
            .map_err(|e| ConfigError::Parsing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Engine;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    fn expected_default() -> Config {
        Config {
            general: General {
                log_level: "info".to_string(),
                log_format: LogFormat::Pretty,
            },
            scheduler: Scheduler {
                engine: Engine::Ecs,
                ecs: Some(scheduler::ecs::Config {
                    app_name: "amazon-ecs-run-task-for-github-actions".to_string(),
                    region: None,
                    endpoint_url: None,
                }),
            },
            waiter: Waiter {
                max_wait_seconds: 200,
                follow_wait_minutes: false,
            },
        }
    }

    #[test]
    /// Test that the default config is properly parsed from the embedded configuration file.
    fn parse_default_config_from_file() {
        let parsed_config: Config = Figment::new()
            .merge(Toml::string(&default_config().unwrap()))
            .extract()
            .unwrap();

        assert_eq!(parsed_config, expected_default());
    }

    #[test]
    /// Test that env vars correctly overwrite file values and are parsed correctly.
    fn parse_env_vars() {
        Jail::expect_with(|jail| {
            jail.set_env("ECS_RUN_TASK_GENERAL__LOG_LEVEL", "debug");
            jail.set_env("ECS_RUN_TASK_GENERAL__LOG_FORMAT", "json");
            jail.set_env("ECS_RUN_TASK_SCHEDULER__ECS__REGION", "eu-west-1");
            jail.set_env("ECS_RUN_TASK_WAITER__MAX_WAIT_SECONDS", "600");

            let config_path = jail.directory().join("missing.toml");
            assert!(Config::parse(config_path.to_str()).is_err());

            let parsed_config = Config::figment(None).unwrap().extract::<Config>()?;

            let mut expected = expected_default();
            expected.general.log_level = "debug".to_string();
            expected.general.log_format = LogFormat::Json;
            if let Some(ecs) = expected.scheduler.ecs.as_mut() {
                ecs.region = Some("eu-west-1".to_string());
            }
            expected.waiter.max_wait_seconds = 600;

            assert_eq!(parsed_config, expected);
            Ok(())
        });
    }

    #[test]
    fn parse_user_config_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "ecs_run_task.toml",
                r#"
                [scheduler.ecs]
                endpoint_url = "http://localhost:4566"

                [waiter]
                follow_wait_minutes = true
                "#,
            )?;

            let path = jail.directory().join("ecs_run_task.toml");
            let parsed_config = Config::parse(path.to_str()).unwrap();

            let ecs = parsed_config.scheduler.ecs.unwrap();
            assert_eq!(ecs.endpoint_url, Some("http://localhost:4566".to_string()));
            assert_eq!(ecs.app_name, "amazon-ecs-run-task-for-github-actions");
            assert!(parsed_config.waiter.follow_wait_minutes);
            assert_eq!(parsed_config.waiter.max_wait_seconds, 200);
            Ok(())
        });
    }

    #[test]
    fn waiter_budget() {
        let mut waiter = Waiter {
            max_wait_seconds: 200,
            follow_wait_minutes: false,
        };
        assert_eq!(waiter.budget(360), Duration::from_secs(200));

        waiter.follow_wait_minutes = true;
        assert_eq!(waiter.budget(360), Duration::from_secs(21600));
    }
}
