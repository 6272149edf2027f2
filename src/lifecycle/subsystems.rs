//! Optional subsystems activated once the gateway is live.
//!
//! # Design Decisions
//! - Best effort: a subsystem that errors or panics is logged and skipped
//! - Each activation runs in its own task so one fault cannot reach the
//!   server or the other subsystems
//! - Activation happens exactly once; the registry is consumed by it

use std::io;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::schema::SubsystemsConfig;

#[derive(Debug, thiserror::Error)]
pub enum SubsystemError {
    #[error("no command configured")]
    NotConfigured,

    #[error("failed to launch '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait Subsystem: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn activate(&self) -> Result<(), SubsystemError>;
}

/// Names of the subsystems that came up and those that did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    pub activated: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Default)]
pub struct SubsystemRegistry {
    subsystems: Vec<Arc<dyn Subsystem>>,
}

impl SubsystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in `bot` and `matchmaker` subsystems.
    pub fn from_config(config: &SubsystemsConfig) -> Self {
        let mut registry = Self::new();
        registry
            .register(CommandSubsystem::new("bot", config.bot_command.clone()))
            .register(CommandSubsystem::new(
                "matchmaker",
                config.matchmaker_command.clone(),
            ));
        registry
    }

    pub fn register(&mut self, subsystem: impl Subsystem) -> &mut Self {
        self.subsystems.push(Arc::new(subsystem));
        self
    }

    pub fn len(&self) -> usize {
        self.subsystems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsystems.is_empty()
    }

    /// Activate every subsystem concurrently and collect the outcome.
    pub async fn activate_all(self) -> ActivationReport {
        let tasks = self
            .subsystems
            .into_iter()
            .map(|subsystem| {
                let name = subsystem.name().to_string();
                let task = tokio::spawn(async move { subsystem.activate().await });
                (name, task)
            })
            .collect::<Vec<_>>();

        let mut report = ActivationReport::default();
        for (name, task) in tasks {
            match task.await {
                Ok(Ok(())) => {
                    tracing::info!(subsystem = %name, "Subsystem activated");
                    report.activated.push(name);
                }
                Ok(Err(e)) => {
                    tracing::debug!(
                        subsystem = %name,
                        reason = %e,
                        "Subsystem unavailable, continuing without it"
                    );
                    report.failed.push(name);
                }
                Err(e) => {
                    tracing::debug!(
                        subsystem = %name,
                        error = %e,
                        "Subsystem crashed during activation"
                    );
                    report.failed.push(name);
                }
            }
        }
        report
    }
}

/// A subsystem that runs as a child process.
///
/// The command line is split on whitespace; the first word is the program.
/// The child outlives activation and is reaped in the background.
pub struct CommandSubsystem {
    name: String,
    command: Option<String>,
}

impl CommandSubsystem {
    pub fn new(name: impl Into<String>, command: Option<String>) -> Self {
        Self {
            name: name.into(),
            command,
        }
    }
}

#[async_trait]
impl Subsystem for CommandSubsystem {
    fn name(&self) -> &str {
        &self.name
    }

    async fn activate(&self) -> Result<(), SubsystemError> {
        let command = self
            .command
            .as_deref()
            .map(str::trim)
            .filter(|command| !command.is_empty())
            .ok_or(SubsystemError::NotConfigured)?;

        let mut words = command.split_whitespace();
        let program = words.next().ok_or(SubsystemError::NotConfigured)?;

        let mut child = Command::new(program)
            .args(words)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| SubsystemError::Launch {
                command: command.to_string(),
                source,
            })?;

        let name = self.name.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => {
                    tracing::info!(subsystem = %name, %status, "Subsystem process exited")
                }
                Err(e) => {
                    tracing::warn!(subsystem = %name, error = %e, "Lost track of subsystem process")
                }
            }
        });

        Ok(())
    }
}
