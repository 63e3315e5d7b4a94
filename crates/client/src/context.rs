//! Orchestration context for one command

use crate::cancel::CancellationCoordinator;
use crate::output::Console;
use crate::progress::ProgressRenderer;
use crate::prompt::{Prompt, TermPrompt};
use pkc_bus::{Channel, EventChannel};
use pkc_config::Config;
use pkc_errors::Error;
use pkc_types::{Capabilities, FilterSet};
use std::sync::Arc;
use std::time::Duration;

/// Everything a transaction shares: the bus, what the service can do,
/// where output goes and where answers come from
pub struct TransactionContext {
    pub bus: Arc<dyn EventChannel>,
    pub capabilities: Arc<Capabilities>,
    pub console: Console,
    pub prompt: Box<dyn Prompt>,
    pub cancellation: CancellationCoordinator,
    pub pulse_interval: Duration,
    /// Filter set given on the command line, replacing per-command defaults
    pub filters: Option<FilterSet>,
    /// Return right after the primary request is issued
    pub nowait: bool,
}

impl TransactionContext {
    /// Open a handle and register it for cancellation
    ///
    /// # Errors
    ///
    /// Returns an error if the service refuses to open a handle.
    pub async fn open_channel(&self) -> Result<Channel, Error> {
        let channel = Channel::open(Arc::clone(&self.bus), Arc::clone(&self.capabilities)).await?;
        self.cancellation.register(channel.id());
        Ok(channel)
    }

    /// The command-line filter set, or `default` when none was given
    #[must_use]
    pub fn filters_or(&self, default: FilterSet) -> FilterSet {
        self.filters.clone().unwrap_or(default)
    }
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("capabilities", &self.capabilities)
            .field("console", &self.console)
            .field("cancellation", &self.cancellation)
            .field("pulse_interval", &self.pulse_interval)
            .field("filters", &self.filters)
            .field("nowait", &self.nowait)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TransactionContext`]
///
/// Only the bus is required. Capabilities are fetched from the service when
/// not given; output and prompts default to the process's terminal.
pub struct TransactionContextBuilder {
    bus: Option<Arc<dyn EventChannel>>,
    capabilities: Option<Capabilities>,
    console: Option<Console>,
    prompt: Option<Box<dyn Prompt>>,
    cancellation: Option<CancellationCoordinator>,
    pulse_interval: Duration,
    bar_width: usize,
    interactive: bool,
    color: bool,
    filters: Option<FilterSet>,
    nowait: bool,
}

impl Default for TransactionContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionContextBuilder {
    #[must_use]
    pub fn new() -> Self {
        let progress = pkc_config::ProgressConfig::default();
        Self {
            bus: None,
            capabilities: None,
            console: None,
            prompt: None,
            cancellation: None,
            pulse_interval: progress.pulse_interval(),
            bar_width: progress.bar_width,
            interactive: false,
            color: false,
            filters: None,
            nowait: false,
        }
    }

    #[must_use]
    pub fn with_bus(mut self, bus: Arc<dyn EventChannel>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Use known capabilities instead of asking the service
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Take bar width and pulse interval from configuration
    #[must_use]
    pub fn with_config(mut self, config: &Config) -> Self {
        self.pulse_interval = config.progress.pulse_interval();
        self.bar_width = config.progress.bar_width;
        self
    }

    /// Terminal settings for the default console
    #[must_use]
    pub fn with_terminal(mut self, interactive: bool, color: bool) -> Self {
        self.interactive = interactive;
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_console(mut self, console: Console) -> Self {
        self.console = Some(console);
        self
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: Box<dyn Prompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationCoordinator) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: Option<FilterSet>) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub fn with_nowait(mut self, nowait: bool) -> Self {
        self.nowait = nowait;
        self
    }

    /// Build the context
    ///
    /// # Errors
    ///
    /// Returns an error if no bus was set or the capabilities query fails.
    pub async fn build(self) -> Result<TransactionContext, Error> {
        let bus = self
            .bus
            .ok_or_else(|| Error::internal("bus is required"))?;
        let capabilities = match self.capabilities {
            Some(capabilities) => capabilities,
            None => bus.capabilities().await?,
        };
        let console = self.console.unwrap_or_else(|| {
            Console::stdio(
                ProgressRenderer::new(self.bar_width, self.interactive),
                self.color,
            )
        });
        let prompt = self
            .prompt
            .unwrap_or_else(|| Box::new(TermPrompt::stdout()));
        let cancellation = self
            .cancellation
            .unwrap_or_else(|| CancellationCoordinator::new(Arc::clone(&bus)));

        Ok(TransactionContext {
            bus,
            capabilities: Arc::new(capabilities),
            console,
            prompt,
            cancellation,
            pulse_interval: self.pulse_interval,
            filters: self.filters,
            nowait: self.nowait,
        })
    }
}
