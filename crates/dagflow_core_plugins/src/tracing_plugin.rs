//! Tracing and observability plugin.
//!
//! Provides [`TracingPlugin`] which configures the `tracing` subscriber and
//! logs every [`ProcessorEvent`] the processor emits.
//!
//! # Lifecycle
//!
//! - **[`TracingPlugin::init()`]** installs a `tracing-subscriber` registry
//!   with an [`EnvFilter`] and a fmt layer in the configured format. It can be
//!   called on its own when only the subscriber is wanted.
//! - **[`Plugin::build()`]** (through [`HooksAPI::add_plugin`]) installs the
//!   subscriber unless disabled with [`TracingPlugin::with_subscriber`], then
//!   registers an observer on every processor schedule and a provider that
//!   exposes [`TracingConfig`] in the runtime bag at the start of each run.
//!
//! # Example
//!
//! ```
//! use dagflow_core_plugins::{TracingConfig, TracingFormat, TracingPlugin};
//! use dagflow_graph::hooks::HooksAPI;
//! use tracing::Level;
//!
//! let hooks = HooksAPI::new();
//! hooks
//!     .add_plugin(
//!         TracingPlugin::default()
//!             .with_level(Level::DEBUG)
//!             .with_format(TracingFormat::Pretty),
//!     )
//!     .unwrap();
//!
//! // Operations can adapt to the configuration:
//! // if let Some(config) = ctx.runtime().get::<TracingConfig>() { ... }
//! ```

use dagflow_graph::hooks::schedule::{
    OnBreakpoint, OnFrameEnter, OnFrameExit, OnIterationStart, OnNodeComplete, OnNodeError,
    OnNodeStart, OnRunComplete, OnRunFailure, OnRunStart,
};
use dagflow_graph::hooks::{HookRegistrationError, HooksAPI, ProcessorEvent};
use dagflow_graph::plugin::Plugin;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Target used for processor event logs.
const EVENT_TARGET: &str = "dagflow::events";

type AllSchedules = (
    OnRunStart,
    OnRunComplete,
    OnRunFailure,
    OnNodeStart,
    OnNodeComplete,
    OnNodeError,
    OnBreakpoint,
    OnFrameEnter,
    OnFrameExit,
    OnIterationStart,
);

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// The tracing configuration, as seen by operations.
///
/// [`TracingPlugin`] inserts it into the processor's runtime bag when a run
/// starts. Operations read it with `ctx.runtime().get::<TracingConfig>()` to
/// skip expensive diagnostics the subscriber would drop anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// The configured log level.
    pub level: Level,
    /// The configured output format.
    pub format: TracingFormat,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing and logging plugin.
///
/// Configures the `tracing` subscriber and logs processor events.
/// Uses the [`tracing`] and [`tracing_subscriber`] crates under the hood.
///
/// # Hooks Registered
///
/// | Hook | Schedules | Kind |
/// |------|-----------|------|
/// | `tracing_events` | every processor schedule | observer |
/// | `tracing_config` | `OnRunStart` | provider of [`TracingConfig`] |
///
/// # Configuration Options
///
/// ```
/// use dagflow_core_plugins::{TracingPlugin, TracingFormat};
/// use tracing::Level;
///
/// // Development: pretty output with debug level and span events
/// let dev_plugin = TracingPlugin::default()
///     .with_level(Level::DEBUG)
///     .with_format(TracingFormat::Pretty)
///     .with_span_events(true);
///
/// // Production: JSON output for log aggregation
/// let prod_plugin = TracingPlugin::default()
///     .with_level(Level::INFO)
///     .with_format(TracingFormat::Json)
///     .with_env_filter("dagflow=info,dagflow::events=warn");
/// ```
#[derive(Debug, Clone)]
pub struct TracingPlugin {
    /// Maximum log level, also the level processor events are logged at.
    level: Level,
    /// Output format.
    format: TracingFormat,
    /// Environment filter (e.g., "`dagflow_graph=debug`").
    env_filter: Option<String>,
    /// Whether to include span events (enter/exit).
    span_events: bool,
    /// Whether `build()` installs the subscriber.
    install_subscriber: bool,
}

impl Default for TracingPlugin {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
            install_subscriber: true,
        }
    }
}

impl TracingPlugin {
    /// Creates a new `TracingPlugin` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a custom environment filter string.
    ///
    /// Format: `target=level,target=level,...`. An unparsable filter falls
    /// back to the configured level.
    ///
    /// # Example
    ///
    /// ```
    /// use dagflow_core_plugins::TracingPlugin;
    ///
    /// TracingPlugin::new()
    ///     .with_env_filter("dagflow_graph=debug,dagflow::events=trace");
    /// ```
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Controls whether adding the plugin installs the global subscriber.
    ///
    /// Disable it when the application already installed one; the event
    /// observer is registered either way.
    #[must_use]
    pub fn with_subscriber(mut self, enabled: bool) -> Self {
        self.install_subscriber = enabled;
        self
    }

    /// Returns the configuration operations will see.
    #[must_use]
    pub fn config(&self) -> TracingConfig {
        TracingConfig {
            level: self.level,
            format: self.format,
        }
    }

    /// Installs the global subscriber.
    ///
    /// Returns `false` if a global subscriber was already set, in which case
    /// the existing one is kept.
    pub fn init(&self) -> bool {
        let env_filter = match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::new(self.level.as_str()),
        };

        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        let registry = tracing_subscriber::registry().with(env_filter);
        let installed = match self.format {
            TracingFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Compact => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
        };

        if installed {
            tracing::info!(
                level = %self.level,
                format = ?self.format,
                "TracingPlugin initialized"
            );
        }
        installed
    }
}

impl Plugin for TracingPlugin {
    fn build(&self, hooks: &HooksAPI) -> Result<(), HookRegistrationError> {
        if self.install_subscriber {
            self.init();
        }

        let level = self.level;
        hooks.register_observer::<AllSchedules, _>("tracing_events", move |event| {
            log_event(level, event);
        })?;

        let config = self.config();
        hooks.register_provider::<OnRunStart, TracingConfig, _>("tracing_config", move |_| {
            Some(config)
        })?;
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

fn log_event(level: Level, event: &ProcessorEvent) {
    let schedule = event.schedule_name();
    match level {
        Level::ERROR => tracing::error!(target: EVENT_TARGET, schedule, "{event}"),
        Level::WARN => tracing::warn!(target: EVENT_TARGET, schedule, "{event}"),
        Level::INFO => tracing::info!(target: EVENT_TARGET, schedule, "{event}"),
        Level::DEBUG => tracing::debug!(target: EVENT_TARGET, schedule, "{event}"),
        _ => tracing::trace!(target: EVENT_TARGET, schedule, "{event}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt;
    use std::sync::Arc;

    use dagflow_graph::graph::Graph;
    use dagflow_graph::processor::{Processor, ProcessorState};
    use dagflow_system::context::Context;
    use dagflow_system::extension::Extensions;
    use dagflow_system::schedule::ScheduleId;
    use parking_lot::Mutex;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::Context as LayerContext;

    /// Captures `(level, schedule)` for every processor event log.
    #[derive(Clone, Default)]
    struct Capture {
        events: Arc<Mutex<Vec<(Level, String)>>>,
    }

    impl Capture {
        fn events(&self) -> Vec<(Level, String)> {
            self.events.lock().clone()
        }
    }

    impl<S: Subscriber> Layer<S> for Capture {
        fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
            let mut visitor = ScheduleVisitor(None);
            event.record(&mut visitor);
            if let Some(schedule) = visitor.0 {
                self.events
                    .lock()
                    .push((*event.metadata().level(), schedule));
            }
        }
    }

    struct ScheduleVisitor(Option<String>);

    impl Visit for ScheduleVisitor {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "schedule" {
                self.0 = Some(value.to_owned());
            }
        }

        fn record_debug(&mut self, _field: &Field, _value: &dyn fmt::Debug) {}
    }

    #[test]
    fn tracing_format_default_is_pretty() {
        assert_eq!(TracingFormat::default(), TracingFormat::Pretty);
    }

    #[test]
    fn tracing_plugin_defaults() {
        let plugin = TracingPlugin::default();
        assert_eq!(plugin.level, Level::INFO);
        assert!(plugin.install_subscriber);
        assert!(!plugin.span_events);
        assert_eq!(plugin.env_filter, None);
    }

    #[test]
    fn tracing_plugin_builders() {
        let plugin = TracingPlugin::new()
            .with_level(Level::DEBUG)
            .with_format(TracingFormat::Json)
            .with_env_filter("dagflow_graph=debug")
            .with_span_events(true)
            .with_subscriber(false);

        assert_eq!(
            plugin.config(),
            TracingConfig {
                level: Level::DEBUG,
                format: TracingFormat::Json,
            }
        );
        assert_eq!(plugin.env_filter.as_deref(), Some("dagflow_graph=debug"));
        assert!(plugin.span_events);
        assert!(!plugin.install_subscriber);
    }

    #[test]
    fn registers_observer_on_every_schedule() {
        let hooks = HooksAPI::new();
        hooks
            .add_plugin(TracingPlugin::new().with_subscriber(false))
            .unwrap();

        for schedule in [
            ScheduleId::of::<OnRunStart>(),
            ScheduleId::of::<OnNodeComplete>(),
            ScheduleId::of::<OnIterationStart>(),
            ScheduleId::of::<OnBreakpoint>(),
        ] {
            assert!(hooks.hook_count(schedule) >= 1, "{schedule:?}");
        }
        assert_eq!(hooks.hook_count(ScheduleId::of::<OnRunStart>()), 2);
    }

    #[test]
    fn provides_config_at_run_start() {
        let plugin = TracingPlugin::new()
            .with_level(Level::TRACE)
            .with_subscriber(false);
        let hooks = HooksAPI::new();
        hooks.add_plugin(plugin.clone()).unwrap();

        let mut runtime = Extensions::new();
        hooks.invoke(
            ScheduleId::of::<OnRunStart>(),
            &mut runtime,
            &ProcessorEvent::RunStart {
                node_count: 0,
                depth: 0,
            },
        );

        assert_eq!(runtime.get::<TracingConfig>(), Some(&plugin.config()));
    }

    #[test]
    fn logs_processor_events_at_configured_level() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());

        let hooks = HooksAPI::new();
        hooks
            .add_plugin(
                TracingPlugin::new()
                    .with_level(Level::DEBUG)
                    .with_subscriber(false),
            )
            .unwrap();
        let hooks = Arc::new(hooks);

        let graph = Graph::new();
        tracing::subscriber::with_default(subscriber, || {
            let mut processor = Processor::new(&graph).with_hooks(Arc::clone(&hooks));
            processor.reset(Context::new());
            assert_eq!(processor.step_all(), ProcessorState::Complete);
        });

        assert_eq!(
            capture.events(),
            vec![
                (Level::DEBUG, "OnRunStart".to_owned()),
                (Level::DEBUG, "OnRunComplete".to_owned()),
            ]
        );
    }
}
