//! Tracing subscriber setup for the binary
//!
//! The library only emits events and spans; installing a subscriber is left
//! to the application, which calls [`TracingConfig::init`] once at startup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Output format for tracing events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Colored console output (CLI default)
    Console,
    /// Plain compact output for CI logs
    Compact,
    /// JSON lines for log shippers
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Where tracing output goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracingOutput {
    Console,
    #[cfg(feature = "tracing-files")]
    File(std::path::PathBuf),
    /// Console plus a daily-rolled log file
    #[cfg(feature = "tracing-files")]
    Both(std::path::PathBuf),
}

/// Keeps non-blocking file writers flushing; hold it until shutdown
#[derive(Debug, Default)]
pub struct TracingGuard {
    #[cfg(feature = "tracing-files")]
    _file: Option<tracing_appender::non_blocking::WorkerGuard>,
}

#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    pub format: TracingFormat,
    pub output: TracingOutput,
    /// Explicit filter directive; wins over `verbosity` and `RUST_LOG`
    pub env_filter: Option<String>,
    /// Correlates every event of one CLI or bot session
    pub session_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            output: TracingOutput::Console,
            env_filter: None,
            session_id: None,
        }
    }
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Filter directive for the configured verbosity
    ///
    /// Only this crate gets louder with `-v`; dependencies stay at `warn`
    /// so HTTP client internals do not flood the output.
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn,stickerbot=info",
            1 => "warn,stickerbot=debug",
            _ => "info,stickerbot=trace",
        }
    }

    fn build_filter(&self) -> anyhow::Result<EnvFilter> {
        if let Some(directive) = &self.env_filter {
            return Ok(EnvFilter::try_new(directive)?);
        }
        if self.verbosity == 0 {
            if let Ok(filter) = EnvFilter::try_from_default_env() {
                return Ok(filter);
            }
        }
        Ok(EnvFilter::try_new(self.verbosity_to_filter())?)
    }

    /// Install the global subscriber
    ///
    /// # Errors
    /// Invalid filter directive, or a subscriber is already installed.
    pub fn init(self) -> anyhow::Result<TracingGuard> {
        use tracing_subscriber::fmt;

        let registry = Registry::default().with(self.build_filter()?);
        #[allow(unused_mut)]
        let mut guard = TracingGuard::default();

        match (&self.format, &self.output) {
            (TracingFormat::Console, TracingOutput::Console) => {
                let layer = fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .compact();
                registry.with(layer).try_init()?;
            },
            (TracingFormat::Compact, TracingOutput::Console) => {
                let layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .compact();
                registry.with(layer).try_init()?;
            },
            #[cfg(feature = "tracing-json")]
            (TracingFormat::Json, TracingOutput::Console) => {
                let layer = fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(true);
                registry.with(layer).try_init()?;
            },
            #[cfg(feature = "tracing-files")]
            (format, TracingOutput::File(path)) => {
                let (writer, file_guard) = tracing_appender::non_blocking(
                    tracing_appender::rolling::never(log_dir(path), log_name(path, "stickerbot.log")),
                );
                guard._file = Some(file_guard);
                match format {
                    #[cfg(feature = "tracing-json")]
                    TracingFormat::Json => {
                        let layer = fmt::layer().json().with_writer(writer).with_current_span(true);
                        registry.with(layer).try_init()?;
                    },
                    _ => {
                        let layer = fmt::layer().with_ansi(false).with_writer(writer).compact();
                        registry.with(layer).try_init()?;
                    },
                }
            },
            #[cfg(feature = "tracing-files")]
            (format, TracingOutput::Both(path)) => {
                let (writer, file_guard) = tracing_appender::non_blocking(
                    tracing_appender::rolling::daily(log_dir(path), log_name(path, "stickerbot")),
                );
                guard._file = Some(file_guard);
                let file_layer = fmt::layer().with_ansi(false).with_writer(writer).compact();
                let console_layer = fmt::layer()
                    .with_ansi(*format == TracingFormat::Console)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .compact();
                registry.with(console_layer).with(file_layer).try_init()?;
            },
        }

        if let Some(session_id) = &self.session_id {
            tracing::info!(session_id = %session_id, "Sticker session started");
        }

        Ok(guard)
    }
}

#[cfg(feature = "tracing-files")]
fn log_dir(path: &std::path::Path) -> &std::path::Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."))
}

#[cfg(feature = "tracing-files")]
fn log_name<'a>(path: &'a std::path::Path, fallback: &'a str) -> &'a std::ffi::OsStr {
    path.file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new(fallback))
}

/// Install CLI defaults with a fresh session id
///
/// # Errors
/// See [`TracingConfig::init`].
pub fn init_cli_tracing(verbosity: u8) -> anyhow::Result<TracingGuard> {
    TracingConfig::new()
        .with_verbosity(verbosity)
        .with_session_id(uuid::Uuid::new_v4().to_string())
        .init()
}

/// Span helpers shared by the CLI and the bot runner
pub mod spans {
    use tracing::{Level, Span};

    pub fn session(session_id: &str, strategy: &str) -> Span {
        tracing::span!(Level::INFO, "session", session_id = %session_id, strategy = %strategy)
    }

    pub fn batch_processing(file_count: usize) -> Span {
        tracing::span!(Level::INFO, "batch_processing", file_count = file_count)
    }

    pub fn fetch(url: &str) -> Span {
        tracing::span!(Level::DEBUG, "fetch", url = %url)
    }
}
