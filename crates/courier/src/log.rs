//! Leveled logging on top of `tracing`.
//!
//! Every actor owns an [`ActorLogger`] whose lines carry an `[actor <name>] `
//! prefix and go to a [`LogSink`], [`TracingSink`] unless the actor's spec
//! names another. [`init`] and [`init_from_env`] install a subscriber that
//! renders events as `<timestamp> [<LEVEL>] <message>`.

use std::fmt;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Environment variable read by [`init_from_env`].
pub const LOG_ENV: &str = "COURIER_LOG";

/// Log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
	#[default]
	Debug,
	Info,
	Warn,
	Error,
	/// Rendered as `FATAL`; recorded as an error event, never aborts.
	Fatal,
}

impl LogLevel {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Debug => "DEBUG",
			Self::Info => "INFO ",
			Self::Warn => "WARN ",
			Self::Error => "ERROR",
			Self::Fatal => "FATAL",
		}
	}

	const fn filter(self) -> LevelFilter {
		match self {
			Self::Debug => LevelFilter::DEBUG,
			Self::Info => LevelFilter::INFO,
			Self::Warn => LevelFilter::WARN,
			Self::Error | Self::Fatal => LevelFilter::ERROR,
		}
	}
}

/// Destination of actor log lines that passed the logger's minimum level.
///
/// `line` already carries the actor prefix.
pub trait LogSink: Send + Sync + 'static {
	fn write(&self, level: LogLevel, line: fmt::Arguments<'_>);
}

/// Forwards lines to `tracing` events at the matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
	fn write(&self, level: LogLevel, line: fmt::Arguments<'_>) {
		match level {
			LogLevel::Debug => tracing::debug!("{line}"),
			LogLevel::Info => tracing::info!("{line}"),
			LogLevel::Warn => tracing::warn!("{line}"),
			LogLevel::Error => tracing::error!("{line}"),
			LogLevel::Fatal => tracing::error!(fatal = true, "{line}"),
		}
	}
}

/// Per-actor logger.
#[derive(Clone)]
pub struct ActorLogger {
	prefix: String,
	min: LogLevel,
	sink: Arc<dyn LogSink>,
}

impl ActorLogger {
	#[cfg(test)]
	pub(crate) fn new(actor: &str, min: LogLevel) -> Self {
		Self::with_sink(actor, min, Arc::new(TracingSink))
	}

	pub(crate) fn with_sink(actor: &str, min: LogLevel, sink: Arc<dyn LogSink>) -> Self {
		Self {
			prefix: format!("[actor {actor}] "),
			min,
			sink,
		}
	}

	/// Returns whether lines at `level` pass this logger's minimum.
	pub fn enabled(&self, level: LogLevel) -> bool {
		level >= self.min
	}

	pub fn min_level(&self) -> LogLevel {
		self.min
	}

	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	/// Logs one line. Pass `format_args!` for formatted output.
	pub fn log(&self, level: LogLevel, msg: impl fmt::Display) {
		if !self.enabled(level) {
			return;
		}
		self.sink.write(level, format_args!("{}{msg}", self.prefix));
	}

	pub fn debug(&self, msg: impl fmt::Display) {
		self.log(LogLevel::Debug, msg);
	}

	pub fn info(&self, msg: impl fmt::Display) {
		self.log(LogLevel::Info, msg);
	}

	pub fn warn(&self, msg: impl fmt::Display) {
		self.log(LogLevel::Warn, msg);
	}

	pub fn error(&self, msg: impl fmt::Display) {
		self.log(LogLevel::Error, msg);
	}

	pub fn fatal(&self, msg: impl fmt::Display) {
		self.log(LogLevel::Fatal, msg);
	}
}

impl fmt::Debug for ActorLogger {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActorLogger").field("prefix", &self.prefix).field("min", &self.min).finish_non_exhaustive()
	}
}

/// Event format producing `<timestamp> [<LEVEL>] <message> [key=value ...]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineFormat;

#[derive(Default)]
struct LineVisitor {
	message: String,
	fields: String,
	fatal: bool,
}

impl Visit for LineVisitor {
	fn record_bool(&mut self, field: &Field, value: bool) {
		if field.name() == "fatal" {
			self.fatal = value;
		} else {
			self.record_debug(field, &value);
		}
	}

	fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
		use std::fmt::Write as _;

		if field.name() == "message" {
			let _ = write!(self.message, "{value:?}");
		} else {
			let _ = write!(self.fields, " {}={value:?}", field.name());
		}
	}
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
	S: Subscriber + for<'a> LookupSpan<'a>,
	N: for<'a> FormatFields<'a> + 'static,
{
	fn format_event(&self, _ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
		let mut visitor = LineVisitor::default();
		event.record(&mut visitor);

		let level = *event.metadata().level();
		let level = if visitor.fatal {
			LogLevel::Fatal
		} else if level == tracing::Level::ERROR {
			LogLevel::Error
		} else if level == tracing::Level::WARN {
			LogLevel::Warn
		} else if level == tracing::Level::INFO {
			LogLevel::Info
		} else {
			LogLevel::Debug
		};
		let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
		writeln!(writer, "{now} [{}] {}{}", level.as_str(), visitor.message, visitor.fields)
	}
}

/// Installs a global subscriber printing lines at or above `min`.
pub fn init(min: LogLevel) -> Result<(), TryInitError> {
	tracing_subscriber::registry()
		.with(min.filter())
		.with(tracing_subscriber::fmt::layer().event_format(LineFormat))
		.try_init()
}

/// Installs a global subscriber filtered by the `COURIER_LOG` directive.
///
/// Falls back to `info` when the variable is unset or invalid.
pub fn init_from_env() -> Result<(), TryInitError> {
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().event_format(LineFormat))
		.try_init()
}
