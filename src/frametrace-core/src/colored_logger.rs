//! Colored logging infrastructure for component identification
//!
//! Provides a custom tracing formatter that adds colored prefixes to
//! distinguish output from the pipeline's components (orchestrator, decoder,
//! OCR workers, store).

use owo_colors::{OwoColorize, Style};
use std::fmt;
use std::io;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{
    format::{Writer, FormatEvent, FormatFields},
    FmtContext,
};
use tracing_subscriber::registry::LookupSpan;

/// Component identifier for prefixing logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Orchestrator,
    Decode,
    Ocr,
    Store,
}

impl Component {
    /// Get the string representation for logging prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Orchestrator => "ORCHESTR",
            Component::Decode => "DECODE",
            Component::Ocr => "OCR",
            Component::Store => "STORE",
        }
    }

    /// Get the color style for this component
    pub fn color_style(&self) -> Style {
        match self {
            Component::Orchestrator => Style::new().cyan().bold(),
            Component::Decode => Style::new().green().bold(),
            Component::Ocr => Style::new().yellow().bold(),
            Component::Store => Style::new().magenta().bold(),
        }
    }

    /// Map a `tracing` event target to its component, falling back to
    /// `Orchestrator` for anything unrecognized (library spans, etc.).
    fn from_target(target: &str) -> Component {
        match target {
            "decode" => Component::Decode,
            "ocr" => Component::Ocr,
            "store" => Component::Store,
            _ => Component::Orchestrator,
        }
    }
}

/// Custom formatter with component prefixes and colors.
///
/// The pipeline runs as a single process with one thread per component
/// rather than this workspace's prior one-process-per-component layout, so
/// the component is read off each event's `target` (set via `target:
/// "decode"` etc. at the call site) instead of being fixed at
/// initialization.
pub struct ColoredFormatter;

impl<S, N> FormatEvent<S, N> for ColoredFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let component = Component::from_target(metadata.target());

        // Timestamp (HH:MM:SS format)
        let now = chrono::Local::now();
        write!(writer, "{} ", now.format("%H:%M:%S").dimmed())?;

        // Component prefix with color
        let prefix = format!("[{:8}]", component.as_str());
        write!(writer, "{} ", prefix.style(component.color_style()))?;

        // Log level with appropriate color
        let level = metadata.level();
        match *level {
            Level::ERROR => write!(writer, "{} ", "ERROR".red().bold())?,
            Level::WARN => write!(writer, "{} ", "WARN ".yellow().bold())?,
            Level::INFO => write!(writer, "{} ", "INFO ".green().bold())?,
            Level::DEBUG => write!(writer, "{} ", "DEBUG".blue().bold())?,
            Level::TRACE => write!(writer, "{} ", "TRACE".dimmed().bold())?,
        }

        // Message content
        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Initialize colored, component-tagged logging for the whole process.
///
/// Should be called once, from `main`. `RUST_LOG` overrides `default_level`
/// where set.
pub fn init_component_logger(default_level: Level) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer()
        .event_format(ColoredFormatter)
        .with_writer(io::stdout);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()))
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
