//! Forward `tracing` records into the console output.
//!
//! Install with [`LogPlugin::custom_layer`](bevy::log::LogPlugin::custom_layer):
//!
//! ```ignore
//! App::new().add_plugins(DefaultPlugins.set(LogPlugin {
//!     custom_layer: bevy_console_runtime::logging::custom_log_layer,
//!     ..default()
//! }));
//! ```

use bevy::log::{BoxedLayer, Level};
use bevy::prelude::*;
use std::sync::mpsc;
use tracing::Subscriber;
use tracing_subscriber::Layer;
use tracing_subscriber::field::Visit;

use crate::core::{ConsoleSession, LineStyle};

/// Records from this crate are not forwarded; they describe console
/// activity the user already sees.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// A function that implements the log reading functionality for the
/// console via [`LogPlugin::custom_layer`](bevy::log::LogPlugin::custom_layer).
pub fn custom_log_layer(app: &mut App) -> Option<BoxedLayer> {
    Some(Box::new(create_custom_log_layer(app)))
}

fn create_custom_log_layer(app: &mut App) -> LogCaptureLayer {
    let (sender, receiver) = mpsc::channel();
    app.insert_non_send_resource(CapturedLogEvents(receiver));
    app.add_systems(PostUpdate, post_log_records);

    LogCaptureLayer { sender }
}

/// A captured log record.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub message: String,
    pub target: &'static str,
    pub level: Level,
}

impl LogRecord {
    /// Style of the console line for this record.
    pub fn style(&self) -> LineStyle {
        match self.level {
            Level::ERROR => LineStyle::RED | LineStyle::LIGHT,
            Level::WARN => LineStyle::YELLOW,
            Level::INFO => LineStyle::NONE,
            _ => LineStyle::BLUE,
        }
    }

    /// Console line for this record.
    pub fn line(&self) -> String {
        match self.level {
            Level::ERROR | Level::WARN => format!("[{}] {}", self.level, self.message),
            _ => self.message.clone(),
        }
    }

    fn is_forwarded(&self) -> bool {
        self.target != OWN_TARGET
            && !self
                .target
                .strip_prefix(OWN_TARGET)
                .is_some_and(|rest| rest.starts_with("::"))
    }
}

/// Post captured records as console lines.
fn post_log_records(
    receiver: NonSend<CapturedLogEvents>,
    session: Option<ResMut<ConsoleSession>>,
) {
    let Some(mut session) = session else {
        // Drop records until a session exists.
        receiver.0.try_iter().for_each(drop);
        return;
    };
    for record in receiver.0.try_iter().filter(LogRecord::is_forwarded) {
        session.post_styled(record.style(), record.line());
    }
}

/// Records waiting to be posted by [`post_log_records`].
struct CapturedLogEvents(mpsc::Receiver<LogRecord>);

/// A [`Layer`] that captures log events and sends them to [`CapturedLogEvents`].
struct LogCaptureLayer {
    sender: mpsc::Sender<LogRecord>,
}

impl<S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>> Layer<S>
    for LogCaptureLayer
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut message = None;
        event.record(&mut LogEventVisitor(&mut message));
        if let Some(message) = message {
            let metadata = event.metadata();
            let _ = self.sender.send(LogRecord {
                message,
                target: metadata.target(),
                level: *metadata.level(),
            });
        }
    }
}

/// A [`Visit`]or that extracts the `message` field.
struct LogEventVisitor<'a>(&'a mut Option<String>);

impl Visit for LogEventVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.0 = Some(format!("{value:?}"));
        }
    }
}
