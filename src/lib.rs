//! Console command runtime for Bevy.
//!
//! Turns text typed at a console, read from a config file or received from a
//! network peer into checked, possibly deferred actions against a registry of
//! commands, typed variables and aliases.
//!
//! - **ConVar**: typed console variables with bounds and protection flags
//! - **ConCommand**: commands with argument signatures and source checks
//! - **Aliases**: `%1`-`%9` positional macro expansion
//! - **Execution buffer**: `after`/`repeat` scheduling with an overflow guard
//! - **Completion**: unambiguous stem or cycling over registry names
//!
//! # Features
//!
//! - `persist` (default): RON configuration (`writeconfig`, `loadconfig`)
//! - `terminal`: stdin/stdout backend for dedicated servers
//! - `log-capture`: forward `tracing` records into the console output
//! - `full`: `persist` + `log-capture`
//!
//! # Quick Start
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_console_runtime::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(ConsolePlugin::default())
//!         .add_systems(Startup, setup_console)
//!         .run();
//! }
//!
//! fn setup_console(mut console: Console) {
//!     console
//!         .register_var(
//!             ConVar::new("sv-gravity", 800.0f32)
//!                 .description("World gravity")
//!                 .flags(ConVarFlags::ARCHIVE),
//!         )
//!         .ok();
//!
//!     console
//!         .register_cmd(
//!             ConCommand::new("say", |session, args| {
//!                 let text = args.join_from(0, " ");
//!                 session.post(text);
//!                 Ok(())
//!             })
//!             .signature("s*")
//!             .description("Print a message"),
//!         )
//!         .ok();
//!
//!     console.run("alias heavy \"sv-gravity 1600\"; after 35 heavy");
//! }
//! ```

use bevy::prelude::*;

pub mod config;
pub mod core;

#[cfg(feature = "log-capture")]
pub mod logging;

#[cfg(feature = "terminal")]
pub mod terminal;

#[cfg(feature = "persist")]
pub mod persist;

pub use config::ConsoleConfig;
pub use crate::core::{
    ArgumentVector, Clock, CommandArgs, CommandFlags, CommandHandler, CommandResult,
    CommandSource, ConAlias, ConCommand, ConValue, ConVar, ConVarChangedEvent, ConVarFlags,
    ConVarKind, ConVarValue, Console, ConsoleClearEvent, ConsoleError, ConsoleEventsPlugin,
    ConsoleInputEvent, ConsoleOutputEvent, ConsoleRef, ConsoleRegistry, ConsoleSession,
    EntryKind, HostCapabilities, LineStyle, ManualClock, PermissionDenied, RegistryEntry,
    SystemClock, VarError, split_statements, tokenize,
};

#[cfg(feature = "persist")]
pub use persist::{ConfigError, ConfigPath, ConsoleConfigFile};

#[cfg(feature = "terminal")]
pub use terminal::{TerminalConfig, TerminalPlugin};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::ConsoleConfig;
    pub use crate::core::{
        CommandArgs, CommandFlags, CommandResult, CommandSource, ConCommand, ConVar,
        ConVarChangedEvent, ConVarFlags, ConVarValue, Console, ConsoleError, ConsoleInputEvent,
        ConsoleOutputEvent, ConsoleRef, ConsoleSession, LineStyle, ManualClock, VarError,
    };
    pub use crate::{ConsoleClock, ConsolePlugin};
}

/// Handle to the clock the session is timed against.
///
/// [`advance_console_clock`] copies `Time::elapsed()` into it every frame.
#[derive(Resource, Debug, Clone, Default)]
pub struct ConsoleClock(pub ManualClock);

/// Main console plugin.
///
/// ```ignore
/// ConsolePlugin {
///     config: ConsoleConfig { tic_rate: 60, ..default() },
/// }
/// ```
#[derive(Default)]
pub struct ConsolePlugin {
    pub config: ConsoleConfig,
}

impl Plugin for ConsolePlugin {
    fn build(&self, app: &mut App) {
        let clock = ConsoleClock::default();
        let session = ConsoleSession::init(self.config.clone(), clock.0.clone());

        app.insert_resource(session)
            .insert_resource(clock)
            .add_plugins(crate::core::ConsoleEventsPlugin);

        // 1. advance_console_clock: publish frame time to the session
        // 2. read_console_input: execute submitted lines
        // 3. tick_console: fire scheduled statements that came due
        // 4. apply_console_world_actions: run queued closures on the world
        // 5. flush_console_output: turn session output into messages
        app.add_systems(
            Update,
            (
                advance_console_clock,
                read_console_input,
                tick_console,
                apply_console_world_actions,
                flush_console_output,
            )
                .chain(),
        );

        #[cfg(feature = "persist")]
        {
            app.init_resource::<persist::ConfigPath>()
                .add_systems(Startup, persist::load_config_on_startup);
        }

        #[cfg(feature = "terminal")]
        {
            app.add_plugins(terminal::TerminalPlugin);
        }
    }
}

/// Copy the frame clock into the session clock.
pub fn advance_console_clock(time: Res<Time>, clock: Res<ConsoleClock>) {
    clock.0.set(time.elapsed());
}

/// Execute every submitted input line.
pub fn read_console_input(
    mut input_events: MessageReader<ConsoleInputEvent>,
    mut session: ResMut<ConsoleSession>,
) {
    for event in input_events.read() {
        if session.config().echo_input && !event.silent {
            session.post(format!("> {}", event.text));
        }
        let ok = session.execute(
            event.source,
            &event.text,
            event.silent,
            event.network_originated,
        );
        if !ok {
            debug!("Console: '{}' did not complete", event.text);
        }
    }
}

/// Pump the execution buffer once per frame.
pub fn tick_console(mut session: ResMut<ConsoleSession>) {
    let report = session.pump();
    if report.dispatched > 0 {
        debug!(
            "Console: dispatched {} scheduled statements ({} failed)",
            report.dispatched, report.failed
        );
    }
}

/// Exclusive system running closures queued by command handlers.
pub fn apply_console_world_actions(world: &mut World) {
    let Some(mut session) = world.get_resource_mut::<ConsoleSession>() else {
        return;
    };
    let actions = session.take_world_actions();
    for action in actions {
        action(world);
    }
}

/// Send posted lines, variable changes and clear requests as messages.
pub fn flush_console_output(
    mut session: ResMut<ConsoleSession>,
    mut output_events: MessageWriter<ConsoleOutputEvent>,
    mut change_events: MessageWriter<ConVarChangedEvent>,
    mut clear_events: MessageWriter<ConsoleClearEvent>,
) {
    if session.take_clear_request() {
        clear_events.write(ConsoleClearEvent);
    }
    output_events.write_batch(session.drain_output());
    change_events.write_batch(session.drain_changes());
}

// Integration tests drive a headless App.
#[cfg(test)]
mod tests {
    use super::*;
    use bevy::time::TimeUpdateStrategy;
    use std::time::Duration;

    /// Output lines seen by the test.
    #[derive(Resource, Default)]
    struct Captured {
        lines: Vec<String>,
        changes: Vec<ConVarChangedEvent>,
        clears: usize,
    }

    #[derive(Resource, Default)]
    struct Counter(usize);

    fn capture(
        mut captured: ResMut<Captured>,
        mut output: MessageReader<ConsoleOutputEvent>,
        mut changes: MessageReader<ConVarChangedEvent>,
        mut clears: MessageReader<ConsoleClearEvent>,
    ) {
        captured.lines.extend(output.read().map(|e| e.text.clone()));
        captured.changes.extend(changes.read().cloned());
        captured.clears += clears.read().count();
    }

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_plugins(ConsolePlugin::default())
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)))
            .init_resource::<Captured>()
            .init_resource::<Counter>()
            .add_systems(PostUpdate, capture);
        app.update();
        app
    }

    fn submit(app: &mut App, event: ConsoleInputEvent) {
        app.world_mut().write_message(event);
        app.update();
    }

    fn lines(app: &mut App) -> Vec<String> {
        std::mem::take(&mut app.world_mut().resource_mut::<Captured>().lines)
    }

    #[test]
    fn test_command_execution_via_input() {
        let mut app = app();
        app.world_mut()
            .resource_mut::<ConsoleSession>()
            .register_cmd(ConCommand::new("count", |session, args| {
                let by = args.parse::<usize>(0).unwrap_or(1);
                session.queue_world_action(move |world| {
                    world.resource_mut::<Counter>().0 += by;
                });
                Ok(())
            }))
            .unwrap();

        submit(&mut app, ConsoleInputEvent::new("count; count 4; count"));

        assert_eq!(app.world().resource::<Counter>().0, 6);
        assert_eq!(lines(&mut app), vec!["> count; count 4; count"]);
    }

    #[test]
    fn test_convar_set_emits_change_message() {
        let mut app = app();
        app.world_mut()
            .resource_mut::<ConsoleSession>()
            .register_var(ConVar::new("test-var", 10i32))
            .unwrap();

        submit(&mut app, ConsoleInputEvent::new("test-var 20"));
        submit(&mut app, ConsoleInputEvent::new("test-var 20").silent());

        let captured = app.world().resource::<Captured>();
        assert_eq!(captured.changes, vec![ConVarChangedEvent::new("test-var", "10", "20")]);
        assert_eq!(
            captured.lines,
            vec!["> test-var 20".to_string(), "\"test-var\" = \"20\"".to_string()]
        );
    }

    #[test]
    fn test_after_fires_once_due() {
        let mut app = app();
        submit(&mut app, ConsoleInputEvent::new("after 35 \"echo late\"").silent());
        assert!(lines(&mut app).is_empty());

        let mut fired = false;
        for _ in 0..40 {
            app.update();
            if lines(&mut app) == vec!["late"] {
                fired = true;
                break;
            }
        }
        assert!(fired, "scheduled statement never fired");
        assert_eq!(app.world().resource::<ConsoleSession>().buffer().queued(), 0);
    }

    #[test]
    fn test_clear_request_becomes_message() {
        let mut app = app();
        submit(&mut app, ConsoleInputEvent::new("clear").silent());
        assert_eq!(app.world().resource::<Captured>().clears, 1);
    }

    #[test]
    fn test_remote_input_is_checked() {
        let mut app = app();
        {
            let mut session = app.world_mut().resource_mut::<ConsoleSession>();
            session.host_mut().server = true;
            session
                .register_cmd(
                    ConCommand::new("kick", |session, _args| {
                        session.post("kicked");
                        Ok(())
                    })
                    .flags(CommandFlags::CLIENT),
                )
                .unwrap();
        }

        submit(&mut app, ConsoleInputEvent::remote("echo hi"));
        submit(&mut app, ConsoleInputEvent::remote("kick"));

        assert_eq!(
            lines(&mut app),
            vec![
                "> echo hi",
                "echo can't be used by remote clients.",
                "> kick",
                "kicked",
            ]
        );
    }

    #[test]
    fn test_system_param_registration() {
        let mut app = app();
        app.add_systems(Update, |mut console: Console| {
            if !console.contains("fov") {
                console.register_var(ConVar::new("fov", 90i32)).unwrap();
                assert!(console.run("fov 100"));
            }
        });
        app.update();

        let session = app.world().resource::<ConsoleSession>();
        assert_eq!(session.get::<i32>("fov"), Some(100));
    }
}
