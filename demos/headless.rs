//! Terminal console demo for a dedicated server.
//!
//! Run with: `cargo run --example headless --features terminal`
//!
//! Try:
//! - `help`, `listcmds`, `listvars sv-`
//! - `sv-maxplayers 80` (out of range) and `sv-maxplayers force 80`
//! - `alias greet "say hello %1"; greet world`
//! - `repeat 3 35 status`
//! - `quit`

use bevy::prelude::*;
use bevy_console_runtime::prelude::*;

fn main() {
    println!("=== Headless Console Demo ===");
    println!("Type commands and press Enter. Type 'quit' to exit.");
    println!();

    use std::io::Write;
    let _ = std::io::stdout().flush();

    App::new()
        .add_plugins(MinimalPlugins)
        .add_plugins(ConsolePlugin::default())
        .add_systems(Startup, setup)
        .run();
}

fn setup(mut console: Console) {
    let vars = [
        ConVar::new("sv-gravity", 800.0f32)
            .description("World gravity")
            .flags(ConVarFlags::ARCHIVE),
        ConVar::new("sv-maxplayers", 32i32)
            .description("Maximum number of players")
            .range(1.0, 64.0),
        ConVar::new("sv-hostname", "My Server".to_string())
            .description("Server name")
            .flags(ConVarFlags::ARCHIVE),
    ];
    for var in vars {
        if let Err(err) = console.register_var(var) {
            error!("{}", err);
        }
    }

    let cmds = [
        ConCommand::new("status", |session, _args| {
            let hostname = session.get_string("sv-hostname").unwrap_or_default();
            let maxplayers = session.get::<i32>("sv-maxplayers").unwrap_or(0);
            let gravity = session.get::<f32>("sv-gravity").unwrap_or(0.0);

            session.post_styled(LineStyle::RULER | LineStyle::CENTER, "Status");
            session.post(format!("Hostname: {hostname}"));
            session.post(format!("Max Players: {maxplayers}"));
            session.post(format!("Gravity: {gravity}"));
            Ok(())
        })
        .signature("")
        .description("Show server status"),
        ConCommand::new("say", |session, args| {
            session.post_styled(LineStyle::GREEN, format!("[SERVER] {}", args.join_from(0, " ")));
            Ok(())
        })
        .signature("s*")
        .description("Broadcast a message"),
        ConCommand::new("quit", |session, _args| {
            session.queue_world_action(|world| {
                world.write_message(AppExit::Success);
            });
            Ok(())
        })
        .signature("")
        .flags(CommandFlags::NO_SCRIPT)
        .description("Exit the application"),
    ];
    for cmd in cmds {
        if let Err(err) = console.register_cmd(cmd) {
            error!("{}", err);
        }
    }

    console.run("help");
}
