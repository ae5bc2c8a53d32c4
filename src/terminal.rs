//! Terminal backend for headless/dedicated server console.
//!
//! Lines read from stdin are executed with [`CommandSource::Console`];
//! console output is written to stdout.

use std::io::{self, BufRead, Write};
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use bevy::prelude::*;

use crate::core::{CommandSource, ConsoleInputEvent, ConsoleOutputEvent, LineStyle};

/// Plugin that adds terminal (stdin/stdout) console support.
pub struct TerminalPlugin;

impl Plugin for TerminalPlugin {
    fn build(&self, app: &mut App) {
        let (sender, receiver) = mpsc::channel();
        let _handle = spawn_stdin_reader(sender);

        app.insert_resource(StdinReceiver(Mutex::new(receiver)))
            .init_resource::<TerminalConfig>()
            .add_systems(Update, (read_stdin, write_stdout));
    }
}

/// Configuration for terminal behavior.
#[derive(Resource, Debug, Clone)]
pub struct TerminalConfig {
    /// Whether to use colored output (ANSI escape codes).
    pub colored: bool,
    /// Width used for rulers and centred lines.
    pub width: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        // Colour is off by default; some terminals mangle the escapes.
        Self {
            colored: false,
            width: 72,
        }
    }
}

#[derive(Resource)]
struct StdinReceiver(Mutex<Receiver<String>>);

fn spawn_stdin_reader(sender: Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        let handle = stdin.lock();

        for line in handle.lines().map_while(Result::ok) {
            let text = line.trim().to_string();
            if !text.is_empty() && sender.send(text).is_err() {
                break;
            }
        }
    })
}

fn read_stdin(receiver: Res<StdinReceiver>, mut events: MessageWriter<ConsoleInputEvent>) {
    let Ok(rx) = receiver.0.lock() else {
        warn!("Terminal: stdin receiver poisoned");
        return;
    };
    while let Ok(line) = rx.try_recv() {
        events.write(ConsoleInputEvent::new(line).source(CommandSource::Console));
    }
}

fn write_stdout(mut events: MessageReader<ConsoleOutputEvent>, config: Res<TerminalConfig>) {
    let mut stdout = io::stdout().lock();
    for event in events.read() {
        let _ = writeln!(stdout, "{}", render_line(event, &config));
    }
    let _ = stdout.flush();
}

fn ansi_color(style: LineStyle) -> Option<&'static str> {
    let light = style.contains(LineStyle::LIGHT);
    let code = [
        (LineStyle::BLACK, "30", "90"),
        (LineStyle::RED, "31", "91"),
        (LineStyle::GREEN, "32", "92"),
        (LineStyle::YELLOW, "33", "93"),
        (LineStyle::BLUE, "34", "94"),
        (LineStyle::MAGENTA, "35", "95"),
        (LineStyle::CYAN, "36", "96"),
        (LineStyle::WHITE, "37", "97"),
    ]
    .into_iter()
    .find(|(color, ..)| style.contains(*color))
    .map(|(_, normal, bright)| if light { bright } else { normal });
    code.or(light.then_some("1"))
}

/// Format one output line for the terminal.
pub fn render_line(event: &ConsoleOutputEvent, config: &TerminalConfig) -> String {
    let style = event.style;
    let mut text = event.text.clone();

    if style.contains(LineStyle::RULER) {
        text = if text.is_empty() {
            "-".repeat(config.width)
        } else {
            let side = config.width.saturating_sub(text.chars().count() + 2) / 2;
            format!("{} {} {}", "-".repeat(side), text, "-".repeat(side))
        };
    } else if style.contains(LineStyle::CENTER) {
        let pad = config.width.saturating_sub(text.chars().count()) / 2;
        text = format!("{}{}", " ".repeat(pad), text);
    }

    match ansi_color(style).filter(|_| config.colored) {
        Some(code) => format!("\x1b[{code}m{text}\x1b[0m"),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(colored: bool) -> TerminalConfig {
        TerminalConfig { colored, width: 20 }
    }

    #[test]
    fn test_plain_line() {
        let event = ConsoleOutputEvent::styled(LineStyle::RED, "oops");
        assert_eq!(render_line(&event, &config(false)), "oops");
    }

    #[test]
    fn test_colored_line() {
        let event = ConsoleOutputEvent::styled(LineStyle::RED | LineStyle::LIGHT, "oops");
        assert_eq!(render_line(&event, &config(true)), "\x1b[91moops\x1b[0m");
        let event = ConsoleOutputEvent::new("plain");
        assert_eq!(render_line(&event, &config(true)), "plain");
    }

    #[test]
    fn test_rulers_and_centering() {
        let rule = ConsoleOutputEvent::styled(LineStyle::RULER, "");
        assert_eq!(render_line(&rule, &config(false)), "-".repeat(20));

        let title = ConsoleOutputEvent::styled(LineStyle::RULER | LineStyle::CENTER, "help");
        assert_eq!(render_line(&title, &config(false)), "------- help -------");

        let centred = ConsoleOutputEvent::styled(LineStyle::CENTER, "abcd");
        assert_eq!(render_line(&centred, &config(false)), "        abcd");
    }
}
