//! Built-in console commands and variables.

use std::cmp::Ordering;
use std::fs;

use bevy::log::{debug, error};

use super::concommand::{CommandArgs, ConCommand};
use super::convar::{ConVar, ConVarFlags, ConValue, format_number, parse_float, parse_integer};
use super::error::{CommandResult, ConsoleError};
use super::events::LineStyle;
use super::permissions::CommandSource;
use super::registry::RegistryEntry;
use super::session::{COMPLETION_VAR, ConsoleSession, VAR_SILENT_VAR};

fn add(session: &mut ConsoleSession, cmd: ConCommand) {
    let name = cmd.name().to_owned();
    if let Err(err) = session.register_cmd(cmd) {
        error!("Console: failed to register built-in '{}': {}", name, err);
    }
}

/// Register the built-in commands and variables on a fresh session.
pub(crate) fn register_builtins(session: &mut ConsoleSession) {
    let mode = session.config().completion_mode;
    let vars = [
        ConVar::new(COMPLETION_VAR, mode.as_int())
            .range(0.0, 1.0)
            .flags(ConVarFlags::ARCHIVE)
            .description("Completion mode: 0 = list matches, 1 = cycle through matches"),
        ConVar::new(VAR_SILENT_VAR, 0u8)
            .range(0.0, 1.0)
            .flags(ConVarFlags::ARCHIVE)
            .description("1 = don't print the value of a variable after it is set"),
    ];
    for var in vars {
        if let Err(err) = session.register_var(var) {
            error!("Console: failed to register built-in variable: {}", err);
        }
    }

    for name in ["echo", "print"] {
        add(
            session,
            ConCommand::new(name, echo)
                .signature("s*")
                .description("Print each argument on its own line"),
        );
    }
    add(session, ConCommand::new("alias", alias).description("Define, replace or delete an alias"));
    add(
        session,
        ConCommand::new("listaliases", list_aliases)
            .signature("*")
            .description("List aliases, optionally by prefix"),
    );
    add(
        session,
        ConCommand::new("after", after)
            .signature("is")
            .description("Run a command after a number of tics"),
    );
    add(
        session,
        ConCommand::new("repeat", repeat)
            .signature("ifs")
            .description("Run a command a number of times at an interval in tics"),
    );
    add(
        session,
        ConCommand::new("if", if_cmd).description("Run a command if a variable comparison holds"),
    );
    add(session, ConCommand::new("add", add_cmd).description("Add to a variable"));
    add(session, ConCommand::new("sub", add_cmd).description("Subtract from a variable"));
    add(session, ConCommand::new("inc", step_cmd).description("Increment a variable by one"));
    add(session, ConCommand::new("dec", step_cmd).description("Decrement a variable by one"));
    add(
        session,
        ConCommand::new("toggle", |session, args| {
            session.toggle_var(&args[0], false)?;
            Ok(())
        })
        .signature("s")
        .description("Flip a variable between zero and one"),
    );
    add(
        session,
        ConCommand::new("reset", |session, args| {
            session.reset_var(&args[0])?;
            Ok(())
        })
        .signature("s")
        .description("Reset a variable to its default value"),
    );
    add(
        session,
        ConCommand::new("help", help_banner)
            .signature("")
            .description("Show console help"),
    );
    add(
        session,
        ConCommand::new("help", help_topic)
            .signature("s")
            .description("Show console help"),
    );
    add(
        session,
        ConCommand::new("listcmds", list_cmds)
            .signature("*")
            .description("List commands, optionally by prefix"),
    );
    add(
        session,
        ConCommand::new("listvars", list_vars)
            .signature("*")
            .description("List variables, optionally by prefix"),
    );
    add(
        session,
        ConCommand::new("find", find)
            .signature("s")
            .description("Search names and descriptions"),
    );
    add(
        session,
        ConCommand::new("clear", |session, _args| {
            session.request_clear();
            Ok(())
        })
        .signature("")
        .description("Clear the console output"),
    );
    add(
        session,
        ConCommand::new("version", |session, _args| {
            session.post(format!(
                "{} {}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ));
            Ok(())
        })
        .signature("")
        .description("Show version information"),
    );
    add(
        session,
        ConCommand::new("exec", exec)
            .signature("s*")
            .description("Run script files"),
    );

    #[cfg(feature = "persist")]
    crate::persist::register_persist_commands(session);
}

fn echo(session: &mut ConsoleSession, args: &CommandArgs) -> CommandResult {
    for arg in args.iter() {
        session.post(arg);
    }
    Ok(())
}

fn alias(session: &mut ConsoleSession, args: &CommandArgs) -> CommandResult {
    match (args.get(0), args.get(1), args.len()) {
        (Some(name), Some(template), 2) if !template.is_empty() => {
            session.register_alias(name, template)
        }
        (Some(name), _, 1 | 2) => {
            if session.remove_alias(name) {
                session.post(format!("Alias '{name}' deleted."));
            } else {
                session.post(format!("There is no alias named '{name}'."));
            }
            Ok(())
        }
        _ => {
            session.post(format!("Usage: {} (alias) (cmd)", args.name()));
            session.post("Example: alias bigfont \"font size 3\".");
            session.post("Use %1-%9 to pass the alias arguments to the command.");
            Ok(())
        }
    }
}

fn list_aliases(session: &mut ConsoleSession, args: &CommandArgs) -> CommandResult {
    let prefix = args.get_or(0, "");
    let lines: Vec<String> = session
        .registry()
        .prefix_iter(prefix)
        .filter_map(|entry| match entry {
            RegistryEntry::Alias(alias) => Some(format!("  {} == {}", alias.name(), alias.template())),
            _ => None,
        })
        .collect();

    session.post_styled(LineStyle::YELLOW, "Aliases:");
    let count = lines.len();
    for line in lines {
        session.post(line);
    }
    session.post(format!("Found {count} aliases."));
    Ok(())
}

fn after(session: &mut ConsoleSession, args: &CommandArgs) -> CommandResult {
    let tics = parse_integer(&args[0]).unwrap_or(0).max(0);
    let delay = session.tics(tics as f64);
    session.schedule_after(&args[1], delay, args.source(), args.is_network());
    Ok(())
}

fn repeat(session: &mut ConsoleSession, args: &CommandArgs) -> CommandResult {
    let count = parse_integer(&args[0]).unwrap_or(0).clamp(0, i64::from(u32::MAX)) as u32;
    let interval = session.tics(parse_float(&args[1]).unwrap_or(0.0));
    session.schedule_repeat(&args[2], count, interval, args.source(), args.is_network());
    Ok(())
}

/// Compare a variable to console text with the variable's own type.
fn compare(value: &ConValue, text: &str) -> Option<Ordering> {
    match value {
        ConValue::Str(s) => Some(s.to_lowercase().cmp(&text.to_lowercase())),
        number => {
            let lhs = number.as_f64()?;
            let rhs = match number {
                ConValue::Float(_) => parse_float(text)?,
                _ => parse_integer(text)? as f64,
            };
            lhs.partial_cmp(&rhs)
        }
    }
}

fn if_cmd(session: &mut ConsoleSession, args: &CommandArgs) -> CommandResult {
    if !matches!(args.len(), 4 | 5) {
        session.post(format!("Usage: {} (cvar) (operator) (value) (cmd) (else-cmd)", args.name()));
        session.post("Operator must be one of: not, =, >, <, >=, <=.");
        session.post("The (else-cmd) can be omitted.");
        return Ok(());
    }

    let name = &args[0];
    let value = session
        .get_var(name)
        .map(|var| var.value().clone())
        .ok_or_else(|| ConsoleError::Usage(format!("{name}: unknown variable")))?;
    let ordering = compare(&value, &args[2]).ok_or_else(|| {
        ConsoleError::Usage(format!("'{}' can't be compared with {}", &args[2], name))
    })?;

    let holds = match args[1].to_ascii_lowercase().as_str() {
        "not" => ordering != Ordering::Equal,
        "=" => ordering == Ordering::Equal,
        ">" => ordering == Ordering::Greater,
        "<" => ordering == Ordering::Less,
        ">=" => ordering != Ordering::Less,
        "<=" => ordering != Ordering::Greater,
        other => return Err(ConsoleError::Usage(format!("Unknown operator '{other}'."))),
    };

    let branch = if holds { args.get(3) } else { args.get(4) };
    if let Some(cmd) = branch {
        // Failures inside the branch are counted by the enclosing execute.
        session.execute(args.source(), cmd, false, args.is_network());
    }
    Ok(())
}

fn force_flag(args: &CommandArgs, index: usize) -> Result<bool, ConsoleError> {
    match args.get(index) {
        None => Ok(false),
        Some(word) if word.eq_ignore_ascii_case("force") => Ok(true),
        Some(_) => Err(ConsoleError::Usage(format!(
            "Usage: {} (cvar) ... (force)",
            args.name()
        ))),
    }
}

fn add_cmd(session: &mut ConsoleSession, args: &CommandArgs) -> CommandResult {
    let usage = || ConsoleError::Usage(format!("Usage: {} (cvar) (val) (force)", args.name()));
    if !matches!(args.len(), 2 | 3) {
        return Err(usage());
    }
    let mut delta = parse_float(&args[1]).ok_or_else(usage)?;
    if args.name().eq_ignore_ascii_case("sub") {
        delta = -delta;
    }
    let forced = force_flag(args, 2)?;
    session.add_var(&args[0], delta, forced)?;
    Ok(())
}

fn step_cmd(session: &mut ConsoleSession, args: &CommandArgs) -> CommandResult {
    if !matches!(args.len(), 1 | 2) {
        return Err(ConsoleError::Usage(format!("Usage: {} (cvar) (force)", args.name())));
    }
    let forced = force_flag(args, 1)?;
    if args.name().eq_ignore_ascii_case("dec") {
        session.dec_var(&args[0], forced)?;
    } else {
        session.inc_var(&args[0], forced)?;
    }
    Ok(())
}

fn help_banner(session: &mut ConsoleSession, _args: &CommandArgs) -> CommandResult {
    session.post_styled(
        LineStyle::RULER | LineStyle::YELLOW | LineStyle::CENTER,
        format!("-=- {} {} Console -=-", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
    );
    session.post("Type \"listcmds\" to see a list of available commands.");
    session.post("Type \"listvars\" to see a list of available variables.");
    session.post("Type \"help (what)\" to see information about (what).");
    session.post_styled(LineStyle::RULER, "");
    Ok(())
}

fn help_topic(session: &mut ConsoleSession, args: &CommandArgs) -> CommandResult {
    let what = &args[0];
    let lines: Vec<String> = match session.registry().get_entry(what) {
        Some(RegistryEntry::Command(set)) => set
            .iter()
            .map(|overload| {
                let cmd = &overload.command;
                let usage = cmd.template().unwrap_or("*");
                match cmd.get_description() {
                    "" => format!("{} ({usage})", cmd.name()),
                    desc => format!("{} ({usage}): {desc}", cmd.name()),
                }
            })
            .collect(),
        Some(RegistryEntry::Variable(var)) => {
            let mut lines = vec![var.to_string()];
            if !var.get_description().is_empty() {
                lines.push(var.get_description().to_owned());
            }
            lines.push(format!("type {}, default \"{}\"", var.kind(), var.default_value()));
            match (var.lower_bound(), var.upper_bound()) {
                (None, None) => {}
                (min, max) => lines.push(format!(
                    "range {} .. {}",
                    min.map_or("-inf".to_owned(), format_number),
                    max.map_or("+inf".to_owned(), format_number)
                )),
            }
            lines
        }
        Some(RegistryEntry::Alias(alias)) => {
            vec![format!("{} == {}", alias.name(), alias.template())]
        }
        Some(RegistryEntry::KnownWord(_)) | None => {
            vec![format!("There's no help about '{what}'.")]
        }
    };

    for line in lines {
        session.post(line);
    }
    Ok(())
}

fn list_cmds(session: &mut ConsoleSession, args: &CommandArgs) -> CommandResult {
    let prefix = args.get_or(0, "");
    let lines: Vec<String> = session
        .registry()
        .prefix_iter(prefix)
        .filter_map(|entry| match entry {
            RegistryEntry::Command(_) => Some(match entry.description() {
                "" => format!("  {}", entry.name()),
                desc => format!("  {} ({desc})", entry.name()),
            }),
            _ => None,
        })
        .collect();

    session.post_styled(LineStyle::YELLOW, "Console commands:");
    let count = lines.len();
    for line in lines {
        session.post(line);
    }
    session.post(format!("Found {count} console commands."));
    Ok(())
}

fn list_vars(session: &mut ConsoleSession, args: &CommandArgs) -> CommandResult {
    let prefix = args.get_or(0, "");
    let lines: Vec<String> = session
        .registry()
        .prefix_iter(prefix)
        .filter(|entry| !entry.is_hidden())
        .filter_map(|entry| match entry {
            RegistryEntry::Variable(var) => Some(format!("  {var}")),
            _ => None,
        })
        .collect();

    session.post_styled(LineStyle::YELLOW, "Console variables:");
    let count = lines.len();
    for line in lines {
        session.post(line);
    }
    session.post(format!("Found {count} console variables."));
    Ok(())
}

fn find(session: &mut ConsoleSession, args: &CommandArgs) -> CommandResult {
    let lines: Vec<String> = session
        .registry()
        .search(&args[0])
        .into_iter()
        .map(|entry| match entry.description() {
            "" => format!("  {} [{}]", entry.name(), entry.kind()),
            desc => format!("  {} [{}] {desc}", entry.name(), entry.kind()),
        })
        .collect();

    let count = lines.len();
    for line in lines {
        session.post(line);
    }
    session.post(format!("Found {count} matches."));
    Ok(())
}

fn exec(session: &mut ConsoleSession, args: &CommandArgs) -> CommandResult {
    let mut failed = Vec::new();

    for path in args.iter() {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                session.post_error(format!("{path}: {err}"));
                failed.push(path);
                continue;
            }
        };
        debug!("Console: executing script '{}'", path);

        for line in contents.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            session.execute(CommandSource::Config, line, false, args.is_network());
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(ConsoleError::Failed(format!("Could not read {}", failed.join(", "))))
    }
}
