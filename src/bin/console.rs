use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use housecast::logging::init_tracing;
use housecast::registry::MemoryRegistryStore;
use housecast::wizard::ButtonAction;
use housecast::{AppConfig, ContextId, Reply, SetupService, Submission, UserId};

fn main() -> Result<()> {
    let args = CliArgs::parse()?;
    init_tracing(args.verbose, args.json_logs);
    let service = if args.memory {
        let mut config = AppConfig::default();
        config.identity.secret = "console".into();
        config.access.block_commands = false;
        SetupService::new(&config, Arc::new(MemoryRegistryStore::new()))?
    } else {
        SetupService::open_workspace()?
    };

    let mut user = UserId(args.user);
    let mut roster_page = 0usize;
    println!("Housecast console. Type 'help' for commands.");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed reading stdin")?;
        let context = ContextId(user.0);
        let (command, rest) = match line.trim().split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (line.trim(), ""),
        };
        let reply = match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                print_help();
                continue;
            }
            "user" => {
                match rest.parse() {
                    Ok(id) => {
                        user = UserId(id);
                        println!("Acting as user {user}");
                    }
                    Err(_) => println!("Expected a numeric user id"),
                }
                continue;
            }
            "start" => service.start(user, context),
            "ack" => service.submit(user, Submission::Acknowledge),
            "say" => match service.handle_message(user, context, rest) {
                Ok(Some(reply)) => Ok(reply),
                Ok(None) => {
                    println!("(nobody is waiting for a message)");
                    continue;
                }
                Err(err) => Err(err),
            },
            "room" => service.submit(user, Submission::SelectRoom(rest.to_string())),
            "points" => service.submit(user, Submission::SelectPoints(rest.to_string())),
            "confirm" => service.submit(user, Submission::Confirm),
            "cancel" => service.submit(user, Submission::Cancel),
            "restart" => service.submit(user, Submission::StartOver),
            "prompt" => {
                match service.current_prompt(user)? {
                    Some(prompt) => println!("{}", prompt.to_text()),
                    None => println!("(no session)"),
                }
                continue;
            }
            "roster" => {
                let action = match rest {
                    "first" => ButtonAction::First,
                    "prev" => ButtonAction::Previous,
                    "next" => ButtonAction::Next,
                    "last" => ButtonAction::Last,
                    _ => ButtonAction::First,
                };
                let page = service.roster().navigate(roster_page, action)?;
                roster_page = page.index;
                println!("{}", page.prompt.to_text());
                continue;
            }
            other => {
                println!("Unknown command '{other}'. Type 'help' for commands.");
                continue;
            }
        };
        match reply {
            Ok(reply) => print_reply(&reply),
            Err(err) if !err.is_recoverable() => {
                eprintln!("error: {err:#}");
            }
            Err(err) => println!("{err}"),
        }
        io::stdout().flush()?;
    }
    Ok(())
}

fn print_reply(reply: &Reply) {
    if let Some(notice) = &reply.notice {
        println!("! {notice}");
    }
    println!("{}", reply.prompt.to_text());
}

fn print_help() {
    println!("Commands:");
    println!("  start              Start the character wizard");
    println!("  ack                Acknowledge the keynote");
    println!("  say <text>         Send a free-text message (the character name)");
    println!("  room <name>        Choose the starting room");
    println!("  points <n>         Assign points to the current trait");
    println!("  confirm            Save the character");
    println!("  cancel             Abandon the wizard");
    println!("  restart            Start over");
    println!("  prompt             Show the current prompt again");
    println!("  roster [first|prev|next|last]  Browse committed characters");
    println!("  user <id>          Switch the acting user");
    println!("  quit               Leave the console");
}

struct CliArgs {
    user: u64,
    memory: bool,
    json_logs: bool,
    verbose: u8,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let mut parsed = Self {
            user: 1,
            memory: false,
            json_logs: false,
            verbose: 0,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--user" => {
                    let value = args.next().context("Expected a user id after --user")?;
                    parsed.user = value
                        .parse()
                        .with_context(|| format!("'{value}' is not a valid user id"))?;
                }
                "--memory" => parsed.memory = true,
                "--json-logs" => parsed.json_logs = true,
                "-v" | "--verbose" => parsed.verbose += 1,
                "--help" | "-h" => {
                    println!("Usage: cargo run --bin console -- [--user <id>] [--memory] [--json-logs] [-v]");
                    std::process::exit(0);
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument '{other}'. Run with --help for usage instructions."
                    ));
                }
            }
        }
        Ok(parsed)
    }
}
