use std::env;

use anyhow::{anyhow, Context, Result};
use housecast::logging::init_tracing;
use housecast::workspace::{config_file_path, ensure_workspace_structure, load_or_default, save};
use rand::distributions::Alphanumeric;
use rand::Rng;

const SECRET_LENGTH: usize = 48;

fn main() -> Result<()> {
    let args = CliArgs::parse()?;
    init_tracing(args.verbose, false);
    let config_path = config_file_path()?;
    let mut config = load_or_default()?;
    let mut changed = !config_path.exists();

    if config.identity.secret.is_empty() {
        config.identity.secret = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SECRET_LENGTH)
            .map(char::from)
            .collect();
        changed = true;
    }
    changed |= apply_override(&mut config.wizard.total_budget, args.budget);
    changed |= apply_override(&mut config.wizard.per_trait_cap, args.cap);
    changed |= apply_override(&mut config.wizard.slot_capacity, args.capacity);

    config
        .wizard
        .validate()
        .context("Refusing to save an inconsistent wizard configuration")?;
    let paths = ensure_workspace_structure(&config)?;

    if changed {
        save(&config)?;
        println!("Wizard settings recorded at {}", config_path.display());
    } else {
        println!("Wizard settings already configured.");
    }
    println!("Registry: {}", paths.registry_dir.display());
    println!("Portraits: {}", paths.assets_dir.display());
    Ok(())
}

struct CliArgs {
    budget: Option<u32>,
    cap: Option<u32>,
    capacity: Option<u32>,
    verbose: u8,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let mut parsed = Self {
            budget: None,
            cap: None,
            capacity: None,
            verbose: 0,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--budget" => parsed.budget = Some(number(args.next(), "--budget")?),
                "--cap" => parsed.cap = Some(number(args.next(), "--cap")?),
                "--capacity" => parsed.capacity = Some(number(args.next(), "--capacity")?),
                "-v" | "--verbose" => parsed.verbose += 1,
                "--help" | "-h" => {
                    print_usage();
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

fn number(value: Option<String>, flag: &str) -> Result<u32> {
    let value = value.with_context(|| format!("Expected a number after {flag}"))?;
    value
        .parse()
        .with_context(|| format!("'{value}' is not a valid value for {flag}"))
}

fn print_usage() {
    println!("Housecast setup");
    println!("Creates the workspace, generates the identity secret and records wizard settings.");
    println!("Usage: cargo run --bin setup -- [options]");
    println!("Options:");
    println!("  --budget <n>     Total trait points per character (default: 60)");
    println!("  --cap <n>        Maximum points for a single trait (default: 20)");
    println!("  --capacity <n>   Number of portrait/emoji pairs (default: 25)");
    println!("  -v, --verbose    Increase log verbosity");
}

fn apply_override(slot: &mut u32, value: Option<u32>) -> bool {
    match value {
        Some(value) if *slot != value => {
            *slot = value;
            true
        }
        _ => false,
    }
}
