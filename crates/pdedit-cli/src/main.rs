// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use pdedit_app::{AppState, CashReconciler, NavigationController, Workbench};
use pdedit_tui::AppRuntime;
use runtime::{DemoRuntime, JsonFileRuntime};
use std::env;
use std::path::PathBuf;
use tracing::info;

const DEMO_SEED: u64 = 2026;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `pdedit --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    logging::init_logging(&config.log_path()?, config.log_level())?;
    info!(config = %options.config_path.display(), "starting pdedit");

    if options.demo {
        return launch(&config, &options, DemoRuntime::new(DEMO_SEED));
    }

    let input = options.input.clone().ok_or_else(|| {
        anyhow!("no intervention file given; pass a JSON path or run `pdedit --demo`")
    })?;
    let runtime = JsonFileRuntime::new(input);
    info!(input = %runtime.path().display(), "opening intervention");
    launch(&config, &options, runtime)
}

fn launch<R: AppRuntime>(config: &Config, options: &CliOptions, mut runtime: R) -> Result<()> {
    let intervention = runtime.load_intervention()?;
    let mut workbench = Workbench::new(
        intervention,
        config.start_panel(),
        NavigationController::new(config.tab_ease_up()),
        CashReconciler::new(config.over_total()),
    );

    if options.check_only {
        let (lines, valid) = check_report(&mut workbench);
        for line in &lines {
            println!("{line}");
        }
        if !valid {
            bail!("{} failed validation", runtime.source_label());
        }
        return Ok(());
    }

    let mut state = AppState {
        panel: config.start_panel(),
        ..AppState::default()
    };
    pdedit_tui::run_app(&mut state, &mut workbench, &mut runtime)
}

/// Validation counts plus the budget summary, as printed by `--check`.
fn check_report(workbench: &mut Workbench) -> (Vec<String>, bool) {
    let report = workbench.validate();
    let intervention = workbench.intervention();
    let mut lines = vec![format!(
        "{} {}: {} invalid rows, {} invalid items",
        intervention.number, intervention.title, report.invalid_owners, report.invalid_items
    )];
    lines.extend(workbench.summary().display_lines(&intervention.currency));
    (lines, report.is_valid())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    input: Option<PathBuf>,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        input: None,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            flag if flag.starts_with('-') => {
                bail!("unknown argument {flag:?}; run with --help to see supported options");
            }
            path => {
                if let Some(existing) = &options.input {
                    bail!(
                        "only one intervention file is supported; got {} and {path:?}",
                        existing.display()
                    );
                }
                options.input = Some(PathBuf::from(path));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("pdedit [options] [intervention.json]");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Edit a generated intervention (in memory)");
    println!("  --check                  Validate the document, print totals, and exit");
    println!("  --help                   Show this help");
}
