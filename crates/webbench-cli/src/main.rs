mod workloads;

use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand, value_parser};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use webbench::config::{CooldownPolicy, FailurePolicy};
use webbench::writer::ResultWriter;
use webbench::{BenchSession, BenchSettings, DeviceInfo, load_settings};

use crate::workloads::{find_workload, known_workloads};

#[derive(Parser, Debug)]
#[command(name = "webbench", version, about = "Repeated browser benchmark runner", long_about = None)]
struct BenchCli {
    /// Increase logging verbosity.
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, action = ArgAction::SetTrue)]
    json_logs: bool,

    /// Override the default benchmark configuration path.
    #[arg(long, value_parser = value_parser!(PathBuf))]
    config: Option<PathBuf>,

    /// Command to execute.
    #[command(subcommand)]
    command: BenchCommand,
}

#[derive(Subcommand, Debug)]
enum BenchCommand {
    /// Run every configured workload and store the median result of each.
    Run(RunCommand),
    /// List known workloads and whether an executor is configured for them.
    Workloads,
    /// Print the headline fields of a stored result artifact.
    Show(ShowCommand),
}

#[derive(Args, Debug)]
struct RunCommand {
    /// Directory to write results into (defaults to ./results).
    #[arg(long, value_parser = value_parser!(PathBuf))]
    output: Option<PathBuf>,

    /// Only run the named workload; repeat to select several.
    #[arg(long = "workload")]
    workloads: Vec<String>,

    /// JSON file describing the device under test.
    #[arg(long, value_parser = value_parser!(PathBuf))]
    device: Option<PathBuf>,

    /// CPU description of the device under test.
    #[arg(long)]
    cpu: Option<String>,

    /// Browser identifier used in artifact names.
    #[arg(long)]
    browser: Option<String>,

    /// Pause between runs in milliseconds.
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// Skip the cooldown after the last run of each workload.
    #[arg(long, action = ArgAction::SetTrue)]
    no_trailing_cooldown: bool,

    /// Keep going with remaining workloads after one fails.
    #[arg(long, action = ArgAction::SetTrue)]
    continue_on_error: bool,
}

#[derive(Args, Debug)]
struct ShowCommand {
    /// Path to a result artifact.
    #[arg(value_parser = value_parser!(PathBuf))]
    artifact: PathBuf,
}

fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose {
        "webbench=debug,webbench_cli=debug"
    } else {
        "webbench=info,webbench_cli=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = BenchCli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: BenchCli) -> Result<()> {
    match cli.command {
        BenchCommand::Run(cmd) => handle_run(cmd, cli.config).await,
        BenchCommand::Workloads => handle_workloads(cli.config),
        BenchCommand::Show(cmd) => handle_show(&cmd),
    }
}

async fn handle_run(cmd: RunCommand, config: Option<PathBuf>) -> Result<()> {
    let mut settings = load_settings(config)?;
    apply_run_overrides(&mut settings, &cmd)?;
    let device = resolve_device(&cmd, settings.device.as_ref())?;

    let session = BenchSession::from_settings(settings)?;
    info!(
        cpu = %device.cpu,
        browser = %device.browser,
        workloads = session.settings().workloads.len(),
        "Executing benchmark pass"
    );

    let summary = session.run(&device).await?;
    for failure in summary.failures() {
        error!(workload = %failure.workload, error = %failure.error, "Workload did not produce a result");
    }
    println!("{}", serde_json::to_string_pretty(&summary.to_json())?);

    if !summary.failures().is_empty() {
        bail!("{} workload(s) failed", summary.failures().len());
    }
    Ok(())
}

fn apply_run_overrides(settings: &mut BenchSettings, cmd: &RunCommand) -> Result<()> {
    if let Some(output) = &cmd.output {
        settings.results_root = Some(output.clone());
    }
    if let Some(cooldown_ms) = cmd.cooldown_ms {
        settings.cooldown_ms = cooldown_ms;
    }
    if cmd.no_trailing_cooldown {
        settings.cooldown_policy = CooldownPolicy::Between;
    }
    if cmd.continue_on_error {
        settings.failure_policy = FailurePolicy::Continue;
    }
    let selected: Vec<String> = cmd
        .workloads
        .iter()
        .map(|name| {
            find_workload(name)
                .map(|known| known.name.to_string())
                .unwrap_or_else(|| name.clone())
        })
        .collect();
    settings.retain_workloads(&selected)?;
    Ok(())
}

fn resolve_device(cmd: &RunCommand, configured: Option<&DeviceInfo>) -> Result<DeviceInfo> {
    let base = match &cmd.device {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Unable to read device file {}", path.display()))?;
            let device: DeviceInfo = serde_json::from_str(&raw)
                .with_context(|| format!("Malformed device file {}", path.display()))?;
            Some(device)
        }
        None => configured.cloned(),
    };

    let device = match (base, &cmd.cpu, &cmd.browser) {
        (Some(mut device), cpu, browser) => {
            if let Some(cpu) = cpu {
                device.cpu = cpu.clone();
            }
            if let Some(browser) = browser {
                device.browser = browser.clone();
            }
            device
        }
        (None, Some(cpu), Some(browser)) => DeviceInfo::new(cpu.clone(), browser.clone()),
        (None, _, _) => bail!(
            "device CPU and browser are required; pass --device, --cpu/--browser, or set `device` in the config"
        ),
    };
    Ok(device)
}

fn handle_workloads(config: Option<PathBuf>) -> Result<()> {
    let settings = load_settings(config)?;
    for workload in known_workloads() {
        let configured = settings
            .workloads
            .iter()
            .find(|spec| spec.name == workload.name);
        let runs = configured
            .map(|spec| spec.run_times)
            .unwrap_or(workload.default_run_times);
        let executor = if settings.executors.contains_key(workload.name) {
            "executor configured"
        } else {
            "no executor"
        };
        println!(
            "{:<14} runs={runs:<3} {executor:<20} {} ({}, sorted by '{}')",
            workload.name, workload.description, workload.homepage, workload.score_field
        );
    }
    for spec in &settings.workloads {
        if find_workload(&spec.name).is_none() {
            println!("{:<14} runs={:<3} custom workload", spec.name, spec.run_times);
        }
    }
    Ok(())
}

fn handle_show(cmd: &ShowCommand) -> Result<()> {
    let record = ResultWriter::load(&cmd.artifact)?;
    println!("workload: {}", record.workload);
    println!("device:   {} / {}", record.device_info.cpu, record.device_info.browser);
    println!("date:     {}", record.execution_date);
    println!("result:   {}", serde_json::to_string_pretty(&record.test_result)?);
    Ok(())
}
