// keepalive — Desktop simulator for the liveness supervisor
//
// Drives the supervisor against a simulated OS so host requests and OS
// lifecycle callbacks can be replayed without a device.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use keepalive_core::platform::policy::{supports_notification_channels, RegistrationMode};
use keepalive_core::{
    policy_allows_foreground, spawn_heartbeat, ApiLevel, AppLifecycleTracker, AppState,
    AppTransition, KeepAliveModule, LivenessSupervisor, ServicePhase, SimulatedOs,
    StartDisposition,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(name = "keepalive")]
#[command(about = "KeepAlive — background liveness supervisor simulator", long_about = None)]
#[command(version)]
struct Cli {
    /// Also write logs to daily-rotated files in this directory
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the foreground policy for one API level, or a table of levels
    Policy {
        #[arg(short, long)]
        api_level: Option<u32>,
    },
    /// Replay host requests and OS events against a simulated OS
    Run {
        #[arg(short, long)]
        api_level: Option<u32>,
        /// Make every service registration throw this message
        #[arg(long)]
        fail_register: Option<String>,
        /// Make every service unregistration throw this message
        #[arg(long)]
        fail_unregister: Option<String>,
        /// Make every notification post throw this message
        #[arg(long)]
        fail_post: Option<String>,
        #[arg(value_enum, required = true)]
        events: Vec<Event>,
    },
    /// Run the keep-alive heartbeat for a number of beats
    Heartbeat {
        #[arg(short, long)]
        api_level: Option<u32>,
        #[arg(short, long, default_value = "3")]
        beats: u32,
        /// Override the configured interval (milliseconds)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
    Path,
    Reset,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Event {
    /// Host shell calls startService()
    Start,
    /// Host shell calls stopService()
    Stop,
    /// User swipes the app away
    TaskRemoved,
    /// Boot-completed broadcast
    BootCompleted,
    /// OS delivers a start command to the service
    StartCommand,
    /// OS creates the service instance
    Create,
    /// OS destroys the service
    Destroy,
    /// OS kills the service process outright
    Kill,
    /// Host app moves to the background
    Background,
    /// Host app returns to the foreground
    Foreground,
}

impl Event {
    fn label(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::TaskRemoved => "task-removed",
            Self::BootCompleted => "boot-completed",
            Self::StartCommand => "start-command",
            Self::Create => "create",
            Self::Destroy => "destroy",
            Self::Kill => "kill",
            Self::Background => "background",
            Self::Foreground => "foreground",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // reset must work even when the current file no longer loads
    if let Commands::Config {
        action: ConfigAction::Reset,
    } = cli.command
    {
        config::Config::reset()?;
        println!("{} Configuration reset to defaults", "✓".green());
        return Ok(());
    }

    let config = config::Config::load()?;

    let log_dir = cli.log_dir.clone().or_else(|| config.log_dir.clone());
    let _guard = init_logging(log_dir.as_deref())?;

    match cli.command {
        Commands::Policy { api_level } => cmd_policy(api_level),
        Commands::Run {
            api_level,
            fail_register,
            fail_unregister,
            fail_post,
            events,
        } => {
            let os = simulated_os(&config, api_level);
            os.fail_register_with(fail_register.as_deref());
            os.fail_unregister_with(fail_unregister.as_deref());
            os.fail_post_with(fail_post.as_deref());
            cmd_run(&config, os, &events)
        }
        Commands::Heartbeat {
            api_level,
            beats,
            interval_ms,
        } => cmd_heartbeat(&config, api_level, beats, interval_ms).await,
        Commands::Config { action } => cmd_config(config, action),
    }
}

fn init_logging(log_dir: Option<&str>) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::RollingFileAppender::builder()
                .rotation(tracing_appender::rolling::Rotation::DAILY)
                .filename_prefix("keepalive")
                .filename_suffix("log")
                .build(dir)
                .with_context(|| format!("Failed to open log directory {}", dir))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}

fn simulated_os(config: &config::Config, api_level: Option<u32>) -> Arc<SimulatedOs> {
    Arc::new(SimulatedOs::new(ApiLevel(
        api_level.unwrap_or(config.api_level),
    )))
}

fn build_supervisor(
    config: &config::Config,
    os: &Arc<SimulatedOs>,
) -> Result<Arc<LivenessSupervisor>> {
    let supervisor =
        LivenessSupervisor::new(os.clone(), os.clone(), config.keepalive.clone())
            .context("Invalid keep-alive settings")?;
    Ok(Arc::new(supervisor))
}

fn phase_label(phase: ServicePhase) -> ColoredString {
    let label = phase.to_string();
    match phase {
        ServicePhase::Running => label.as_str().green(),
        ServicePhase::Starting => label.as_str().yellow(),
        ServicePhase::Denied => label.as_str().magenta(),
        ServicePhase::Stopped => label.as_str().dimmed(),
    }
}

fn cmd_policy(api_level: Option<u32>) -> Result<()> {
    let levels: Vec<u32> = match api_level {
        Some(level) => vec![level],
        None => (23..=35).collect(),
    };

    println!("{}", "Foreground policy".bold());
    for level in levels {
        let level = ApiLevel(level);
        let allowed = if policy_allows_foreground(level) {
            "allowed".green()
        } else {
            "denied".red()
        };
        let mode = match RegistrationMode::strongest_for(level) {
            RegistrationMode::Foreground => "foreground".bright_cyan(),
            RegistrationMode::Background => "background".yellow(),
        };
        let channels = if supports_notification_channels(level) {
            "channels"
        } else {
            "no channels"
        };
        println!("  {:<8} {:<8} {:<11} {}", level.to_string(), allowed, mode, channels);
    }

    Ok(())
}

fn cmd_run(config: &config::Config, os: Arc<SimulatedOs>, events: &[Event]) -> Result<()> {
    use keepalive_core::ServiceManager;

    let supervisor = build_supervisor(config, &os)?;
    let module = KeepAliveModule::with_supervisor(supervisor.clone());
    tracing::debug!(events = events.len(), "Replaying events");
    let mut tracker = AppLifecycleTracker::new(config.keepalive.background_threshold());

    println!(
        "{} {}",
        "Simulating".bold(),
        os.platform_version().to_string().bright_cyan()
    );

    for (step, event) in events.iter().enumerate() {
        let outcome = match event {
            Event::Start => match module.start_service() {
                Ok(message) => message.as_str().green().to_string(),
                Err(e) => format!("{} {}", e.code().red(), e.message()),
            },
            Event::Stop => match module.stop_service() {
                Ok(message) => message.as_str().green().to_string(),
                Err(e) => format!("{} {}", e.code().red(), e.message()),
            },
            Event::TaskRemoved => {
                module.on_task_removed();
                String::new()
            }
            Event::BootCompleted => {
                module.on_boot_completed();
                String::new()
            }
            Event::StartCommand => match module.on_start_command() {
                StartDisposition::Sticky => "START_STICKY".green().to_string(),
                StartDisposition::NotSticky => "START_NOT_STICKY".yellow().to_string(),
            },
            Event::Create => {
                module.on_create();
                String::new()
            }
            Event::Destroy => {
                module.on_destroy();
                String::new()
            }
            Event::Kill => {
                os.kill_service();
                module.on_destroy();
                String::new()
            }
            Event::Background => describe_transition(tracker.handle(AppState::Background)),
            Event::Foreground => describe_transition(tracker.handle(AppState::Active)),
        };

        println!("  {:>2}. {:<15} {}", step + 1, event.label(), outcome);
        for call in os.take_calls() {
            println!("        {} {}", "→".dimmed(), call);
        }
        println!("        phase: {}", phase_label(supervisor.phase()));
    }

    let state = supervisor.snapshot();
    println!();
    println!("{}", "Final state".bold());
    println!("  Phase:         {}", phase_label(state.phase));
    println!("  Registered:    {}", state.registered);
    println!("  Signal:        {}", state.signal_visible);
    println!("  Registrations: {}", state.registrations);
    if let Some(err) = state.last_error {
        println!("  Last error:    {} {}", err.code().red(), err.message());
    }

    Ok(())
}

fn describe_transition(transition: AppTransition) -> String {
    match transition {
        AppTransition::EnteredBackground => "entered background".to_string(),
        AppTransition::Resumed {
            background_for,
            extended: true,
        } => format!(
            "resumed after {:?} {}",
            background_for,
            "(refresh needed)".yellow()
        ),
        AppTransition::Resumed { background_for, .. } => {
            format!("resumed after {:?}", background_for)
        }
        AppTransition::Unchanged => "unchanged".dimmed().to_string(),
    }
}

async fn cmd_heartbeat(
    config: &config::Config,
    api_level: Option<u32>,
    beats: u32,
    interval_ms: Option<u64>,
) -> Result<()> {
    if !config.keepalive.heartbeat_enabled {
        println!(
            "Heartbeat disabled; enable with: {}",
            "keepalive config set heartbeat_enabled true".bright_green()
        );
        return Ok(());
    }

    let os = simulated_os(config, api_level);
    let supervisor = build_supervisor(config, &os)?;
    let period = interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.keepalive.heartbeat_interval());
    if period.is_zero() {
        anyhow::bail!("Heartbeat interval must be greater than zero");
    }

    println!(
        "{} {} beats every {:?}",
        "Heartbeat".bold(),
        beats,
        period
    );

    let heartbeat = spawn_heartbeat(supervisor.clone(), period);
    let run_for = heartbeat_run_time(period, beats)?;
    tokio::time::sleep(run_for).await;
    let ticks = heartbeat.stop().await;

    println!("  Beats:         {}", ticks);
    println!("  Registrations: {}", os.registrations());
    println!("  Phase:         {}", phase_label(supervisor.phase()));

    Ok(())
}

fn cmd_config(mut config: config::Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            println!("{} {} = {}", "✓".green(), key.bright_cyan(), value);
        }
        ConfigAction::Get { key } => match config.get(&key) {
            Some(value) => println!("{}", value),
            None => println!("{}", "(unset)".dimmed()),
        },
        ConfigAction::List => {
            println!("{}", "Configuration".bold());
            for (key, value) in config.list() {
                println!("  {:<26} {}", key.bright_cyan(), value);
            }
        }
        ConfigAction::Path => {
            println!("{}", config::Config::config_file()?.display());
        }
        ConfigAction::Reset => {
            config::Config::reset()?;
            println!("{} Configuration reset to defaults", "✓".green());
        }
    }

    Ok(())
}

/// Long enough for `beats` ticks plus half a period of slack
fn heartbeat_run_time(period: Duration, beats: u32) -> Result<Duration> {
    period
        .checked_mul(beats)
        .and_then(|total| total.checked_add(period / 2))
        .context("Heartbeat run time overflows; lower --beats or --interval-ms")
}
