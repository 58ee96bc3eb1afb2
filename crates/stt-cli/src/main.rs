use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stt_cli::commands::{backup, days, import, overtime, report, status, track};
use stt_cli::{Cli, Commands, Config, Tracker};
use stt_core::{Clock, SystemClock};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut stdout = std::io::stdout().lock();

    let open = || Tracker::open(&config, Arc::clone(&clock));

    match command {
        Commands::On { .. } | Commands::Fin { .. } | Commands::Resume => {
            let text = command.command_text().context("not a tracking command")?;
            track::run(&mut stdout, &mut open()?, &text)?;
        }
        Commands::Status { json } => {
            let tracker = open()?;
            status::run(&mut stdout, &tracker.queries, tracker.now(), *json)?;
        }
        Commands::Report { day, json } => {
            let tracker = open()?;
            let day = match day {
                Some(day) => tracker
                    .interpreter
                    .resolver()
                    .resolve_date(day)
                    .context("invalid --day, expected YYYY-MM-DD")?,
                None => clock.today(),
            };
            report::run(&mut stdout, &tracker.queries, day, tracker.now(), *json)?;
        }
        Commands::Days => days::run(&mut stdout, &open()?.queries)?,
        Commands::Overtime => {
            let tracker = open()?;
            overtime::run(
                &mut stdout,
                &tracker.queries,
                &config.categorizer(),
                &config.working_time(),
                tracker.now(),
            )?;
        }
        Commands::Import { file } => {
            import::run(&mut stdout, &mut open()?.journal, file)?;
        }
        Commands::Backup => {
            let rotator = config
                .backup_rotator()
                .context("no backup location configured (set backup.location)")?;
            backup::run(&mut stdout, &rotator, &config.database_path, clock.today())?;
        }
    }

    Ok(())
}
