use anyhow::{Context, Result};
use release_pipeline::cli::output::{format_plan, format_run_summary, CROSS};
use release_pipeline::cli::terminal_output::ConsoleReporter;
use release_pipeline::cli::Cli;
use release_pipeline::{
    DryRunRunner, PipelineRun, ProcessRunner, ReleaseConfig, ReleaseEngine, Reporter, StepRunner,
};
use std::sync::Arc;
use tracing::{debug, error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; stdout belongs to progress lines and child output
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let config = ReleaseConfig::load(&cli.root, cli.config.as_deref())
        .context("Failed to load release config")?;
    debug!("Loaded release config with {} packages in order", config.publish_order.len());

    let runner: Arc<dyn StepRunner> = if cli.dry_run {
        Arc::new(DryRunRunner)
    } else {
        Arc::new(ProcessRunner)
    };
    let reporter: Arc<dyn Reporter> = Arc::new(ConsoleReporter::new(cli.verbose));
    let engine = ReleaseEngine::new(config, cli.root.clone(), runner, reporter)
        .with_dry_run(cli.dry_run);

    if cli.plan {
        match engine.plan(&cli.version) {
            Ok((version, plan)) => println!("{}", format_plan(&version, &plan)),
            Err(e) => {
                println!("{}{}", CROSS, e);
                std::process::exit(e.exit_code());
            }
        }
        return Ok(());
    }

    let mut run = PipelineRun::new();
    let result = engine.execute(&mut run, &cli.version).await;
    println!("{}", format_run_summary(&run));

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }

    Ok(())
}
