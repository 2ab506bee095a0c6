//! The `mender run` command: the main mend loop with a progress bar.

use crate::logging::{self, Console, RunLog};
use anyhow::Context;
use clap::Args;
use console::Style;
use mender_core::{Config, ItemOutcome, Mender, RunOptions, RunOutcome, RunReport};
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

/// Arguments for the `run` command.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Config file to use instead of the default lookup
    #[arg(short, long, env = "MENDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Generate overviews but do not write them back
    #[arg(long)]
    pub dry_run: bool,

    /// Process at most this many items
    #[arg(long)]
    pub limit: Option<usize>,

    /// LLM provider (openai, anthropic, google, local)
    #[arg(long)]
    pub provider: Option<String>,

    /// LLM model name (provider-specific)
    #[arg(long)]
    pub model: Option<String>,
}

/// Execute the run command.
///
/// Logging is set up here, after the config is loaded, so the run log lands
/// in the configured directory. Fatal errors are written to the run log
/// before they propagate.
pub async fn execute(args: RunArgs, verbose: bool, json_logs: bool) -> anyhow::Result<()> {
    let path = Config::locate(args.config.as_deref());
    let mut config = Config::load_from(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    apply_overrides(&mut config, &args);

    let log_dir = config.log_dir();
    let run_log = RunLog::create(&log_dir)
        .with_context(|| format!("Failed to create run log in {}", log_dir.display()))?;
    let (console_level, file_level) = if verbose {
        ("debug", LevelFilter::DEBUG)
    } else {
        ("warn", logging::level_from_str(&config.logging.log_level))
    };
    let console = logging::init(console_level, json_logs, Some((&run_log, file_level)));
    tracing::debug!("Mender v{}", mender_core::VERSION);

    let result = mend(&config, &args, run_log.path(), &console).await;
    if let Err(e) = &result {
        tracing::error!("Run aborted: {e:#}");
    }
    result
}

/// Command-line provider and model take precedence over the config file.
fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(provider) = &args.provider {
        config.llm.model_provider = Some(provider.clone());
    }
    if let Some(model) = &args.model {
        config.llm.model = Some(model.clone());
    }
}

async fn mend(
    config: &Config,
    args: &RunArgs,
    log_path: &Path,
    console: &Console,
) -> anyhow::Result<()> {
    let mut options = RunOptions::from_config(config);
    options.dry_run = args.dry_run;
    options.limit = args.limit;

    tracing::info!(
        "Mender run: model {} via {} for types {}",
        config.model(),
        config.provider(),
        options.item_types.join(", ")
    );
    let mender = Mender::from_config(config, options)?;

    // Length is unknown until the listing is classified; the first callback sets it.
    let pb = create_progress_bar(0);
    console.attach(&pb);
    let outcome = mender
        .run(|progress| {
            pb.set_length(progress.total as u64);
            pb.set_position(progress.done as u64);
            pb.set_message(progress_message(&progress.item.name, progress.outcome));
        })
        .await;
    pb.finish_and_clear();
    console.detach();

    match outcome? {
        RunOutcome::NothingToDo { listed } => {
            tracing::info!("Nothing to fix among {listed} item(s)");
            println!("Nothing to fix, the library already has overviews everywhere.");
        }
        RunOutcome::Finished(report) => {
            for line in summary_lines(&report, log_path) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

/// Create a progress bar for the item loop.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

fn progress_message(name: &str, outcome: &ItemOutcome) -> String {
    let status = match outcome {
        ItemOutcome::Updated => "updated",
        ItemOutcome::WouldUpdate => "would update",
        ItemOutcome::GenerationFailed => "skipped (generation failed)",
        ItemOutcome::Unavailable { .. } => "skipped (unavailable)",
    };
    format!("{name}: {status}")
}

/// Human-readable summary printed to stdout after a run.
fn summary_lines(report: &RunReport, log_path: &Path) -> Vec<String> {
    let ok = Style::new().green().bold();
    let dim = Style::new().dim();
    let stats = &report.stats;

    let headline = if report.dry_run {
        format!(
            "Dry run finished: {} item(s) would be updated, {} skipped.",
            stats.updated, stats.skipped
        )
    } else {
        format!(
            "Finished! {} item(s) updated, {} skipped.",
            stats.updated, stats.skipped
        )
    };

    vec![
        String::new(),
        ok.apply_to(headline).to_string(),
        format!(
            "Token usage: {}  |  Approx cost: ${:.4}",
            stats.total_tokens, report.approx_cost
        ),
        dim.apply_to(format!("Detailed log saved to: {}", log_path.display()))
            .to_string(),
    ]
}
