//! erisa-tree CLI
//!
//! Opens the ERISApedia tree in Chrome, waits for the user to log in, expands
//! the selected folders, writes them out as CSV and optionally pushes the CSV
//! to the configured spreadsheet web app.

use anyhow::{Context, bail};
use clap::Parser;
use erisa_tree::config::DEFAULT_CONFIG_PATH;
use erisa_tree::{ConnectionOptions, ExpandOptions, ExpandStrategy, FlattenOptions, HarvestConfig, HarvestOptions,
                 HarvestReport, HarvestSession, LaunchOptions, MemoryTree, Selection, WaitOptions, harvest};
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "erisa-tree")]
#[command(version)]
#[command(about = "Expand the ERISApedia tree and export it as CSV", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Comma-separated root folder titles (default: "folders" from the config)
    #[arg(long, value_name = "LIST")]
    folders: Option<String>,

    /// CSV output file (default: erisa-tree-<timestamp>.csv)
    #[arg(long, short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,

    /// Leave the browser open until Ctrl+C
    #[arg(long)]
    keep_open: bool,

    /// Launch browser in headless mode (only useful with an already logged-in profile)
    #[arg(long)]
    headless: bool,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR", default_value = "chrome-data")]
    user_data_dir: PathBuf,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    chrome_path: Option<PathBuf>,

    /// WebSocket endpoint URL of a running browser to attach to
    #[arg(long, value_name = "URL")]
    ws_endpoint: Option<String>,

    /// Expand sibling nodes one at a time
    #[arg(long, conflicts_with = "batch_size")]
    sequential: bool,

    /// Number of sibling nodes expanded concurrently
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Delay after each expand request, in milliseconds
    #[arg(long, value_name = "MS")]
    settle_ms: Option<u64>,

    /// Leave out the "Source URL" column
    #[arg(long)]
    no_citations: bool,

    /// Do not push the CSV to the spreadsheet web app
    #[arg(long)]
    no_relay: bool,

    /// Give up waiting for login after this many seconds (default: wait forever)
    #[arg(long, value_name = "SECS")]
    login_timeout: Option<u64>,

    /// Also write the expanded tree as JSON
    #[arg(long, value_name = "PATH")]
    dump_tree: Option<PathBuf>,

    /// Flatten a tree previously written with --dump-tree instead of opening a browser
    #[arg(long, value_name = "PATH", conflicts_with_all = ["ws_endpoint", "keep_open", "headless"])]
    from_snapshot: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Cli {
    fn selection(&self, config: &HarvestConfig) -> Selection {
        match &self.folders {
            Some(list) => Selection::parse_list(list),
            None => config.folders.clone(),
        }
    }

    fn harvest_options(&self, config: &HarvestConfig) -> HarvestOptions {
        let batch_size = if self.sequential { 1 } else { self.batch_size.unwrap_or(config.batch_size) };
        let settle_ms = self.settle_ms.unwrap_or(config.settle_ms);

        HarvestOptions {
            expand: ExpandOptions::new()
                .strategy(ExpandStrategy::from_batch_size(batch_size))
                .settle_delay(Duration::from_millis(settle_ms)),
            flatten: FlattenOptions { citations: config.citations && !self.no_citations },
        }
    }

    fn launch_options(&self) -> LaunchOptions {
        let options = LaunchOptions::new()
            .headless(self.headless)
            .user_data_dir(Some(self.user_data_dir.clone()));

        match &self.chrome_path {
            Some(path) => options.chrome_path(path.clone()),
            None => options,
        }
    }

    fn wait_options(&self) -> WaitOptions {
        WaitOptions::new().timeout(self.login_timeout.map(Duration::from_secs))
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .init();

    if let Err(e) = run(cli) {
        log::error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = HarvestConfig::load_or_default(&cli.config)?;

    let selection = cli.selection(&config);
    if selection.is_empty() {
        bail!("Select at least one folder (--folders, or \"folders\" in {}).", cli.config.display());
    }

    let options = cli.harvest_options(&config);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let (session, report) = match &cli.from_snapshot {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
            let tree = MemoryTree::from_json(&json)?;
            (None, runtime.block_on(harvest(&tree, &selection, &options))?)
        }
        None => {
            let session = open_session(&cli, &config)?;
            let tree = session.tree(&config.tree_selector);
            let report = runtime.block_on(harvest(&tree, &selection, &options))?;
            (Some(session), report)
        }
    };

    write_outputs(&cli, &report)?;

    if !cli.no_relay {
        if let Some(url) = config.relay_url() {
            push_to_sheet(&runtime, url, &report.csv());
        }
    }

    if let Some(session) = session {
        if cli.keep_open {
            log::info!("Browser left open (--keep-open). Press Ctrl+C to exit.");
            runtime.block_on(tokio::signal::ctrl_c()).context("Failed to wait for Ctrl+C")?;
        } else {
            session.close()?;
            log::info!("Done.");
        }
    }

    Ok(())
}

fn open_session(cli: &Cli, config: &HarvestConfig) -> anyhow::Result<HarvestSession> {
    if config.login_url.is_empty() {
        bail!("\"loginUrl\" is missing from {}.", cli.config.display());
    }

    let session = match &cli.ws_endpoint {
        Some(ws_url) => {
            log::info!("Connecting to browser at {}...", ws_url);
            HarvestSession::connect(ConnectionOptions::new(ws_url.clone()))?
        }
        None => {
            log::info!("Launching browser...");
            HarvestSession::launch(cli.launch_options())?
        }
    };

    session.open(&config.login_url)?;

    let wait = cli.wait_options();
    session.wait_for_login(&config.tree_selector, &wait)?;
    session.wait_for_tree_ready(&config.tree_selector, &wait)?;

    Ok(session)
}

fn write_outputs(cli: &Cli, report: &HarvestReport) -> anyhow::Result<()> {
    if let Some(path) = &cli.dump_tree {
        report
            .write_snapshot(path)
            .with_context(|| format!("Failed to write tree snapshot to {}", path.display()))?;
        log::info!("Wrote tree snapshot to {}", path.display());
    }

    let output = cli.output.clone().unwrap_or_else(default_output_path);
    report
        .write_csv(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let output = std::path::absolute(&output).unwrap_or(output);
    log::info!("Wrote {} rows to {}", report.table.row_count(), output.display());
    Ok(())
}

fn default_output_path() -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S");
    PathBuf::from(format!("erisa-tree-{}.csv", stamp))
}

#[cfg(feature = "relay")]
fn push_to_sheet(runtime: &Runtime, url: &str, csv: &str) {
    use erisa_tree::relay::{SheetRelay, log_outcome};

    let result = SheetRelay::new(url).and_then(|relay| runtime.block_on(relay.push(csv)));
    match result {
        Ok(outcome) => log_outcome(&outcome),
        Err(e) => log::error!("Failed to push to Google Sheet: {}", e),
    }
}

#[cfg(not(feature = "relay"))]
fn push_to_sheet(_runtime: &Runtime, url: &str, _csv: &str) {
    log::warn!("Built without the `relay` feature; not pushing to {}", url);
}
