use anyhow::Context;
use clap::Parser;
use modprefs::{PreferenceStore, ValueRegistry, builtin, statics};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "modprefs", version, about = statics::APP_NAME)]
struct Cli {
    /// Preferences file to edit; created on first save if missing.
    #[arg(default_value = statics::DEFAULT_PREFS_FILE)]
    path: PathBuf,

    /// Register demo categories covering every editor.
    #[arg(long)]
    demo: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut store = PreferenceStore::load_path(&cli.path)
        .with_context(|| format!("loading preferences from {:?}", cli.path))?;
    builtin::register_manager_category(&mut store);
    if cli.demo {
        builtin::register_demo_categories(&mut store);
    }
    let adopted = store.adopt_undeclared();
    info!(path = %cli.path.display(), adopted, "preferences loaded");

    modprefs::run_gui(store, ValueRegistry::new())
        .map_err(|e| anyhow::anyhow!("running GUI: {e}"))
}
