//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use tracing::debug;

use cartsync_engine::checkout::TracingSink;
use cartsync_engine::CheckoutEngine;
use cartsync_store::{FileBackend, Store, SystemClock};

use crate::config::CliConfig;
use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// CLI configuration.
    pub config: CliConfig,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
    /// Persisted state file.
    pub store_path: PathBuf,
    /// Whether promotional pricing applies this session.
    pub eligible: bool,
}

impl Context {
    /// Load context from config file and command line overrides.
    pub fn load(
        config_path: Option<&str>,
        store_path: Option<&str>,
        eligible: Option<bool>,
        output: Output,
    ) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config = if let Some(path) = config_path {
            CliConfig::load(path)?
        } else {
            // Try to find config in current directory or parent directories
            Self::find_config(&cwd, &output).unwrap_or_default()
        };

        let store_path = resolve(&cwd, store_path.unwrap_or(&config.store.path));
        let eligible = eligible.unwrap_or(config.session.eligible);

        Ok(Self {
            config,
            output,
            cwd,
            store_path,
            eligible,
        })
    }

    /// Find config file in directory tree.
    fn find_config(start: &Path, output: &Output) -> Option<CliConfig> {
        let config_names = ["cartsync.toml", ".cartsync.toml", "cartsync.json"];

        let mut current = start.to_path_buf();
        loop {
            for name in &config_names {
                let config_path = current.join(name);
                if config_path.exists() {
                    match CliConfig::load(config_path.to_str()?) {
                        Ok(config) => {
                            output.debug(&format!("Using config {}", config_path.display()));
                            return Some(config);
                        }
                        Err(e) => output.warn(&format!("Ignoring {:#}", e)),
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Open the persisted session as one page load: build the engine and
    /// reconcile with what storage holds.
    pub fn open_engine(&self) -> Result<CheckoutEngine> {
        debug!(path = %self.store_path.display(), "opening store");
        let backend = FileBackend::open(&self.store_path)
            .with_context(|| format!("Failed to open store {}", self.store_path.display()))?;
        let store = Store::new(backend, SystemClock);

        let mut engine = CheckoutEngine::new(store, self.config.engine.clone(), TracingSink)
            .context("Failed to start checkout engine")?
            .with_eligibility(self.eligible);

        let view = engine.activate();
        self.output.debug(&format!(
            "Loaded {} ({}), payable {} from {}",
            self.store_path.display(),
            if self.eligible { "eligible session" } else { "ineligible session" },
            view.payable,
            view.source.as_str()
        ));
        Ok(engine)
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        resolve(&self.cwd, path)
    }
}

fn resolve(cwd: &Path, path: &str) -> PathBuf {
    if Path::new(path).is_absolute() {
        PathBuf::from(path)
    } else {
        cwd.join(path)
    }
}
