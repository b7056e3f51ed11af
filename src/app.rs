//! Application wiring: configuration in, running poller out.

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use carwatch_poller::{Output, Poller};
use carwatch_types::FleetView;

use crate::config::Settings;
use crate::duration::format_duration;
use crate::source::build_fetcher;

/// A configured poller and its export destination.
#[derive(Debug)]
pub struct App {
    poller: Poller,
    export_path: Option<PathBuf>,
}

impl App {
    /// Build the poller and register every configured vehicle.
    ///
    /// `base` resolves relative replay directories. `export_override`
    /// replaces `export.path` from the settings.
    pub fn new(settings: &Settings, base: &Path, export_override: Option<PathBuf>) -> Result<Self> {
        if settings.vehicles.is_empty() {
            bail!("no vehicles configured");
        }

        let poll_settings = settings.poll_settings()?;
        let export_path = export_override.or_else(|| settings.export.path.clone());

        let mut builder = Poller::builder()
            .settings(poll_settings)
            .export_interval(settings.export_interval()?);
        if let Some(path) = &export_path {
            builder = builder.output(Output::file(path));
        }
        let poller = builder.build();

        for entry in &settings.vehicles {
            let spec = entry.spec()?;
            let fetcher = build_fetcher(&entry.vin, &entry.source, base)?;
            let interval = poller.settings().interval_for(spec.channels.len());

            tracing::info!(
                vin = %spec.vin,
                model = %spec.model_id,
                channels = spec.channels.len(),
                interval = %format_duration(interval),
                source = fetcher.description(),
                "registered vehicle"
            );
            poller.register(spec, fetcher);
        }

        Ok(Self {
            poller,
            export_path,
        })
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn export_path(&self) -> Option<&Path> {
        self.export_path.as_deref()
    }

    /// Refresh every channel once, export, and return the read model.
    pub async fn run_once(&self) -> FleetView {
        let report = self.poller.first_refresh().await;
        tracing::info!(
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            "refresh complete"
        );
        self.poller.emit_now().await;
        self.poller.collect()
    }

    /// Poll until `shutdown` resolves, then export a final view.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        self.run_once().await;

        let handle = self.poller.start();
        tracing::info!(tasks = handle.running(), "polling started");

        shutdown.await;
        tracing::info!("shutting down");
        handle.shutdown().await;

        self.poller.emit_now().await;
        Ok(())
    }
}

/// Load settings and build the app.
pub fn from_config_file(path: &Path, export_override: Option<PathBuf>) -> Result<App> {
    let settings = Settings::load(path)?;
    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    App::new(&settings, base, export_override)
        .with_context(|| format!("cannot start from {}", path.display()))
}
