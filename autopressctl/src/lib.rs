use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tracing::{error, info, warn};

use autopress_core::{
    AnalyticsLog, ChromiumSessionFactory, ContentGenerator, Credentials, GeminiModel, PublishRun,
    Settings, TemplateStore, TextModel,
};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("run error: {0}")]
    Run(#[from] autopress_core::RunError),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Automated blog publishing bot", long_about = None)]
pub struct Cli {
    /// Run Chromium without a visible window
    #[arg(long)]
    pub headless: bool,
    /// Path to the settings file
    #[arg(long, default_value = "configs/autopress.toml")]
    pub config: PathBuf,
    /// Path to the JSON credential file
    #[arg(long, default_value = "config.json")]
    pub credentials: PathBuf,
    /// Generate content and report without launching a browser
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(cli: Cli) -> Result<()> {
    let (mut settings, settings_issue) = Settings::load_or_default(&cli.config);
    if cli.headless {
        settings.chromium.headless = true;
    }
    let settings = Arc::new(settings);

    prepare_directories(&settings)?;
    let _log_guard = init_logging(&settings);

    if let Some(issue) = &settings_issue {
        warn!(path = %cli.config.display(), error = %issue, "settings unavailable, using defaults");
    }
    info!(
        config = %cli.config.display(),
        headless = settings.chromium.headless,
        dry_run = cli.dry_run,
        "starting blog automation"
    );

    let credentials = Credentials::load(&cli.credentials);
    let model: Option<Arc<dyn TextModel>> = match credentials.api_key.as_ref() {
        Some(api_key) => Some(Arc::new(GeminiModel::new(
            &settings.generator,
            api_key.clone(),
        ))),
        None => {
            warn!("no Google AI key configured, model generation disabled");
            None
        }
    };
    let templates = TemplateStore::load(&settings.paths.templates_file);
    let generator = ContentGenerator::new(templates, model);
    let analytics = AnalyticsLog::new(settings.paths.analytics_file.clone());
    let sessions = ChromiumSessionFactory::new(settings.chromium.clone(), &settings.timeouts);
    let publish = PublishRun::new(Arc::clone(&settings), generator, analytics, cli.dry_run);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(async {
        let mut rng = rand::thread_rng();
        publish.execute(&sessions, &credentials, &mut rng).await
    });

    match outcome {
        Ok(report) => {
            info!(
                run_id = %report.run_id,
                title = %report.title,
                source = %report.source,
                duration_secs = report.duration_secs,
                "blog automation finished"
            );
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "blog automation failed");
            Err(err.into())
        }
    }
}

fn prepare_directories(settings: &Settings) -> Result<()> {
    std::fs::create_dir_all(&settings.paths.screenshots_dir)?;
    std::fs::create_dir_all(&settings.paths.logs_dir)?;
    Ok(())
}

/// Logs go to stdout and to a file under the configured logs directory. The
/// returned guard must stay alive for the whole run so buffered lines are
/// flushed.
fn init_logging(settings: &Settings) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let appender = tracing_appender::rolling::never(&settings.paths.logs_dir, "autopress.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_match_repository_layout() {
        let cli = Cli::try_parse_from(["autopressctl"]).unwrap();
        assert!(!cli.headless);
        assert!(!cli.dry_run);
        assert_eq!(cli.config, PathBuf::from("configs/autopress.toml"));
        assert_eq!(cli.credentials, PathBuf::from("config.json"));
    }

    #[test]
    fn cli_flags_are_recognized() {
        let cli = Cli::try_parse_from([
            "autopressctl",
            "--headless",
            "--dry-run",
            "--config",
            "elsewhere.toml",
        ])
        .unwrap();
        assert!(cli.headless);
        assert!(cli.dry_run);
        assert_eq!(cli.config, PathBuf::from("elsewhere.toml"));
    }

    #[test]
    fn directories_are_created_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.paths.screenshots_dir = dir
            .path()
            .join("shots")
            .to_string_lossy()
            .into_owned();
        settings.paths.logs_dir = dir.path().join("logs").to_string_lossy().into_owned();

        prepare_directories(&settings).unwrap();

        assert!(dir.path().join("shots").is_dir());
        assert!(dir.path().join("logs").is_dir());
    }
}
