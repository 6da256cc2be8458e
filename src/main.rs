mod api;
mod app;
mod config;
mod country;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::CountryClient;
use app::App;
use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "xcountries")]
#[command(version)]
#[command(about = "Browse and search the world's countries from your terminal")]
struct Args {
    /// Country list endpoint (overrides the config file)
    #[arg(long)]
    api_url: Option<String>,

    /// Print the country list and exit instead of starting the TUI
    #[arg(short, long)]
    list: bool,

    /// Only list countries whose name contains this text (with --list)
    #[arg(short, long, requires = "list")]
    search: Option<String>,

    /// Print the list as JSON (with --list)
    #[arg(long, requires = "list")]
    json: bool,

    /// Where to write the log while the TUI is running
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The TUI owns the terminal, so it logs to a file
    let _guard = if args.list {
        init_stderr_logging();
        None
    } else {
        init_file_logging(args.log_file.clone())
    };

    let config = AppConfig::load().unwrap_or_default();
    let api_url = args.api_url.clone().unwrap_or_else(|| config.api_url.clone());
    let client = CountryClient::new(api_url);

    if args.list {
        let output = list_countries(&config, &client, args.search.as_deref(), args.json).await?;
        print!("{}", output);
        return Ok(());
    }

    run_tui(&config, client).await
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("xcountries=info"))
}

fn init_stderr_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

/// Open the log file, creating its directory if needed
fn open_log_file(path: &Path) -> Result<RollingFileAppender> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "xcountries.log".to_string());

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {:?}", dir))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(&dir)
        .with_context(|| format!("Failed to open log file {:?}", path))?;
    Ok(appender)
}

fn init_file_logging(path: Option<PathBuf>) -> Option<WorkerGuard> {
    let path = path.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("xcountries")
            .join("xcountries.log")
    });

    let file_appender = match open_log_file(&path) {
        Ok(appender) => appender,
        Err(e) => {
            // Still on the normal screen here, so the user sees this
            eprintln!("{:#}; logging disabled", e);
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_writer(io::sink))
                .with(env_filter())
                .init();
            return None;
        }
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .with(env_filter())
        .init();

    tracing::info!("xcountries v{} starting", env!("CARGO_PKG_VERSION"));
    Some(guard)
}

/// Fetch the list and format it for `--list`: one `name\tabbr\tflag` line
/// per country, or a JSON array
async fn list_countries(
    config: &AppConfig,
    client: &CountryClient,
    search: Option<&str>,
    json: bool,
) -> Result<String> {
    let mut app = App::new(config);
    app.load(client).await;

    if !app.error.is_empty() {
        anyhow::bail!("{}", app.error);
    }

    app.set_search_term(search.unwrap_or(""));

    if json {
        let mut out = serde_json::to_string_pretty(&app.filtered_countries)?;
        out.push('\n');
        return Ok(out);
    }

    let mut out = String::new();
    for country in &app.filtered_countries {
        out.push_str(&format!("{}\t{}\t{}\n", country.name, country.abbr, country.flag));
    }
    Ok(out)
}

async fn run_tui(config: &AppConfig, client: CountryClient) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config);
    tracing::info!("Loading countries from {}", client.url());
    app.spawn_load(client);

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        app.tick();

        let size = terminal.size()?;
        let (columns, rows) = ui::grid_viewport(app, Rect::new(0, 0, size.width, size.height));
        app.set_viewport(columns, rows);

        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key) {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{spawn_api, FETCH_FAILED_MESSAGE};
    use crate::country::Country;

    const THREE_COUNTRIES: &str = r#"{"data":[
        {"name":"France","abbr":"FR","flag":"url1"},
        {"name":"Germany","abbr":"DE","flag":"url2"},
        {"name":"Austria","abbr":"AT","flag":"url3"}
    ]}"#;

    #[test]
    fn test_open_log_file_in_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("app.log");

        assert!(open_log_file(&path).is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_open_log_file_unwritable_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file can't be used as the log directory
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        assert!(open_log_file(&blocker.join("app.log")).is_err());
    }

    #[tokio::test]
    async fn test_list_tab_separated() {
        let url = spawn_api(200, THREE_COUNTRIES).await;
        let client = CountryClient::new(url);

        let output = list_countries(&AppConfig::default(), &client, None, false)
            .await
            .unwrap();

        assert_eq!(output, "France\tFR\turl1\nGermany\tDE\turl2\nAustria\tAT\turl3\n");
    }

    #[tokio::test]
    async fn test_list_with_search() {
        let url = spawn_api(200, THREE_COUNTRIES).await;
        let client = CountryClient::new(url);

        let output = list_countries(&AppConfig::default(), &client, Some("AN"), false)
            .await
            .unwrap();

        assert_eq!(output, "France\tFR\turl1\nGermany\tDE\turl2\n");
    }

    #[tokio::test]
    async fn test_list_as_json() {
        let url = spawn_api(200, THREE_COUNTRIES).await;
        let client = CountryClient::new(url);

        let output = list_countries(&AppConfig::default(), &client, Some("er"), true)
            .await
            .unwrap();

        let countries: Vec<Country> = serde_json::from_str(&output).unwrap();
        assert_eq!(countries.len(), 1);
        assert_eq!(countries[0].name, "Germany");
        assert_eq!(countries[0].abbr, "DE");
        assert_eq!(countries[0].flag, "url2");
    }

    #[tokio::test]
    async fn test_list_server_error() {
        let url = spawn_api(500, "boom").await;
        let client = CountryClient::new(url);

        let err = list_countries(&AppConfig::default(), &client, None, false)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), FETCH_FAILED_MESSAGE);
    }
}
