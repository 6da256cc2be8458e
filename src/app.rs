use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::api::{CountryClient, FetchError};
use crate::config::AppConfig;
use crate::country::{filter_countries, Country};
use crate::theme::Theme;

type LoadResult = Result<Vec<Country>, FetchError>;

/// State for one browsing session.
///
/// Everything the UI shows is derived from these fields; `ui::draw` never
/// mutates them.
pub struct App {
    // Fetched once, never modified afterwards
    pub countries: Vec<Country>,
    // `countries` narrowed by `search_term`
    pub filtered_countries: Vec<Country>,
    // Always stored lower-cased
    pub search_term: String,
    // Text as typed; edited a char at a time before lower-casing
    input: String,

    pub loading: bool,
    pub error: String,

    pub placeholder: String,
    pub card_width: u16,
    pub theme: Theme,

    // Grid scrolling, in card rows
    pub scroll: usize,
    grid_columns: usize,
    visible_rows: usize,

    pub show_help: bool,

    load_started: bool,
    pending_load: Option<oneshot::Receiver<LoadResult>>,
}

impl App {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            countries: Vec::new(),
            filtered_countries: Vec::new(),
            search_term: String::new(),
            input: String::new(),

            // Loading from the first frame, the fetch is fired right after
            loading: true,
            error: String::new(),

            placeholder: config.placeholder.clone(),
            card_width: config.card_width,
            theme: Theme::from_config(&config.theme),

            scroll: 0,
            grid_columns: 1,
            visible_rows: 1,

            show_help: false,

            load_started: false,
            pending_load: None,
        }
    }

    /// Mark the initial load as started. Returns false if it already ran.
    pub fn begin_load(&mut self) -> bool {
        if self.load_started {
            tracing::debug!("Initial load already started, ignoring");
            return false;
        }
        self.load_started = true;
        self.loading = true;
        self.error.clear();
        true
    }

    /// Apply the outcome of the initial load
    pub fn finish_load(&mut self, result: LoadResult) {
        match result {
            Ok(countries) => {
                tracing::info!("Loaded {} countries", countries.len());
                // Honor anything typed while the request was in flight
                self.filtered_countries = filter_countries(&countries, &self.search_term);
                self.countries = countries;
                self.error.clear();
            }
            Err(e) => {
                tracing::error!("Error fetching data: {}", e);
                self.error = e.user_message().to_string();
            }
        }
        self.loading = false;
    }

    /// Run the initial load to completion
    pub async fn load(&mut self, client: &CountryClient) {
        if !self.begin_load() {
            return;
        }
        let result = client.fetch_all().await;
        self.finish_load(result);
    }

    /// Start the initial load in the background; `tick` picks up the result
    pub fn spawn_load(&mut self, client: CountryClient) {
        if !self.begin_load() {
            return;
        }

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(client.fetch_all().await);
        });
        self.pending_load = Some(rx);
    }

    /// Poll the background load, if one is pending
    pub fn tick(&mut self) {
        let Some(rx) = self.pending_load.as_mut() else {
            return;
        };

        match rx.try_recv() {
            Ok(result) => {
                self.pending_load = None;
                self.finish_load(result);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => {
                self.pending_load = None;
                self.finish_load(Err(FetchError::Interrupted));
            }
        }
    }

    /// Replace the search term and recompute the visible countries
    pub fn set_search_term(&mut self, raw: &str) {
        self.input = raw.to_string();
        self.search_term = raw.to_lowercase();
        self.filtered_countries = filter_countries(&self.countries, &self.search_term);
        self.scroll = 0;
    }

    /// Tell the app how the grid is laid out so scrolling can be clamped
    pub fn set_viewport(&mut self, columns: usize, visible_rows: usize) {
        self.grid_columns = columns.max(1);
        self.visible_rows = visible_rows.max(1);
        self.scroll = self.scroll.min(self.max_scroll());
    }

    fn total_rows(&self) -> usize {
        self.filtered_countries.len().div_ceil(self.grid_columns)
    }

    fn max_scroll(&self) -> usize {
        self.total_rows().saturating_sub(self.visible_rows)
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let target = self.scroll.saturating_add_signed(delta);
        self.scroll = target.min(self.max_scroll());
    }

    /// Handle a key press. Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Enter) {
                self.show_help = false;
            }
            return false;
        }

        let page = self.visible_rows as isize;
        match key.code {
            KeyCode::Esc => return true,
            KeyCode::F(1) => self.show_help = true,

            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.set_search_term("");
            }
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                let mut raw = self.input.clone();
                raw.push(c);
                self.set_search_term(&raw);
            }
            KeyCode::Backspace => {
                let mut raw = self.input.clone();
                if raw.pop().is_some() {
                    self.set_search_term(&raw);
                }
            }

            KeyCode::Down => self.scroll_by(1),
            KeyCode::Up => self.scroll_by(-1),
            KeyCode::PageDown => self.scroll_by(page),
            KeyCode::PageUp => self.scroll_by(-page),
            KeyCode::Home => self.scroll = 0,
            KeyCode::End => self.scroll = self.max_scroll(),

            _ => {}
        }
        false
    }
}
