use address_selector::{City, Selector, StreetLookup, StreetsRequest};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

const PAGE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Cities,
    Streets,
}

impl Pane {
    pub fn other(&self) -> Self {
        match self {
            Pane::Cities => Pane::Streets,
            Pane::Streets => Pane::Cities,
        }
    }
}

pub struct App {
    pub selector: Selector,
    pub focus: Pane,
    pub city_query: String,
    pub street_query: String,
    pub city_state: TableState,
    pub street_state: TableState,
    /// Lookup to run after the next draw, so the loading state is visible
    pub pending: Option<StreetsRequest>,
}

impl App {
    pub fn new(cities: Vec<City>) -> Self {
        let mut city_state = TableState::default();
        if !cities.is_empty() {
            city_state.select(Some(0));
        }

        Self {
            selector: Selector::new(cities),
            focus: Pane::Cities,
            city_query: String::new(),
            street_query: String::new(),
            city_state,
            street_state: TableState::default(),
            pending: None,
        }
    }

    fn query(&self) -> &str {
        match self.focus {
            Pane::Cities => self.city_query.as_str(),
            Pane::Streets => self.street_query.as_str(),
        }
    }

    fn query_mut(&mut self) -> &mut String {
        match self.focus {
            Pane::Cities => &mut self.city_query,
            Pane::Streets => &mut self.street_query,
        }
    }

    fn state_mut(&mut self) -> &mut TableState {
        match self.focus {
            Pane::Cities => &mut self.city_state,
            Pane::Streets => &mut self.street_state,
        }
    }

    /// Number of rows the focused pane currently shows.
    fn visible_len(&self) -> usize {
        match self.focus {
            Pane::Cities => self.selector.filtered_cities(&self.city_query).len(),
            Pane::Streets => self.selector.filtered_streets(&self.street_query).len(),
        }
    }

    fn reset_highlight(&mut self) {
        let first = if self.visible_len() > 0 { Some(0) } else { None };
        self.state_mut().select(first);
    }

    fn move_highlight(&mut self, delta: isize) {
        let len = self.visible_len();
        if len == 0 {
            return;
        }
        let current = self.state_mut().selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1) as usize;
        self.state_mut().select(Some(next));
    }

    fn highlight_last(&mut self) {
        let len = self.visible_len();
        if len > 0 {
            self.state_mut().select(Some(len - 1));
        }
    }

    pub fn push_char(&mut self, c: char) {
        self.query_mut().push(c);
        self.reset_highlight();
    }

    pub fn pop_char(&mut self) {
        self.query_mut().pop();
        self.reset_highlight();
    }

    /// Toggle the highlighted row of the focused pane.
    pub fn activate(&mut self) {
        let index = match self.state_mut().selected() {
            Some(i) => i,
            None => return,
        };

        match self.focus {
            Pane::Cities => {
                let city = match self.selector.filtered_cities(&self.city_query).get(index) {
                    Some(city) => (*city).clone(),
                    None => return,
                };
                self.pending = self.selector.select_city(&city);
                self.city_query.clear();
                self.street_query.clear();
                self.street_state.select(None);
                self.reset_highlight();
                if self.pending.is_some() {
                    self.focus = Pane::Streets;
                }
            }
            Pane::Streets => {
                let street = match self.selector.filtered_streets(&self.street_query).get(index) {
                    Some(street) => (*street).clone(),
                    None => return,
                };
                self.selector.select_street(&street);
                self.street_query.clear();
                self.reset_highlight();
            }
        }
    }

    /// Run a queued lookup. Returns true if one ran.
    pub fn run_pending<L: StreetLookup + ?Sized>(&mut self, lookup: &L) -> bool {
        match self.pending.take() {
            Some(request) => {
                self.selector.fetch_streets(lookup, request);
                if self.focus == Pane::Streets {
                    self.reset_highlight();
                } else {
                    let first = if self.selector.streets().is_empty() { None } else { Some(0) };
                    self.street_state.select(first);
                }
                true
            }
            None => false,
        }
    }

    /// Forget the chosen city and go back to the city list.
    pub fn clear_selection(&mut self) {
        self.selector.clear_city();
        self.pending = None;
        self.street_query.clear();
        self.street_state.select(None);
        self.focus = Pane::Cities;
        self.reset_highlight();
    }

    /// Returns true when the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        match key.code {
            KeyCode::Esc => {
                if self.query().is_empty() {
                    return true;
                }
                self.query_mut().clear();
                self.reset_highlight();
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = self.focus.other();
                if self.state_mut().selected().is_none() {
                    self.reset_highlight();
                }
            }
            KeyCode::Enter => self.activate(),
            KeyCode::Delete => self.clear_selection(),
            KeyCode::Down => self.move_highlight(1),
            KeyCode::Up => self.move_highlight(-1),
            KeyCode::PageDown => self.move_highlight(PAGE as isize),
            KeyCode::PageUp => self.move_highlight(-(PAGE as isize)),
            KeyCode::Home => self.reset_highlight(),
            KeyCode::End => self.highlight_last(),
            KeyCode::Backspace => self.pop_char(),
            KeyCode::Char(c) => self.push_char(c),
            _ => {}
        }

        false
    }
}

pub fn run_ui<L: StreetLookup + ?Sized>(app: &mut App, lookup: &L) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app, lookup);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend, L: StreetLookup + ?Sized>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    lookup: &L,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        // Loading frame has been drawn; now do the lookup and redraw
        if app.run_pending(lookup) {
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Pickers
            Constraint::Length(7), // Selection details
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    render_cities(f, panes[0], app);
    render_streets(f, panes[1], app);
    render_details(f, chunks[2], app);
    render_status_bar(f, chunks[3], app);
}

fn pane_style(app: &App, pane: Pane) -> Style {
    if app.focus == pane {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let city_label = app
        .selector
        .selected_city()
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "בחר עיר...".to_string());

    let spans = vec![
        Span::styled(
            " בחירת כתובת ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" │ "),
        Span::styled("עיר: ", Style::default().fg(Color::DarkGray)),
        Span::styled(city_label, Style::default().fg(Color::White)),
        Span::raw(" │ "),
        Span::styled("רחוב: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            app.selector.street_prompt().label().to_string(),
            Style::default().fg(Color::White),
        ),
    ];

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn search_line(query: &str, placeholder: &str) -> Line<'static> {
    if query.is_empty() {
        Line::from(Span::styled(
            format!(" 🔍 {}", placeholder),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
    } else {
        Line::from(Span::styled(format!(" 🔍 {}", query), Style::default().fg(Color::White)))
    }
}

fn render_cities(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    f.render_widget(Paragraph::new(search_line(&app.city_query, "חפש עיר...")), chunks[0]);

    let selected_symbol = app.selector.selected_city().map(|c| c.symbol);
    let visible = app.selector.filtered_cities(&app.city_query);
    let title = if visible.is_empty() {
        " ערים - לא נמצאו ערים ".to_string()
    } else {
        format!(" ערים ({}) ", visible.len())
    };

    let header = Row::new(["", "סמל", "שם", "מועצה"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    }))
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows: Vec<Row> = visible
        .iter()
        .map(|city| {
            let check = if Some(city.symbol) == selected_symbol { "✓" } else { "" };
            Row::new(vec![
                Cell::from(check).style(Style::default().fg(Color::Green)),
                Cell::from(city.symbol.to_string()),
                Cell::from(truncate(&city.name, 28)),
                Cell::from(truncate(&city.council_name, 20)).style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Length(6),
            Constraint::Length(30),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(pane_style(app, Pane::Cities))
            .title(title),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, chunks[1], &mut app.city_state);
}

fn render_streets(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    f.render_widget(Paragraph::new(search_line(&app.street_query, "חפש רחוב...")), chunks[0]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(pane_style(app, Pane::Streets));

    // Nothing to list: show why
    if app.selector.is_loading() || app.selector.streets().is_empty() {
        let prompt = app.selector.street_prompt();
        let mut lines = vec![Line::from(""), Line::from(format!("  {}", prompt.label()))];
        if let Some(err) = app.selector.lookup_error() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("  {}", err),
                Style::default().fg(Color::Red),
            )));
        }
        f.render_widget(Paragraph::new(lines).block(block.title(" רחובות ")), chunks[1]);
        return;
    }

    let selected_id = app.selector.selected_street().map(|s| s.id);
    let visible = app.selector.filtered_streets(&app.street_query);
    let title = if visible.is_empty() {
        " רחובות - לא נמצאו רחובות ".to_string()
    } else {
        format!(" רחובות ({}) ", visible.len())
    };

    let rows: Vec<Row> = visible
        .iter()
        .map(|street| {
            let check = if Some(street.id) == selected_id { "✓" } else { "" };
            Row::new(vec![
                Cell::from(check).style(Style::default().fg(Color::Green)),
                Cell::from(truncate(&street.name, 40)),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(2), Constraint::Min(10)])
        .block(block.title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, chunks[1], &mut app.street_state);
}

fn render_details(f: &mut Frame, area: Rect, app: &App) {
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let content = match app.selector.details() {
        Some(address) => vec![
            Line::from(vec![Span::styled("  עיר: ", label), Span::raw(address.city_name)]),
            Line::from(vec![Span::styled("  רחוב: ", label), Span::raw(address.street_name)]),
            Line::from(vec![
                Span::styled("  סמל ישוב: ", label),
                Span::styled(address.city_symbol.to_string(), Style::default().fg(Color::Green)),
            ]),
        ],
        None => vec![
            Line::from(""),
            Line::from(Span::styled(
                "  בחר עיר ורחוב כדי לראות את הפרטים",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
        ],
    };

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" הבחירה שלך "),
    );

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![Span::styled(
        format!(" {} ערים במאגר", app.selector.cities().len()),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(city) = app.selector.selected_city() {
        status_spans.push(Span::raw(" • "));
        status_spans.push(Span::styled(
            format!("{} רחובות ב{}", app.selector.streets().len(), city.name),
            Style::default().fg(Color::Green),
        ));
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Select | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Pane | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("Del", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Reset | "));
    status_spans.push(Span::styled("Esc", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Clear/Quit"));

    let status_bar = Paragraph::new(Line::from(status_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}
