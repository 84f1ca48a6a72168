use std::cell::Cell;
use std::collections::HashMap;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use textwrap::{wrap, Options as WrapOptions};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::catalog::{Item, MAX_DEPTH};
use crate::media;
use crate::prefs::{FrameProbe, PreferenceStore, ProbeVerdict, ECO_MODE_KEY};
use crate::session::{Crumb, Presenter, Session};
use crate::trigger::{ScrollMetrics, TriggerController};

const COLOR_BG: Color = Color::Rgb(19, 19, 31);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(0, 240, 255);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(0, 240, 255);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const ROOT_LABEL: &str = "Todos";
const MISSING_L1_LABEL: &str = "Otros";
const NO_SUBCATEGORIES: &str = "No hay subcategorías";
const NO_RESULTS: &str = "No se encontraron archivos CNC.";
const NO_DESCRIPTION: &str = "Sin descripción";
const CARD_HEIGHT: usize = 3;
const PROBE_POLL: Duration = Duration::from_millis(5);

/// Label shown for a raw category value. Items without a top-level category
/// are grouped under "Otros" on screen only.
fn display_label(label: &str) -> &str {
    if label.is_empty() {
        MISSING_L1_LABEL
    } else {
        label
    }
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn preview_summary(info: &media::PreviewInfo) -> String {
    let label = media::format_label(info.format);
    let size_kb = info.size_bytes.div_ceil(1024);
    match info.dimensions {
        Some((width, height)) => {
            format!("Vista previa: {label} {width}×{height} ({size_kb} KB)")
        }
        None => format!("Vista previa: {label} ({size_kb} KB)"),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Card {
    id: String,
    name: String,
    category: String,
    description: String,
    preview: Option<String>,
    download_url: String,
}

impl Card {
    fn from_item(item: &Item) -> Self {
        let mut labels = item.category_path();
        if labels.is_empty() {
            labels.push(MISSING_L1_LABEL);
        }
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            category: labels.join(" > "),
            description: item
                .description
                .clone()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            preview: item.preview.clone().filter(|p| !p.trim().is_empty()),
            download_url: item.download_url.clone(),
        }
    }
}

/// What the session has published, in the shape the widgets draw it.
#[derive(Default)]
struct GalleryView {
    crumbs: Vec<Crumb>,
    categories: Vec<String>,
    cards: Vec<Card>,
    empty: bool,
    generation: u64,
}

impl Presenter for GalleryView {
    fn render_breadcrumb(&mut self, crumbs: &[Crumb]) {
        self.crumbs = crumbs.to_vec();
    }

    fn render_categories(&mut self, labels: &[String]) {
        self.categories = labels.to_vec();
    }

    fn render_batch(&mut self, items: &[&Item], reset: bool) {
        if reset {
            self.cards.clear();
            self.generation += 1;
        }
        self.empty = false;
        self.cards.extend(items.iter().map(|item| Card::from_item(item)));
    }

    fn render_empty(&mut self) {
        self.cards.clear();
        self.empty = true;
        self.generation += 1;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Pane {
    Categories,
    Gallery,
}

impl Pane {
    fn toggle(self) -> Self {
        match self {
            Pane::Categories => Pane::Gallery,
            Pane::Gallery => Pane::Categories,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum InputMode {
    Normal,
    Search,
}

enum PreviewState {
    Pending,
    Ready(media::PreviewInfo),
    Failed,
}

pub struct Options {
    pub session: Session,
    pub eco_mode: bool,
    pub probe_performance: bool,
    pub prefs: Arc<dyn PreferenceStore + Send + Sync>,
    pub media_handle: Option<media::Handle>,
    pub tick_rate: Duration,
    pub trigger_margin: usize,
    pub source_label: String,
}

pub struct Model {
    session: Session,
    view: GalleryView,
    seen_generation: u64,
    focused_pane: Pane,
    input_mode: InputMode,
    search_buffer: String,
    selected_category: usize,
    selected_card: usize,
    card_offset: Cell<usize>,
    gallery_height: Cell<u16>,
    detail: Option<usize>,
    trigger: TriggerController,
    tick_rate: Duration,
    eco_mode: bool,
    probe: Option<FrameProbe>,
    prefs: Arc<dyn PreferenceStore + Send + Sync>,
    media_handle: Option<media::Handle>,
    previews: HashMap<String, PreviewState>,
    status_message: String,
    status_is_error: bool,
    needs_redraw: bool,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let mut session = opts.session;
        let mut view = GalleryView::default();
        session.start(&mut view);
        let status_message = format!(
            "{} diseños cargados desde {}",
            session.catalog().len(),
            opts.source_label
        );
        let probe = opts
            .probe_performance
            .then(|| FrameProbe::new(Instant::now()));

        let mut model = Self {
            session,
            view,
            seen_generation: 0,
            focused_pane: Pane::Categories,
            input_mode: InputMode::Normal,
            search_buffer: String::new(),
            selected_category: 0,
            selected_card: 0,
            card_offset: Cell::new(0),
            gallery_height: Cell::new(0),
            detail: None,
            trigger: TriggerController::new(opts.trigger_margin),
            tick_rate: opts.tick_rate,
            eco_mode: opts.eco_mode,
            probe,
            prefs: opts.prefs,
            media_handle: opts.media_handle,
            previews: HashMap::new(),
            status_message,
            status_is_error: false,
            needs_redraw: true,
        };
        model.sync_view();
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("ui: enable raw mode")?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();

        loop {
            if self.poll_media() {
                self.mark_dirty();
            }
            if self.probe.is_some() {
                self.needs_redraw = true;
            }

            if self.needs_redraw {
                let height = self.gallery_height.get();
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
                if self.gallery_height.get() != height {
                    self.signal_scroll();
                }
                self.record_probe_frame();
            }

            let timeout = if self.probe.is_some() {
                PROBE_POLL
            } else {
                self.tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or_else(|| Duration::from_millis(16))
            };

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => self.set_error(format!("Error: {err}")),
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::Resize(_, _) => {
                        self.signal_scroll();
                        self.mark_dirty();
                    }
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                last_tick = Instant::now();
                self.on_tick();
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status_message = message.into();
        self.status_is_error = false;
        self.mark_dirty();
    }

    fn set_error<S: Into<String>>(&mut self, message: S) {
        self.status_message = message.into();
        self.status_is_error = true;
        self.mark_dirty();
    }

    /// Runs after every session transition: a new view generation puts the
    /// selection back at the top.
    fn sync_view(&mut self) {
        if self.view.generation != self.seen_generation {
            self.seen_generation = self.view.generation;
            self.selected_card = 0;
            self.card_offset.set(0);
            self.detail = None;
        }
        let categories = self.view.categories.len();
        self.selected_category = self.selected_category.min(categories.saturating_sub(1));
        let cards = self.view.cards.len();
        self.selected_card = self.selected_card.min(cards.saturating_sub(1));
        self.ensure_card_visible();
        self.signal_scroll();
        self.mark_dirty();
    }

    fn visible_cards(&self) -> usize {
        (usize::from(self.gallery_height.get()) / CARD_HEIGHT).max(1)
    }

    fn ensure_card_visible(&self) {
        let visible = self.visible_cards();
        let offset = self.card_offset.get();
        if self.selected_card < offset {
            self.card_offset.set(self.selected_card);
        } else if self.selected_card >= offset + visible {
            self.card_offset.set(self.selected_card + 1 - visible);
        }
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            offset: self.card_offset.get() * CARD_HEIGHT,
            viewport: usize::from(self.gallery_height.get()),
            content: self.view.cards.len() * CARD_HEIGHT,
        }
    }

    fn signal_scroll(&mut self) {
        if self.gallery_height.get() == 0 {
            return;
        }
        let metrics = self.scroll_metrics();
        self.trigger.on_scroll(metrics);
    }

    fn on_tick(&mut self) {
        if self.trigger.on_tick() {
            self.request_more();
        }
    }

    fn request_more(&mut self) {
        let added = self.session.request_more(&mut self.view);
        if added > 0 {
            tracing::debug!(
                added,
                rendered = self.session.rendered_len(),
                total = self.session.filtered_len(),
                "gallery extended"
            );
            self.signal_scroll();
            self.mark_dirty();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }
        if self.input_mode == InputMode::Search {
            self.handle_search_key(key);
            return Ok(false);
        }
        if self.detail.is_some() {
            return self.handle_detail_key(key.code);
        }

        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Tab | KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.toggle();
                self.mark_dirty();
            }
            KeyCode::Char('h') | KeyCode::Left => {
                self.focused_pane = Pane::Categories;
                self.mark_dirty();
            }
            KeyCode::Char('l') | KeyCode::Right => {
                self.focused_pane = Pane::Gallery;
                self.mark_dirty();
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::PageDown => self.move_selection(self.visible_cards() as i64),
            KeyCode::PageUp => self.move_selection(-(self.visible_cards() as i64)),
            KeyCode::Char('g') | KeyCode::Home => self.move_selection(i64::MIN / 2),
            KeyCode::Char('G') | KeyCode::End => self.move_selection(i64::MAX / 2),
            KeyCode::Enter => match self.focused_pane {
                Pane::Categories => self.descend_selected(),
                Pane::Gallery => self.open_detail(),
            },
            KeyCode::Backspace | KeyCode::Char('u') => self.go_up(),
            KeyCode::Char(ch @ '0'..='9') => {
                if let Some(depth) = ch.to_digit(10) {
                    self.jump_to_crumb(depth as usize);
                }
            }
            KeyCode::Char('/') => {
                self.input_mode = InputMode::Search;
                self.search_buffer = self.session.query().to_string();
                self.set_status("Buscando: escribe para filtrar, Enter o Esc para terminar.");
            }
            KeyCode::F(9) => {
                let enabled = !self.eco_mode;
                self.set_eco_mode(enabled);
                let label = if enabled { "activado" } else { "desactivado" };
                self.set_status(format!("Modo eco {label}."));
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.focused_pane = Pane::Gallery;
                let message = format!("{} resultados.", self.session.filtered_len());
                self.set_status(message);
                return;
            }
            KeyCode::Backspace => {
                self.search_buffer.pop();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search_buffer.clear();
            }
            KeyCode::Char(ch) => self.search_buffer.push(ch),
            _ => return,
        }
        self.session.set_query(&self.search_buffer, &mut self.view);
        self.sync_view();
    }

    fn handle_detail_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Backspace => {
                self.detail = None;
                self.mark_dirty();
            }
            KeyCode::Char('o') => self.open_download()?,
            KeyCode::Char('y') => self.copy_download()?,
            _ => {}
        }
        Ok(false)
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.detail.is_some() {
            return;
        }
        match mouse.kind {
            MouseEventKind::ScrollDown => self.move_selection(1),
            MouseEventKind::ScrollUp => self.move_selection(-1),
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: i64) {
        let (len, current) = match self.focused_pane {
            Pane::Categories => (self.view.categories.len(), self.selected_category),
            Pane::Gallery => (self.view.cards.len(), self.selected_card),
        };
        if len == 0 {
            return;
        }
        let target = (current as i64)
            .saturating_add(delta)
            .clamp(0, len as i64 - 1) as usize;
        match self.focused_pane {
            Pane::Categories => self.selected_category = target,
            Pane::Gallery => {
                self.selected_card = target;
                self.ensure_card_visible();
                self.signal_scroll();
            }
        }
        self.mark_dirty();
    }

    fn descend_selected(&mut self) {
        if self.session.path().depth() >= MAX_DEPTH {
            return;
        }
        let Some(label) = self.view.categories.get(self.selected_category).cloned() else {
            self.set_status(NO_SUBCATEGORIES);
            return;
        };
        self.session.descend(&label, &mut self.view);
        self.selected_category = 0;
        self.sync_view();
        self.report_view();
    }

    fn go_up(&mut self) {
        let depth = self.session.path().depth();
        if depth == 0 {
            return;
        }
        self.jump_to_crumb(depth - 1);
    }

    /// Breadcrumb navigation: keep the first `depth` levels.
    fn jump_to_crumb(&mut self, depth: usize) {
        if depth > self.session.path().depth() {
            return;
        }
        self.session.navigate_up(depth, &mut self.view);
        self.selected_category = 0;
        self.sync_view();
        self.report_view();
    }

    fn report_view(&mut self) {
        let message = if self.view.empty {
            NO_RESULTS.to_string()
        } else {
            format!(
                "{}: {} diseños.",
                self.breadcrumb_text(),
                self.session.filtered_len()
            )
        };
        self.set_status(message);
    }

    fn open_detail(&mut self) {
        let Some(card) = self.view.cards.get(self.selected_card) else {
            return;
        };
        let id = card.id.clone();
        let preview = card.preview.clone();
        self.detail = Some(self.selected_card);
        if !self.eco_mode {
            if let (Some(preview), Some(handle)) = (preview, self.media_handle.as_ref()) {
                if !self.previews.contains_key(&id) {
                    handle.enqueue(&id, &preview);
                    self.previews.insert(id, PreviewState::Pending);
                }
            }
        }
        self.mark_dirty();
    }

    fn detail_card(&self) -> Option<&Card> {
        self.detail.and_then(|index| self.view.cards.get(index))
    }

    fn open_download(&mut self) -> Result<()> {
        let Some(url) = self.detail_card().map(|card| card.download_url.clone()) else {
            return Ok(());
        };
        if url.trim().is_empty() {
            self.set_error("Este diseño no tiene enlace de descarga.");
            return Ok(());
        }
        webbrowser::open(&url).with_context(|| format!("open {url}"))?;
        tracing::info!(url = %url, "opened download link");
        self.set_status(format!("Abriendo {url}"));
        Ok(())
    }

    fn copy_download(&mut self) -> Result<()> {
        let Some(url) = self.detail_card().map(|card| card.download_url.clone()) else {
            return Ok(());
        };
        if url.trim().is_empty() {
            self.set_error("Este diseño no tiene enlace de descarga.");
            return Ok(());
        }
        let mut clipboard = arboard::Clipboard::new().context("access clipboard")?;
        clipboard
            .set_text(url.clone())
            .context("copy download link")?;
        self.set_status(format!("Enlace copiado: {url}"));
        Ok(())
    }

    fn set_eco_mode(&mut self, enabled: bool) {
        self.eco_mode = enabled;
        if let Err(err) = self.prefs.save_flag(ECO_MODE_KEY, enabled) {
            tracing::warn!(error = %err, "failed to persist eco mode");
        }
        self.mark_dirty();
    }

    fn record_probe_frame(&mut self) {
        let Some(probe) = self.probe.as_mut() else {
            return;
        };
        let Some(verdict) = probe.record_frame(Instant::now()) else {
            return;
        };
        self.probe = None;
        match verdict {
            ProbeVerdict::Slow { fps } => {
                tracing::info!(fps, "low frame rate, switching to eco mode");
                self.set_eco_mode(true);
                self.set_status("Rendimiento bajo detectado: modo eco activado (F9 para cambiar).");
            }
            ProbeVerdict::Fast { fps } => tracing::debug!(fps, "frame rate probe passed"),
        }
    }

    fn poll_media(&mut self) -> bool {
        let Some(handle) = self.media_handle.as_ref() else {
            return false;
        };
        let mut changed = false;
        while let Some(result) = handle.try_recv() {
            let state = match result.info {
                Some(info) => PreviewState::Ready(info),
                None => PreviewState::Failed,
            };
            self.previews.insert(result.item_id, state);
            changed = true;
        }
        changed
    }

    fn breadcrumb_text(&self) -> String {
        self.view
            .crumbs
            .iter()
            .map(|crumb| {
                if crumb.depth == 0 {
                    ROOT_LABEL
                } else {
                    display_label(&crumb.label)
                }
            })
            .collect::<Vec<_>>()
            .join(" > ")
    }

    fn border_type(&self) -> BorderType {
        if self.eco_mode {
            BorderType::Plain
        } else {
            BorderType::Rounded
        }
    }

    fn pane_block(&self, pane: Pane, title: String) -> Block<'static> {
        let focused = self.focused_pane == pane && self.detail.is_none();
        let border = if focused {
            COLOR_BORDER_FOCUSED
        } else {
            COLOR_BORDER_IDLE
        };
        Block::default()
            .borders(Borders::ALL)
            .border_type(self.border_type())
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ))
    }

    fn draw(&self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(full);

        frame.render_widget(Paragraph::new(self.breadcrumb_line()), layout[0]);
        frame.render_widget(Paragraph::new(self.search_line()), layout[1]);

        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
            .split(layout[2]);
        self.draw_categories(frame, main[0]);
        self.draw_gallery(frame, main[1]);

        let status_color = if self.status_is_error {
            COLOR_ERROR
        } else {
            COLOR_TEXT_PRIMARY
        };
        let mut status = self.status_message.clone();
        if self.eco_mode {
            status.push_str("  [eco]");
        }
        frame.render_widget(
            Paragraph::new(status).style(Style::default().fg(status_color).bg(COLOR_PANEL_BG)),
            layout[3],
        );

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, layout[4]);

        if self.detail.is_some() {
            self.draw_detail(frame, layout[2]);
        }
    }

    fn breadcrumb_line(&self) -> Line<'static> {
        let mut spans = Vec::with_capacity(self.view.crumbs.len() * 2);
        for (idx, crumb) in self.view.crumbs.iter().enumerate() {
            if idx > 0 {
                spans.push(Span::styled(" > ", Style::default().fg(COLOR_TEXT_SECONDARY)));
            }
            let label = if crumb.depth == 0 {
                ROOT_LABEL
            } else {
                display_label(&crumb.label)
            };
            let style = if crumb.active {
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(COLOR_TEXT_PRIMARY)
            };
            spans.push(Span::styled(format!("[{}] {}", crumb.depth, label), style));
        }
        Line::from(spans)
    }

    fn search_line(&self) -> Line<'static> {
        match self.input_mode {
            InputMode::Search => Line::from(vec![
                Span::styled("Buscar: ", Style::default().fg(COLOR_ACCENT)),
                Span::styled(
                    format!("{}▏", self.search_buffer),
                    Style::default().fg(COLOR_TEXT_PRIMARY),
                ),
            ]),
            InputMode::Normal if !self.session.query().is_empty() => Line::from(vec![
                Span::styled("Filtro: ", Style::default().fg(COLOR_TEXT_SECONDARY)),
                Span::styled(
                    self.session.query().to_string(),
                    Style::default().fg(COLOR_TEXT_PRIMARY),
                ),
                Span::styled("  (/ para editar)", Style::default().fg(COLOR_TEXT_SECONDARY)),
            ]),
            InputMode::Normal => Line::from(Span::styled(
                "/ para buscar",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
        }
    }

    fn footer_text(&self) -> &'static str {
        if self.detail.is_some() {
            "o abrir descarga · y copiar enlace · Esc cerrar"
        } else {
            "j/k mover · Tab panel · Enter abrir · ⌫ subir · 0-3 migas · / buscar · F9 eco · q salir"
        }
    }

    fn draw_categories(&self, frame: &mut Frame<'_>, area: Rect) {
        let title = format!("Categorías ({})", self.view.categories.len());
        let block = self.pane_block(Pane::Categories, title);

        if self.view.categories.is_empty() {
            let empty = Paragraph::new(NO_SUBCATEGORIES)
                .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(empty, area);
            return;
        }

        let items: Vec<ListItem> = self
            .view
            .categories
            .iter()
            .map(|label| {
                ListItem::new(Line::from(Span::styled(
                    display_label(label).to_string(),
                    Style::default().fg(COLOR_TEXT_PRIMARY),
                )))
            })
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(COLOR_PANEL_SELECTED_BG)
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("› ");
        let mut state = ListState::default().with_selected(Some(self.selected_category));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_gallery(&self, frame: &mut Frame<'_>, area: Rect) {
        let title = format!(
            "Diseños ({}/{})",
            self.session.rendered_len(),
            self.session.filtered_len()
        );
        let block = self.pane_block(Pane::Gallery, title);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.gallery_height.set(inner.height);
        self.ensure_card_visible();

        if self.view.empty {
            let empty = Paragraph::new(NO_RESULTS)
                .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                .alignment(Alignment::Center);
            let vertical = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Percentage(45),
                    Constraint::Length(1),
                    Constraint::Min(0),
                ])
                .split(inner);
            frame.render_widget(empty, vertical[1]);
            return;
        }

        let width = usize::from(inner.width.saturating_sub(2));
        let focused = self.focused_pane == Pane::Gallery;
        let offset = self.card_offset.get();
        let mut lines: Vec<Line<'static>> = Vec::new();
        for (index, card) in self
            .view
            .cards
            .iter()
            .enumerate()
            .skip(offset)
            .take(self.visible_cards())
        {
            let selected = index == self.selected_card;
            let base = if selected && focused {
                Style::default().bg(COLOR_PANEL_SELECTED_BG)
            } else {
                Style::default()
            };
            let marker = if selected { "▌ " } else { "  " };
            lines.push(Line::from(vec![
                Span::styled(marker, base.fg(COLOR_ACCENT)),
                Span::styled(
                    truncate_to_width(&card.name, width),
                    base.fg(COLOR_TEXT_PRIMARY).add_modifier(Modifier::BOLD),
                ),
            ]));
            lines.push(Line::from(vec![
                Span::styled("  ", base),
                Span::styled(
                    truncate_to_width(&card.category, width),
                    base.fg(COLOR_ACCENT),
                ),
            ]));
            lines.push(Line::from(vec![
                Span::styled("  ", base),
                Span::styled(
                    truncate_to_width(&card.description, width),
                    base.fg(COLOR_TEXT_SECONDARY),
                ),
            ]));
        }
        frame.render_widget(Paragraph::new(Text::from(lines)), inner);
    }

    fn preview_status(&self, card: &Card) -> String {
        if card.preview.is_none() {
            return "Vista previa: no disponible".to_string();
        }
        if self.eco_mode {
            return "Vista previa: desactivada en modo eco".to_string();
        }
        match self.previews.get(&card.id) {
            Some(PreviewState::Ready(info)) => preview_summary(info),
            Some(PreviewState::Pending) => "Vista previa: cargando…".to_string(),
            Some(PreviewState::Failed) | None => "Vista previa: no disponible".to_string(),
        }
    }

    fn draw_detail(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(card) = self.detail_card() else {
            return;
        };
        let popup = centered_rect(70, 70, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(self.border_type())
            .border_style(Style::default().fg(COLOR_BORDER_FOCUSED))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .title(Span::styled(
                card.name.clone(),
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let width = usize::from(inner.width.max(1));
        let mut lines: Vec<Line<'static>> = vec![
            Line::from(Span::styled(
                card.category.clone(),
                Style::default().fg(COLOR_ACCENT),
            )),
            Line::default(),
        ];
        for row in wrap(&card.description, WrapOptions::new(width)) {
            lines.push(Line::from(Span::styled(
                row.into_owned(),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            )));
        }
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            self.preview_status(card),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )));
        let download = if card.download_url.trim().is_empty() {
            "Descarga: sin enlace".to_string()
        } else {
            format!("Descarga: {}", card.download_url)
        };
        lines.push(Line::from(Span::styled(
            download,
            Style::default().fg(COLOR_TEXT_PRIMARY),
        )));
        frame.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false }), inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::storage::Store;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn model_with(items: Vec<Item>) -> Model {
        let catalog = Arc::new(Catalog::load(items).unwrap());
        let store = Store::open_in_memory().unwrap();
        Model::new(Options {
            session: Session::with_batch_size(catalog, 2),
            eco_mode: false,
            probe_performance: false,
            prefs: Arc::new(store),
            media_handle: None,
            tick_rate: Duration::from_millis(120),
            trigger_margin: 6,
            source_label: "test".into(),
        })
    }

    fn model() -> Model {
        model_with(vec![
            Item::new("1", "Dragon").with_categories("Animals", "Dragons", ""),
            Item::new("2", "Box").with_categories("Wood", "Boxes", "Small"),
            Item::new("3", "Crate").with_categories("Wood", "Boxes", ""),
            Item::new("4", "Loose").with_categories("", "", ""),
        ])
    }

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate_to_width("abc", 5), "abc");
        assert_eq!(truncate_to_width("abcdef", 4), "abc…");
        assert_eq!(truncate_to_width("abcdef", 0), "");
    }

    #[test]
    fn preview_summary_omits_unknown_dimensions() {
        let mut info = media::PreviewInfo {
            path: "previews/foxu_1.avif".into(),
            format: Some(image::ImageFormat::Avif),
            dimensions: None,
            size_bytes: 2048,
        };
        assert_eq!(preview_summary(&info), "Vista previa: AVIF (2 KB)");
        info.format = Some(image::ImageFormat::Png);
        info.dimensions = Some((600, 400));
        assert_eq!(preview_summary(&info), "Vista previa: PNG 600×400 (2 KB)");
    }

    #[test]
    fn card_uses_display_fallbacks() {
        let card = Card::from_item(&Item::new("x", "Plain"));
        assert_eq!(card.category, MISSING_L1_LABEL);
        assert_eq!(card.description, NO_DESCRIPTION);
        assert!(card.preview.is_none());
    }

    #[test]
    fn empty_category_shows_as_otros_without_changing_filter() {
        let mut model = model();
        assert_eq!(model.view.categories, vec!["", "Animals", "Wood"]);
        model.handle_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(model.session.path().segments(), &["".to_string()]);
        assert_eq!(model.breadcrumb_text(), "Todos > Otros");
        assert_eq!(model.view.cards.len(), 1);
        assert_eq!(model.view.cards[0].name, "Loose");
    }

    #[test]
    fn enter_descends_and_digits_jump_back() {
        let mut model = model();
        model.handle_key(key(KeyCode::Char('j'))).unwrap();
        model.handle_key(key(KeyCode::Char('j'))).unwrap();
        model.handle_key(key(KeyCode::Enter)).unwrap();
        model.handle_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(model.breadcrumb_text(), "Todos > Wood > Boxes");
        assert_eq!(model.view.categories, vec!["Small"]);

        model.handle_key(key(KeyCode::Char('1'))).unwrap();
        assert_eq!(model.breadcrumb_text(), "Todos > Wood");
        model.handle_key(key(KeyCode::Backspace)).unwrap();
        assert!(model.session.path().is_root());
    }

    #[test]
    fn search_mode_filters_on_every_keystroke() {
        let mut model = model();
        model.handle_key(key(KeyCode::Char('/'))).unwrap();
        for ch in "cra".chars() {
            model.handle_key(key(KeyCode::Char(ch))).unwrap();
        }
        assert_eq!(model.session.query(), "cra");
        assert_eq!(model.view.cards.len(), 1);
        model.handle_key(key(KeyCode::Esc)).unwrap();
        assert_eq!(model.input_mode, InputMode::Normal);
        assert_eq!(model.focused_pane, Pane::Gallery);
    }

    #[test]
    fn scrolling_to_bottom_requests_next_batch_on_tick() {
        let mut model = model();
        model.gallery_height.set(CARD_HEIGHT as u16);
        assert_eq!(model.view.cards.len(), 2);
        model.on_tick();
        assert_eq!(model.view.cards.len(), 2);
        model.handle_key(key(KeyCode::Tab)).unwrap();
        model.handle_key(key(KeyCode::Char('G'))).unwrap();
        model.on_tick();
        assert_eq!(model.view.cards.len(), 4);
    }

    #[test]
    fn f9_toggles_and_persists_eco_mode() {
        let mut model = model();
        model.handle_key(key(KeyCode::F(9))).unwrap();
        assert!(model.eco_mode);
        assert_eq!(model.prefs.load_flag(ECO_MODE_KEY).unwrap(), Some(true));
    }

    #[test]
    fn quit_keys() {
        let mut model = model();
        assert!(model.handle_key(key(KeyCode::Char('q'))).unwrap());
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(model.handle_key(ctrl_c).unwrap());
    }
}
