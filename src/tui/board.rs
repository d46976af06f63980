//! Kanban board interface.
//!
//! This module implements the board view where tasks are organized into the
//! six status columns, with card movement, a grading popup for review tasks
//! and the renewal prompt for recurring tasks that hit their limit. All
//! mutations go through the settlement engine, so the board can never bend
//! the lifecycle rules the CLI enforces.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    prelude::CrosstermBackend,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::building::{self, Scope};
use crate::fields::{Rating, Status};
use crate::scoring;
use crate::settlement;
use crate::state::GameState;
use crate::task::{FixedLimiter, Rule, Task};
use crate::tui::colors::{DARK_GREEN, DARK_PURPLE, DARK_RED, GOLD, SLATE, STEEL_BLUE};

/// Input mode for the board.
enum Mode {
    Normal,
    /// Picking a rating for the selected review task.
    Grading { rating: u8 },
    /// Deciding whether to renew a recurring task.
    Renewal { task_id: u64 },
}

/// Main board application state
pub struct BoardApp {
    state: GameState,
    state_path: PathBuf,
    building_filter: Option<u64>,
    acting_user: Option<String>,
    selected_column: usize,
    selected_card: usize,
    column_scroll_offsets: [usize; 6],
    status_message: String,
    show_task_detail: bool,
    mode: Mode,

    // Task IDs organized into the six status columns
    columns: [Vec<u64>; 6],
}

impl BoardApp {
    /// Create a new BoardApp instance
    pub fn new(
        state_path: &Path,
        building_filter: Option<u64>,
        acting_user: Option<String>,
    ) -> io::Result<Self> {
        let state = GameState::load(state_path);

        let mut app = BoardApp {
            state,
            state_path: state_path.to_path_buf(),
            building_filter,
            acting_user,
            selected_column: 0,
            selected_card: 0,
            column_scroll_offsets: [0; 6],
            status_message: String::new(),
            show_task_detail: false,
            mode: Mode::Normal,
            columns: Default::default(),
        };

        app.update_columns();
        Ok(app)
    }

    fn column_accent(column: usize) -> Color {
        match column {
            0 => SLATE,
            1 => STEEL_BLUE,
            2 => GOLD,
            3 => DARK_RED,
            4 => DARK_PURPLE,
            _ => DARK_GREEN,
        }
    }

    /// Update the task columns based on the current building filter
    fn update_columns(&mut self) {
        for (i, column) in self.columns.iter_mut().enumerate() {
            column.clear();
            self.column_scroll_offsets[i] = 0;
        }

        for b in &self.state.buildings {
            if let Some(filter) = self.building_filter {
                if b.id != filter {
                    continue;
                }
            }
            for task in &b.tasks {
                self.columns[task.status.column()].push(task.id);
            }
        }

        self.clamp_selection();
    }

    /// Ensure selected column and card indices are valid
    fn clamp_selection(&mut self) {
        if self.selected_column >= self.columns.len() {
            self.selected_column = 0;
        }

        let column_len = self.columns[self.selected_column].len();
        if column_len == 0 {
            self.selected_card = 0;
            self.column_scroll_offsets[self.selected_column] = 0;
        } else if self.selected_card >= column_len {
            self.selected_card = column_len - 1;
        }
    }

    fn selected_task_id(&self) -> Option<u64> {
        self.columns[self.selected_column]
            .get(self.selected_card)
            .copied()
    }

    fn task(&self, id: u64) -> Option<&Task> {
        self.state.locate_task(id).map(|(_, t)| t)
    }

    /// Save the state to disk and refresh columns
    fn save_state(&mut self) -> io::Result<()> {
        self.state.save(&self.state_path)?;
        self.state = GameState::load(&self.state_path);
        self.update_columns();
        Ok(())
    }

    fn set_status_message(&mut self, msg: String) {
        self.status_message = msg;
    }

    fn clear_status_message(&mut self) {
        self.status_message.clear();
    }

    /// Handle keyboard input
    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                match self.mode {
                    Mode::Grading { rating } => {
                        self.handle_grading_input(key.code, rating)?;
                        return Ok(false);
                    }
                    Mode::Renewal { task_id } => {
                        self.handle_renewal_input(key.code, task_id)?;
                        return Ok(false);
                    }
                    Mode::Normal => {}
                }

                self.clear_status_message();

                match key.code {
                    KeyCode::Char('q') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(true)
                    }
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(true)
                    }
                    KeyCode::Esc => {
                        if self.show_task_detail {
                            self.show_task_detail = false;
                        } else {
                            return Ok(true);
                        }
                    }
                    KeyCode::Char('q') => return Ok(true),

                    // Task detail popup
                    KeyCode::Enter => {
                        self.show_task_detail = !self.show_task_detail;
                    }

                    // Card movement between columns (check first, before navigation)
                    KeyCode::Left if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        self.move_card(-1);
                    }
                    KeyCode::Right if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        self.move_card(1);
                    }

                    // Column navigation
                    KeyCode::Left => {
                        if self.selected_column > 0 {
                            self.selected_column -= 1;
                            self.clamp_selection();
                        }
                    }
                    KeyCode::Right => {
                        if self.selected_column < self.columns.len() - 1 {
                            self.selected_column += 1;
                            self.clamp_selection();
                        }
                    }

                    // Card navigation within column
                    KeyCode::Up => {
                        if self.selected_card > 0 {
                            self.selected_card -= 1;
                        }
                    }
                    KeyCode::Down => {
                        let column_len = self.columns[self.selected_column].len();
                        if column_len > 0 && self.selected_card < column_len - 1 {
                            self.selected_card += 1;
                        }
                    }

                    // Grade the selected review task
                    KeyCode::Char('g') => {
                        self.start_grading();
                    }

                    // Resolve a pending renewal on the selected task
                    KeyCode::Char('r') => {
                        self.start_renewal();
                    }

                    // Help
                    KeyCode::Char('h') => {
                        self.set_status_message(
                            "Help: Enter: Details | Ctrl+←/→: Move card | g: Grade review task | \
                             r: Renewal decision | Esc: Exit"
                                .to_string(),
                        );
                    }

                    _ => {}
                }
            }
        }
        Ok(false)
    }

    fn handle_grading_input(&mut self, code: KeyCode, rating: u8) -> io::Result<()> {
        match code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.set_status_message("Grading cancelled".to_string());
            }
            KeyCode::Char(c @ '0'..='3') => {
                self.mode = Mode::Grading { rating: c as u8 - b'0' };
            }
            KeyCode::Up => {
                self.mode = Mode::Grading { rating: rating.saturating_sub(1) };
            }
            KeyCode::Down => {
                self.mode = Mode::Grading { rating: (rating + 1).min(3) };
            }
            KeyCode::Enter => {
                self.confirm_grading(rating)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_renewal_input(&mut self, code: KeyCode, task_id: u64) -> io::Result<()> {
        let accept = match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => true,
            KeyCode::Char('n') | KeyCode::Char('N') => false,
            KeyCode::Esc => {
                // Leaving the prompt keeps the task frozen until decided.
                self.mode = Mode::Normal;
                self.set_status_message(
                    "Renewal left pending; press r on the task to decide".to_string(),
                );
                return Ok(());
            }
            _ => return Ok(()),
        };

        let Some(actor) = self.acting_user.clone() else {
            self.mode = Mode::Normal;
            self.set_status_message("Pass --user to act on renewals".to_string());
            return Ok(());
        };
        let Some(building_id) = self.state.locate_task(task_id).map(|(b, _)| b) else {
            self.mode = Mode::Normal;
            return Ok(());
        };

        let now = Utc::now().timestamp();
        match settlement::resolve_renewal(&mut self.state, building_id, task_id, accept, &actor, now)
        {
            Ok(Status::Backlog) => {
                self.save_state()?;
                self.set_status_message(format!("Task #{task_id} renewed, back to the backlog"));
            }
            Ok(_) => {
                self.save_state()?;
                self.set_status_message(format!("Task #{task_id} closed permanently"));
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
        self.mode = Mode::Normal;
        Ok(())
    }

    fn start_grading(&mut self) {
        let Some(task_id) = self.selected_task_id() else {
            return;
        };
        let Some(task) = self.task(task_id) else {
            return;
        };
        if task.status != Status::Review {
            self.set_status_message("Only review tasks can be graded".to_string());
            return;
        }
        if self.acting_user.is_none() {
            self.set_status_message("Pass --user to grade tasks".to_string());
            return;
        }
        self.mode = Mode::Grading { rating: 1 };
    }

    fn start_renewal(&mut self) {
        let Some(task_id) = self.selected_task_id() else {
            return;
        };
        let Some(task) = self.task(task_id) else {
            return;
        };
        if task.pending_renewal.is_none() {
            self.set_status_message("Task is not awaiting a renewal decision".to_string());
            return;
        }
        self.mode = Mode::Renewal { task_id };
    }

    fn confirm_grading(&mut self, rating: u8) -> io::Result<()> {
        self.mode = Mode::Normal;
        let Some(task_id) = self.selected_task_id() else {
            return Ok(());
        };
        let Some(actor) = self.acting_user.clone() else {
            return Ok(());
        };
        let Some(building_id) = self.state.locate_task(task_id).map(|(b, _)| b) else {
            return Ok(());
        };
        let Some(rating) = Rating::from_value(rating) else {
            return Ok(());
        };

        let now = Utc::now().timestamp();
        match settlement::settle(&mut self.state, building_id, task_id, rating, None, &actor, now) {
            Ok(outcome) => {
                self.save_state()?;
                if outcome.renewal_pending.is_some() {
                    self.mode = Mode::Renewal { task_id };
                    self.set_status_message(format!(
                        "Task #{task_id} hit its renewal limit; renew it?"
                    ));
                } else {
                    self.set_status_message(format!(
                        "Settled task #{task_id}: {} pts, {} XP, {} coins",
                        outcome.task_points, outcome.task_xp, outcome.task_coins
                    ));
                }
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
        Ok(())
    }

    /// Move the selected card one column left or right
    fn move_card(&mut self, direction: isize) {
        let target_column = self.selected_column as isize + direction;
        if target_column < 0 || target_column >= self.columns.len() as isize {
            return;
        }
        let target_column = target_column as usize;
        let Some(task_id) = self.selected_task_id() else {
            return;
        };
        let Some(building_id) = self.state.locate_task(task_id).map(|(b, _)| b) else {
            return;
        };
        let target = Status::ALL[target_column];

        match settlement::move_task(&mut self.state, building_id, task_id, target) {
            Ok(()) => {
                if let Err(e) = self.save_state() {
                    self.set_status_message(format!("Error saving: {e}"));
                    return;
                }
                self.set_status_message(format!("Moved task to {}", target.label()));
                self.selected_column = target_column;
                if let Some(position) = self.columns[target_column]
                    .iter()
                    .position(|&id| id == task_id)
                {
                    self.selected_card = position;
                } else {
                    self.clamp_selection();
                }
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    /// Render the kanban board
    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Board
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_board(f, chunks[1]);
        self.render_status_bar(f, chunks[2]);

        if self.show_task_detail {
            self.render_task_detail_popup(f);
        }
        match self.mode {
            Mode::Grading { rating } => self.render_grading_popup(f, rating),
            Mode::Renewal { task_id } => self.render_renewal_popup(f, task_id),
            Mode::Normal => {}
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let scope_display = match self.building_filter.and_then(|id| self.state.building(id)) {
            Some(b) => {
                let scope = Scope::Building(b.id);
                format!(
                    "{} (level {})  Planned: {}  Concluded: {}/{}",
                    b.name,
                    b.level,
                    building::planned_points(&self.state, &scope),
                    building::concluded_points(&self.state, &scope),
                    b.capacity()
                )
            }
            None => format!("All buildings  {}", self.state.sprint_label()),
        };

        let header_text = vec![Line::from(vec![
            Span::styled("CITY BOARD", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                scope_display,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ])];

        let header_block = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header_block, area);
    }

    fn render_board(&mut self, f: &mut Frame, area: Rect) {
        let column_count = self.columns.len();
        let constraints: Vec<Constraint> = (0..column_count)
            .map(|_| Constraint::Percentage(100 / column_count as u16))
            .collect();

        let columns_layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        for (i, &column_area) in columns_layout.iter().enumerate() {
            self.render_column(f, column_area, i);
        }
    }

    fn render_column(&mut self, f: &mut Frame, area: Rect, column_index: usize) {
        let is_selected = column_index == self.selected_column;
        let accent = Self::column_accent(column_index);

        let border_style = if is_selected {
            Style::default().fg(accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let title = format!(
            "{} ({})",
            Status::ALL[column_index].label(),
            self.columns[column_index].len()
        );
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style);

        let inner = block.inner(area);
        f.render_widget(block, area);

        let cards = &self.columns[column_index];
        if cards.is_empty() {
            return;
        }

        let card_height = 5;
        let available_height = inner.height as usize;
        let visible_cards = available_height / card_height;

        let scroll_offset = if is_selected {
            let start_visible = self.column_scroll_offsets[column_index];
            let end_visible = start_visible + visible_cards;

            if self.selected_card < start_visible {
                self.column_scroll_offsets[column_index] = self.selected_card;
                self.selected_card
            } else if self.selected_card >= end_visible && end_visible > 0 {
                let new_offset = self.selected_card - visible_cards + 1;
                self.column_scroll_offsets[column_index] = new_offset;
                new_offset
            } else {
                start_visible
            }
        } else {
            self.column_scroll_offsets[column_index]
        };

        let mut current_y = 0;
        let mut rendered_cards = 0;
        let card_ids: Vec<u64> = cards.iter().copied().collect();

        for (card_index, task_id) in card_ids.iter().enumerate().skip(scroll_offset) {
            if let Some(task) = self.task(*task_id) {
                if current_y + card_height > available_height {
                    break;
                }

                let is_this_card_selected = is_selected && card_index == self.selected_card;

                let card_area = Rect {
                    x: inner.x,
                    y: inner.y + current_y as u16,
                    width: inner.width,
                    height: card_height as u16,
                };

                render_card(f, card_area, task, accent, is_this_card_selected);

                current_y += card_height;
                rendered_cards += 1;
            }
        }

        if scroll_offset > 0 {
            let indicator = Paragraph::new(format!("▲ +{scroll_offset} above"))
                .style(Style::default().fg(Color::Cyan));
            f.render_widget(
                indicator,
                Rect { x: inner.x, y: inner.y, width: inner.width, height: 1 },
            );
        }

        let remaining = cards.len() - scroll_offset - rendered_cards;
        if remaining > 0 {
            let indicator = Paragraph::new(format!("▼ +{remaining} below"))
                .style(Style::default().fg(Color::Cyan));
            f.render_widget(
                indicator,
                Rect {
                    x: inner.x,
                    y: inner.y + inner.height - 1,
                    width: inner.width,
                    height: 1,
                },
            );
        }
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            let total_tasks: usize = self.columns.iter().map(|col| col.len()).sum();
            format!(
                "Tasks: {total_tasks} | Ctrl+←/→: Move | g: Grade | r: Renewal | Enter: Details | h: Help"
            )
        };

        let accent = Self::column_accent(self.selected_column);
        let text_color = match accent {
            GOLD => Color::Rgb(20, 20, 20),
            _ => Color::White,
        };

        let status = Paragraph::new(status_text)
            .style(Style::default().bg(accent).fg(text_color))
            .alignment(Alignment::Left);

        f.render_widget(status, area);
    }

    fn render_task_detail_popup(&self, f: &mut Frame) {
        let Some(task_id) = self.selected_task_id() else {
            return;
        };
        let Some((building_id, task)) = self.state.locate_task(task_id) else {
            return;
        };

        let popup_area = centered_rect(f.area(), 80, 80);
        f.render_widget(Clear, popup_area);

        let base = scoring::base_points(task.size, task.complexity, task.rule_multiplier);
        let mut detail_lines = vec![
            Line::from(vec![Span::styled(
                format!("Task #{}: {}", task.id, task.title),
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(format!("Status:       {}", task.status.label())),
            Line::from(format!("Building:     #{building_id}")),
            Line::from(format!("Squad:        {}", task.squad)),
            Line::from(format!("Rule:         {}", task.rule.kind().label())),
            Line::from(format!(
                "Value:        {} x {} = {base} pts",
                task.size, task.complexity
            )),
            Line::from(format!(
                "Participants: {}",
                task.participants_or_creator().join(", ")
            )),
        ];

        if let Rule::Fixed { limiter } = &task.rule {
            match limiter {
                FixedLimiter::Quantity { limit, count } => {
                    detail_lines.push(Line::from(format!("Cycles:       {count}/{limit}")));
                }
                FixedLimiter::Deadline { deadline_utc, period } => {
                    detail_lines
                        .push(Line::from(format!("Deadline:     {deadline_utc} ({period:?})")));
                }
            }
        }
        if !task.sprint_history.is_empty() {
            detail_lines.push(Line::from(format!(
                "Sprints:      {}",
                task.sprint_history.join(", ")
            )));
        }
        if let Some(s) = &task.settlement {
            detail_lines.push(Line::from(format!(
                "Settled:      rating {} -> {} pts, {} XP, {} coins",
                s.rating, s.final_points, s.final_xp, s.final_coins
            )));
        }
        if !task.history.is_empty() {
            detail_lines.push(Line::from(format!(
                "History:      {} cycle(s), {} pts total",
                task.history.len(),
                task.history_points()
            )));
        }
        detail_lines.push(Line::from(""));
        detail_lines.push(Line::from("Description:"));
        detail_lines.push(Line::from(task.description.as_deref().unwrap_or("-")));

        let popup_block = Block::default()
            .borders(Borders::ALL)
            .title("Task Details (Press Enter to close)")
            .title_alignment(Alignment::Center)
            .border_style(
                Style::default()
                    .fg(Self::column_accent(self.selected_column))
                    .add_modifier(Modifier::BOLD),
            );

        let popup_paragraph = Paragraph::new(detail_lines)
            .block(popup_block)
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(Color::Black));

        f.render_widget(popup_paragraph, popup_area);
    }

    fn render_grading_popup(&self, f: &mut Frame, rating: u8) {
        let popup_area = centered_rect(f.area(), 46, 30);
        f.render_widget(Clear, popup_area);

        let mut lines = vec![
            Line::from("Grade this task:"),
            Line::from(""),
        ];
        for value in 0..=3u8 {
            let label = Rating::from_value(value)
                .map(|r| r.label())
                .unwrap_or("-");
            let marker = if value == rating { ">" } else { " " };
            let multiplier = scoring::rating_multiplier(value);
            let line = format!("{marker} {value}: {label} (x{multiplier})");
            if value == rating {
                lines.push(Line::from(Span::styled(
                    line,
                    Style::default().add_modifier(Modifier::BOLD).fg(GOLD),
                )));
            } else {
                lines.push(Line::from(line));
            }
        }
        lines.push(Line::from(""));
        lines.push(Line::from("0-3/↑↓: pick | Enter: confirm | Esc: cancel"));

        let popup = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Settlement")
                    .title_alignment(Alignment::Center)
                    .border_style(Style::default().fg(DARK_PURPLE).add_modifier(Modifier::BOLD)),
            )
            .style(Style::default().bg(Color::Black));

        f.render_widget(popup, popup_area);
    }

    fn render_renewal_popup(&self, f: &mut Frame, task_id: u64) {
        let popup_area = centered_rect(f.area(), 50, 25);
        f.render_widget(Clear, popup_area);

        let limiter_text = self
            .task(task_id)
            .and_then(|t| match &t.rule {
                Rule::Fixed { limiter: FixedLimiter::Quantity { limit, count } } => {
                    Some(format!("completed {count}/{limit} cycles"))
                }
                Rule::Fixed { limiter: FixedLimiter::Deadline { .. } } => {
                    Some("reached its deadline".to_string())
                }
                _ => None,
            })
            .unwrap_or_default();

        let lines = vec![
            Line::from(format!("Task #{task_id} {limiter_text}.")),
            Line::from(""),
            Line::from("Renew for another run?"),
            Line::from(""),
            Line::from("y: renew (back to backlog) | n: close permanently | Esc: later"),
        ];

        let popup = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Renewal")
                    .title_alignment(Alignment::Center)
                    .border_style(Style::default().fg(GOLD).add_modifier(Modifier::BOLD)),
            )
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(Color::Black));

        f.render_widget(popup, popup_area);
    }

    /// Main event loop
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

/// Render a single task card
fn render_card(f: &mut Frame, area: Rect, task: &Task, accent: Color, is_selected: bool) {
    let style = if is_selected {
        Style::default().bg(accent).fg(Color::Black).add_modifier(Modifier::BOLD)
    } else {
        Style::default().bg(Color::DarkGray)
    };

    let mut card_text = vec![Line::from(format!(
        "#{} · {} pts",
        task.id,
        scoring::estimate_points(task)
    ))];

    // Manually wrap the title (accounting for borders), max 2 lines.
    let available_width = area.width.saturating_sub(2) as usize;
    let mut current_line = String::new();
    let mut lines = Vec::new();
    for word in task.title.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= available_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line.clone());
            current_line = word.to_string();
            if lines.len() >= 2 {
                break;
            }
        }
    }
    if !current_line.is_empty() && lines.len() < 2 {
        lines.push(current_line);
    }
    for line in lines {
        card_text.push(Line::from(line));
    }

    let footer = match &task.rule {
        Rule::Fixed { limiter: FixedLimiter::Quantity { limit, count } } => {
            format!("Fixed {count}/{limit}x | {}", task.squad)
        }
        Rule::Fixed { limiter: FixedLimiter::Deadline { .. } } => {
            format!("Fixed (deadline) | {}", task.squad)
        }
        rule => format!("{} | {}", rule.kind().label(), task.squad),
    };
    card_text.push(Line::from(footer));

    let card_block = Paragraph::new(card_text)
        .block(Block::default().borders(Borders::ALL))
        .style(style)
        .wrap(Wrap { trim: true });

    f.render_widget(card_block, area);
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_width = (area.width * percent_x) / 100;
    let popup_height = (area.height * percent_y) / 100;
    let x = (area.width.saturating_sub(popup_width)) / 2;
    let y = (area.height.saturating_sub(popup_height)) / 2;
    Rect::new(x, y, popup_width, popup_height)
}

/// Initialise and run the board terminal user interface.
pub fn run_board(
    state_path: &Path,
    building_filter: Option<u64>,
    acting_user: Option<String>,
) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = BoardApp::new(state_path, building_filter, acting_user)?;
    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}
