use crate::client::{
    AppSnapshot,
    Screen,
};
use crate::views::{
    GameMeta,
    GameState,
    Symbol,
    short_address,
};
use color_eyre::eyre::Result;
use crossterm::event::{
    Event,
    KeyCode,
    KeyEventKind,
};
use crossterm::terminal::{
    disable_raw_mode,
    enable_raw_mode,
};
use ethers::types::U256;
use ethers::utils::format_units;
use itertools::Itertools;
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::io::stdout;

pub enum UserEvent {
    Quit,
    Redraw,
    GoHome,
    GoLobby,
    Back,
    OpenGame(u64),
    GotoSubmitted(String),
    Connect,
    Disconnect,
    ConfirmCreate { symbol: Symbol, bet: String },
    JoinGame(u64),
    CancelGame(u64),
    PlayCell { x: usize, y: usize },
}

#[derive(Debug)]
pub struct UiState {
    mode: Mode,
    screen: Screen,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
    // cached lobby rows for selection handling between draws
    lobby_rows: Vec<LobbyRow>,
    selected: usize,
    cursor: (usize, usize),
}

#[derive(Clone, Debug)]
struct LobbyRow {
    id: u64,
    waiting: bool,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            mode: Mode::Normal,
            screen: Screen::Home,
            terminal: None,
            lobby_rows: Vec::new(),
            selected: 0,
            cursor: (1, 1),
        }
    }
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    CreateModal(CreateState),
    GotoModal(String),
    QuitModal,
}

#[derive(Clone, Debug)]
struct CreateState {
    symbol: Symbol,
    bet: String,
}

impl Default for CreateState {
    fn default() -> Self {
        CreateState {
            symbol: Symbol::X,
            bet: String::from("0.01"),
        }
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    // Single persistent Terminal so buffers survive across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    state.screen = snap.screen.clone();
    state.lobby_rows = snap
        .active_games
        .iter()
        .map(|g| LobbyRow {
            id: g.id,
            waiting: g.state == GameState::WaitingForPlayer,
        })
        .collect();
    if !state.lobby_rows.is_empty() {
        state.selected = state.selected.min(state.lobby_rows.len() - 1);
    } else {
        state.selected = 0;
    }
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Translates a raw terminal event into an app action. Returns `None` for
/// events that need no handling at all (releases, unbound keys).
pub fn interpret_event(state: &mut UiState, raw: Event) -> Option<UserEvent> {
    let Event::Key(k) = raw else {
        return Some(UserEvent::Redraw);
    };
    if k.kind != KeyEventKind::Press {
        return None;
    }

    match &mut state.mode {
        Mode::CreateModal(cs) => {
            return Some(match k.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    UserEvent::Redraw
                }
                KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                    cs.symbol = cs.symbol.opposite();
                    UserEvent::Redraw
                }
                KeyCode::Backspace => {
                    cs.bet.pop();
                    UserEvent::Redraw
                }
                KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                    cs.bet.push(c);
                    UserEvent::Redraw
                }
                KeyCode::Enter => {
                    let symbol = cs.symbol;
                    let bet = cs.bet.clone();
                    state.mode = Mode::Normal;
                    UserEvent::ConfirmCreate { symbol, bet }
                }
                _ => return None,
            });
        }
        Mode::GotoModal(buf) => {
            return Some(match k.code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    UserEvent::Redraw
                }
                KeyCode::Backspace => {
                    buf.pop();
                    UserEvent::Redraw
                }
                // any printable input is accepted; validation happens on
                // submit, malformed ids get their own screen
                KeyCode::Char(c) if !c.is_control() => {
                    buf.push(c);
                    UserEvent::Redraw
                }
                KeyCode::Enter => {
                    let raw = buf.clone();
                    state.mode = Mode::Normal;
                    UserEvent::GotoSubmitted(raw)
                }
                _ => return None,
            });
        }
        Mode::QuitModal => {
            return Some(match k.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => UserEvent::Quit,
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    UserEvent::Redraw
                }
                _ => return None,
            });
        }
        Mode::Normal => {}
    }

    // global bindings first, then per-screen
    match k.code {
        KeyCode::Char('q') => {
            state.mode = Mode::QuitModal;
            return Some(UserEvent::Redraw);
        }
        KeyCode::Char('h') => return Some(UserEvent::GoHome),
        KeyCode::Char('l') => return Some(UserEvent::GoLobby),
        KeyCode::Char('c') => return Some(UserEvent::Connect),
        KeyCode::Char('d') => return Some(UserEvent::Disconnect),
        KeyCode::Char('g') => {
            state.mode = Mode::GotoModal(String::new());
            return Some(UserEvent::Redraw);
        }
        KeyCode::Esc => return Some(UserEvent::Back),
        _ => {}
    }

    match state.screen {
        Screen::Lobby => match k.code {
            KeyCode::Up => {
                state.selected = state.selected.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down => {
                let max = state.lobby_rows.len().saturating_sub(1);
                state.selected = (state.selected + 1).min(max);
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => state
                .lobby_rows
                .get(state.selected)
                .map(|row| UserEvent::OpenGame(row.id)),
            KeyCode::Char('n') => {
                state.mode = Mode::CreateModal(CreateState::default());
                Some(UserEvent::Redraw)
            }
            KeyCode::Char('j') => state
                .lobby_rows
                .get(state.selected)
                .filter(|row| row.waiting)
                .map(|row| UserEvent::JoinGame(row.id)),
            KeyCode::Char('x') => state
                .lobby_rows
                .get(state.selected)
                .filter(|row| row.waiting)
                .map(|row| UserEvent::CancelGame(row.id)),
            _ => None,
        },
        Screen::Game { .. } => match k.code {
            KeyCode::Up => {
                state.cursor.1 = state.cursor.1.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down => {
                state.cursor.1 = (state.cursor.1 + 1).min(2);
                Some(UserEvent::Redraw)
            }
            KeyCode::Left => {
                state.cursor.0 = state.cursor.0.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Right => {
                state.cursor.0 = (state.cursor.0 + 1).min(2);
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter | KeyCode::Char(' ') => Some(UserEvent::PlayCell {
                x: state.cursor.0,
                y: state.cursor.1,
            }),
            _ => None,
        },
        Screen::Home | Screen::InvalidGameId { .. } => None,
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),  // status
            Constraint::Min(14),    // main panel
            Constraint::Length(7),  // errors
            Constraint::Length(3),  // help
        ])
        .split(f.area());

    draw_top(f, chunks[0], snap);
    match &snap.screen {
        Screen::Home => draw_home(f, chunks[1], snap),
        Screen::Lobby => draw_lobby(f, state, chunks[1], snap),
        Screen::Game { .. } => draw_game(f, state, chunks[1], snap),
        Screen::InvalidGameId { raw } => draw_invalid_game(f, chunks[1], raw),
    }
    draw_errors(f, chunks[2], snap);
    draw_help(f, chunks[3], snap);
    draw_modals(f, state);
}

fn draw_top(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let wallet = match snap.address {
        Some(addr) => short_address(addr),
        None => String::from("not connected"),
    };
    let pending = if snap.tx_pending { " | tx pending…" } else { "" };
    let header = Paragraph::new(format!(
        "Chain: {} (id {}) | Wallet: {}{}\n{}",
        snap.chain_name, snap.chain_id, wallet, pending, snap.status
    ))
    .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(header, area);
}

fn draw_home(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let connectors = if snap.connectors.is_empty() {
        String::from("none found")
    } else {
        snap.connectors.iter().join(", ")
    };
    let lines = vec![
        Line::from("Tic-tac-toe, settled on chain."),
        Line::from(""),
        Line::from(format!("Available wallets: {connectors}")),
        Line::from(""),
        Line::from("Press 'l' to browse open games, 'c' to connect a wallet."),
    ];
    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Home"));
    f.render_widget(p, area);
}

// "0.010000000000000000" reads poorly in a table; trim to "0.01"
fn fmt_eth(wei: U256) -> String {
    let full = format_units(wei, "ether").unwrap_or_else(|_| wei.to_string());
    if full.contains('.') {
        let trimmed = full.trim_end_matches('0').trim_end_matches('.');
        if trimmed.is_empty() {
            String::from("0")
        } else {
            trimmed.to_string()
        }
    } else {
        full
    }
}

fn lobby_line(g: &GameMeta, selected: bool) -> Line<'static> {
    let cursor = if selected { ">" } else { " " };
    let text = format!(
        "{} #{:<4} {:<18} creator {} | bet {} ETH",
        cursor,
        g.id,
        g.state.label(),
        short_address(g.creator),
        fmt_eth(g.bet),
    );
    if selected {
        Line::styled(text, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    } else {
        Line::from(text)
    }
}

fn draw_lobby(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let mut open_lines = Vec::new();
    if snap.active_games.is_empty() {
        open_lines.push(Line::styled(
            "No open games. Press 'n' to create one.",
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        for (i, g) in snap.active_games.iter().enumerate() {
            open_lines.push(lobby_line(g, i == state.selected));
        }
    }
    let open = Paragraph::new(open_lines)
        .block(Block::default().borders(Borders::ALL).title("Open Games"));
    f.render_widget(open, halves[0]);

    let mut done_lines = Vec::new();
    if snap.finished_games.is_empty() {
        done_lines.push(Line::styled("None", Style::default().fg(Color::DarkGray)));
    } else {
        for g in &snap.finished_games {
            let outcome = if g.winner.is_zero() {
                String::from("draw")
            } else {
                format!("won by {}", short_address(g.winner))
            };
            done_lines.push(Line::from(format!(
                "  #{:<4} {:<10} {} | bet {} ETH",
                g.id,
                g.state.label(),
                outcome,
                fmt_eth(g.bet),
            )));
        }
    }
    let done = Paragraph::new(done_lines)
        .block(Block::default().borders(Borders::ALL).title("Finished"));
    f.render_widget(done, halves[1]);
}

fn draw_game(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let Some(view) = snap.game.as_ref() else {
        return;
    };
    if let Some(err) = &view.error {
        let p = Paragraph::new(err.as_str())
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL).title(format!("Game #{}", view.id)));
        f.render_widget(p, area);
        return;
    }
    let Some(meta) = view.meta.as_ref() else {
        let p = Paragraph::new("Loading…")
            .block(Block::default().borders(Borders::ALL).title(format!("Game #{}", view.id)));
        f.render_widget(p, area);
        return;
    };

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(31), Constraint::Min(20)])
        .split(area);

    draw_board(f, state, cols[0], view, snap);

    let your_symbol = match view.your_symbol {
        Some(s) => s.label().to_string(),
        None => String::from("spectating"),
    };
    let turn = match meta.turn {
        Some(s) if view.your_turn => format!("{} (you)", s.label()),
        Some(s) => s.label().to_string(),
        None => String::from("-"),
    };
    let mut lines = vec![
        Line::from(format!("State: {}", meta.state.label())),
        Line::from(format!("Bet: {} ETH", fmt_eth(meta.bet))),
        Line::from(format!("Creator:  {}", short_address(meta.creator))),
        Line::from(format!("Opponent: {}", short_address(meta.opponent))),
        Line::from(format!("You play: {your_symbol}")),
        Line::from(format!("Turn: {turn}")),
    ];
    if meta.state == GameState::Finished {
        let outcome = if meta.winner.is_zero() {
            String::from("Draw")
        } else {
            format!("Winner: {}", short_address(meta.winner))
        };
        lines.push(Line::from(""));
        lines.push(Line::styled(outcome, Style::default().fg(Color::Green)));
    }
    let info = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Game #{}", view.id)),
    );
    f.render_widget(info, cols[1]);
}

fn draw_board(
    f: &mut Frame,
    state: &UiState,
    area: Rect,
    view: &crate::client::GameView,
    snap: &AppSnapshot,
) {
    let outer = Block::default().borders(Borders::ALL).title("Board");
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let cell_w = inner.width / 3;
    let cell_h = inner.height / 3;
    for y in 0..3usize {
        for x in 0..3usize {
            let rect = Rect::new(
                inner.x + x as u16 * cell_w,
                inner.y + y as u16 * cell_h,
                cell_w,
                cell_h,
            );
            let under_cursor = state.cursor == (x, y);
            let cell = view.board.cell(x, y);
            let playable =
                crate::views::cell_interactive(cell, view.your_turn, snap.tx_pending);
            let style = if under_cursor && playable {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if under_cursor {
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let block = Block::default().borders(Borders::ALL).style(style);
            let mark = Paragraph::new(cell.label())
                .alignment(Alignment::Center)
                .style(style);
            let text_area = block.inner(rect);
            f.render_widget(block, rect);
            f.render_widget(mark, text_area);
        }
    }
}

fn draw_invalid_game(f: &mut Frame, area: Rect, raw: &str) {
    let lines = vec![
        Line::styled(
            format!("'{raw}' is not a valid game ID."),
            Style::default().fg(Color::Red),
        ),
        Line::from(""),
        Line::from("Press 'l' for the lobby or 'g' to enter another ID."),
    ];
    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Invalid Game"));
    f.render_widget(p, area);
}

fn draw_errors(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut lines: Vec<Line> = Vec::new();
    if snap.errors.is_empty() {
        lines.push(Line::from("No errors"));
    } else {
        for e in &snap.errors {
            lines.push(Line::from(e.clone()));
        }
    }
    let color = if snap.errors.is_empty() {
        Color::DarkGray
    } else {
        Color::Red
    };
    let errors = Paragraph::new(lines)
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL).title("Errors"));
    f.render_widget(errors, area);
}

fn draw_help(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let text = match snap.screen {
        Screen::Lobby => {
            "↑/↓ select | Enter open | n create | j join | x cancel | g go to id | h home | c/d wallet | q quit"
        }
        Screen::Game { .. } => {
            "arrows move | Enter play square | Esc lobby | g go to id | c/d wallet | q quit"
        }
        _ => "l lobby | g go to id | c connect | d disconnect | q quit",
    };
    let help = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_modals(f: &mut Frame, state: &UiState) {
    match &state.mode {
        Mode::CreateModal(cs) => {
            let area = centered_rect(44, 30, f.area());
            let block = Block::default().borders(Borders::ALL).title("Create Game");
            let p = Paragraph::new(format!(
                "Your symbol: {} (←/→ to switch)\nBet: {} ETH\nEnter=create Esc=cancel",
                cs.symbol.label(),
                cs.bet
            ));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::GotoModal(buf) => {
            let area = centered_rect(40, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Go To Game");
            let p = Paragraph::new(format!("Game ID: {buf}\nEnter=open Esc=cancel"));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(40, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
            let p = Paragraph::new("Quit? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}
