//! Terminal remote picker.

use std::fmt;
use std::io::{self, Stderr};
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

use crate::app::selector::{
    ItemButton, PickRequest, Picker, PickerEntry, PickerEvent, PickerSession,
};
use crate::infra::config::Keybindings;

/// A single key chord such as `enter` or `ctrl+d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    code: KeyCode,
    modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn matches(&self, key: &KeyEvent) -> bool {
        let modifiers = key.modifiers & (KeyModifiers::CONTROL | KeyModifiers::ALT);
        key.code == self.code && modifiers == self.modifiers
    }
}

impl FromStr for KeyBinding {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let mut modifiers = KeyModifiers::NONE;
        let mut code = None;
        for part in value.split('+').map(str::trim) {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
                "alt" => modifiers |= KeyModifiers::ALT,
                "enter" | "return" => code = Some(KeyCode::Enter),
                "esc" | "escape" => code = Some(KeyCode::Esc),
                "tab" => code = Some(KeyCode::Tab),
                "space" => code = Some(KeyCode::Char(' ')),
                "up" => code = Some(KeyCode::Up),
                "down" => code = Some(KeyCode::Down),
                key if key.chars().count() == 1 => code = key.chars().next().map(KeyCode::Char),
                _ => return Err(anyhow!("unrecognised key `{part}` in binding `{value}`")),
            }
        }
        let code = code.with_context(|| format!("key binding `{value}` has no key"))?;
        Ok(Self { code, modifiers })
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("ctrl+")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("alt+")?;
        }
        match self.code {
            KeyCode::Enter => f.write_str("enter"),
            KeyCode::Esc => f.write_str("esc"),
            KeyCode::Tab => f.write_str("tab"),
            KeyCode::Up => f.write_str("up"),
            KeyCode::Down => f.write_str("down"),
            KeyCode::Char(' ') => f.write_str("space"),
            KeyCode::Char(ch) => write!(f, "{ch}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Picker key map built from the `[keybindings]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickerKeys {
    pub up: KeyBinding,
    pub down: KeyBinding,
    pub accept: KeyBinding,
    pub dismiss: KeyBinding,
    pub set_default: KeyBinding,
}

impl PickerKeys {
    pub fn from_config(bindings: &Keybindings) -> Result<Self> {
        let parse = |name: &str, value: &str| {
            value
                .parse::<KeyBinding>()
                .with_context(|| format!("invalid `{name}` key binding"))
        };
        Ok(Self {
            up: parse("up", &bindings.up)?,
            down: parse("down", &bindings.down)?,
            accept: parse("accept", &bindings.accept)?,
            dismiss: parse("dismiss", &bindings.dismiss)?,
            set_default: parse("set_default", &bindings.set_default)?,
        })
    }
}

/// Cursor over the presented entries.
#[derive(Debug, Clone, Default)]
pub struct PickerState {
    entries: Vec<PickerEntry>,
    selected: usize,
}

impl PickerState {
    pub fn new(entries: Vec<PickerEntry>) -> Self {
        Self {
            entries,
            selected: 0,
        }
    }

    pub fn entries(&self) -> &[PickerEntry] {
        &self.entries
    }

    /// Index of the highlighted entry, if the list is not empty.
    pub fn active(&self) -> Option<usize> {
        (!self.entries.is_empty()).then_some(self.selected)
    }

    pub fn move_by(&mut self, delta: isize) {
        let len = self.entries.len();
        if len == 0 {
            return;
        }
        self.selected = (self.selected as isize + delta).rem_euclid(len as isize) as usize;
    }

    /// Translate a key press into a picker event. Navigation keys return `None`.
    pub fn handle_key(&mut self, key: &KeyEvent, keys: &PickerKeys) -> Option<PickerEvent> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(PickerEvent::Dismissed);
        }
        if keys.dismiss.matches(key) {
            return Some(PickerEvent::Dismissed);
        }
        if keys.accept.matches(key) {
            return Some(PickerEvent::Accepted {
                active: self.active(),
            });
        }
        if keys.set_default.matches(key) {
            let index = self.active()?;
            let has_button = self.entries[index]
                .buttons
                .contains(&ItemButton::SetDefault);
            return has_button.then_some(PickerEvent::ButtonTriggered {
                index,
                button: ItemButton::SetDefault,
            });
        }
        if keys.up.matches(key) || key.code == KeyCode::Up {
            self.move_by(-1);
        } else if keys.down.matches(key) || key.code == KeyCode::Down {
            self.move_by(1);
        }
        None
    }
}

/// Draw the picker into `area`.
pub fn render_picker(
    frame: &mut Frame<'_>,
    area: Rect,
    title: &str,
    placeholder: &str,
    state: &PickerState,
    keys: &PickerKeys,
) {
    let block = Block::default()
        .title(title.to_owned())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let prompt = Paragraph::new(placeholder.to_owned()).style(Style::default().fg(Color::Gray));
    frame.render_widget(prompt, layout[0]);

    let items: Vec<ListItem> = state
        .entries()
        .iter()
        .map(|entry| {
            let mut head = vec![Span::styled(
                entry.label.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )];
            if let Some(description) = &entry.description {
                head.push(Span::raw("  "));
                head.push(Span::styled(
                    description.clone(),
                    Style::default().fg(Color::Yellow),
                ));
            }
            if entry.buttons.contains(&ItemButton::SetDefault) {
                head.push(Span::styled(
                    format!("  [{} set default]", keys.set_default),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            let mut lines = vec![Line::from(head)];
            if let Some(detail) = &entry.detail {
                lines.push(Line::from(Span::styled(
                    format!("  {detail}"),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("> ");
    let mut list_state = ListState::default().with_selected(state.active());
    frame.render_stateful_widget(list, layout[1], &mut list_state);

    let hints = Paragraph::new(format!(
        "{}/{} move  {} accept  {} cancel",
        keys.up, keys.down, keys.accept, keys.dismiss
    ))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(hints, layout[2]);
}

/// Interactive picker drawn on stderr so stdout stays free for URLs.
pub struct TerminalPicker {
    keys: PickerKeys,
}

impl TerminalPicker {
    pub fn new(keys: PickerKeys) -> Self {
        Self { keys }
    }
}

impl Picker for TerminalPicker {
    fn present(&mut self, request: PickRequest<'_>) -> Result<Box<dyn PickerSession + '_>> {
        let terminal = TerminalGuard::enter()?;
        Ok(Box::new(TerminalSession {
            terminal,
            title: request.title.to_owned(),
            placeholder: request.placeholder.to_owned(),
            state: PickerState::new(request.entries.to_vec()),
            keys: &self.keys,
        }))
    }
}

struct TerminalSession<'a> {
    terminal: TerminalGuard,
    title: String,
    placeholder: String,
    state: PickerState,
    keys: &'a PickerKeys,
}

impl PickerSession for TerminalSession<'_> {
    fn next_event(&mut self) -> Result<PickerEvent> {
        loop {
            let (title, placeholder, state, keys) =
                (&self.title, &self.placeholder, &self.state, self.keys);
            self.terminal
                .terminal
                .draw(|frame| {
                    let area = frame.size();
                    render_picker(frame, area, title, placeholder, state, keys);
                })
                .context("failed to draw picker")?;

            if let Event::Key(key) = event::read().context("failed to read terminal event")?
                && key.kind == KeyEventKind::Press
                && let Some(event) = self.state.handle_key(&key, self.keys)
            {
                return Ok(event);
            }
        }
    }
}

/// Raw-mode alternate screen that is restored when dropped.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stderr>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stderr = io::stderr();
        if let Err(err) = execute!(stderr, EnterAlternateScreen) {
            disable_raw_mode().ok();
            return Err(err).context("failed to enter alternate screen");
        }
        let terminal = match Terminal::new(CrosstermBackend::new(stderr)) {
            Ok(terminal) => terminal,
            Err(err) => {
                disable_raw_mode().ok();
                let _ = execute!(io::stderr(), LeaveAlternateScreen);
                return Err(err).context("failed to initialize terminal");
            }
        };
        let mut guard = Self { terminal };
        guard.terminal.hide_cursor().ok();
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        disable_raw_mode().ok();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}
