use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use log::{debug, info};
use ratatui::{Frame, Terminal, layout::Rect};

use crate::event_source::{EventSource, to_viewer_input};
use crate::interaction::ViewerInput;
use crate::layout::ViewMode;
use crate::ui::{self, ViewerWidget};
use crate::viewer::Viewer;

/// Wheel ticks scroll the strip this many times their pixel delta
const WHEEL_SCROLL_FACTOR: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
}

/// Terminal host around a single viewer
pub struct App {
    pub viewer: Viewer,
}

impl App {
    pub fn new(viewer: Viewer) -> Self {
        Self { viewer }
    }

    pub fn draw(&self, f: &mut Frame) {
        f.render_widget(ViewerWidget::new(&self.viewer), f.area());
    }

    /// Report the terminal size to the viewer as its container
    pub fn handle_resize(&mut self, columns: u16, rows: u16) {
        let area = ui::pages_area(
            Rect::new(0, 0, columns, rows),
            self.viewer.config().show_controls,
        );
        let (width, height) = ui::container_size(area);
        self.viewer.resize(width, height);
    }

    pub fn handle_event(&mut self, event: &Event) -> Option<AppAction> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Some(AppAction::Quit),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Some(AppAction::Quit);
                    }
                    KeyCode::Char('m') => {
                        self.viewer.toggle_view_mode();
                        return None;
                    }
                    KeyCode::Char('r') => {
                        self.viewer.refresh();
                        return None;
                    }
                    _ => {}
                }
            }
            Event::Resize(columns, rows) => {
                self.handle_resize(*columns, *rows);
                return None;
            }
            _ => {}
        }

        let input = to_viewer_input(event, 0)?;
        let handled = self.viewer.handle_input(input);
        if !handled {
            self.native_fallback(input);
        }
        None
    }

    /// What a host does with input the viewer leaves alone
    fn native_fallback(&mut self, input: ViewerInput) {
        if let ViewerInput::Wheel { delta_x, delta_y } = input {
            if self.viewer.state().mode == ViewMode::Scroll {
                let delta = if delta_y.abs() >= delta_x.abs() {
                    delta_y
                } else {
                    delta_x
                };
                self.viewer.scroll_by(delta * WHEEL_SCROLL_FACTOR);
            }
        }
    }
}

pub fn run_app_with_event_source<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();
    let mut first_render = true;

    let size = terminal.size()?;
    app.handle_resize(size.width, size.height);

    loop {
        let mut events_processed = 0;
        let mut should_quit = false;

        while event_source.poll(Duration::from_millis(0))? && events_processed < 50 {
            let event = event_source.read()?;
            events_processed += 1;

            if app.handle_event(&event) == Some(AppAction::Quit) {
                should_quit = true;
                break;
            }
        }

        if should_quit {
            info!("Quit requested");
            return Ok(());
        }

        let mut needs_redraw = events_processed > 0 || first_render;
        first_render = false;

        if last_tick.elapsed() >= tick_rate {
            if app.viewer.poll() {
                debug!("Viewer changed, forcing redraw");
                needs_redraw = true;
            }
            last_tick = Instant::now();
        }

        if needs_redraw {
            terminal.draw(|f| app.draw(f))?;
        }

        // If no events were processed, wait a bit to avoid busy-waiting
        if events_processed == 0 {
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));
            let _ = event_source.poll(timeout);
        }
    }
}
