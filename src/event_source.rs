use anyhow::Result;
pub use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use std::time::Duration;

use crate::interaction::{ViewerInput, ViewerKey};

/// Logical pixels covered by one terminal cell
pub const CELL_WIDTH_PX: f32 = 8.0;
pub const CELL_HEIGHT_PX: f32 = 16.0;

/// Trait for abstracting event sources to enable testing
pub trait EventSource {
    /// Poll for events with a timeout
    fn poll(&mut self, timeout: Duration) -> Result<bool>;

    /// Read the next event
    fn read(&mut self) -> Result<Event>;
}

/// Keyboard, mouse and resize events from the real terminal
pub struct TerminalEventSource;

impl EventSource for TerminalEventSource {
    fn poll(&mut self, timeout: Duration) -> Result<bool> {
        Ok(crossterm::event::poll(timeout)?)
    }

    fn read(&mut self) -> Result<Event> {
        Ok(crossterm::event::read()?)
    }
}

/// Simulated event source for testing
pub struct SimulatedEventSource {
    pub(crate) events: Vec<Event>,
    current_index: usize,
}

impl SimulatedEventSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            current_index: 0,
        }
    }

    /// Helper method to create a key event
    pub fn key_event(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: crossterm::event::KeyEventState::empty(),
        })
    }

    /// Helper method to create a simple character key event
    pub fn char_key(c: char) -> Event {
        Self::key_event(KeyCode::Char(c), KeyModifiers::empty())
    }

    pub fn key(code: KeyCode) -> Event {
        Self::key_event(code, KeyModifiers::empty())
    }

    /// Mouse event at a cell position
    pub fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::empty(),
        })
    }

    pub fn resize(columns: u16, rows: u16) -> Event {
        Event::Resize(columns, rows)
    }
}

impl EventSource for SimulatedEventSource {
    fn poll(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(self.current_index < self.events.len())
    }

    fn read(&mut self) -> Result<Event> {
        if self.current_index < self.events.len() {
            let event = self.events[self.current_index].clone();
            self.current_index += 1;
            Ok(event)
        } else {
            // Return a quit event if we've exhausted all events
            Ok(SimulatedEventSource::char_key('q'))
        }
    }
}

/// Translate a terminal event into viewer input.
///
/// `origin_column` is the left edge of the page area; pointer positions
/// are reported relative to it. Host commands (quit, mode toggle, refresh)
/// are not viewer input and map to None, as do releases and repeats.
pub fn to_viewer_input(event: &Event, origin_column: u16) -> Option<ViewerInput> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            let viewer_key = match key.code {
                KeyCode::Left => ViewerKey::Left,
                KeyCode::Right => ViewerKey::Right,
                KeyCode::Home => ViewerKey::Home,
                KeyCode::End => ViewerKey::End,
                KeyCode::Char('+' | '=') => ViewerKey::Plus,
                KeyCode::Char('-') => ViewerKey::Minus,
                _ => ViewerKey::Other,
            };
            Some(ViewerInput::Key(viewer_key))
        }
        Event::Mouse(mouse) => {
            let x = f32::from(mouse.column.saturating_sub(origin_column)) * CELL_WIDTH_PX;
            match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => Some(ViewerInput::PointerDown { x }),
                MouseEventKind::Drag(MouseButton::Left) => Some(ViewerInput::PointerMove { x }),
                MouseEventKind::Up(MouseButton::Left) => Some(ViewerInput::PointerUp),
                MouseEventKind::ScrollDown => Some(ViewerInput::Wheel {
                    delta_x: 0.0,
                    delta_y: CELL_HEIGHT_PX,
                }),
                MouseEventKind::ScrollUp => Some(ViewerInput::Wheel {
                    delta_x: 0.0,
                    delta_y: -CELL_HEIGHT_PX,
                }),
                MouseEventKind::ScrollRight => Some(ViewerInput::Wheel {
                    delta_x: CELL_WIDTH_PX,
                    delta_y: 0.0,
                }),
                MouseEventKind::ScrollLeft => Some(ViewerInput::Wheel {
                    delta_x: -CELL_WIDTH_PX,
                    delta_y: 0.0,
                }),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_event_source() {
        let events = vec![
            SimulatedEventSource::char_key('m'),
            SimulatedEventSource::key(KeyCode::Right),
            SimulatedEventSource::resize(80, 24),
        ];

        let mut source = SimulatedEventSource::new(events);

        // Should have events available
        assert!(source.poll(Duration::from_millis(0)).unwrap());

        if let Event::Key(key) = source.read().unwrap() {
            assert_eq!(key.code, KeyCode::Char('m'));
            assert!(key.modifiers.is_empty());
        }

        if let Event::Key(key) = source.read().unwrap() {
            assert_eq!(key.code, KeyCode::Right);
        }

        assert_eq!(source.read().unwrap(), Event::Resize(80, 24));

        // No more events
        assert!(!source.poll(Duration::from_millis(0)).unwrap());
    }

    #[test]
    fn keys_translate_to_viewer_keys() {
        let cases = [
            (KeyCode::Left, ViewerKey::Left),
            (KeyCode::Right, ViewerKey::Right),
            (KeyCode::Home, ViewerKey::Home),
            (KeyCode::End, ViewerKey::End),
            (KeyCode::Char('+'), ViewerKey::Plus),
            (KeyCode::Char('='), ViewerKey::Plus),
            (KeyCode::Char('-'), ViewerKey::Minus),
            (KeyCode::Char('x'), ViewerKey::Other),
        ];
        for (code, expected) in cases {
            assert_eq!(
                to_viewer_input(&SimulatedEventSource::key(code), 0),
                Some(ViewerInput::Key(expected)),
                "{code:?}"
            );
        }
    }

    #[test]
    fn mouse_positions_are_scaled_to_pixels() {
        let down = SimulatedEventSource::mouse(MouseEventKind::Down(MouseButton::Left), 12, 3);
        assert_eq!(
            to_viewer_input(&down, 2),
            Some(ViewerInput::PointerDown { x: 80.0 })
        );

        let wheel = SimulatedEventSource::mouse(MouseEventKind::ScrollDown, 0, 0);
        assert!(matches!(
            to_viewer_input(&wheel, 0),
            Some(ViewerInput::Wheel { delta_y, .. }) if delta_y > 0.0
        ));

        let moved = SimulatedEventSource::mouse(MouseEventKind::Moved, 5, 5);
        assert_eq!(to_viewer_input(&moved, 0), None);
    }
}
