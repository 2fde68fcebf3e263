//! Interaction handler
//!
//! Turns pointer drags, touch swipes, wheel ticks and key presses into
//! navigation commands. Host toolkits translate their native events into
//! [`ViewerInput`] first.

use log::debug;

use crate::layout::{PageElement, ViewMode};
use crate::navigation::{Command, ViewerState};

/// Keys the viewer reacts to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewerKey {
    Left,
    Right,
    Plus,
    Minus,
    Home,
    End,
    Other,
}

/// Input events in container coordinates (logical pixels)
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewerInput {
    PointerDown { x: f32 },
    PointerMove { x: f32 },
    PointerUp,
    TouchStart { x: f32 },
    TouchMove { x: f32 },
    TouchEnd,
    Wheel { delta_x: f32, delta_y: f32 },
    Key(ViewerKey),
    /// The host scrolled the page strip natively
    Scrolled,
}

/// What the viewer should do in response to an input
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputAction {
    Navigate(Command),
    /// Move the strip to this scroll offset
    ScrollTo(f32),
    /// Re-detect the most visible page
    DetectPage,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputResponse {
    pub actions: Vec<InputAction>,
    /// The host's default handling must be suppressed
    pub handled: bool,
}

impl InputResponse {
    fn handled(actions: Vec<InputAction>) -> Self {
        Self {
            actions,
            handled: true,
        }
    }

    fn unhandled() -> Self {
        Self::default()
    }

    fn observe(action: InputAction) -> Self {
        Self {
            actions: vec![action],
            handled: false,
        }
    }
}

/// Gesture tracking that outlives a single event
#[derive(Debug)]
pub struct InteractionHandler {
    swipe_threshold: f32,
    touch_reference: Option<f32>,
}

impl InteractionHandler {
    #[must_use]
    pub fn new(swipe_threshold: f32) -> Self {
        Self {
            swipe_threshold,
            touch_reference: None,
        }
    }

    /// Translate one input. Only the drag fields of `state` are touched here;
    /// everything else comes back as actions.
    pub fn handle(&mut self, input: ViewerInput, state: &mut ViewerState) -> InputResponse {
        match input {
            ViewerInput::PointerDown { x } => {
                if state.mode != ViewMode::Book {
                    return InputResponse::unhandled();
                }
                state.is_dragging = true;
                state.drag_origin = x;
                state.drag_start_scroll_offset = state.scroll_offset;
                InputResponse::handled(vec![])
            }

            ViewerInput::PointerMove { x } => {
                if !state.is_dragging || state.mode != ViewMode::Book {
                    return InputResponse::unhandled();
                }
                let offset = state.drag_start_scroll_offset - (x - state.drag_origin);
                InputResponse::handled(vec![InputAction::ScrollTo(offset)])
            }

            ViewerInput::PointerUp => {
                let was_dragging = state.is_dragging;
                state.is_dragging = false;
                InputResponse {
                    actions: vec![],
                    handled: was_dragging,
                }
            }

            ViewerInput::TouchStart { x } => {
                self.touch_reference = Some(x);
                InputResponse::unhandled()
            }

            ViewerInput::TouchMove { x } => self.handle_swipe(x, state),

            ViewerInput::TouchEnd => {
                self.touch_reference = None;
                InputResponse::unhandled()
            }

            ViewerInput::Wheel { delta_x, delta_y } => {
                if state.mode != ViewMode::Book || !state.is_loaded() {
                    // Scroll mode keeps native scrolling
                    return InputResponse::unhandled();
                }
                let delta = if delta_y.abs() >= delta_x.abs() {
                    delta_y
                } else {
                    delta_x
                };
                let command = if delta > 0.0 {
                    Some(Command::NextPage)
                } else if delta < 0.0 {
                    Some(Command::PrevPage)
                } else {
                    None
                };
                InputResponse::handled(command.map(InputAction::Navigate).into_iter().collect())
            }

            ViewerInput::Key(key) => {
                if !state.is_loaded() {
                    return InputResponse::unhandled();
                }
                let command = match key {
                    ViewerKey::Left => Command::PrevPage,
                    ViewerKey::Right => Command::NextPage,
                    ViewerKey::Plus => Command::ZoomIn,
                    ViewerKey::Minus => Command::ZoomOut,
                    ViewerKey::Home => Command::FirstPage,
                    ViewerKey::End => Command::LastPage,
                    ViewerKey::Other => return InputResponse::unhandled(),
                };
                InputResponse::handled(vec![InputAction::Navigate(command)])
            }

            ViewerInput::Scrolled => {
                if state.mode == ViewMode::Scroll {
                    InputResponse::observe(InputAction::DetectPage)
                } else {
                    InputResponse::unhandled()
                }
            }
        }
    }

    fn handle_swipe(&mut self, x: f32, state: &ViewerState) -> InputResponse {
        let Some(reference) = self.touch_reference else {
            return InputResponse::unhandled();
        };
        if !state.is_loaded() {
            return InputResponse::unhandled();
        }

        let delta = x - reference;
        if delta.abs() <= self.swipe_threshold {
            return InputResponse::unhandled();
        }

        // Restart from here so one long swipe can turn several pages
        self.touch_reference = Some(x);
        let command = if delta < 0.0 {
            Command::NextPage
        } else {
            Command::PrevPage
        };
        debug!("Swipe of {delta}px -> {command:?}");
        InputResponse::handled(vec![InputAction::Navigate(command)])
    }
}

/// Page whose element shows the most width inside the scroll window.
///
/// Ties go to the lower page number. None when nothing is visible.
#[must_use]
pub fn most_visible_page(elements: &[PageElement], scroll_offset: f32, width: f32) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    let mut ordered: Vec<&PageElement> = elements.iter().collect();
    ordered.sort_by_key(|e| e.page);

    for element in ordered {
        let visible = element.visible_width(scroll_offset, width);
        if visible <= 0.0 {
            continue;
        }
        match best {
            Some((_, best_visible)) if visible <= best_visible => {}
            _ => best = Some((element.page, visible)),
        }
    }

    best.map(|(page, _)| page)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(mode: ViewMode) -> ViewerState {
        ViewerState {
            mode,
            current_page: 1,
            total_pages: 10,
            container_width: 500.0,
            ..ViewerState::default()
        }
    }

    fn navigations(response: &InputResponse) -> Vec<Command> {
        response
            .actions
            .iter()
            .filter_map(|a| match a {
                InputAction::Navigate(cmd) => Some(*cmd),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn drag_moves_scroll_against_pointer() {
        let mut handler = InteractionHandler::new(50.0);
        let mut state = state(ViewMode::Book);
        state.scroll_offset = 100.0;

        handler.handle(ViewerInput::PointerDown { x: 200.0 }, &mut state);
        assert!(state.is_dragging);
        assert_eq!(state.drag_origin, 200.0);
        assert_eq!(state.drag_start_scroll_offset, 100.0);

        let response = handler.handle(ViewerInput::PointerMove { x: 170.0 }, &mut state);
        assert_eq!(response.actions, vec![InputAction::ScrollTo(130.0)]);

        let response = handler.handle(ViewerInput::PointerMove { x: 260.0 }, &mut state);
        assert_eq!(response.actions, vec![InputAction::ScrollTo(40.0)]);

        handler.handle(ViewerInput::PointerUp, &mut state);
        assert!(!state.is_dragging);
        let response = handler.handle(ViewerInput::PointerMove { x: 0.0 }, &mut state);
        assert!(response.actions.is_empty());
    }

    #[test]
    fn drag_is_ignored_in_scroll_mode() {
        let mut handler = InteractionHandler::new(50.0);
        let mut state = state(ViewMode::Scroll);

        let response = handler.handle(ViewerInput::PointerDown { x: 10.0 }, &mut state);
        assert!(!response.handled);
        assert!(!state.is_dragging);
    }

    #[test]
    fn swipe_turns_once_per_threshold() {
        let mut handler = InteractionHandler::new(50.0);
        let mut state = state(ViewMode::Book);

        handler.handle(ViewerInput::TouchStart { x: 300.0 }, &mut state);
        let r = handler.handle(ViewerInput::TouchMove { x: 270.0 }, &mut state);
        assert!(navigations(&r).is_empty());

        let r = handler.handle(ViewerInput::TouchMove { x: 240.0 }, &mut state);
        assert_eq!(navigations(&r), vec![Command::NextPage]);

        // Reference moved to 240, so another 60px turns again
        let r = handler.handle(ViewerInput::TouchMove { x: 200.0 }, &mut state);
        assert!(navigations(&r).is_empty());
        let r = handler.handle(ViewerInput::TouchMove { x: 180.0 }, &mut state);
        assert_eq!(navigations(&r), vec![Command::NextPage]);
    }

    #[test]
    fn rightward_swipe_goes_back() {
        let mut handler = InteractionHandler::new(50.0);
        let mut state = state(ViewMode::Book);

        handler.handle(ViewerInput::TouchStart { x: 0.0 }, &mut state);
        let r = handler.handle(ViewerInput::TouchMove { x: 60.0 }, &mut state);
        assert_eq!(navigations(&r), vec![Command::PrevPage]);

        handler.handle(ViewerInput::TouchEnd, &mut state);
        let r = handler.handle(ViewerInput::TouchMove { x: 200.0 }, &mut state);
        assert!(navigations(&r).is_empty());
    }

    #[test]
    fn wheel_turns_pages_only_in_book_mode() {
        let mut handler = InteractionHandler::new(50.0);

        let mut book = state(ViewMode::Book);
        let r = handler.handle(
            ViewerInput::Wheel {
                delta_x: 0.0,
                delta_y: 3.0,
            },
            &mut book,
        );
        assert!(r.handled);
        assert_eq!(navigations(&r), vec![Command::NextPage]);

        let r = handler.handle(
            ViewerInput::Wheel {
                delta_x: -4.0,
                delta_y: 1.0,
            },
            &mut book,
        );
        assert_eq!(navigations(&r), vec![Command::PrevPage]);

        let mut scroll = state(ViewMode::Scroll);
        let r = handler.handle(
            ViewerInput::Wheel {
                delta_x: 0.0,
                delta_y: 3.0,
            },
            &mut scroll,
        );
        assert!(!r.handled);
        assert!(r.actions.is_empty());
    }

    #[test]
    fn keys_map_to_commands_when_loaded() {
        let mut handler = InteractionHandler::new(50.0);
        let mut state = state(ViewMode::Scroll);

        let cases = [
            (ViewerKey::Left, Command::PrevPage),
            (ViewerKey::Right, Command::NextPage),
            (ViewerKey::Plus, Command::ZoomIn),
            (ViewerKey::Minus, Command::ZoomOut),
            (ViewerKey::Home, Command::FirstPage),
            (ViewerKey::End, Command::LastPage),
        ];
        for (key, expected) in cases {
            let r = handler.handle(ViewerInput::Key(key), &mut state);
            assert!(r.handled);
            assert_eq!(navigations(&r), vec![expected]);
        }

        let r = handler.handle(ViewerInput::Key(ViewerKey::Other), &mut state);
        assert!(!r.handled);

        let mut empty = ViewerState::default();
        let r = handler.handle(ViewerInput::Key(ViewerKey::Right), &mut empty);
        assert!(!r.handled);
        assert!(r.actions.is_empty());
    }

    fn element(page: usize, x: f32, width: f32) -> PageElement {
        PageElement {
            page,
            x,
            width,
            height: 100.0,
        }
    }

    #[test]
    fn most_visible_picks_largest_overlap() {
        let elements = [
            element(3, 0.0, 100.0),
            element(4, 110.0, 100.0),
            element(5, 220.0, 100.0),
        ];
        assert_eq!(most_visible_page(&elements, 0.0, 150.0), Some(3));
        assert_eq!(most_visible_page(&elements, 90.0, 150.0), Some(4));
        assert_eq!(most_visible_page(&elements, 200.0, 150.0), Some(5));
        assert_eq!(most_visible_page(&elements, 1000.0, 150.0), None);
    }

    #[test]
    fn exact_tie_goes_to_lower_page() {
        let elements = [element(2, 100.0, 100.0), element(1, 0.0, 100.0)];
        // Window [50, 150) shows 50px of each
        assert_eq!(most_visible_page(&elements, 50.0, 100.0), Some(1));
    }

    #[test]
    fn scroll_event_detects_only_in_scroll_mode() {
        let mut handler = InteractionHandler::new(50.0);
        let r = handler.handle(ViewerInput::Scrolled, &mut state(ViewMode::Scroll));
        assert_eq!(r.actions, vec![InputAction::DetectPage]);
        assert!(!r.handled);

        let r = handler.handle(ViewerInput::Scrolled, &mut state(ViewMode::Book));
        assert!(r.actions.is_empty());
    }
}
