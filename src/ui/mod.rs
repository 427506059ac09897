use std::io::Write;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use crate::error::ViewerError;
use crate::ui::surface::WindowSurface;
use crate::viewer::{Action, Exit, Flow, RedrawStep, Viewer, ViewerEvent};

pub mod render;
pub mod surface;

const TITLE: &str = "lazyview";

/// Key binding table. Letters match regardless of shift state.
pub fn action_for_key(key: &Key) -> Option<Action> {
    match key {
        Key::Named(NamedKey::Escape) => Some(Action::Quit),
        Key::Named(NamedKey::ArrowRight | NamedKey::Space) => Some(Action::Next),
        Key::Named(NamedKey::ArrowLeft | NamedKey::Backspace) => Some(Action::Previous),
        Key::Named(NamedKey::Enter) => Some(Action::Commit),
        Key::Character(s) => match s.chars().next()?.to_ascii_lowercase() {
            'q' => Some(Action::Quit),
            't' | 'l' => Some(Action::Next),
            'n' | 'h' => Some(Action::Previous),
            'r' => Some(Action::Reload),
            _ => None,
        },
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Application handler (winit 0.30 style)
// ---------------------------------------------------------------------------

/// Feeds winit events into a `Viewer` and runs one redraw step each time the
/// event queue runs dry.
pub struct App<W> {
    viewer: Viewer<W>,
    initial_size: LogicalSize<u32>,
    surface: Option<WindowSurface>,
    outcome: Option<Result<Exit, ViewerError>>,
}

impl<W: Write> App<W> {
    pub fn new(viewer: Viewer<W>, initial_size: LogicalSize<u32>) -> Self {
        Self {
            viewer,
            initial_size,
            surface: None,
            outcome: None,
        }
    }

    /// How the viewer ended. A loop that stopped on its own counts as closed.
    pub fn into_outcome(self) -> Result<Exit, ViewerError> {
        self.outcome.unwrap_or(Ok(Exit::Closed))
    }

    fn finish(&mut self, event_loop: &ActiveEventLoop, outcome: Result<Exit, ViewerError>) {
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
        }
        event_loop.exit();
    }

    fn dispatch(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if self.viewer.handle_event(event, surface) == Flow::Quit {
            self.finish(event_loop, Ok(Exit::Quit));
        }
    }
}

impl<W: Write> ApplicationHandler for App<W> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() || self.outcome.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(self.initial_size);
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.finish(event_loop, Err(e.into())),
        };
        match WindowSurface::new(Arc::clone(&window)) {
            Ok(surface) => self.surface = Some(surface),
            Err(e) => return self.finish(event_loop, Err(e)),
        }

        let PhysicalSize { width, height } = window.inner_size();
        self.dispatch(event_loop, ViewerEvent::Mapped);
        self.dispatch(event_loop, ViewerEvent::Resized { width, height });
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.outcome.is_some() {
            return;
        }
        let event = match event {
            WindowEvent::CloseRequested => ViewerEvent::Key(Action::Quit),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                ViewerEvent::Resized { width, height }
            }
            WindowEvent::RedrawRequested => ViewerEvent::Exposed,
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match action_for_key(&event.logical_key) {
                    Some(action) => ViewerEvent::Key(action),
                    None => return,
                }
            }
            _ => return,
        };
        self.dispatch(event_loop, event);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.outcome.is_some() {
            return;
        }
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        match self.viewer.redraw_step(surface) {
            Ok(step) => {
                if step == RedrawStep::Opened {
                    let name = self.viewer.state().current_path().display();
                    surface.window().set_title(&format!("{TITLE}: {name}"));
                }
                // Poll drains whatever arrived during open/decode before the
                // next step; Wait blocks until the window system wakes us.
                event_loop.set_control_flow(if step.wants_another_pass() {
                    ControlFlow::Poll
                } else {
                    ControlFlow::Wait
                });
            }
            Err(e) => self.finish(event_loop, Err(e)),
        }
    }
}
