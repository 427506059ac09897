use std::io::Write;
use std::path::Path;

use crate::codec::CodecRegistry;
use crate::entity::ImageEntity;
use crate::error::ViewerError;
use crate::ring::{Direction, NavigationRing};

// ---------------------------------------------------------------------------
// Events and collaborators
// ---------------------------------------------------------------------------

/// What a key press asks the viewer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Next,
    Previous,
    Reload,
    /// Print the current filename.
    Commit,
}

/// Window-system notifications, already stripped of platform detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerEvent {
    Mapped,
    Resized { width: u32, height: u32 },
    Exposed,
    Key(Action),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Outcome of one pass through the redraw pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedrawStep {
    /// Nothing to do.
    Idle,
    /// A file was opened; the pixels still need decoding.
    Opened,
    /// Pixels were decoded; they still need presenting.
    Decoded,
    /// The buffer went to the display and the pending flag is clear.
    Presented,
}

impl RedrawStep {
    /// Opening and decoding hand control back to the event source before the
    /// next step so bursts of resizes are seen before more work is done.
    pub fn wants_another_pass(self) -> bool {
        matches!(self, RedrawStep::Opened | RedrawStep::Decoded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The user asked to quit.
    Quit,
    /// The event source went away.
    Closed,
}

/// A decoded RGB24 picture handed to the display.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
}

/// Where pictures end up.
pub trait DisplaySurface {
    /// Ask the window system to keep the window at this aspect ratio. Returns
    /// the new window size when it was applied on the spot, in which case no
    /// resize notification is guaranteed to follow.
    fn set_aspect_hint(&mut self, width: u32, height: u32) -> Option<(u32, u32)>;

    /// Scale `frame` into a window of the given size and show it.
    fn present(&mut self, frame: Frame<'_>, window_width: u32, window_height: u32);
}

/// Pull-style event feed.
pub trait EventSource {
    /// Block until an event arrives. `None` means the source is closed.
    fn wait_event(&mut self) -> Option<ViewerEvent>;

    /// Whether `wait_event` would return without blocking.
    fn has_pending(&mut self) -> bool;
}

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

/// Frame-to-frame state of the viewer. Only `Viewer` mutates it.
#[derive(Debug)]
pub struct ViewerState {
    ring: NavigationRing,
    image: Option<ImageEntity>,
    direction: Direction,
    window: (u32, u32),
    redraw_pending: bool,
}

impl ViewerState {
    pub fn new(ring: NavigationRing) -> Self {
        Self {
            ring,
            image: None,
            direction: Direction::Forward,
            window: (0, 0),
            redraw_pending: false,
        }
    }

    pub fn current_path(&self) -> &Path {
        self.ring.current()
    }

    pub fn position(&self) -> usize {
        self.ring.position()
    }

    pub fn image(&self) -> Option<&ImageEntity> {
        self.image.as_ref()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.window
    }

    pub fn redraw_pending(&self) -> bool {
        self.redraw_pending
    }

    /// Drop the current image and its pixels and schedule a redraw. This is
    /// the only place an entity is released.
    pub fn invalidate(&mut self) {
        if let Some(image) = self.image.take() {
            log::debug!("Releasing {:?}", image.path());
        }
        self.redraw_pending = true;
    }
}

// ---------------------------------------------------------------------------
// Viewer
// ---------------------------------------------------------------------------

/// The navigation/decode/redraw state machine. Committed filenames go to
/// `commit_out`.
pub struct Viewer<W> {
    state: ViewerState,
    registry: CodecRegistry,
    commit_out: W,
}

impl<W: Write> Viewer<W> {
    pub fn new(ring: NavigationRing, registry: CodecRegistry, commit_out: W) -> Self {
        Self {
            state: ViewerState::new(ring),
            registry,
            commit_out,
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn commit_out(&self) -> &W {
        &self.commit_out
    }

    pub fn redraw_pending(&self) -> bool {
        self.state.redraw_pending
    }

    /// Apply one window-system event. Only `Flow::Quit` stops the viewer.
    pub fn handle_event(&mut self, event: ViewerEvent, display: &mut dyn DisplaySurface) -> Flow {
        match event {
            ViewerEvent::Mapped => {}
            ViewerEvent::Resized { width, height } => {
                if (width, height) != self.state.window {
                    self.state.window = (width, height);
                    self.state.redraw_pending = true;

                    // Window managers may forget the hint across resizes.
                    self.hint_aspect(display);
                }
            }
            ViewerEvent::Exposed => self.state.redraw_pending = true,
            ViewerEvent::Key(action) => return self.apply(action),
        }
        Flow::Continue
    }

    fn apply(&mut self, action: Action) -> Flow {
        match action {
            Action::Quit => return Flow::Quit,
            Action::Next | Action::Previous => {
                self.state.direction = if action == Action::Next {
                    Direction::Forward
                } else {
                    Direction::Backward
                };
                self.state.invalidate();
                let path = self.state.ring.advance(self.state.direction);
                log::debug!("[nav] {:?} -> {:?}", self.state.direction, path);
            }
            Action::Reload => self.state.invalidate(),
            Action::Commit => self.commit(),
        }
        Flow::Continue
    }

    fn hint_aspect(&mut self, display: &mut dyn DisplaySurface) {
        let Some(image) = &self.state.image else {
            return;
        };
        let Some(size) = display.set_aspect_hint(image.width(), image.height()) else {
            return;
        };
        if size != self.state.window {
            log::debug!("Window resized to {}x{} by aspect hint", size.0, size.1);
            self.state.window = size;
            self.state.redraw_pending = true;
        }
    }

    fn commit(&mut self) {
        let path = self.state.ring.current();
        let written = writeln!(self.commit_out, "{}", path.display())
            .and_then(|()| self.commit_out.flush());
        if let Err(e) = written {
            log::error!("Failed to write committed filename: {}", e);
        }
    }

    /// Make sure an image is open, sweeping the ring in the last navigation
    /// direction past files that fail. Coming back to the starting node
    /// without success means nothing in the list is viewable.
    pub fn ensure_open(&mut self) -> Result<(), ViewerError> {
        if self.state.image.is_some() {
            return Ok(());
        }

        let sentinel = self.state.ring.position();
        loop {
            if let Ok(image) = self.registry.open(self.state.ring.current()) {
                self.state.image = Some(image);
                return Ok(());
            }
            self.state.ring.advance(self.state.direction);
            if self.state.ring.position() == sentinel {
                return Err(ViewerError::NoValidImages);
            }
        }
    }

    /// Decode the open image if that has not happened yet. Decode errors are
    /// reported and the partial picture is kept.
    pub fn ensure_decoded(&mut self) {
        if let Some(image) = self.state.image.as_mut() {
            if let Err(e) = image.decode() {
                log::warn!("Read error in '{}': {}", image.path().display(), e);
            }
        }
    }

    /// Advance the redraw pipeline by one step: open, then decode, then
    /// present. Each call does at most one of the three.
    pub fn redraw_step(
        &mut self,
        display: &mut dyn DisplaySurface,
    ) -> Result<RedrawStep, ViewerError> {
        if !self.state.redraw_pending {
            return Ok(RedrawStep::Idle);
        }

        if self.state.image.is_none() {
            self.ensure_open()?;
            self.hint_aspect(display);
            return Ok(RedrawStep::Opened);
        }

        if !self.state.image.as_ref().is_some_and(ImageEntity::is_decoded) {
            self.ensure_decoded();
            return Ok(RedrawStep::Decoded);
        }

        if let Some(image) = &self.state.image {
            let frame = Frame {
                pixels: image.buffer().unwrap_or_default(),
                width: image.width(),
                height: image.height(),
            };
            let (w, h) = self.state.window;
            log::trace!("Presenting {}x{} into {}x{}", frame.width, frame.height, w, h);
            display.present(frame, w, h);
        }
        self.state.redraw_pending = false;
        Ok(RedrawStep::Presented)
    }

    /// Drive the viewer from a pull-style event source until quit, close or a
    /// fatal error. While a redraw is pending every queued event is drained
    /// before the next step; otherwise the loop blocks on the source.
    pub fn run(
        &mut self,
        events: &mut dyn EventSource,
        display: &mut dyn DisplaySurface,
    ) -> Result<Exit, ViewerError> {
        loop {
            loop {
                if self.state.redraw_pending && !events.has_pending() {
                    break;
                }
                let Some(event) = events.wait_event() else {
                    return Ok(Exit::Closed);
                };
                if self.handle_event(event, display) == Flow::Quit {
                    return Ok(Exit::Quit);
                }
            }
            self.redraw_step(display)?;
        }
    }
}
