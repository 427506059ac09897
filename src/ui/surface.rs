use std::num::NonZeroU32;
use std::sync::Arc;

use softbuffer::{Context, Surface};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::error::ViewerError;
use crate::ui::render::{aspect_fit_area, draw_fitted};
use crate::viewer::{DisplaySurface, Frame};

/// A winit window with a softbuffer framebuffer behind it.
pub struct WindowSurface {
    window: Arc<Window>,
    _context: Context<Arc<Window>>,
    surface: Surface<Arc<Window>, Arc<Window>>,
}

impl WindowSurface {
    pub fn new(window: Arc<Window>) -> Result<Self, ViewerError> {
        let context = Context::new(Arc::clone(&window))?;
        let surface = Surface::new(&context, Arc::clone(&window))?;
        Ok(Self {
            window,
            _context: context,
            surface,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}

impl DisplaySurface for WindowSurface {
    /// winit cannot pin an aspect ratio, so ask for a window of the same area
    /// shaped like the image instead. Near-misses are left alone so repeated
    /// hints settle.
    fn set_aspect_hint(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        let current = self.window.inner_size();
        let (w, h) = aspect_fit_area(width, height, current.width, current.height)?;
        if w.abs_diff(current.width) <= 1 && h.abs_diff(current.height) <= 1 {
            return None;
        }
        log::debug!(
            "Aspect hint {}x{}: {}x{} -> {}x{}",
            width, height, current.width, current.height, w, h
        );
        self.window
            .request_inner_size(PhysicalSize::new(w, h))
            .map(|size| (size.width, size.height))
    }

    fn present(&mut self, frame: Frame<'_>, window_width: u32, window_height: u32) {
        // Before the first resize notification fall back to what winit reports.
        let (window_width, window_height) = if window_width == 0 || window_height == 0 {
            let size = self.window.inner_size();
            (size.width, size.height)
        } else {
            (window_width, window_height)
        };
        let (Some(w), Some(h)) = (NonZeroU32::new(window_width), NonZeroU32::new(window_height))
        else {
            return;
        };

        if let Err(e) = self.surface.resize(w, h) {
            log::error!("Failed to resize surface: {}", e);
            return;
        }
        match self.surface.buffer_mut() {
            Ok(mut buffer) => {
                draw_fitted(&mut buffer, w.get(), h.get(), frame);
                if let Err(e) = buffer.present() {
                    log::error!("Failed to present frame: {}", e);
                }
            }
            Err(e) => log::error!("Failed to map surface buffer: {}", e),
        }
    }
}
