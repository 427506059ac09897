#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Once;

use image::{ImageFormat, Rgb, RgbImage};
use lazyview::{
    Codec, DecodeError, DisplaySurface, EventSource, Frame, Header, ImageStream, ViewerEvent,
};
use log::{Level, LevelFilter, Log, Metadata, Record};

// ---------------------------------------------------------------------------
// Fake codec: text files of the form "FAKE <w> <h> [broken]"
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Counters {
    pub probes: Cell<usize>,
    pub decodes: Cell<usize>,
}

pub struct FakeCodec {
    pub counters: Rc<Counters>,
}

impl FakeCodec {
    pub fn new() -> (Self, Rc<Counters>) {
        let counters = Rc::new(Counters::default());
        (Self { counters: Rc::clone(&counters) }, counters)
    }
}

impl Codec for FakeCodec {
    fn name(&self) -> &str {
        "fake"
    }

    fn probe(&self, stream: &mut dyn ImageStream) -> Option<Header> {
        self.counters.probes.set(self.counters.probes.get() + 1);
        let mut line = String::new();
        stream.read_line(&mut line).ok()?;
        let mut parts = line.split_whitespace();
        if parts.next()? != "FAKE" {
            return None;
        }
        let width = parts.next()?.parse().ok()?;
        let height = parts.next()?.parse().ok()?;
        Some(Header { width, height })
    }

    /// Fills the buffer with the decode sequence number so each decode is
    /// distinguishable. Broken files only get the first half.
    fn decode(
        &self,
        stream: &mut dyn ImageStream,
        _: Header,
        out: &mut [u8],
    ) -> Result<(), DecodeError> {
        let n = self.counters.decodes.get() + 1;
        self.counters.decodes.set(n);
        let mut line = String::new();
        stream.read_line(&mut line)?;
        if line.contains("broken") {
            let half = out.len() / 2;
            out[..half].fill(n as u8);
            return Err(DecodeError::Codec("unexpected end of data".into()));
        }
        out.fill(n as u8);
        Ok(())
    }
}

pub fn fake_file(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("FAKE {width} {height}\n")).unwrap();
    path
}

pub fn broken_file(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("FAKE {width} {height} broken\n")).unwrap();
    path
}

pub fn text_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, "not an image\n").unwrap();
    path
}

pub fn real_image(dir: &Path, name: &str, format: ImageFormat, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, Rgb([200, 100, 50]))
        .save_with_format(&path, format)
        .unwrap();
    path
}

// ---------------------------------------------------------------------------
// Scripted event source
// ---------------------------------------------------------------------------

/// Events grouped into bursts. Everything in a burst is "already queued";
/// moving on to the next burst stands in for a blocking wait.
pub struct Script {
    bursts: VecDeque<VecDeque<ViewerEvent>>,
}

impl Script {
    pub fn new<B>(bursts: impl IntoIterator<Item = B>) -> Self
    where
        B: IntoIterator<Item = ViewerEvent>,
    {
        Self {
            bursts: bursts.into_iter().map(|b| b.into_iter().collect()).collect(),
        }
    }
}

impl EventSource for Script {
    fn wait_event(&mut self) -> Option<ViewerEvent> {
        loop {
            let burst = self.bursts.front_mut()?;
            if let Some(event) = burst.pop_front() {
                return Some(event);
            }
            self.bursts.pop_front();
        }
    }

    fn has_pending(&mut self) -> bool {
        self.bursts.front().is_some_and(|b| !b.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Recording display
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presented {
    pub image: (u32, u32),
    pub window: (u32, u32),
    pub len: usize,
    pub first_byte: Option<u8>,
}

#[derive(Default)]
pub struct Recorder {
    pub hints: Vec<(u32, u32)>,
    pub presents: Vec<Presented>,
    /// Window size reported back from every hint, as if the window system
    /// resized on the spot.
    pub applied: Option<(u32, u32)>,
}

impl DisplaySurface for Recorder {
    fn set_aspect_hint(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        self.hints.push((width, height));
        self.applied
    }

    fn present(&mut self, frame: Frame<'_>, window_width: u32, window_height: u32) {
        self.presents.push(Presented {
            image: (frame.width, frame.height),
            window: (window_width, window_height),
            len: frame.pixels.len(),
            first_byte: frame.pixels.first().copied(),
        });
    }
}

pub fn resized(width: u32, height: u32) -> ViewerEvent {
    ViewerEvent::Resized { width, height }
}

// ---------------------------------------------------------------------------
// Log capture
// ---------------------------------------------------------------------------

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Keeps records per thread; the test harness runs each test on its own.
struct Capture;

impl Log for Capture {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        RECORDS.with(|r| r.borrow_mut().push((record.level(), record.args().to_string())));
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture;

/// Route `log` output into a per-thread buffer and clear it.
pub fn capture_logs() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        if log::set_logger(&CAPTURE).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
    RECORDS.with(|r| r.borrow_mut().clear());
}

/// Messages captured on this thread at exactly `level`.
pub fn logged(level: Level) -> Vec<String> {
    RECORDS.with(|r| {
        r.borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, msg)| msg.clone())
            .collect()
    })
}
