use std::fmt;
use std::io::Seek;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use crate::codec::{Codec, Header, ImageStream};
use crate::error::DecodeError;

/// Size in bytes of an RGB24 buffer, or `None` if it does not fit in memory.
pub fn rgb_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(3)
}

/// A zero-filled buffer of `len` bytes, or `None` if the allocator refuses.
pub(crate) fn try_zeroed(len: usize) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).ok()?;
    buf.resize(len, 0);
    Some(buf)
}

// ---------------------------------------------------------------------------
// Image entity
// ---------------------------------------------------------------------------

/// The picture currently on screen: an open stream, the codec that accepted
/// it and, once decoded, its pixels. Dropping the entity releases all three.
pub struct ImageEntity {
    path: PathBuf,
    codec: Rc<dyn Codec>,
    header: Header,
    stream: Box<dyn ImageStream>,
    buffer: Option<Vec<u8>>,
}

impl ImageEntity {
    pub(crate) fn new(
        path: PathBuf,
        codec: Rc<dyn Codec>,
        header: Header,
        stream: Box<dyn ImageStream>,
    ) -> Self {
        Self {
            path,
            codec,
            header,
            stream,
            buffer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn codec_name(&self) -> &str {
        self.codec.name()
    }

    pub fn width(&self) -> u32 {
        self.header.width
    }

    pub fn height(&self) -> u32 {
        self.header.height
    }

    /// True once a decode has been attempted, successful or not.
    pub fn is_decoded(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn buffer(&self) -> Option<&[u8]> {
        self.buffer.as_deref()
    }

    /// Allocate the pixel buffer and run the codec over it. Runs at most once
    /// per entity; later calls are no-ops. A failed decode still leaves the
    /// buffer in place with whatever the codec managed to write.
    pub fn decode(&mut self) -> Result<(), DecodeError> {
        if self.buffer.is_some() {
            return Ok(());
        }

        let Header { width, height } = self.header;
        let Some(len) = rgb_len(width, height) else {
            self.buffer = Some(Vec::new());
            return Err(DecodeError::SizeOverflow { width, height });
        };

        let Some(mut buffer) = try_zeroed(len) else {
            self.buffer = Some(Vec::new());
            return Err(DecodeError::OutOfMemory {
                width,
                height,
                bytes: len,
            });
        };

        let start = Instant::now();
        let result = match self.stream.rewind() {
            Ok(()) => self.codec.decode(&mut *self.stream, self.header, &mut buffer),
            Err(e) => Err(e.into()),
        };
        log::debug!(
            "Decoded {:?} ({}x{}) in {:.1} ms",
            self.path,
            width,
            height,
            start.elapsed().as_secs_f64() * 1000.0
        );
        self.buffer = Some(buffer);
        result
    }
}

impl fmt::Debug for ImageEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageEntity")
            .field("path", &self.path)
            .field("codec", &self.codec.name())
            .field("header", &self.header)
            .field("decoded", &self.is_decoded())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Cursor;

    /// Writes one pixel per call and then fails, counting invocations.
    struct HalfDone {
        calls: Rc<Cell<usize>>,
    }

    impl Codec for HalfDone {
        fn name(&self) -> &str {
            "half"
        }

        fn probe(&self, _: &mut dyn ImageStream) -> Option<Header> {
            None
        }

        fn decode(
            &self,
            _: &mut dyn ImageStream,
            _: Header,
            out: &mut [u8],
        ) -> Result<(), DecodeError> {
            self.calls.set(self.calls.get() + 1);
            out[..3].copy_from_slice(&[1, 2, 3]);
            Err(DecodeError::Codec("premature end of data".into()))
        }
    }

    fn entity(width: u32, height: u32, calls: Rc<Cell<usize>>) -> ImageEntity {
        ImageEntity::new(
            PathBuf::from("half.bin"),
            Rc::new(HalfDone { calls }),
            Header { width, height },
            Box::new(Cursor::new(Vec::new())),
        )
    }

    #[test]
    fn rgb_len_is_three_bytes_per_pixel() {
        assert_eq!(rgb_len(4, 3), Some(36));
        assert_eq!(rgb_len(0, 10), Some(0));
    }

    #[test]
    fn rgb_len_overflow_is_none() {
        assert_eq!(rgb_len(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn failed_decode_keeps_partial_buffer() {
        let calls = Rc::new(Cell::new(0));
        let mut img = entity(2, 2, Rc::clone(&calls));
        assert!(!img.is_decoded());

        assert!(img.decode().is_err());
        assert!(img.is_decoded());
        let buf = img.buffer().unwrap();
        assert_eq!(buf.len(), 12);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert!(buf[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn unallocatable_buffer_is_a_decode_error() {
        let calls = Rc::new(Cell::new(0));
        let mut img = entity(0x7FFF_FFFF, 0x7FFF_FFFF, Rc::clone(&calls));

        let err = img.decode().unwrap_err();
        assert!(matches!(err, DecodeError::OutOfMemory { width: 0x7FFF_FFFF, .. }));
        assert_eq!(img.buffer(), Some(&[][..]));
        assert_eq!(calls.get(), 0);

        img.decode().unwrap();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn decode_runs_once_per_entity() {
        let calls = Rc::new(Cell::new(0));
        let mut img = entity(1, 1, Rc::clone(&calls));
        let _ = img.decode();
        img.decode().unwrap();
        assert_eq!(calls.get(), 1);
    }
}
