use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek};
use std::path::Path;
use std::rc::Rc;

use image::{ColorType, ImageDecoder, ImageFormat, ImageReader, Limits};

use crate::entity::{ImageEntity, try_zeroed};
use crate::error::{DecodeError, OpenError};

/// Bytes read from the start of a stream when sniffing its format.
const SNIFF_LEN: u64 = 32;

/// Anything a codec can probe and decode from. Blanket-implemented so both
/// files and in-memory cursors work.
pub trait ImageStream: BufRead + Seek {}

impl<T: BufRead + Seek + ?Sized> ImageStream for T {}

/// Dimensions read at open time. They never change for the life of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub width: u32,
    pub height: u32,
}

/// One image format the viewer knows how to recognise and decode.
pub trait Codec {
    fn name(&self) -> &str;

    /// Inspect the stream and return its dimensions if this codec accepts it.
    /// The stream may be left at any position; the registry rewinds it.
    fn probe(&self, stream: &mut dyn ImageStream) -> Option<Header>;

    /// Write `3 * width * height` bytes of row-major RGB into `out`. The
    /// stream is rewound before the call. On failure `out` may hold a
    /// partially decoded picture.
    fn decode(
        &self,
        stream: &mut dyn ImageStream,
        header: Header,
        out: &mut [u8],
    ) -> Result<(), DecodeError>;
}

// ---------------------------------------------------------------------------
// Built-in codecs (backed by the `image` crate)
// ---------------------------------------------------------------------------

fn sniff(stream: &mut dyn ImageStream) -> Option<ImageFormat> {
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    (&mut *stream).take(SNIFF_LEN).read_to_end(&mut head).ok()?;
    image::guess_format(&head).ok()
}

fn reader<'a>(
    stream: &'a mut dyn ImageStream,
    format: ImageFormat,
    limits: &Limits,
) -> ImageReader<&'a mut dyn ImageStream> {
    let mut reader = ImageReader::with_format(stream, format);
    reader.limits(limits.clone());
    reader
}

fn read_header(
    stream: &mut dyn ImageStream,
    format: ImageFormat,
    limits: &Limits,
) -> Option<Header> {
    stream.rewind().ok()?;
    let (width, height) = reader(stream, format, limits).into_dimensions().ok()?;
    Some(Header { width, height })
}

/// Decode into the decoder's native layout, then expand to RGB24. Whatever
/// rows were read before a failure still reach `out`.
fn decode_rgb(
    stream: &mut dyn ImageStream,
    format: ImageFormat,
    limits: &Limits,
    header: Header,
    out: &mut [u8],
) -> Result<(), DecodeError> {
    let decoder = reader(stream, format, limits).into_decoder()?;
    if decoder.dimensions() != (header.width, header.height) {
        return Err(DecodeError::Codec("image size changed since open".into()));
    }

    let color = decoder.color_type();
    let len = usize::try_from(decoder.total_bytes()).unwrap_or(usize::MAX);
    let mut native = try_zeroed(len).ok_or_else(|| DecodeError::OutOfMemory {
        width: header.width,
        height: header.height,
        bytes: len,
    })?;

    let read = decoder.read_image(&mut native);
    expand_to_rgb(color, &native, out)?;
    Ok(read?)
}

/// Convert native samples to RGB24. Gray is replicated, alpha is dropped and
/// wide samples keep their most significant byte.
fn expand_to_rgb(color: ColorType, src: &[u8], out: &mut [u8]) -> Result<(), DecodeError> {
    let pixel = usize::from(color.bytes_per_pixel());
    let width = pixel / usize::from(color.channel_count());
    let sample: fn(&[u8]) -> u8 = match width {
        1 => |b| b[0],
        2 => |b| (u16::from_ne_bytes([b[0], b[1]]) >> 8) as u8,
        4 => |b| {
            let v = f32::from_ne_bytes([b[0], b[1], b[2], b[3]]);
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        },
        _ => return Err(DecodeError::Codec(format!("unsupported color type {color:?}"))),
    };

    for (px, rgb) in src.chunks_exact(pixel).zip(out.chunks_exact_mut(3)) {
        if color.has_color() {
            for (c, v) in rgb.iter_mut().enumerate() {
                *v = sample(&px[c * width..(c + 1) * width]);
            }
        } else {
            rgb.fill(sample(&px[..width]));
        }
    }
    Ok(())
}

/// Accepts exactly one format, identified by its magic bytes.
pub struct FormatCodec {
    name: &'static str,
    format: ImageFormat,
    limits: Limits,
}

impl FormatCodec {
    /// Decoding is unbounded; the entity has already sized the output.
    pub fn new(name: &'static str, format: ImageFormat) -> Self {
        Self {
            name,
            format,
            limits: Limits::no_limits(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }
}

impl Codec for FormatCodec {
    fn name(&self) -> &str {
        self.name
    }

    fn probe(&self, stream: &mut dyn ImageStream) -> Option<Header> {
        if sniff(stream)? != self.format {
            return None;
        }
        read_header(stream, self.format, &self.limits)
    }

    fn decode(
        &self,
        stream: &mut dyn ImageStream,
        header: Header,
        out: &mut [u8],
    ) -> Result<(), DecodeError> {
        decode_rgb(stream, self.format, &self.limits, header, out)
    }
}

/// Fallback: anything else the `image` crate can identify and read.
pub struct SniffingCodec {
    limits: Limits,
}

impl SniffingCodec {
    pub fn new() -> Self {
        Self {
            limits: Limits::no_limits(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

impl Default for SniffingCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for SniffingCodec {
    fn name(&self) -> &str {
        "any"
    }

    fn probe(&self, stream: &mut dyn ImageStream) -> Option<Header> {
        let format = sniff(stream)?;
        read_header(stream, format, &self.limits)
    }

    fn decode(
        &self,
        stream: &mut dyn ImageStream,
        header: Header,
        out: &mut [u8],
    ) -> Result<(), DecodeError> {
        let format = sniff(stream)
            .ok_or_else(|| DecodeError::Codec("format no longer recognised".into()))?;
        stream.rewind()?;
        decode_rgb(stream, format, &self.limits, header, out)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Ordered list of codecs. Probing goes front to back and the first codec
/// that accepts a stream owns it. Duplicates are kept in place.
pub struct CodecRegistry {
    codecs: Vec<Rc<dyn Codec>>,
}

impl CodecRegistry {
    /// A registry with no codecs; every open fails with `UnsupportedFormat`.
    pub fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    /// jpeg, gif, png, then the sniffing fallback.
    pub fn with_defaults() -> Self {
        Self::empty()
            .with(FormatCodec::new("jpeg", ImageFormat::Jpeg))
            .with(FormatCodec::new("gif", ImageFormat::Gif))
            .with(FormatCodec::new("png", ImageFormat::Png))
            .with(SniffingCodec::new())
    }

    /// Append a codec after every codec already registered.
    pub fn with(mut self, codec: impl Codec + 'static) -> Self {
        self.codecs.push(Rc::new(codec));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.codecs.iter().map(|c| c.name())
    }

    /// Open `path` and hand it to the first codec that accepts it. Failures
    /// are logged here; callers only decide what to try next.
    pub fn open(&self, path: &Path) -> Result<ImageEntity, OpenError> {
        let result = self.probe_all(path);
        if let Err(ref e) = result {
            log::warn!("{}", e);
        }
        result
    }

    fn probe_all(&self, path: &Path) -> Result<ImageEntity, OpenError> {
        let io_err = |source| OpenError::FileOpen {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;
        let mut stream = BufReader::new(file);

        for codec in &self.codecs {
            stream.rewind().map_err(io_err)?;
            if let Some(header) = codec.probe(&mut stream) {
                stream.rewind().map_err(io_err)?;
                log::debug!(
                    "Opened {:?} as {} ({}x{})",
                    path,
                    codec.name(),
                    header.width,
                    header.height
                );
                return Ok(ImageEntity::new(
                    path.to_path_buf(),
                    Rc::clone(codec),
                    header,
                    Box::new(stream),
                ));
            }
        }

        Err(OpenError::UnsupportedFormat {
            path: path.to_path_buf(),
        })
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
