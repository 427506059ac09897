use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a single file could not be turned into an image. Recoverable: the
/// viewer skips the file and tries the next one in the ring.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("Cannot open '{}': {}", .path.display(), .source)]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unknown file type: '{}'", .path.display())]
    UnsupportedFormat { path: PathBuf },
}

/// Failure while filling an image buffer. Recoverable: whatever the codec
/// already wrote stays in the buffer and is presented as is.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{width}x{height} image is too large to buffer")]
    SizeOverflow { width: u32, height: u32 },

    #[error("cannot allocate {bytes} bytes for a {width}x{height} image")]
    OutOfMemory { width: u32, height: u32, bytes: usize },

    #[error("{0}")]
    Codec(String),
}

/// Fatal conditions. Any of these ends the process with exit code 1.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("No files to view")]
    NoFiles,

    #[error("No valid images to view")]
    NoValidImages,

    #[error("cannot open output: {0}")]
    Output(#[from] io::Error),

    #[error("event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window: {0}")]
    Os(#[from] winit::error::OsError),

    #[error("surface: {0}")]
    Surface(#[from] softbuffer::SoftBufferError),
}
