//! Minimal image viewer: cycles through a list of files in a window,
//! opening and decoding each one only when it is about to be shown.

pub mod cli;
pub mod codec;
pub mod entity;
pub mod error;
pub mod ring;
pub mod ui;
pub mod viewer;

pub use codec::{Codec, CodecRegistry, Header, ImageStream};
pub use entity::ImageEntity;
pub use error::{DecodeError, OpenError, ViewerError};
pub use ring::{Direction, NavigationRing};
pub use viewer::{
    Action, DisplaySurface, EventSource, Exit, Flow, Frame, RedrawStep, Viewer, ViewerEvent,
    ViewerState,
};
