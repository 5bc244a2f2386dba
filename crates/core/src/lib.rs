//! Core library for the moire terminal.
//!
//! A scrolling text buffer (backspace-aware, capped at a number of rows) is
//! fed by a procedural animation that paints overlapping circle outlines
//! into a window of upcoming columns and emits one column per frame. Line
//! input from an external field can be read into the same buffer while the
//! animation runs.

pub mod config;
pub mod error;
pub mod input;
pub mod random;
pub mod raster;
pub mod scene;
pub mod session;
pub mod terminal;
pub mod text;
pub mod timeline;

pub use config::{AnimationConfig, AppConfig, SineConfig, TerminalConfig};
pub use error::{MoireError, Result};
pub use input::{InputField, InputHandle, LineRequest};
pub use random::{RandomSource, XorShift64};
pub use raster::{circle, CircleDescriptor, GlyphMap, NormalizedImage, Point};
pub use scene::{Frame, PlacedCircle, SceneComposer};
pub use session::{AnimationSession, SessionHandle, SessionSummary};
pub use terminal::Terminal;
pub use text::{DisplayChange, DisplaySink, MemoryDisplay, TextBuffer, DEFAULT_ROW_CAP};
pub use timeline::{FrameClock, TokioClock, VirtualClock};
