//! Exhibit core library
//!
//! Document sessions and the multi-document workspace: routes user input to
//! the coordinate mapper, zoom controller, sticker composer and annotation
//! store, and keeps the displayed raster in step with the current page.

pub mod events;
pub mod session;
pub mod workspace;

pub use events::InputEvent;
pub use session::{DocumentSession, SessionConfig, SessionError, SessionOutcome};
pub use workspace::Workspace;
