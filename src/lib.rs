//! # solidtutor
//!
//! A Socratic tutor for solid-geometry problems.
//!
//! A learner sketches a solid (or inserts a template, or types the problem),
//! confirms which primitive it is, and then talks it through with a chat
//! model. Every question is grounded with formulas pulled from a small
//! knowledge base before it is forwarded.
//!
//! ## Layout
//!
//! 1. **sketch** - stroke smoothing, template curves, the canvas state
//!    machine and the shape confirmation gate
//! 2. **knowledge** - static formula base and keyword retrieval
//! 3. **tutor** - the tutoring session and its prompts
//! 4. **chat** - the chat service seam plus bridge and offline backends
//! 5. **scene** - wireframe descriptions for the rendering surface

pub mod chat;
pub mod config;
pub mod event;
pub mod geometry;
pub mod knowledge;
pub mod problem;
pub mod scene;
pub mod sketch;
pub mod tutor;

pub use config::AppConfig;
pub use geometry::GeometryKind;
pub use problem::{ImageRef, ProblemContext};
pub use sketch::{AnalyzeOutcome, SketchCanvas};
pub use tutor::{ChatMessage, SessionState, Speaker, TutorSession};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global tracing subscriber.
///
/// Honours `RUST_LOG`; anything not mentioned there logs at `info`.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize logging: {err}"))?;

    Ok(())
}
