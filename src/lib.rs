//! Tether - declarative layout attributes installed as native constraints
//!
//! Views declare geometric intents ([`Attribute`]s). The [`Installer`]
//! resolves where each one lives in the view tree, replaces conflicting
//! declarations, and hands concrete requests to a constraint engine. The
//! bundled [`Scene`] is an in-memory view tree backed by a Cassowary solver,
//! and the scene script language drives it from text.
//!
//! # Example
//!
//! ```rust
//! use tether::run;
//!
//! let session = run(r#"
//!     view root [width: 400, height: 1000]
//!     view card in root
//!     card <- [top(20), leading(16), size(120, 40)]
//! "#).unwrap();
//!
//! let card = session.frames().by_name("card").unwrap();
//! assert_eq!((card.x, card.y, card.width), (16.0, 20.0, 120.0));
//! ```

pub mod attribute;
pub mod config;
pub mod error;
pub mod install;
pub mod parser;
pub mod platform;
pub mod scene;
pub mod script;

pub use attribute::{Attribute, AttributeBatch, AttributeKind, LayoutDirection, Priority, Relation};
pub use config::{ConfigError, LayoutConfig};
pub use error::ParseError;
pub use install::Installer;
pub use parser::{parse, Script};
pub use platform::{ConstraintEngine, ConstraintRequest, EngineError, Platform, ViewHierarchy, ViewId};
pub use scene::{Frame, Frames, Scene, SceneError};
pub use script::{ScriptError, Session};

use thiserror::Error;

/// Errors that can occur while running a script
#[derive(Debug, Error)]
pub enum RunError {
    /// Error during parsing
    #[error("parse errors: {}", format_parse_errors(.0))]
    Parse(Vec<ParseError>),

    /// Error while executing a statement
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
}

impl From<Vec<ParseError>> for RunError {
    fn from(errors: Vec<ParseError>) -> Self {
        RunError::Parse(errors)
    }
}

impl RunError {
    /// Render every diagnostic with source context
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            RunError::Parse(errors) => errors
                .iter()
                .map(|e| e.format(source, filename))
                .collect::<Vec<_>>()
                .join("\n"),
            RunError::Script(err) => err.format(source, filename),
        }
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Run a scene script with default configuration
pub fn run(source: &str) -> Result<Session, RunError> {
    run_with_config(source, LayoutConfig::default())
}

/// Run a scene script with custom configuration
///
/// # Example
///
/// ```rust
/// use tether::{run_with_config, LayoutConfig, LayoutDirection};
///
/// let config = LayoutConfig::default().with_direction(LayoutDirection::RightToLeft);
/// let session = run_with_config(r#"
///     view root [width: 400, height: 400]
///     view chip in root
///     chip <- [leading(10), width(50)]
/// "#, config).unwrap();
///
/// assert_eq!(session.frames().by_name("chip").unwrap().x, 340.0);
/// ```
pub fn run_with_config(source: &str, config: LayoutConfig) -> Result<Session, RunError> {
    let script = parse(source)?;
    log::debug!("parsed {} statements", script.statements.len());

    let mut session = Session::new(config);
    session.execute(&script)?;
    Ok(session)
}
