//! Compile sequential host code into a graph of spawn-triggered objects.
//!
//! A [`Compiler`] owns every piece of compile-time state. Statements are
//! plain method calls; each one appends objects to the current context, and
//! [`Compiler::flush`] turns the contexts into the final object list.
//!
//! ```
//! use trigforge_script::{Compiler, less_than};
//!
//! let mut c = Compiler::new();
//! let hits = c.counter(0.0)?;
//! c.wait(1.0)?;
//! c.repeat_while(less_than(hits, 10.0), |c, _| hits.add(c, 1.0))?;
//! let level = c.export()?;
//! assert!(level.ends_with(';'));
//! # Ok::<(), trigforge_script::CompileError>(())
//! ```

pub mod context;
pub mod control;
pub mod counter;
pub mod triggers;

use thiserror::Error;
use trigforge_data::{CodecError, TypedRef, ValidationError};

pub use context::{ChainGraph, Compiler, CompilerOptions, Context, ContextId, GLOBAL};
pub use control::{CompiledLoop, LoopRange, Remappable, Sequence, SequenceMode, SequenceReset};
pub use counter::{Amount, Comparator, Condition, Counter, CounterKind, CounterOptions, equal_to, greater_than, less_than};

/// Errors raised while building the trigger graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// An object was given a field value of the wrong reference domain.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("no context named '{0}'")]
    UnknownContext(String),
    #[error("no context owns {0}")]
    UnknownGroup(TypedRef),
    #[error("context '{0}' already exists")]
    DuplicateContext(String),
    #[error("invalid loop range: {0}")]
    InvalidRange(String),
    /// Delays must be finite and not negative.
    #[error("invalid delay {0}")]
    InvalidDelay(f64),
}
