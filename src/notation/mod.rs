// Notation module - recorded take to renderable tokens

pub mod assembler;
pub mod export;
pub mod token;

pub use assembler::{Notation, assemble};
pub use export::{ExportError, ExportedToken, NotationExport};
pub use token::{NotationToken, TimingClass, TokenKind, TokenMetadata};
