//! ZL IR - AST and value types for the ZL runtime.
//!
//! This crate defines the data the rest of the pipeline flows through:
//!
//! - [`Node`]: the universal AST record produced by the parser
//! - [`NodeId`]: process-unique node identity, used by the engine's
//!   handler cache so the AST itself stays immutable and shareable
//! - [`Value`]: the dynamic value sum type held by scopes
//! - [`SlotMeta`] / [`InputMeta`]: per-slot documentation and the
//!   strict-mode validation contract
//! - [`Token`] / [`TokenKind`]: the lexer's output

mod node;
mod slot_meta;
mod token;
mod value;

pub use node::{unquote, Node, NodeId, RAW_VALUE_PREFIX};
pub use slot_meta::{InputMeta, SlotMeta, ValueType};
pub use token::{Token, TokenKind};
pub use value::Value;
