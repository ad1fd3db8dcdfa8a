// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! mf-script
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Tokenizer and per-line statement grammar.
pub mod ast;
/// Statement resolution and plan compilation.
pub mod compile;

pub use ast::{parse_line, parse_script, ScriptIssue, Stmt};
pub use compile::{compile, validate_syntax, CompileOutput};
