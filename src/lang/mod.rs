//! # Recovered Source Model
//!
//! Values and syntax trees shared by the parser, the rewrite passes and
//! source generation.
//!
//! ## Conventions
//!
//! - Child indices may be negative and then count from the end.
//! - Token equality ignores offsets, so canonical shapes built by hand
//!   compare equal to decoded ones.

pub mod node;
pub mod value;
