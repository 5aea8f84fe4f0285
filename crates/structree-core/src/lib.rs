#![forbid(unsafe_code)]

//! Core: exact rational arithmetic for the structree growth engine.
//!
//! # Role in structree
//! `structree-core` is the arithmetic layer. Every weight, rate, and
//! transition amount in the growth tree is a [`Rational`], so structural
//! decisions (spawn a child, prune a leaf) are made on exact values and never
//! on rounded floating-point approximations.
//!
//! # How it fits in the system
//! The engine (`structree-tree`) uses the checked operations exclusively and
//! propagates [`ArithmeticFault`] to its caller. The operator impls
//! (`+`, `-`, `*`, `/`) panic on a fault and exist for tests and drivers
//! that build literal values.

pub mod error;
pub mod rational;

pub use error::{ArithmeticFault, ParseRationalError};
pub use rational::Rational;
