// SPDX-License-Identifier: Apache-2.0

//! Compiles structural netlists of CGRA tiles into symbolic transition
//! systems, and checks them with bounded model checking.

pub mod bits;
pub mod bmc;
pub mod btor2;
pub mod compute;
pub mod equiv;
pub mod error;
pub mod graph;
pub mod lut;
pub mod rewrite;
pub mod sim;
pub mod solver;
pub mod storage;
pub mod synth;
pub mod term;
pub mod translate;
pub mod transys;
pub mod unroll;

pub use error::{CompileError, Result};
pub use translate::{compile, CompileOptions, Compiled, TileLibrary};
