// SPDX-License-Identifier: Apache-2.0

//! Solver backends over the term arena.
//!
//! A backend receives terms by reference to the `TermManager` that owns them
//! and encodes them in whatever form it needs; terms never have to be
//! rebuilt in a solver-specific arena.

pub mod bitblast;
pub mod easy_smt_backend;
pub mod smtlib;

use crate::bits::Bits;
use crate::error::Result;
use crate::term::{TermManager, TermRef};

pub use bitblast::SatBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Sat,
    Unsat,
    Unknown,
}

pub trait SolverBackend {
    /// Adds the Bool term `t` as a permanent assertion.
    fn assert(&mut self, tm: &TermManager, t: TermRef) -> Result<()>;

    /// Checks the assertions together with the temporary Bool
    /// `assumptions`.
    fn check_assuming(&mut self, tm: &TermManager, assumptions: &[TermRef]) -> Result<Response>;

    /// Makes `t` available to `value` after the next satisfiable check.
    fn track(&mut self, _tm: &TermManager, _t: TermRef) -> Result<()> {
        Ok(())
    }

    /// Value of the Bool or bit-vector term `t` in the model of the last
    /// satisfiable check. Booleans are one-bit values.
    fn value(&mut self, tm: &TermManager, t: TermRef) -> Result<Bits>;
}

/// Which backend a driver should construct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SolverChoice {
    /// In-process SAT bit-blasting.
    #[default]
    Sat,
    /// External SMT-LIB process at the given path.
    SmtLib { path: String, args: Vec<String> },
}

/// Builds the backend selected by `choice`.
pub fn make_backend(choice: &SolverChoice) -> Result<Box<dyn SolverBackend>> {
    match choice {
        SolverChoice::Sat => Ok(Box::new(SatBackend::new())),
        #[cfg(feature = "has-easy-smt")]
        SolverChoice::SmtLib { path, args } => Ok(Box::new(
            easy_smt_backend::SmtLibBackend::new(path, args)?,
        )),
        #[cfg(not(feature = "has-easy-smt"))]
        SolverChoice::SmtLib { path, .. } => Err(crate::error::CompileError::Solver(format!(
            "SMT-LIB backend '{}' requested but the crate was built without `with-easy-smt`",
            path
        ))),
    }
}

impl<B: SolverBackend + ?Sized> SolverBackend for Box<B> {
    fn assert(&mut self, tm: &TermManager, t: TermRef) -> Result<()> {
        (**self).assert(tm, t)
    }

    fn check_assuming(&mut self, tm: &TermManager, assumptions: &[TermRef]) -> Result<Response> {
        (**self).check_assuming(tm, assumptions)
    }

    fn track(&mut self, tm: &TermManager, t: TermRef) -> Result<()> {
        (**self).track(tm, t)
    }

    fn value(&mut self, tm: &TermManager, t: TermRef) -> Result<Bits> {
        (**self).value(tm, t)
    }
}
