//! Scoped parameter resolution
//!
//! Parameters live in six scopes. From lowest to highest precedence:
//! database input, project input, database calculated, project calculated,
//! then process-local input and calculated. Each parameter gets an
//! uppercased, prefixed alias (`SP_` by default). Formulas are rewritten to
//! use those aliases and evaluated against everything resolved so far.
//!
//! Once parameters are known, exchange amount and allocation formulas are
//! evaluated and uncertainty distributions are built around the final
//! amounts.

pub mod order;
pub mod resolver;


pub use order::evaluation_order;
pub use resolver::{GlobalScope, ParameterResolver, attach_uncertainty};
