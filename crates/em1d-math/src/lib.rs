//! Mathematical primitives for SCPN EM1D.

pub mod filter;
pub mod interp;
pub mod quadrature;
pub mod sparse;
pub mod special;
