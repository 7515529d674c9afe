//! Read entities definitions.

pub mod proposal;
