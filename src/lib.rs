/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Vectored exception and interrupt dispatch for bare-metal AArch64.
//!
//! The crate covers the path between the interrupt controller hardware (an
//! ARM GICv2 distributor + CPU interface) and firmware code: a unified
//! vector table for traps and peripheral interrupts, the router stubs
//! behind the hardware vector entries, the controller bring-up sequence,
//! and the per-interrupt enable/pending/priority controls.
//!
//! Everything is sized at build time from the platform configuration; the
//! only runtime-mutable state is the vector table itself, whose slots are
//! replaced with single atomic stores so interrupt context never observes
//! a torn handler reference.

#![cfg_attr(not(test), no_std)]
#![allow(clippy::upper_case_acronyms)]

pub mod arch;
pub mod console;
pub mod cpu;
pub mod driver;
pub mod exception;
pub mod macros;
pub mod panic;
pub mod platform;
pub mod synchronization;

/// Version string for field support reports.
pub fn version() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #[test]
    fn version_names_the_crate() {
        assert!(super::version().starts_with("intc "));
    }
}
