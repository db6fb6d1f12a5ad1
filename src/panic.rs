/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Panic reporting helper.
//!
//! The crate is a library, so it does not claim the `#[panic_handler]`
//! attribute itself; the firmware image wires this function into its own
//! panic handler.

/// Report the panic through the console and park the core.
pub fn handler(info: &core::panic::PanicInfo) -> ! {
    crate::println!("{}", info);
    crate::cpu::wait_forever()
}
