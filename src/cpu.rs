/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Processor parking and spin primitives.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "aarch64")] {
        /// Pause execution on the core forever.
        pub fn wait_forever() -> ! {
            loop {
                aarch64_cpu::asm::wfe()
            }
        }
    } else {
        /// Pause execution on the core forever.
        pub fn wait_forever() -> ! {
            loop {
                core::hint::spin_loop()
            }
        }
    }
}
