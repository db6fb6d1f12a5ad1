/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Architecture-specific code.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "aarch64")] {
        pub mod aarch64;
    }
}
