/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Board support.

pub mod device_driver;

pub mod qemu_virt;

#[cfg(feature = "qemu_virt")]
pub use qemu_virt::*;
