/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! ARM driver top level.

mod gicv2;

pub use gicv2::*;
