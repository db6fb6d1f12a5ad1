/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Device driver top level.

mod arm;
pub mod common;

pub use arm::*;
