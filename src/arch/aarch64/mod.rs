/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! AArch64 implementations of the architectural interfaces.

pub mod exception;
