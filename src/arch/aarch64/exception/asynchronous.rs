/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! AArch64 asynchronous exception handling: PSTATE.DAIF manipulation.

use {
    crate::info,
    aarch64_cpu::registers::*,
    core::arch::asm,
    tock_registers::{
        fields::Field,
        interfaces::{Readable, Writeable},
    },
};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

mod daif_bits {
    pub const IRQ: u8 = 0b0010;
}

trait DaifField {
    fn daif_field() -> Field<u64, DAIF::Register>;
}

struct Debug;
struct SError;
struct IRQ;
struct FIQ;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Saved DAIF state, as returned by [`local_irq_mask_save`].
#[derive(Clone, Copy)]
pub struct IRQMask {
    daif: u64,
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl DaifField for Debug {
    fn daif_field() -> Field<u64, DAIF::Register> {
        DAIF::D
    }
}

impl DaifField for SError {
    fn daif_field() -> Field<u64, DAIF::Register> {
        DAIF::A
    }
}

impl DaifField for IRQ {
    fn daif_field() -> Field<u64, DAIF::Register> {
        DAIF::I
    }
}

impl DaifField for FIQ {
    fn daif_field() -> Field<u64, DAIF::Register> {
        DAIF::F
    }
}

fn is_masked<T>() -> bool
where
    T: DaifField,
{
    DAIF.is_set(T::daif_field())
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Returns whether IRQs are masked on the executing core.
pub fn is_local_irq_masked() -> bool {
    is_masked::<IRQ>()
}

/// Mask IRQs on the executing core.
#[inline(always)]
pub fn local_irq_mask() {
    unsafe {
        asm!(
            "msr DAIFSet, {arg}",
            arg = const daif_bits::IRQ,
            options(nomem, nostack, preserves_flags)
        );
    }
}

/// Unmask IRQs on the executing core.
///
/// Must not be called before the interrupt controller driver and the vector
/// base register are set up.
#[inline(always)]
pub fn local_irq_unmask() {
    unsafe {
        asm!(
            "msr DAIFClr, {arg}",
            arg = const daif_bits::IRQ,
            options(nomem, nostack, preserves_flags)
        );
    }
}

/// Mask IRQs on the executing core and return the previously saved interrupt
/// mask bits (DAIF).
#[inline(always)]
pub fn local_irq_mask_save() -> IRQMask {
    let saved = IRQMask { daif: DAIF.get() };
    local_irq_mask();

    saved
}

/// Restore the interrupt mask bits (DAIF) using a previously saved state.
#[inline(always)]
pub fn local_irq_restore(saved: IRQMask) {
    DAIF.set(saved.daif);
}

/// Print the AArch64 exceptions status.
#[rustfmt::skip]
pub fn print_state() {
    let to_mask_str = |x| -> _ {
        if x { "Masked" } else { "Unmasked" }
    };

    info!("      Debug:  {}", to_mask_str(is_masked::<Debug>()));
    info!("      SError: {}", to_mask_str(is_masked::<SError>()));
    info!("      IRQ:    {}", to_mask_str(is_masked::<IRQ>()));
    info!("      FIQ:    {}", to_mask_str(is_masked::<FIQ>()));
}
