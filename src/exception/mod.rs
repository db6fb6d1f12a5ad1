/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Synchronous and asynchronous exception handling.
//!
//! Traps and peripheral interrupts share one linear exception numbering:
//! trap `t` occupies vector-table slot `t`, peripheral interrupt `i`
//! occupies slot `NUM_TRAPS + i`. Handlers are installed at runtime and
//! always receive the stripped number of their own class, so a handler
//! registered for interrupt 5 is called with `5`, not with `NUM_TRAPS + 5`.
//!
//! Slot replacement is a single atomic pointer store and dispatch is a
//! single atomic load, which is what makes installation safe against a
//! concurrently executing interrupt context without any lock.

#[cfg(target_arch = "aarch64")]
use crate::arch::aarch64::exception as arch_exception;

use {
    core::ptr,
    core::sync::atomic::{AtomicPtr, Ordering},
    static_assertions::{const_assert, const_assert_eq},
};

pub mod asynchronous;

//--------------------------------------------------------------------------------------------------
// Architectural Public Reexports
//--------------------------------------------------------------------------------------------------

#[cfg(target_arch = "aarch64")]
pub use arch_exception::{current_privilege_level, handling_init};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Kernel privilege levels.
#[allow(missing_docs)]
#[derive(Eq, PartialEq)]
pub enum PrivilegeLevel {
    User,
    Kernel,
    Hypervisor,
    Unknown,
}

/// An installable exception handler. The argument is the stripped exception
/// number: the trap number for traps, the peripheral interrupt number for
/// interrupts.
pub type ExceptionHandler = fn(usize);

/// Number of trap slots. Matches the AArch64 exception vector table: 16
/// entries of 0x80 bytes, four sets of four.
pub const NUM_TRAPS: usize = 16;

const NUM_SLOTS: usize = NUM_TRAPS + crate::platform::NUM_PERIPHERAL_IRQS;

// The table must fit the exception range the controller hardware can
// actually deliver. Exceeding it is a build-time failure, not a runtime one.
const_assert_eq!(NUM_TRAPS, 16);
const_assert!(
    crate::platform::NUM_PERIPHERAL_IRQS
        <= crate::platform::device_driver::GICv2::MAX_IRQ_NUMBER + 1
);

/// The unified trap + interrupt dispatch table.
///
/// Slots hold type-erased `ExceptionHandler` pointers. A null slot resolves
/// to [`default_handler`], so lookups never produce an undefined reference,
/// installed or not, initialized or not.
pub struct VectorTable<const NUM_SLOTS: usize> {
    slots: [AtomicPtr<()>; NUM_SLOTS],
}

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static VECTOR_TABLE: VectorTable<NUM_SLOTS> = VectorTable::new();

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl<const NUM_SLOTS: usize> VectorTable<NUM_SLOTS> {
    /// Create an instance with every slot resolving to the default handler.
    pub const fn new() -> Self {
        const VACANT: AtomicPtr<()> = AtomicPtr::new(ptr::null_mut());

        Self {
            slots: [VACANT; NUM_SLOTS],
        }
    }

    /// Replace a slot. The store is a single word, so a concurrently
    /// dispatching interrupt context sees either the old or the new handler,
    /// never a torn reference.
    fn install(&self, slot: usize, handler: ExceptionHandler) {
        assert!(slot < NUM_SLOTS, "vector table slot {} out of range", slot);

        self.slots[slot].store(handler as *mut (), Ordering::Release);
    }

    /// Resolve a slot to a callable handler.
    fn handler(&self, slot: usize) -> ExceptionHandler {
        assert!(slot < NUM_SLOTS, "vector table slot {} out of range", slot);

        let raw = self.slots[slot].load(Ordering::Acquire);
        if raw.is_null() {
            default_handler
        } else {
            // SAFETY: Non-null slot contents are only ever written by
            // `install`, which stores a valid `ExceptionHandler`.
            unsafe { core::mem::transmute::<*mut (), ExceptionHandler>(raw) }
        }
    }

    /// Whether a slot still resolves to the default handler.
    fn is_vacant(&self, slot: usize) -> bool {
        assert!(slot < NUM_SLOTS, "vector table slot {} out of range", slot);

        self.slots[slot].load(Ordering::Acquire).is_null()
    }

    /// Point every slot back at the default handler.
    pub fn reset(&self) {
        for slot in self.slots.iter() {
            slot.store(ptr::null_mut(), Ordering::Release);
        }
    }
}

impl<const NUM_SLOTS: usize> Default for VectorTable<NUM_SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

/// The handler every slot resolves to until something else is installed.
///
/// Panics instead of hanging so that an unexpected exception is an
/// immediate, attributable failure naming the offending number. The
/// dispatch functions name the exception class as well; this fallback
/// fires when it is resolved directly or reinstalled explicitly.
pub fn default_handler(exception_number: usize) {
    panic!("No handler installed for exception {}", exception_number);
}

/// Install a trap handler.
///
/// An out-of-range trap number is a programming error and asserts.
pub fn install_trap(trap_no: usize, handler: ExceptionHandler) {
    assert!(trap_no < NUM_TRAPS, "trap number {} out of range", trap_no);

    VECTOR_TABLE.install(trap_no, handler);
}

/// Install a peripheral interrupt handler.
///
/// An out-of-range interrupt number is a programming error and asserts.
pub fn install_handler(int_no: usize, handler: ExceptionHandler) {
    assert!(
        int_no < crate::platform::NUM_PERIPHERAL_IRQS,
        "interrupt number {} out of range",
        int_no
    );

    VECTOR_TABLE.install(NUM_TRAPS + int_no, handler);
}

/// Whether a handler other than the default one is installed for a trap.
///
/// The architectural router stubs use this to decide between dispatching
/// and panicking with the full saved machine context.
pub fn trap_handler_installed(trap_no: usize) -> bool {
    assert!(trap_no < NUM_TRAPS, "trap number {} out of range", trap_no);

    !VECTOR_TABLE.is_vacant(trap_no)
}

/// Reset the whole table to the default handler. There is no single-slot
/// removal primitive; uninstalling one handler means installing
/// [`default_handler`] over it.
pub fn reset_vector_table() {
    VECTOR_TABLE.reset();
}

/// Route a trap to its installed handler. Called by the per-trap router
/// stubs with their compile-time trap number.
///
/// A vacant slot panics naming the trap, so the report distinguishes an
/// unhandled trap from an unhandled interrupt of the same number.
pub fn dispatch_trap(trap_no: usize) {
    assert!(trap_no < NUM_TRAPS, "trap number {} out of range", trap_no);

    if VECTOR_TABLE.is_vacant(trap_no) {
        panic!("No handler installed for trap {}", trap_no);
    }

    (VECTOR_TABLE.handler(trap_no))(trap_no);
}

/// Route a peripheral interrupt to its installed handler. Called by the
/// generic interrupt entry after acknowledging the controller.
///
/// A vacant slot panics naming the interrupt, so the report distinguishes
/// an unhandled interrupt from an unhandled trap of the same number.
pub fn dispatch_interrupt(int_no: usize) {
    assert!(
        int_no < crate::platform::NUM_PERIPHERAL_IRQS,
        "interrupt number {} out of range",
        int_no
    );

    if VECTOR_TABLE.is_vacant(NUM_TRAPS + int_no) {
        panic!("No handler installed for interrupt {}", int_no);
    }

    (VECTOR_TABLE.handler(NUM_TRAPS + int_no))(int_no);
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use {
        super::*,
        core::sync::atomic::{AtomicUsize, Ordering},
    };

    fn nop_handler(_n: usize) {}

    #[test]
    fn fresh_table_resolves_to_default_everywhere() {
        let table = VectorTable::<8>::new();

        for slot in 0..8 {
            assert_eq!(table.handler(slot) as usize, default_handler as usize);
        }
    }

    #[test]
    fn install_replaces_only_the_given_slot() {
        let table = VectorTable::<8>::new();

        table.install(3, nop_handler);

        assert_eq!(table.handler(3) as usize, nop_handler as usize);
        assert_eq!(table.handler(2) as usize, default_handler as usize);
        assert_eq!(table.handler(4) as usize, default_handler as usize);
    }

    #[test]
    fn reset_restores_the_default_handler() {
        let table = VectorTable::<8>::new();

        table.install(1, nop_handler);
        table.install(6, nop_handler);
        table.reset();

        for slot in 0..8 {
            assert_eq!(table.handler(slot) as usize, default_handler as usize);
        }
    }

    #[test]
    #[should_panic(expected = "vector table slot")]
    fn out_of_range_slot_asserts() {
        let table = VectorTable::<8>::new();

        table.install(8, nop_handler);
    }

    static TRAP_RECORD: AtomicUsize = AtomicUsize::new(usize::MAX);

    fn trap_recorder(n: usize) {
        TRAP_RECORD.store(n, Ordering::SeqCst);
    }

    #[test]
    fn installed_trap_handler_receives_its_trap_number() {
        install_trap(3, trap_recorder);

        dispatch_trap(3);

        assert_eq!(TRAP_RECORD.load(Ordering::SeqCst), 3);
    }

    static IRQ_RECORD: AtomicUsize = AtomicUsize::new(usize::MAX);

    fn irq_recorder(n: usize) {
        IRQ_RECORD.store(n, Ordering::SeqCst);
    }

    #[test]
    fn installed_interrupt_handler_receives_the_stripped_number() {
        install_handler(7, irq_recorder);

        dispatch_interrupt(7);

        // The handler sees the peripheral interrupt number, not the
        // table slot `NUM_TRAPS + 7`.
        assert_eq!(IRQ_RECORD.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn handler_installation_is_observable() {
        assert!(!trap_handler_installed(10));

        install_trap(10, nop_handler);

        assert!(trap_handler_installed(10));
    }

    #[test]
    #[should_panic(expected = "No handler installed for trap 14")]
    fn uninstalled_trap_names_its_class() {
        dispatch_trap(14);
    }

    #[test]
    #[should_panic(expected = "No handler installed for interrupt 12")]
    fn uninstalled_interrupt_names_its_class() {
        dispatch_interrupt(12);
    }

    #[test]
    #[should_panic(expected = "trap number 16 out of range")]
    fn trap_installation_is_bounds_checked() {
        install_trap(NUM_TRAPS, nop_handler);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn interrupt_installation_is_bounds_checked() {
        install_handler(crate::platform::NUM_PERIPHERAL_IRQS, nop_handler);
    }
}
