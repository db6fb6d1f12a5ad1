/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Asynchronous exception handling: local IRQ masking and the pluggable
//! interrupt-controller manager.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "aarch64")] {
        use crate::arch::aarch64::exception::asynchronous as arch_asynchronous;
    }
}

use crate::synchronization::{interface::ReadWriteEx, InitStateLock};

//--------------------------------------------------------------------------------------------------
// Architectural Public Reexports
//--------------------------------------------------------------------------------------------------

#[cfg(target_arch = "aarch64")]
pub use arch_asynchronous::{
    is_local_irq_masked, local_irq_mask, local_irq_mask_save, local_irq_restore, local_irq_unmask,
    print_state, IRQMask,
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Interrupt-controller interfaces.
pub mod interface {
    use super::IRQContext;

    /// Implemented by types that handle IRQs.
    pub trait IRQManager {
        /// Called by the CPU's generic interrupt entry. Acknowledges, routes
        /// and completes everything the controller has pending.
        ///
        /// The [`IRQContext`] token proves the caller really is running in
        /// interrupt context.
        fn handle_pending_irqs<'irq_context>(&'irq_context self, ic: &IRQContext<'irq_context>);

        /// Print the controller's register state.
        fn dump_registers(&self) {}
    }
}

/// Interrupt context token.
///
/// An instance of this type indicates that the current core is executing in
/// IRQ context, with interrupts automatically masked by the hardware. Code
/// receiving `&IRQContext` may skip software masking.
#[derive(Clone, Copy)]
pub struct IRQContext<'irq_context> {
    _0: core::marker::PhantomData<&'irq_context ()>,
}

/// RAII guard that masks local IRQs on construction and restores the saved
/// mask state on drop. Nests correctly: an inner guard restores a
/// still-masked state.
pub struct IRQMaskGuard {
    saved: IRQMask,
}

/// A dummy manager that panics on any IRQ, used until a real controller is
/// registered.
pub struct NullIRQManager;

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static CUR_IRQ_MANAGER: InitStateLock<&'static (dyn interface::IRQManager + Sync)> =
    InitStateLock::new(&NULL_IRQ_MANAGER);

static NULL_IRQ_MANAGER: NullIRQManager = NullIRQManager {};

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl<'irq_context> IRQContext<'irq_context> {
    /// Create an instance.
    ///
    /// # Safety
    ///
    /// - This must only be called when the current core is in an interrupt
    ///   context and will not live beyond the end of it. Creating the token
    ///   from a handler function is fine; storing it somewhere is not.
    #[inline(always)]
    pub unsafe fn new() -> Self {
        IRQContext {
            _0: core::marker::PhantomData,
        }
    }
}

impl IRQMaskGuard {
    /// Mask local IRQs, remembering whether they were already masked.
    pub fn new() -> Self {
        Self {
            saved: local_irq_mask_save(),
        }
    }
}

impl Default for IRQMaskGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IRQMaskGuard {
    fn drop(&mut self) {
        local_irq_restore(self.saved);
    }
}

impl interface::IRQManager for NullIRQManager {
    fn handle_pending_irqs<'irq_context>(&'irq_context self, _ic: &IRQContext<'irq_context>) {
        panic!("No IRQ Manager registered yet");
    }
}

/// Executes the provided closure while IRQs are masked on the executing core.
///
/// The previous mask state is restored afterwards, so nesting inside an
/// already-masked section keeps IRQs masked.
#[inline(always)]
pub fn exec_with_irq_masked<T>(f: impl FnOnce() -> T) -> T {
    let _guard = IRQMaskGuard::new();

    f()
}

/// Register a new IRQ manager.
pub fn register_irq_manager(new_manager: &'static (dyn interface::IRQManager + Sync)) {
    CUR_IRQ_MANAGER.write(|manager| *manager = new_manager);
}

/// Return a reference to the currently registered IRQ manager.
///
/// This is the IRQ manager used by the architectural interrupt handling code.
pub fn irq_manager() -> &'static dyn interface::IRQManager {
    CUR_IRQ_MANAGER.read(|manager| *manager)
}

//--------------------------------------------------------------------------------------------------
// Host Fallback Code
//--------------------------------------------------------------------------------------------------

// On non-AArch64 builds (unit tests on the host) the DAIF-based masking
// primitives are emulated with a process-global flag so that the guard and
// nesting logic stays observable.
cfg_if::cfg_if! {
    if #[cfg(not(target_arch = "aarch64"))] {
        use core::sync::atomic::{AtomicBool, Ordering};

        /// Saved IRQ mask state, as returned by [`local_irq_mask_save`].
        #[derive(Clone, Copy)]
        pub struct IRQMask {
            masked: bool,
        }

        static EMULATED_IRQ_MASKED: AtomicBool = AtomicBool::new(false);

        /// Returns whether IRQs are masked on the executing core.
        pub fn is_local_irq_masked() -> bool {
            EMULATED_IRQ_MASKED.load(Ordering::SeqCst)
        }

        /// Mask IRQs on the executing core.
        pub fn local_irq_mask() {
            EMULATED_IRQ_MASKED.store(true, Ordering::SeqCst);
        }

        /// Unmask IRQs on the executing core.
        pub fn local_irq_unmask() {
            EMULATED_IRQ_MASKED.store(false, Ordering::SeqCst);
        }

        /// Mask IRQs and return the previously saved state.
        pub fn local_irq_mask_save() -> IRQMask {
            IRQMask {
                masked: EMULATED_IRQ_MASKED.swap(true, Ordering::SeqCst),
            }
        }

        /// Restore a previously saved IRQ mask state.
        pub fn local_irq_restore(saved: IRQMask) {
            EMULATED_IRQ_MASKED.store(saved.masked, Ordering::SeqCst);
        }

        /// Print the current IRQ mask state.
        pub fn print_state() {
            crate::info!(
                "      IRQs masked: {}",
                if is_local_irq_masked() { "Masked" } else { "Unmasked" }
            );
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

// Tests that touch the emulated mask flag share process-global state, so
// they serialize on this lock. A poisoned lock is still usable since the
// flag is reset at the start of each test body.
#[cfg(test)]
pub(crate) static TEST_IRQ_SERIAL: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    fn serial_guard() -> std::sync::MutexGuard<'static, ()> {
        TEST_IRQ_SERIAL.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn mask_and_unmask_are_observable() {
        let _serial = serial_guard();
        local_irq_unmask();

        assert!(!is_local_irq_masked());
        local_irq_mask();
        assert!(is_local_irq_masked());
        local_irq_unmask();
        assert!(!is_local_irq_masked());
    }

    #[test]
    fn guard_restores_the_unmasked_state() {
        let _serial = serial_guard();
        local_irq_unmask();

        {
            let _guard = IRQMaskGuard::new();
            assert!(is_local_irq_masked());
        }

        assert!(!is_local_irq_masked());
    }

    #[test]
    fn nested_guards_keep_irqs_masked() {
        let _serial = serial_guard();
        local_irq_unmask();

        {
            let _outer = IRQMaskGuard::new();
            {
                let _inner = IRQMaskGuard::new();
                assert!(is_local_irq_masked());
            }
            // The inner guard restored a masked state, not an unmasked one.
            assert!(is_local_irq_masked());
        }

        assert!(!is_local_irq_masked());
    }

    #[test]
    fn exec_with_irq_masked_brackets_the_closure() {
        let _serial = serial_guard();
        local_irq_unmask();

        let observed = exec_with_irq_masked(is_local_irq_masked);

        assert!(observed);
        assert!(!is_local_irq_masked());
    }
}
