/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! GICv2 Driver - ARM Generic Interrupt Controller v2.
//!
//! The driver is split into two parts, the Distributor (GICD) and the CPU
//! interface (GICC). The Distributor performs interrupt prioritization and
//! distribution; the CPU interface handles acknowledge and completion.
//!
//! Handler routing itself lives in the `exception` module's unified vector
//! table; this driver acknowledges the hardware, strips the INTID out of IAR
//! and forwards through [`crate::exception::dispatch_interrupt`].

mod gicc;
mod gicd;

use crate::{
    driver, exception,
    exception::asynchronous::{interface::IRQManager, IRQContext},
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Representation of the GIC.
pub struct GICv2 {
    /// The Distributor.
    gicd: gicd::GICD,

    /// The CPU Interface.
    gicc: gicc::GICC,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl GICv2 {
    /// Highest INTID a GICv2 can implement.
    pub const MAX_IRQ_NUMBER: usize = 1019;

    /// An interrupt at or beyond the most permissive priority-mask value can
    /// never be signaled, so `set_priority` rejects it.
    pub const MAX_PRIORITY: u8 = 0xFF;

    /// IAR values at or above this never correspond to a real interrupt.
    const SPURIOUS_INTID: usize = 1020;

    /// ITARGETSR lane value routing an SPI to the boot core.
    const BOOT_CORE_TARGET_MASK: u8 = 1 << crate::platform::BOOT_CORE_ID;

    /// INTIDs below this are banked per core; their target lanes are
    /// read-only in hardware.
    const FIRST_SPI: usize = 32;

    /// Create an instance.
    ///
    /// # Safety
    ///
    /// - The user must ensure to provide correct MMIO start addresses.
    pub const unsafe fn new(gicd_mmio_start_addr: usize, gicc_mmio_start_addr: usize) -> Self {
        Self {
            gicd: gicd::GICD::new(gicd_mmio_start_addr),
            gicc: gicc::GICC::new(gicc_mmio_start_addr),
        }
    }

    /// Bring the controller from whatever state the boot loader left it in
    /// to Armed:
    ///
    /// 1. Mask the core's IRQ line.
    /// 2. Disable the distributor.
    /// 3. Mask and clear every interrupt group.
    /// 4. Optionally reset the vector table to the default handler.
    /// 5. Accept all priorities on the CPU interface.
    /// 6. Re-enable the distributor and the CPU interface.
    ///
    /// Returns with the core's IRQ line still masked; the caller unmasks via
    /// [`exception::asynchronous::local_irq_unmask`] once it is ready to
    /// take the first interrupt. The sequence is idempotent.
    pub fn init(&self, reset_vector_table: bool) {
        exception::asynchronous::local_irq_mask();

        self.gicd.disable_distributor();
        self.gicd.quiesce();

        if reset_vector_table {
            exception::reset_vector_table();
        }

        self.gicc.priority_accept_all();

        self.gicd.enable_distributor();
        self.gicc.enable();
    }

    /// Enable or disable forwarding of a peripheral interrupt.
    ///
    /// Enabling an SPI also routes it to the boot core. Disabling writes
    /// only the clear-enable bit; priority and target stay untouched.
    pub fn enable(&self, int_no: usize, on: bool) {
        assert!(
            int_no < crate::platform::NUM_PERIPHERAL_IRQS,
            "interrupt number {} out of range",
            int_no
        );

        if on {
            if int_no >= Self::FIRST_SPI {
                self.gicd.set_target(int_no, Self::BOOT_CORE_TARGET_MASK);
            }
            self.gicd.enable(int_no);
        } else {
            self.gicd.disable(int_no);
        }
    }

    /// Whether the interrupt's forwarding bit is set.
    pub fn is_enabled(&self, int_no: usize) -> bool {
        assert!(
            int_no < crate::platform::NUM_PERIPHERAL_IRQS,
            "interrupt number {} out of range",
            int_no
        );

        self.gicd.is_enabled(int_no)
    }

    /// Clear the interrupt's pending bit. Idempotent.
    pub fn clear_pending(&self, int_no: usize) {
        assert!(
            int_no < crate::platform::NUM_PERIPHERAL_IRQS,
            "interrupt number {} out of range",
            int_no
        );

        self.gicd.clear_pending(int_no);
    }

    /// Whether the interrupt's pending bit is set.
    pub fn is_pending(&self, int_no: usize) -> bool {
        assert!(
            int_no < crate::platform::NUM_PERIPHERAL_IRQS,
            "interrupt number {} out of range",
            int_no
        );

        self.gicd.is_pending(int_no)
    }

    /// Program the interrupt's priority. Lower values mean higher priority.
    pub fn set_priority(&self, int_no: usize, priority: u8) {
        assert!(
            int_no < crate::platform::NUM_PERIPHERAL_IRQS,
            "interrupt number {} out of range",
            int_no
        );
        assert!(
            priority < Self::MAX_PRIORITY,
            "priority {} can never be signaled",
            priority
        );

        self.gicd.set_priority(int_no, priority);
    }

    /// Accepted for contract symmetry with `set_priority`, but a no-op:
    /// AArch64 synchronous exceptions have no controller-side priority.
    pub fn set_trap_priority(&self, trap_no: usize, _priority: u8) {
        assert!(
            trap_no < exception::NUM_TRAPS,
            "trap number {} out of range",
            trap_no
        );
    }
}

impl driver::interface::DeviceDriver for GICv2 {
    fn compatible(&self) -> &'static str {
        "GICv2 (ARM Generic Interrupt Controller v2)"
    }

    unsafe fn init(&self) -> Result<(), &'static str> {
        GICv2::init(self, true);

        Ok(())
    }
}

impl IRQManager for GICv2 {
    fn handle_pending_irqs<'irq_context>(&'irq_context self, ic: &IRQContext<'irq_context>) {
        // Extract the highest priority pending IRQ number from the
        // Interrupt Acknowledge Register (IAR).
        let irq_number = self.gicc.pending_irq_number(ic);

        // Guard against spurious IRQs.
        if irq_number >= Self::SPURIOUS_INTID {
            return;
        }

        // Clear the pending bit before the handler runs, then route through
        // the vector table.
        self.clear_pending(irq_number);
        exception::dispatch_interrupt(irq_number);

        // Signal completion of handling.
        self.gicc.mark_completed(irq_number as u32, ic);
    }

    fn dump_registers(&self) {
        self.gicd.dump_registers();
        self.gicc.dump_registers();
    }
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

    const GICD_FAKE_REGS: usize = 0xBFC / 4;
    const GICD_CTLR: usize = 0;
    const GICD_TYPER: usize = 0x004 / 4;
    const GICD_ISENABLER0: usize = 0x100 / 4;
    const GICD_ICENABLER0: usize = 0x180 / 4;
    const GICD_ICPENDR0: usize = 0x280 / 4;
    const GICD_IPRIORITYR0: usize = 0x400 / 4;
    const GICD_ITARGETSR0: usize = 0x800 / 4;

    const GICC_FAKE_REGS: usize = 0x014 / 4;
    const GICC_CTLR: usize = 0;
    const GICC_PMR: usize = 0x004 / 4;
    const GICC_IAR: usize = 0x00C / 4;
    const GICC_EOIR: usize = 0x010 / 4;

    struct FakeGic {
        gicd: [u32; GICD_FAKE_REGS],
        gicc: [u32; GICC_FAKE_REGS],
    }

    impl FakeGic {
        fn new() -> Self {
            let mut gicd = [0; GICD_FAKE_REGS];

            // TYPER: ITLinesNumber = 1, the 64 INTIDs the board routes.
            gicd[GICD_TYPER] = 1;

            Self {
                gicd,
                gicc: [0; GICC_FAKE_REGS],
            }
        }

        fn driver(&mut self) -> GICv2 {
            unsafe {
                GICv2::new(
                    &mut self.gicd as *mut _ as usize,
                    &mut self.gicc as *mut _ as usize,
                )
            }
        }

        /// Fold the write-1-to-clear words into the set-enable view, the way
        /// the hardware aliases ICENABLER onto the enable state ISENABLER
        /// reads back.
        fn settle_enables(&mut self) {
            for group in 0..(crate::platform::NUM_PERIPHERAL_IRQS / 32) {
                self.gicd[GICD_ISENABLER0 + group] &= !self.gicd[GICD_ICENABLER0 + group];
                self.gicd[GICD_ICENABLER0 + group] = 0;
            }
        }
    }

    fn serial_guard() -> std::sync::MutexGuard<'static, ()> {
        crate::exception::asynchronous::TEST_IRQ_SERIAL
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn init_arms_the_controller_and_leaves_irqs_masked() {
        let _serial = serial_guard();
        exception::asynchronous::local_irq_unmask();

        let mut fake = FakeGic::new();
        let gic = fake.driver();

        gic.init(false);

        assert!(exception::asynchronous::is_local_irq_masked());
        assert_eq!(fake.gicd[GICD_CTLR], 1);
        assert_eq!(fake.gicc[GICC_CTLR], 1);
        assert_eq!(fake.gicc[GICC_PMR], 0xFF);
        for group in 0..(crate::platform::NUM_PERIPHERAL_IRQS / 32) {
            assert_eq!(fake.gicd[GICD_ICENABLER0 + group], u32::MAX);
            assert_eq!(fake.gicd[GICD_ICPENDR0 + group], u32::MAX);
        }

        exception::asynchronous::local_irq_unmask();
    }

    #[test]
    fn init_is_idempotent() {
        let _serial = serial_guard();

        let mut fake = FakeGic::new();
        let gic = fake.driver();

        gic.init(false);
        let gicd_after_first = fake.gicd;
        let gicc_after_first = fake.gicc;

        gic.init(false);

        assert_eq!(fake.gicd, gicd_after_first);
        assert_eq!(fake.gicc, gicc_after_first);

        exception::asynchronous::local_irq_unmask();
    }

    #[test]
    fn init_quiesces_groups_beyond_the_board_interrupt_range() {
        let _serial = serial_guard();

        let mut fake = FakeGic::new();

        // Hardware with 96 INTIDs, and a boot loader that left INTID 64
        // enabled and pending.
        fake.gicd[GICD_TYPER] = 2;
        fake.gicd[GICD_ISENABLER0 + 2] = 1;

        let gic = fake.driver();
        gic.init(false);

        assert_eq!(fake.gicd[GICD_ICENABLER0 + 2], u32::MAX);
        assert_eq!(fake.gicd[GICD_ICPENDR0 + 2], u32::MAX);

        exception::asynchronous::local_irq_unmask();
    }

    #[test]
    fn enable_state_round_trips_through_the_api() {
        let _serial = serial_guard();

        let mut fake = FakeGic::new();
        let gic = fake.driver();

        gic.enable(33, true);
        assert!(gic.is_enabled(33));

        gic.enable(33, false);
        fake.settle_enables();
        assert!(!gic.is_enabled(33));
    }

    #[test]
    fn enabling_a_shared_peripheral_also_targets_the_boot_core() {
        let _serial = serial_guard();

        let mut fake = FakeGic::new();
        let gic = fake.driver();

        gic.enable(33, true);

        assert_eq!(fake.gicd[GICD_ISENABLER0 + 1], 1 << 1);
        assert_eq!(fake.gicd[GICD_ITARGETSR0 + 8], 0x0000_0100);
    }

    #[test]
    fn enabling_a_banked_interrupt_leaves_the_target_lane_alone() {
        let _serial = serial_guard();

        let mut fake = FakeGic::new();
        let gic = fake.driver();

        gic.enable(5, true);

        assert_eq!(fake.gicd[GICD_ISENABLER0], 1 << 5);
        assert_eq!(fake.gicd[GICD_ITARGETSR0 + 1], 0);
    }

    #[test]
    fn disable_leaves_priority_and_target_untouched() {
        let _serial = serial_guard();

        let mut fake = FakeGic::new();
        let gic = fake.driver();

        gic.enable(33, true);
        gic.set_priority(33, 0xA0);
        let priority_word = fake.gicd[GICD_IPRIORITYR0 + 8];
        let target_word = fake.gicd[GICD_ITARGETSR0 + 8];

        gic.enable(33, false);

        assert_eq!(fake.gicd[GICD_ICENABLER0 + 1], 1 << 1);
        assert_eq!(fake.gicd[GICD_IPRIORITYR0 + 8], priority_word);
        assert_eq!(fake.gicd[GICD_ITARGETSR0 + 8], target_word);
    }

    static HANDLED_IRQ: AtomicUsize = AtomicUsize::new(usize::MAX);

    fn irq_recorder(int_no: usize) {
        HANDLED_IRQ.store(int_no, Ordering::SeqCst);
    }

    #[test]
    fn pending_irq_is_acknowledged_dispatched_and_completed() {
        let _serial = serial_guard();

        let mut fake = FakeGic::new();
        let gic = fake.driver();
        let token = unsafe { IRQContext::new() };

        exception::install_handler(21, irq_recorder);
        fake.gicc[GICC_IAR] = 21;

        gic.handle_pending_irqs(&token);

        assert_eq!(HANDLED_IRQ.load(Ordering::SeqCst), 21);
        // Pending clear was written for INTID 21, completion for the same
        // number the acknowledge returned.
        assert_eq!(fake.gicd[GICD_ICPENDR0], 1 << 21);
        assert_eq!(fake.gicc[GICC_EOIR], 21);
    }

    #[test]
    fn spurious_intid_is_neither_dispatched_nor_completed() {
        let _serial = serial_guard();

        let mut fake = FakeGic::new();
        let gic = fake.driver();
        let token = unsafe { IRQContext::new() };

        fake.gicc[GICC_IAR] = 1023;

        gic.handle_pending_irqs(&token);

        assert_eq!(fake.gicc[GICC_EOIR], 0);
        assert_eq!(fake.gicd[GICD_ICPENDR0], 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn enable_is_bounds_checked() {
        let _serial = serial_guard();

        let mut fake = FakeGic::new();
        let gic = fake.driver();

        gic.enable(crate::platform::NUM_PERIPHERAL_IRQS, true);
    }

    #[test]
    #[should_panic(expected = "can never be signaled")]
    fn most_permissive_priority_is_rejected() {
        let _serial = serial_guard();

        let mut fake = FakeGic::new();
        let gic = fake.driver();

        gic.set_priority(3, GICv2::MAX_PRIORITY);
    }

    #[test]
    fn trap_priority_is_accepted_but_inert() {
        let _serial = serial_guard();

        let mut fake = FakeGic::new();
        let gicd_before = fake.gicd;
        let gic = fake.driver();

        gic.set_trap_priority(4, 0x40);

        assert_eq!(fake.gicd, gicd_before);
    }

    #[test]
    #[should_panic(expected = "trap number 16 out of range")]
    fn trap_priority_is_bounds_checked() {
        let _serial = serial_guard();

        let mut fake = FakeGic::new();
        let gic = fake.driver();

        gic.set_trap_priority(exception::NUM_TRAPS, 0x40);
    }
}
