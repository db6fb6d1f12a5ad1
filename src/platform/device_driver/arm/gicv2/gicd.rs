/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! GICD Driver - GIC Distributor.
//!
//! # Glossary
//!   - SPI - Shared Peripheral Interrupt.
//!
//! The first 32 INTIDs are banked per core in hardware; since all interrupts
//! are routed to the boot core, the distributor is driven through one
//! uniform register view. Multi-register read-modify-write sequences go
//! through the IRQ-safe lock so they are perceived as a unit.

use {
    crate::{
        info,
        platform::device_driver::common::MMIODerefWrapper,
        synchronization::{interface::Mutex, IRQSafeNullLock},
    },
    tock_registers::{
        interfaces::{Readable, Writeable},
        register_bitfields, register_structs,
        registers::{ReadOnly, ReadWrite},
    },
};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

register_bitfields! {
    u32,

    /// Distributor Control Register
    CTLR [
        Enable OFFSET(0) NUMBITS(1) []
    ],

    /// Interrupt Controller Type Register
    TYPER [
        ITLinesNumber OFFSET(0)  NUMBITS(5) []
    ]
}

register_structs! {
    #[allow(non_snake_case)]
    RegisterBlock {
        (0x000 => CTLR: ReadWrite<u32, CTLR::Register>),
        (0x004 => TYPER: ReadOnly<u32, TYPER::Register>),
        (0x008 => IIDR: ReadOnly<u32>),
        (0x00C => _reserved1),
        (0x100 => ISENABLER: [ReadWrite<u32>; 32]),
        (0x180 => ICENABLER: [ReadWrite<u32>; 32]),
        (0x200 => ISPENDR: [ReadWrite<u32>; 32]),
        (0x280 => ICPENDR: [ReadWrite<u32>; 32]),
        (0x300 => _reserved2),
        (0x400 => IPRIORITYR: [ReadWrite<u32>; 255]),
        (0x7FC => _reserved3),
        (0x800 => ITARGETSR: [ReadWrite<u32>; 255]),
        (0xBFC => @END),
    }
}

/// Abstraction for the associated MMIO registers.
type Registers = MMIODerefWrapper<RegisterBlock>;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Representation of the GIC Distributor.
pub struct GICD {
    registers: IRQSafeNullLock<Registers>,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl GICD {
    /// Number of 32-interrupt groups the driver manages.
    const NUM_GROUPS: usize = crate::platform::NUM_PERIPHERAL_IRQS / 32;

    /// Create an instance.
    ///
    /// # Safety
    ///
    /// - The user must ensure to provide a correct MMIO start address.
    pub const unsafe fn new(mmio_start_addr: usize) -> Self {
        Self {
            registers: IRQSafeNullLock::new(Registers::new(mmio_start_addr)),
        }
    }

    /// Set the distributor's group-enable bit.
    pub fn enable_distributor(&self) {
        self.registers
            .lock(|regs| regs.CTLR.write(CTLR::Enable::SET));
    }

    /// Clear the distributor's group-enable bit. No interrupt is forwarded
    /// to any CPU interface afterwards.
    pub fn disable_distributor(&self) {
        self.registers
            .lock(|regs| regs.CTLR.write(CTLR::Enable::CLEAR));
    }

    /// Mask every interrupt and clear every pending bit, group by group,
    /// for as many groups as the hardware reports in TYPER.
    ///
    /// Establishes a deterministic quiesced state regardless of what a boot
    /// loader left behind, including sources beyond the range the board
    /// routes. Write-1-to-clear semantics make this idempotent.
    pub fn quiesce(&self) {
        let num_groups = self.num_supported_irqs() / 32;

        self.registers.lock(|regs| {
            for group in 0..num_groups {
                regs.ICENABLER[group].set(u32::MAX);
                regs.ICPENDR[group].set(u32::MAX);
            }
        });
    }

    /// Forward the interrupt to the CPU interface (write-1-to-set).
    pub fn enable(&self, int_no: usize) {
        let (group, bit) = (int_no / 32, int_no % 32);

        self.registers
            .lock(|regs| regs.ISENABLER[group].set(1 << bit));
    }

    /// Stop forwarding the interrupt (write-1-to-clear). Priority and target
    /// configuration is left untouched.
    pub fn disable(&self, int_no: usize) {
        let (group, bit) = (int_no / 32, int_no % 32);

        self.registers
            .lock(|regs| regs.ICENABLER[group].set(1 << bit));
    }

    /// Whether the interrupt's forwarding bit is set.
    pub fn is_enabled(&self, int_no: usize) -> bool {
        let (group, bit) = (int_no / 32, int_no % 32);

        self.registers
            .lock(|regs| regs.ISENABLER[group].get() & (1 << bit) != 0)
    }

    /// Clear the interrupt's pending bit (write-1-to-clear, idempotent).
    pub fn clear_pending(&self, int_no: usize) {
        let (group, bit) = (int_no / 32, int_no % 32);

        self.registers
            .lock(|regs| regs.ICPENDR[group].set(1 << bit));
    }

    /// Whether the interrupt's pending bit is set.
    pub fn is_pending(&self, int_no: usize) -> bool {
        let (group, bit) = (int_no / 32, int_no % 32);

        self.registers
            .lock(|regs| regs.ISPENDR[group].get() & (1 << bit) != 0)
    }

    /// Program the interrupt's priority byte lane.
    pub fn set_priority(&self, int_no: usize, priority: u8) {
        let (reg, lane) = (int_no / 4, (int_no % 4) * 8);

        self.registers.lock(|regs| {
            let word = regs.IPRIORITYR[reg].get() & !(0xFFu32 << lane);
            regs.IPRIORITYR[reg].set(word | (priority as u32) << lane);
        });
    }

    /// Program the interrupt's target-core byte lane.
    ///
    /// Only meaningful for SPIs; the lanes of the first 32 INTIDs are
    /// read-only in hardware.
    pub fn set_target(&self, int_no: usize, target: u8) {
        let (reg, lane) = (int_no / 4, (int_no % 4) * 8);

        self.registers.lock(|regs| {
            let word = regs.ITARGETSR[reg].get() & !(0xFFu32 << lane);
            regs.ITARGETSR[reg].set(word | (target as u32) << lane);
        });
    }

    /// Highest INTID the hardware supports, as reported by TYPER.
    pub fn num_supported_irqs(&self) -> usize {
        self.registers
            .lock(|regs| (regs.TYPER.read(TYPER::ITLinesNumber) as usize + 1) * 32)
    }

    /// Print the distributor register state.
    pub fn dump_registers(&self) {
        self.registers.lock(|regs| {
            info!("GICD_CTLR  = {:#010x}", regs.CTLR.get());
            info!("GICD_TYPER = {:#010x}", regs.TYPER.get());
            info!("GICD_IIDR  = {:#010x}", regs.IIDR.get());

            for group in 0..Self::NUM_GROUPS {
                info!(
                    "GICD_ISENABLER[{}] = {:#010x}",
                    group,
                    regs.ISENABLER[group].get()
                );
                info!(
                    "GICD_ISPENDR[{}]   = {:#010x}",
                    group,
                    regs.ISPENDR[group].get()
                );
            }

            for reg in 0..(crate::platform::NUM_PERIPHERAL_IRQS / 4) {
                info!(
                    "GICD_IPRIORITYR[{}] = {:#010x}   GICD_ITARGETSR[{}] = {:#010x}",
                    reg,
                    regs.IPRIORITYR[reg].get(),
                    reg,
                    regs.ITARGETSR[reg].get()
                );
            }
        });
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const NUM_FAKE_REGS: usize = 0xBFC / 4;

    const ISENABLER0: usize = 0x100 / 4;
    const ICENABLER0: usize = 0x180 / 4;
    const ISPENDR0: usize = 0x200 / 4;
    const ICPENDR0: usize = 0x280 / 4;
    const IPRIORITYR0: usize = 0x400 / 4;
    const ITARGETSR0: usize = 0x800 / 4;

    fn serial_guard() -> std::sync::MutexGuard<'static, ()> {
        crate::exception::asynchronous::TEST_IRQ_SERIAL
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn enable_and_disable_write_the_group_bit() {
        let _serial = serial_guard();
        let mut reg = [0u32; NUM_FAKE_REGS];
        let gicd = unsafe { GICD::new(&mut reg as *mut _ as usize) };

        gicd.enable(33);
        assert_eq!(reg[ISENABLER0 + 1], 1 << 1);

        gicd.disable(33);
        assert_eq!(reg[ICENABLER0 + 1], 1 << 1);

        gicd.enable(5);
        assert_eq!(reg[ISENABLER0], 1 << 5);
    }

    #[test]
    fn enabled_and_pending_bits_are_observable() {
        let _serial = serial_guard();
        let mut reg = [0u32; NUM_FAKE_REGS];
        let gicd = unsafe { GICD::new(&mut reg as *mut _ as usize) };

        assert!(!gicd.is_enabled(42));
        reg[ISENABLER0 + 1] = 1 << 10;
        assert!(gicd.is_enabled(42));

        assert!(!gicd.is_pending(42));
        reg[ISPENDR0 + 1] = 1 << 10;
        assert!(gicd.is_pending(42));
    }

    #[test]
    fn clear_pending_writes_only_the_interrupt_bit() {
        let _serial = serial_guard();
        let mut reg = [0u32; NUM_FAKE_REGS];
        let gicd = unsafe { GICD::new(&mut reg as *mut _ as usize) };

        gicd.clear_pending(5);
        assert_eq!(reg[ICPENDR0], 1 << 5);

        // Idempotent: same write again.
        gicd.clear_pending(5);
        assert_eq!(reg[ICPENDR0], 1 << 5);
    }

    #[test]
    fn priority_write_preserves_sibling_lanes() {
        let _serial = serial_guard();
        let mut reg = [0u32; NUM_FAKE_REGS];
        let gicd = unsafe { GICD::new(&mut reg as *mut _ as usize) };

        // INTID 32 already carries a priority in lane 0.
        reg[IPRIORITYR0 + 8] = 0x0000_00FF;

        gicd.set_priority(33, 0xA0);
        assert_eq!(reg[IPRIORITYR0 + 8], 0x0000_A0FF);
    }

    #[test]
    fn target_write_preserves_sibling_lanes() {
        let _serial = serial_guard();
        let mut reg = [0u32; NUM_FAKE_REGS];
        let gicd = unsafe { GICD::new(&mut reg as *mut _ as usize) };

        reg[ITARGETSR0 + 8] = 0x0000_0001;

        gicd.set_target(34, 0b0000_0001);
        assert_eq!(reg[ITARGETSR0 + 8], 0x0001_0001);
    }

    #[test]
    fn quiesce_covers_every_hardware_reported_group() {
        let _serial = serial_guard();
        let mut reg = [0u32; NUM_FAKE_REGS];
        let gicd = unsafe { GICD::new(&mut reg as *mut _ as usize) };

        // TYPER: ITLinesNumber = 2, so 96 supported INTIDs in 3 groups.
        reg[1] = 2;

        assert_eq!(gicd.num_supported_irqs(), 96);

        gicd.quiesce();

        for group in 0..3 {
            assert_eq!(reg[ICENABLER0 + group], u32::MAX);
            assert_eq!(reg[ICPENDR0 + group], u32::MAX);
        }
        assert_eq!(reg[ICENABLER0 + 3], 0);
        assert_eq!(reg[ICPENDR0 + 3], 0);
    }

    #[test]
    fn distributor_enable_toggles_ctlr() {
        let _serial = serial_guard();
        let mut reg = [0u32; NUM_FAKE_REGS];
        let gicd = unsafe { GICD::new(&mut reg as *mut _ as usize) };

        gicd.enable_distributor();
        assert_eq!(reg[0], 1);

        gicd.disable_distributor();
        assert_eq!(reg[0], 0);
    }
}
