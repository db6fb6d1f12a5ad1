/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Board support for the QEMU `virt` machine.
//!
//! All configuration is compile-time: the memory map, the interrupt range
//! and the boot core are properties of the machine, not runtime knobs.

use {
    crate::{driver, exception, platform::device_driver},
    core::sync::atomic::{AtomicBool, Ordering},
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// The board's physical memory map.
pub mod memory_map {
    /// Memory-mapped peripherals.
    pub mod mmio {
        /// GIC Distributor.
        pub const GICD_START: usize = 0x0800_0000;

        /// GIC CPU interface.
        pub const GICC_START: usize = 0x0801_0000;
    }
}

/// Peripheral interrupt IDs the board wires up. QEMU `virt` keeps its
/// peripherals (UART, RTC, PCIe, virtio) well below this.
pub const NUM_PERIPHERAL_IRQS: usize = 64;

/// The core the boot loader starts on; all interrupts are routed to it.
pub const BOOT_CORE_ID: usize = 0;

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static INTERRUPT_CONTROLLER: device_driver::GICv2 = unsafe {
    device_driver::GICv2::new(memory_map::mmio::GICD_START, memory_map::mmio::GICC_START)
};

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

/// This must be called only after successful init of the interrupt
/// controller driver.
fn post_init_interrupt_controller() -> Result<(), &'static str> {
    exception::asynchronous::register_irq_manager(&INTERRUPT_CONTROLLER);
    crate::info!("[0] Interrupt controller is live!");
    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Return a reference to the board's interrupt controller.
pub fn interrupt_controller() -> &'static device_driver::GICv2 {
    &INTERRUPT_CONTROLLER
}

/// Bring up the board: vector table base first, then the driver subsystem.
///
/// Returns with IRQs still masked on the boot core. The caller unmasks via
/// [`exception::asynchronous::local_irq_unmask`] when it is ready.
///
/// # Safety
///
/// - Must only be called once, by the boot core, early during kernel init.
pub unsafe fn init() -> Result<(), &'static str> {
    static INIT_DONE: AtomicBool = AtomicBool::new(false);
    if INIT_DONE.load(Ordering::Relaxed) {
        return Err("Init already done");
    }

    #[cfg(target_arch = "aarch64")]
    exception::handling_init();

    let controller_descriptor = driver::DeviceDriverDescriptor::new(
        &INTERRUPT_CONTROLLER,
        Some(post_init_interrupt_controller),
    );
    driver::driver_manager().register_driver(controller_descriptor);

    driver::driver_manager().init_drivers();

    INIT_DONE.store(true, Ordering::Relaxed);
    Ok(())
}
