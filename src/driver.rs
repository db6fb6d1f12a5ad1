/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Driver support.

use crate::{
    info,
    synchronization::{interface::Mutex, IRQSafeNullLock},
};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

const NUM_DRIVERS: usize = 3;

struct DriverManagerInner {
    next_index: usize,
    descriptors: [Option<DeviceDriverDescriptor>; NUM_DRIVERS],
}

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Driver interfaces.
pub mod interface {
    /// Device Driver functions.
    pub trait DeviceDriver {
        /// Return a compatibility string for identifying the driver.
        fn compatible(&self) -> &'static str;

        /// Called by the kernel to bring up the device.
        /// The default implementation does nothing.
        ///
        /// # Safety
        ///
        /// - During init, drivers might do things with system-wide impact.
        unsafe fn init(&self) -> Result<(), &'static str> {
            Ok(())
        }
    }
}

/// Type to be used as an optional callback after a driver's init() has run.
pub type DeviceDriverPostInitCallback = unsafe fn() -> Result<(), &'static str>;

/// A descriptor for device drivers.
#[derive(Copy, Clone)]
pub struct DeviceDriverDescriptor {
    device_driver: &'static (dyn interface::DeviceDriver + Sync),
    post_init_callback: Option<DeviceDriverPostInitCallback>,
}

/// Provides device driver management functions.
pub struct DriverManager {
    inner: IRQSafeNullLock<DriverManagerInner>,
}

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static DRIVER_MANAGER: DriverManager = DriverManager::new();

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl DriverManagerInner {
    pub const fn new() -> Self {
        Self {
            next_index: 0,
            descriptors: [None; NUM_DRIVERS],
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Return a reference to the global DriverManager.
pub fn driver_manager() -> &'static DriverManager {
    &DRIVER_MANAGER
}

impl DeviceDriverDescriptor {
    /// Create an instance.
    pub fn new(
        device_driver: &'static (dyn interface::DeviceDriver + Sync),
        post_init_callback: Option<DeviceDriverPostInitCallback>,
    ) -> Self {
        Self {
            device_driver,
            post_init_callback,
        }
    }
}

impl DriverManager {
    /// Create an instance.
    pub const fn new() -> Self {
        Self {
            inner: IRQSafeNullLock::new(DriverManagerInner::new()),
        }
    }

    /// Register a device driver with the kernel.
    pub fn register_driver(&self, descriptor: DeviceDriverDescriptor) {
        self.inner.lock(|inner| {
            assert!(inner.next_index < NUM_DRIVERS);
            inner.descriptors[inner.next_index] = Some(descriptor);
            inner.next_index += 1;
        })
    }

    /// Helper for iterating over registered drivers.
    fn for_each_descriptor(&self, f: impl FnMut(&DeviceDriverDescriptor)) {
        self.inner.lock(|inner| {
            inner
                .descriptors
                .iter()
                .filter_map(|x| x.as_ref())
                .for_each(f)
        })
    }

    /// Fully initialize all drivers.
    ///
    /// # Safety
    ///
    /// - During init, drivers might do things with system-wide impact.
    pub unsafe fn init_drivers(&self) {
        self.for_each_descriptor(|descriptor| {
            // 1. Initialize driver.
            if let Err(x) = descriptor.device_driver.init() {
                panic!(
                    "Error initializing driver: {}: {}",
                    descriptor.device_driver.compatible(),
                    x
                );
            }

            // 2. Call corresponding post init callback.
            if let Some(callback) = &descriptor.post_init_callback {
                if let Err(x) = callback() {
                    panic!(
                        "Error during driver post-init callback: {}: {}",
                        descriptor.device_driver.compatible(),
                        x
                    );
                }
            }
        });
    }

    /// Enumerate all registered device drivers.
    pub fn enumerate(&self) {
        let mut i: usize = 1;
        self.for_each_descriptor(|descriptor| {
            info!("      {}. {}", i, descriptor.device_driver.compatible());

            i += 1;
        });
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

    static INIT_CALLS: AtomicUsize = AtomicUsize::new(0);
    static CALLBACK_CALLS: AtomicUsize = AtomicUsize::new(0);

    struct FakeDriver;

    impl interface::DeviceDriver for FakeDriver {
        fn compatible(&self) -> &'static str {
            "Fake Driver"
        }

        unsafe fn init(&self) -> Result<(), &'static str> {
            INIT_CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    static FAKE_DRIVER: FakeDriver = FakeDriver;

    unsafe fn fake_post_init() -> Result<(), &'static str> {
        CALLBACK_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    // IRQSafeNullLock toggles the host-emulated IRQ mask flag, so these
    // tests serialize with the masking tests.
    fn serial_guard() -> std::sync::MutexGuard<'static, ()> {
        crate::exception::asynchronous::TEST_IRQ_SERIAL
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn init_runs_driver_init_then_post_init_callback() {
        let _serial = serial_guard();
        let manager = DriverManager::new();

        manager.register_driver(DeviceDriverDescriptor::new(
            &FAKE_DRIVER,
            Some(fake_post_init),
        ));

        unsafe { manager.init_drivers() };

        assert_eq!(INIT_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(CALLBACK_CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic]
    fn overflowing_the_descriptor_table_asserts() {
        let _serial = serial_guard();
        let manager = DriverManager::new();

        for _ in 0..=NUM_DRIVERS {
            manager.register_driver(DeviceDriverDescriptor::new(&FAKE_DRIVER, None));
        }
    }
}
