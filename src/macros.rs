/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

/// Macro similar to [std](https://doc.rust-lang.org/src/std/macros.rs.html)
/// but for writing into the registered kernel console.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::macros::_print(format_args!($($arg)*)));
}

/// Macro similar to [std](https://doc.rust-lang.org/src/std/macros.rs.html)
/// but for writing into the registered kernel console.
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($format_string:expr) => ({
        $crate::macros::_print(format_args!(concat!($format_string, "\n")));
    });
    ($format_string:expr, $($arg:tt)*) => ({
        $crate::macros::_print(format_args!(concat!($format_string, "\n"), $($arg)*));
    })
}

/// Prints info text, with a newline.
#[macro_export]
macro_rules! info {
    ($format_string:expr) => ({
        $crate::macros::_print(format_args!(concat!("[i] ", $format_string, "\n")));
    });
    ($format_string:expr, $($arg:tt)*) => ({
        $crate::macros::_print(format_args!(concat!("[i] ", $format_string, "\n"), $($arg)*));
    })
}

/// Prints warning text, with a newline.
#[macro_export]
macro_rules! warn {
    ($format_string:expr) => ({
        $crate::macros::_print(format_args!(concat!("[w] ", $format_string, "\n")));
    });
    ($format_string:expr, $($arg:tt)*) => ({
        $crate::macros::_print(format_args!(concat!("[w] ", $format_string, "\n"), $($arg)*));
    })
}

#[doc(hidden)]
pub fn _print(args: core::fmt::Arguments) {
    crate::console::console().write_fmt(args).unwrap();
}
