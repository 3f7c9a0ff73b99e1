//! Utility macros and functions for the client crate.
//!
//! This module provides helper macros that are used internally
//! by the client implementation.

/// A macro for early returns with an error if a condition is not met.
///
/// This is similar to the `assert!` macro, but returns an error instead of panicking.
/// It is used for capacity and state checks where the operation must leave
/// everything untouched when the condition does not hold.
///
/// # Example
///
/// ```ignore
/// ensure!(required <= capacity, BufferOverflow::new(required, capacity));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
