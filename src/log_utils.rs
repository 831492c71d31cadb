pub use log::debug;

/// Emit a debug message when either the global debug log level is active or a local debug flag
/// is set
///
/// With the local flag set, the message goes straight to stderr regardless of log level. This is
/// used for detailed per-window traces that would be too verbose for the normal debug log.
///
/// # Examples
///
/// ```ignore
/// debug_msg!(false, "Window {} median {}", pos, median); // log at debug level only
/// debug_msg!(true, "Window {} median {}", pos, median); // always print to stderr
/// ```
macro_rules! debug_msg {
    ($flag:expr, $($arg:tt)+) => {
        if $flag {
            eprintln!($($arg)+);
        } else {
            $crate::log_utils::debug!($($arg)+);
        }
    }
}

pub(crate) use debug_msg;
