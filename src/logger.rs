//! Best-effort debug tracing.
//!
//! Every listener carries its own sink; nothing here is process-global.

use std::fmt;
use std::sync::Arc;


/// A diagnostic sink. Purely advisory, never consulted for control flow.
pub trait DebugLog: Send + Sync {
    fn debugf(&self, args: fmt::Arguments<'_>);
}


impl<L: DebugLog + ?Sized> DebugLog for Arc<L> {
    fn debugf(&self, args: fmt::Arguments<'_>) {
        (**self).debugf(args)
    }
}


/// Forwards to the `log` crate at debug level, under this crate's target.
/// Without an installed logger this is silent.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFacade;

impl DebugLog for LogFacade {
    fn debugf(&self, args: fmt::Arguments<'_>) {
        ::log::debug!("{}", args);
    }
}


/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLog;

impl DebugLog for NullLog {
    fn debugf(&self, _args: fmt::Arguments<'_>) {}
}


macro_rules! debugf {
    ($sink:expr, $($arg:tt)+) => {{
        use $crate::logger::DebugLog as _;
        $sink.debugf(format_args!($($arg)+))
    }};
}
