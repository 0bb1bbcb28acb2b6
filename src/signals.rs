use core::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

static SIGINT: AtomicBool = AtomicBool::new(false);

/// Set once Ctrl-C or SIGTERM arrived. Running solvers are killed and no
/// new graphs are scheduled.
pub fn received_ctrl_c() -> bool {
    SIGINT.load(Ordering::SeqCst)
}

#[cfg(feature = "handle-ctrlc")]
pub fn initialize() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        SIGINT.store(true, Ordering::SeqCst);
    })
}
