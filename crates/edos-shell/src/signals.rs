//! Process-exit hooks for the disk.
//!
//! Normal exits and panics save the disk through [`ArchiveStore`]'s `Drop`.
//! Termination signals bypass destructors, so a watcher thread saves it
//! before exiting. The watcher only holds a weak reference and never keeps
//! the store alive. SIGKILL cannot be caught; changes since the last save are
//! lost.

use std::io;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread;

use edos_disk::ArchiveStore;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{error, info};

/// Save the disk on SIGTERM or SIGHUP, then exit with `128 + signal`.
///
/// SIGINT is recorded instead of killing the shell, so Ctrl-C while an
/// external program runs only stops that program.
pub fn install_exit_hooks(store: &Arc<Mutex<ArchiveStore>>) -> io::Result<()> {
    signal_hook::flag::register(SIGINT, Arc::new(AtomicBool::new(false)))?;

    let store: Weak<Mutex<ArchiveStore>> = Arc::downgrade(store);
    let mut signals = Signals::new([SIGTERM, SIGHUP])?;
    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let _ = crossterm::terminal::disable_raw_mode();
            info!(signal = sig, "termination signal, saving disk");
            // Gone means the store was already dropped, and saved with it.
            if let Some(store) = store.upgrade() {
                let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
                if let Err(e) = store.shutdown() {
                    error!(error = %e, "failed to save disk on signal");
                    eprintln!("eDOS: failed to save disk: {e}");
                }
            }
            std::process::exit(128 + sig);
        }
    });

    Ok(())
}
