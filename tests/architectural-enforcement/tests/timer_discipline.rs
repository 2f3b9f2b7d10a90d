//! Integration Test: Timer Discipline
//!
//! Every transition commit, reward window, heartbeat and reveal tick in the
//! core is a cancellable timer from `timer.rs`. Raw tokio timers elsewhere
//! would survive logout and fire into a torn-down session.

use architectural_enforcement::{report, scan};

#[test]
fn test_tokio_time_only_in_timer_module() {
    let violations = scan(
        "conductor/core/src",
        &["tokio::time", "time::sleep", "time::interval", "time::timeout"],
        &["timer.rs"],
    );
    report("tokio timers used outside conductor/core/src/timer.rs", &violations);
}

#[test]
fn test_no_thread_sleep_in_production_code() {
    for dir in ["conductor/core/src", "conductor/daemon/src"] {
        let violations = scan(dir, &["thread::sleep"], &[]);
        report("std::thread::sleep in production code", &violations);
    }
}
