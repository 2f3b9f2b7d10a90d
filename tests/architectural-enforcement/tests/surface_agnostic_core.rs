//! Integration Test: Surface-Agnostic Core
//!
//! The core renders only through `PetDisplay`; writing to the terminal is
//! the daemon's job.

use architectural_enforcement::{report, scan};

#[test]
fn test_core_never_prints() {
    let violations = scan(
        "conductor/core/src",
        &["println!", "print!(", "eprintln!", "eprint!(", "io::stdout", "io::stderr"],
        &[],
    );
    report("terminal output from conductor/core", &violations);
}
