//! Integration Test: Async I/O
//!
//! Network calls run on the tokio runtime, never through blocking clients.

use architectural_enforcement::{report, scan};

#[test]
fn test_no_blocking_network_clients() {
    for dir in ["conductor/core/src", "conductor/daemon/src"] {
        let violations = scan(
            dir,
            &["reqwest::blocking", "std::net::UdpSocket", "std::net::TcpStream"],
            &[],
        );
        report("blocking network client in production code", &violations);
    }
}
