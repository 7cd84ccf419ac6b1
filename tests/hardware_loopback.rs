//! Hardware loopback tests.
//!
//! These need a real serial port with TX wired to RX and are ignored by
//! default. Run with:
//!
//! ```text
//! TEST_PORT=/dev/ttyUSB0 TEST_LOOPBACK=1 cargo test --features hardware-tests -- --ignored
//! ```

#![cfg(feature = "hardware-tests")]

mod common;

use common::{data_of, eventually, EventLog};
use serial_session::config::TestingConfig;
use serial_session::{list_ports, ConfigLoader, PartialSettings, PortDescriptor, SessionState};

/// Testing section from config plus `TEST_*` overrides, if a loopback port
/// is configured.
fn loopback_config() -> Option<TestingConfig> {
    let loader = ConfigLoader::load().ok()?;
    let testing = loader.into_config().testing;
    match (&testing.port, testing.loopback_enabled) {
        (Some(_), true) => Some(testing),
        _ => {
            eprintln!("No loopback port configured (set TEST_PORT and TEST_LOOPBACK=1); skipping");
            None
        }
    }
}

fn settings_for(testing: &TestingConfig) -> PartialSettings {
    PartialSettings {
        baud_rate: Some(i64::from(testing.baud)),
        timeout_ms: Some(20),
        ..Default::default()
    }
}

#[test]
#[ignore]
fn test_hardware_echo_single_byte() {
    let Some(testing) = loopback_config() else {
        return;
    };
    let Some(path) = testing.port.clone() else {
        return;
    };

    let log = EventLog::new();
    let port = PortDescriptor::from_path(path)
        .session()
        .settings(settings_for(&testing))
        .spawn(log.clone())
        .expect("settings should resolve");

    port.write(vec![0x41]).unwrap();
    assert!(
        log.wait_for(testing.timeout(), |events| !events.is_empty()),
        "nothing came back within {:?}",
        testing.timeout()
    );
    assert_eq!(log.error_count(), 0, "unexpected errors on loopback");
    assert_eq!(log.data(), vec![0x41]);
    port.close();
}

#[test]
#[ignore]
fn test_hardware_echo_burst() {
    let Some(testing) = loopback_config() else {
        return;
    };
    let Some(path) = testing.port.clone() else {
        return;
    };

    let log = EventLog::new();
    let port = PortDescriptor::from_path(path)
        .session()
        .settings(settings_for(&testing))
        .spawn(log.clone())
        .expect("settings should resolve");

    let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    for chunk in payload.chunks(100) {
        port.write(chunk).unwrap();
    }

    let received = log.wait_for(testing.timeout() * 4, |events| {
        data_of(events).len() >= payload.len()
    });
    port.close();
    assert!(received, "only {} of {} bytes came back", log.data().len(), payload.len());
    assert_eq!(log.data(), payload);
}

#[test]
#[ignore]
fn test_hardware_close_releases_port() {
    let Some(testing) = loopback_config() else {
        return;
    };
    let Some(path) = testing.port.clone() else {
        return;
    };

    for _ in 0..3 {
        let log = EventLog::new();
        let port = PortDescriptor::from_path(path.clone())
            .session()
            .settings(settings_for(&testing))
            .spawn(log.clone())
            .expect("settings should resolve");
        assert!(eventually(testing.timeout(), || {
            port.state() == SessionState::Running
        }));
        port.close();
        assert_eq!(port.state(), SessionState::Closed);
        // Reopening right away fails unless the handle was released.
        assert_eq!(log.error_count(), 0);
    }
}

#[test]
#[ignore]
fn test_hardware_port_is_listed() {
    let Some(testing) = loopback_config() else {
        return;
    };
    let ports = list_ports().expect("enumeration should work on a test rig");
    for port in &ports {
        eprintln!("  {port}");
    }
    let wanted = testing.port.unwrap_or_default();
    assert!(
        ports.iter().any(|p| p.path() == wanted),
        "{wanted} not among enumerated ports"
    );
}
