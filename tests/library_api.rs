/*
 * library_api.rs
 *
 * integration-style tests exercising procwrap as a library.
 *
 * goal: the validation, decoding, and report layers are usable without
 * shelling out to the CLI. supervise() itself stays out of here - it
 * installs process-wide handlers and masks, which the threaded test
 * harness must not inherit; the binary covers it in tests/integration.rs.
 */

use procwrap::config::{MAX_TIMEOUT_SECS, SupervisionConfig};
use procwrap::error::{SupervisorError, exit_codes};
use procwrap::process::{DecodedStatus, ExitStatus, StatusKind};
use procwrap::report::UsageReport;
use procwrap::rusage::ResourceUsage;
use procwrap::signal::Signal;

fn args(a: &str, b: &str) -> Vec<String> {
    vec![a.to_string(), b.to_string()]
}

/* =========================================================================
 * CONFIG VALIDATION
 * ========================================================================= */

#[test]
fn library_config_accepts_open_fd_and_sane_timeout() {
    /* stderr is open in any test process */
    let cfg = SupervisionConfig::from_args(&args("2", "15")).expect("valid config");
    assert_eq!(cfg.output_fd, 2);
    assert_eq!(cfg.timeout_secs, 15);
    assert_eq!(cfg.term_signal, Signal::Kill);
    assert!(cfg.preserve_child_status);
}

#[test]
fn library_config_range_is_inclusive() {
    assert!(SupervisionConfig::from_args(&args("2", "1")).is_ok());
    assert!(
        SupervisionConfig::from_args(&args("2", &MAX_TIMEOUT_SECS.to_string())).is_ok()
    );
    assert!(matches!(
        SupervisionConfig::from_args(&args("2", "61")),
        Err(SupervisorError::TimeoutOutOfRange(61))
    ));
}

#[test]
fn library_config_errors_map_to_exit_2() {
    let errs = [
        SupervisionConfig::from_args(&[]).unwrap_err(),
        SupervisionConfig::from_args(&args("2", "nope")).unwrap_err(),
        SupervisionConfig::from_args(&args("931", "5")).unwrap_err(),
    ];
    for err in errs {
        assert_eq!(err.exit_code(), exit_codes::USAGE);
    }
}

/* =========================================================================
 * STATUS DECODING
 * ========================================================================= */

#[test]
fn library_status_decoding_covers_the_schema() {
    /* Linux encodings: code<<8 exited, sig signaled, |0x80 dumped */
    let exited = ExitStatus::from_raw(7 << 8).decode();
    assert_eq!((exited.kind, exited.value), (StatusKind::Exited, 7));

    let killed = ExitStatus::from_raw(libc::SIGKILL).decode();
    assert_eq!((killed.kind, killed.value), (StatusKind::Killed, 9));

    let dumped = ExitStatus::from_raw(libc::SIGABRT | 0x80).decode();
    assert_eq!(
        (dumped.kind, dumped.value),
        (StatusKind::CoreDump, libc::SIGABRT)
    );

    let unknown = DecodedStatus::unknown();
    assert_eq!((unknown.kind, unknown.value), (StatusKind::Unknown, -1));
}

/* =========================================================================
 * REPORT EMISSION
 * ========================================================================= */

#[test]
fn library_report_roundtrip_through_a_pipe() {
    let mut fds = [0i32; 2];
    // SAFETY: fds is a valid 2-element array for pipe to fill.
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);

    let report = UsageReport {
        timed_out: true,
        status: DecodedStatus {
            kind: StatusKind::Killed,
            value: 9,
        },
        real_ns: 2_000_000_123,
        usage: ResourceUsage::default(),
    };
    report.emit(fds[1]).expect("emit to a pipe");
    // SAFETY: fds[1] came from pipe above, unused after close.
    unsafe { libc::close(fds[1]) };

    let mut buf = vec![0u8; 4096];
    // SAFETY: buf is a valid buffer; fds[0] is the open read end.
    let n = unsafe { libc::read(fds[0], buf.as_mut_ptr().cast(), buf.len()) };
    assert!(n > 0);
    // SAFETY: fds[0] came from pipe above, unused after close.
    unsafe { libc::close(fds[0]) };

    let text = String::from_utf8_lossy(&buf[..n as usize]).into_owned();
    assert!(text.starts_with(
        "{\"timed_out\":true,\"status_type\":\"killed\",\"status_value\":9,"
    ));
    assert!(text.contains("\"real\":2000000123,"));
    assert!(text.ends_with("}\n"));
}

#[test]
fn library_report_write_failure_is_fatal_not_partial() {
    let report = UsageReport {
        timed_out: false,
        status: DecodedStatus {
            kind: StatusKind::Exited,
            value: 0,
        },
        real_ns: 1,
        usage: ResourceUsage::default(),
    };
    /* fd 977 is not open here */
    let err = report.emit(977).unwrap_err();
    assert!(matches!(err, SupervisorError::ReportWrite(_)));
    assert_eq!(err.exit_code(), exit_codes::FAILURE);
}

/* =========================================================================
 * RESOURCE USAGE
 * ========================================================================= */

#[test]
fn library_rusage_children_after_a_real_child() {
    let status = std::process::Command::new("/bin/true")
        .status()
        .expect("run /bin/true");
    assert!(status.success());

    let usage = ResourceUsage::for_children().expect("getrusage");
    assert!(usage.max_rss_kb > 0, "a reaped child leaves a footprint");
}
