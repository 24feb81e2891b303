/*
 * main.rs
 *
 * Validate argv, supervise, emit, exit. Boring on purpose.
 * The interesting stuff is in runner.rs.
 */

use procwrap::config::SupervisionConfig;
use procwrap::error::exit_codes;
use procwrap::runner::supervise;

fn main() {
    std::process::exit(i32::from(run_main()));
}

fn run_main() -> u8 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    /* configuration failures speak on stderr, never on the output fd -
     * the fd itself may be the broken thing */
    let config = match SupervisionConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("procwrap: {e}");
            return e.exit_code();
        }
    };

    let report = match supervise(&config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("procwrap: {e}");
            return e.exit_code();
        }
    };

    if let Err(e) = report.emit(config.output_fd) {
        eprintln!("procwrap: {e}");
        return e.exit_code();
    }

    /* fixed default is preserve: the child's status lives in the report and
     * our own exit says only "report delivered" */
    if !config.preserve_child_status && report.timed_out {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        return ((128 + config.term_signal.as_raw()) & 0xFF) as u8;
    }

    exit_codes::OK
}
