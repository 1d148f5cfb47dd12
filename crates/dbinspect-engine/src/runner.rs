//! Check runner that turns one inspector's checks into canonical records

use dbinspect_core::{InspectError, InspectionRun, Inspector, Result, RunStamp};
use tracing::{debug, info};

/// Run every check of `inspector` in declaration order.
///
/// The first failing check aborts the run; no partial output is returned.
pub fn run_checks(inspector: &dyn Inspector, stamp: &RunStamp) -> Result<InspectionRun> {
    let mut run = InspectionRun::empty(stamp.server_ip());

    let backend = inspector.backend();

    for check in inspector.checks() {
        let info = check.info();
        debug!(
            server = %inspector.target(),
            backend = %backend,
            check = info.id,
            title = info.title,
            "Running check"
        );

        let outcome = check.run()?;

        if outcome.check_id != info.id {
            return Err(InspectError::check(
                info.id,
                format!(
                    "{} check '{}' reported id {}",
                    backend, info.title, outcome.check_id
                ),
            ));
        }
        if run.contains(&outcome.check_id) {
            return Err(InspectError::check(check.id(), "duplicate check id"));
        }

        info!(
            server = %inspector.target(),
            check = check.id(),
            status = %outcome.status,
            "Check finished"
        );
        run.push(stamp.record(outcome));
    }

    Ok(run)
}

/// Run all checks, then release the inspector whatever the result.
pub fn run_to_completion(inspector: Box<dyn Inspector>, stamp: &RunStamp) -> Result<InspectionRun> {
    let result = run_checks(inspector.as_ref(), stamp);
    inspector.close();
    result
}
