//! Closed registry of [`Specialist`] variants, keyed by job-type name.
//! Mirrors `SpecialistFactory.SPECIALIST_TYPE` in
//! `examples/original_source/script/python/tools/auto_submitter/specialist.py`.

use super::{GromacsSpecialist, Specialist, TestSpecialist};
use crate::error::SupervisorError;

/// Create a [`Specialist`] for `job_type`. `None` for an unrecognized
/// type, logged the same way the source's factory does.
pub fn create_specialist(job_type: &str) -> Option<Box<dyn Specialist>> {
    let specialist: Box<dyn Specialist> = match job_type {
        "Gromacs" => Box::new(GromacsSpecialist::new()),
        "Test" => Box::new(TestSpecialist::new()),
        other => {
            let err = SupervisorError::UnknownVariant {
                kind: other.to_string(),
                of: "Specialist",
            };
            tracing::error!("{err}");
            return None;
        }
    };
    tracing::info!("create a specialist of type [{job_type}]");
    Some(specialist)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_job_types_are_created() {
        assert!(create_specialist("Gromacs").is_some());
        assert!(create_specialist("Test").is_some());
    }

    #[test]
    fn unknown_job_type_is_rejected() {
        assert!(create_specialist("Amber").is_none());
    }
}
