pub mod config;
pub mod cycles;
pub mod detectors;
pub mod error;
pub mod filter;
pub mod io;
pub mod kinematics;
pub mod metrics;
pub mod plot;
pub mod report;
pub mod resample;
pub mod signal;
pub mod smoothing;

pub use config::{EnergeticsConfig, EnergeticsInput, StudyConfig};
pub use cycles::{run_energetics, Cycle, CycleField, CycleSet, EnergeticsOutput};
pub use error::{EnergeticsError, EnergeticsResult};
pub use report::Report;
pub use signal::*;

/// Validate `input`, run the pipeline and assemble the report.
pub fn run(input: EnergeticsInput) -> EnergeticsResult<Report> {
    let validated = input.validate()?;
    let output = run_energetics(&validated.series, &validated.config)?;
    Ok(Report::assemble(
        output,
        validated.config.condition_name,
        validated.config.subject_name,
    ))
}
