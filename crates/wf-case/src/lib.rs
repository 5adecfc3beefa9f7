//! wf-case: YAML case files and their conversion to a runnable simulator.
//!
//! Case files use field units (bar, m³/day, days, metres, °C); everything is
//! converted to SI on [`Case::build`].

pub mod build;
pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::{ValidationError, validate_case};

pub type CaseResult<T> = Result<T, CaseError>;

#[derive(thiserror::Error, Debug)]
pub enum CaseError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Simulation setup error: {0}")]
    Sim(#[from] wf_sim::SimError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub fn from_yaml_str(content: &str) -> CaseResult<Case> {
    let case: Case = serde_yaml::from_str(content)?;
    validate_case(&case)?;
    Ok(case)
}

pub fn load_yaml(path: &std::path::Path) -> CaseResult<Case> {
    let content = std::fs::read_to_string(path)?;
    from_yaml_str(&content)
}

pub fn save_yaml(path: &std::path::Path, case: &Case) -> CaseResult<()> {
    validate_case(case)?;
    let content = serde_yaml::to_string(case)?;
    std::fs::write(path, content)?;
    Ok(())
}
