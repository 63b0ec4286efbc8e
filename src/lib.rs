pub mod classify;
pub mod config;
pub mod coordinator;
pub mod discover;
pub mod error;
pub mod generator;
pub mod guard;
pub mod logging;
pub mod mutants;
pub mod output;
pub mod render;
pub mod report;
pub mod rules;
pub mod verifier;

pub use config::MutationConfig;
pub use coordinator::{CancelFlag, Coordinator, FileRun, UnitRun};
pub use error::{MutationError, VerifierError};
pub use mutants::{MutantOutcome, MutationCandidate, SourceUnit, Verdict};
pub use report::{ContractMutationReport, RunSummary};
pub use rules::{MutationRule, RuleSet};
pub use verifier::{CommandVerifier, Verifier, VerifierOutput};
