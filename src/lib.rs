//! Alloy Dosing: ladle chemistry correction advisor
//!
//! Turns an initial and a target melt chemistry plus a melt weight into
//! bounded, operator-safe ferroalloy additions.
//!
//! ## Architecture
//!
//! - **Input adapter** (`types::request`): validates the JSON request body
//! - **Feature builder** (`pipeline::features`): chemistry delta in element order
//! - **Predictors** (`predictor`): one pre-trained regressor per alloy
//! - **Safety stage** (`pipeline::safety`): clamp, unit conversion, step planning
//! - **Assembler** (`pipeline::assembler`): the structured recommendation
//!
//! Config and models are built once and injected into [`DosingPipeline`];
//! every request after that is a pure function of its input.

pub mod audit;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod predictor;
pub mod types;

pub use audit::AuditRecord;
pub use config::{AlloyConfig, ConfigError, DosingConfig};
pub use error::DosingError;
pub use pipeline::{DosingPipeline, PipelineError};
pub use predictor::{LinearModel, ModelRegistry, Predictor, PredictorError, RegistryError};
pub use types::{
    AlloyRecommendation, ChemistryDelta, Composition, DosingOutcome, DosingRequest,
    Recommendation,
};
