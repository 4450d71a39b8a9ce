//! The five pipeline stages

mod correct;
mod design;
mod model;
mod parse;
mod synthesize;
mod validate;

pub use correct::CorrectStage;
pub use design::DesignStage;
pub use model::ModelStageDeps;
pub use parse::ParseStage;
pub use synthesize::SynthesizeStage;
pub use validate::ValidateStage;
