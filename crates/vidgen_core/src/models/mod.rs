//! Data model shared across the pipeline.
//!
//! The types here form the contracts between stages: the `Script`
//! artifact produced by the script stage is consumed by every later
//! stage, and the per-scene image/audio records are joined by the
//! assembly stage.

mod enums;
mod media;
mod run;
mod script;

pub use enums::{RunStatus, StepName, TaskStatus};
pub(crate) use media::success_rate;
pub use media::{AssemblyStats, AudioStats, ImageStats, SceneAudio, SceneImage};
pub use run::Run;
pub use script::{Scene, Script};
