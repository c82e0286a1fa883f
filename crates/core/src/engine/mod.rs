//! Engine - configuration, lifecycle, and the orchestrator.

mod engine_config;
mod lifecycle;
mod orchestrator;

pub use engine_config::{AssetConfig, EngineConfig, DEFAULT_BOT_TYPE};
pub use lifecycle::{
    status_code, AssetReport, LifecycleState, Phase, WorkReport, STATUS_FAILED, STATUS_OK,
};
pub use orchestrator::{EventSources, Orchestrator};

#[cfg(test)]
mod orchestrator_tests;
