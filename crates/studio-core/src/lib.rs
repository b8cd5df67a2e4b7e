//! Core library crate: job planning, ffmpeg invocation and shared configuration for Ultra Studio.

pub mod config;
pub mod error;
pub mod filters;
pub mod jobs;
pub mod logging;
pub mod media;
pub mod naming;
pub mod params;
pub mod runner;
pub mod studio;

pub use config::{
    ConfigError, ConfigLoadResult, ConfigSource, FileConfig, RuntimeOverrides, StudioSettings,
    apply_runtime_overrides, config_directory, config_path, load_config, load_config_from,
    resolve_settings, save_config,
};
pub use error::StudioError;
pub use jobs::{JobKind, JobPlan, JobRequest, PlannedOutput, ToolSpec, Workspace, tool_catalog};
pub use params::{
    AudioBitrate, AudioFormat, Channels, CompressParams, ExtractParams, MergeParams,
    SplitParams, StandardCleanParams, UltraCleanParams,
};
pub use runner::{FfmpegCommand, ProcessRunner, RecordingRunner, ToolRunner};
pub use studio::{JobReport, Studio};
