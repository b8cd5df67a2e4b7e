//! Command builders for the six processing tools.
//!
//! Each builder is a pure function: presence check, output naming, argument assembly.
//! Nothing here touches the filesystem or spawns processes; see [`crate::studio::Studio`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::error::StudioError;
use crate::filters::{audio_bitrate_kbps, standard_filter_chain, ultra_filter_chain, video_crf};
use crate::media::is_video;
use crate::naming::{resolve_output_path, segment_pattern, segment_prefix};
use crate::params::{
    AudioBitrate, AudioFormat, COMPRESS_SPECS, Channels, CompressParams, ExtractParams,
    MERGE_SPECS, MergeParams, ParamSpec, STANDARD_CLEAN_SPECS, SplitParams, StandardCleanParams,
    ULTRA_CLEAN_SPECS, UltraCleanParams,
};
use crate::runner::FfmpegCommand;

pub const ULTRA_PREFIX: &str = "ultra_ai";
pub const STANDARD_PREFIX: &str = "standard";
pub const EXTRACT_PREFIX: &str = "extracted";
pub const MERGE_PREFIX: &str = "merged";
pub const COMPRESS_PREFIX: &str = "compressed";

/// Everything a builder needs to know about where it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Directory receiving every output file.
    pub output_dir: PathBuf,
    /// RNN noise model consumed by `arnndn`.
    pub denoise_model: PathBuf,
    /// ffmpeg executable (name on `PATH` or absolute path).
    pub ffmpeg: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    UltraClean,
    StandardClean,
    Split,
    Extract,
    Merge,
    Compress,
}

impl JobKind {
    pub const ALL: [JobKind; 6] = [
        JobKind::UltraClean,
        JobKind::StandardClean,
        JobKind::Split,
        JobKind::Extract,
        JobKind::Merge,
        JobKind::Compress,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            JobKind::UltraClean => "ultra-clean",
            JobKind::StandardClean => "standard-clean",
            JobKind::Split => "split",
            JobKind::Extract => "extract",
            JobKind::Merge => "merge",
            JobKind::Compress => "compress",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            JobKind::UltraClean => "Ultra AI Clean",
            JobKind::StandardClean => "Standard Clean",
            JobKind::Split => "Precision Splitter",
            JobKind::Extract => "Audio Extraction",
            JobKind::Merge => "Merge & Replace Audio",
            JobKind::Compress => "Universal Compressor",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for JobKind {
    type Err = StudioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        JobKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == value)
            .ok_or_else(|| StudioError::invalid("tool", format!("unknown tool '{value}'")))
    }
}

/// One job as submitted by the UI or the CLI. Inputs are optional so the presence check
/// happens in one place.
#[derive(Debug, Clone, PartialEq)]
pub enum JobRequest {
    UltraClean {
        input: Option<PathBuf>,
        params: UltraCleanParams,
    },
    StandardClean {
        input: Option<PathBuf>,
        params: StandardCleanParams,
    },
    Split {
        input: Option<PathBuf>,
        params: SplitParams,
    },
    Extract {
        input: Option<PathBuf>,
        params: ExtractParams,
    },
    Merge {
        video: Option<PathBuf>,
        audio: Option<PathBuf>,
        params: MergeParams,
    },
    Compress {
        input: Option<PathBuf>,
        params: CompressParams,
    },
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::UltraClean { .. } => JobKind::UltraClean,
            JobRequest::StandardClean { .. } => JobKind::StandardClean,
            JobRequest::Split { .. } => JobKind::Split,
            JobRequest::Extract { .. } => JobKind::Extract,
            JobRequest::Merge { .. } => JobKind::Merge,
            JobRequest::Compress { .. } => JobKind::Compress,
        }
    }

    /// Validate the request and build its command.
    pub fn plan(&self, workspace: &Workspace) -> Result<JobPlan, StudioError> {
        match self {
            JobRequest::UltraClean { input, params } => {
                plan_ultra_clean(workspace, require(input, "input")?, params)
            }
            JobRequest::StandardClean { input, params } => {
                plan_standard_clean(workspace, require(input, "input")?, params)
            }
            JobRequest::Split { input, params } => {
                plan_split(workspace, require(input, "input")?, params)
            }
            JobRequest::Extract { input, params } => {
                plan_extract(workspace, require(input, "video")?, params)
            }
            JobRequest::Merge {
                video,
                audio,
                params,
            } => plan_merge(
                workspace,
                require(video, "video")?,
                require(audio, "audio")?,
                params,
            ),
            JobRequest::Compress { input, params } => {
                plan_compress(workspace, require(input, "input")?, params)
            }
        }
    }
}

fn require<'a>(path: &'a Option<PathBuf>, field: &'static str) -> Result<&'a Path, StudioError> {
    match path {
        Some(path) if !path.as_os_str().is_empty() => Ok(path.as_path()),
        _ => Err(StudioError::MissingInput(field)),
    }
}

/// Where a job's results will appear once the tool exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedOutput {
    File(PathBuf),
    /// Numbered `{prefix}_NNN.wav` files in `dir`.
    Segments { dir: PathBuf, prefix: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPlan {
    pub kind: JobKind,
    pub command: FfmpegCommand,
    pub output: PlannedOutput,
}

fn base_command(workspace: &Workspace, input: &Path) -> FfmpegCommand {
    let mut command = FfmpegCommand::new(workspace.ffmpeg.clone());
    command.args(["-y", "-i"]).arg(input);
    command
}

pub fn plan_ultra_clean(
    workspace: &Workspace,
    input: &Path,
    params: &UltraCleanParams,
) -> Result<JobPlan, StudioError> {
    params.validate()?;

    let video = is_video(input);
    let target_ext = if video { Some(".mp4") } else { None };
    let out_path = resolve_output_path(
        &workspace.output_dir,
        input,
        params.custom_name.as_deref(),
        ULTRA_PREFIX,
        target_ext,
    );
    let chain = ultra_filter_chain(params, &workspace.denoise_model);

    let mut command = base_command(workspace, input);
    command.arg("-af").arg(&chain);
    if video {
        command.args([
            "-c:v", "copy", "-c:a", "aac", "-b:a", "192k", "-map", "0:v:0", "-map", "0:a:0",
        ]);
    }
    command.arg(&out_path);

    Ok(JobPlan {
        kind: JobKind::UltraClean,
        command,
        output: PlannedOutput::File(out_path),
    })
}

pub fn plan_standard_clean(
    workspace: &Workspace,
    input: &Path,
    params: &StandardCleanParams,
) -> Result<JobPlan, StudioError> {
    params.validate()?;

    let out_path = resolve_output_path(
        &workspace.output_dir,
        input,
        params.custom_name.as_deref(),
        STANDARD_PREFIX,
        None,
    );

    let mut command = base_command(workspace, input);
    command
        .arg("-af")
        .arg(standard_filter_chain(params))
        .arg(&out_path);

    Ok(JobPlan {
        kind: JobKind::StandardClean,
        command,
        output: PlannedOutput::File(out_path),
    })
}

pub fn plan_split(
    workspace: &Workspace,
    input: &Path,
    params: &SplitParams,
) -> Result<JobPlan, StudioError> {
    let points = params.points()?;
    let prefix = segment_prefix(params.prefix.as_deref());
    let pattern = segment_pattern(&workspace.output_dir, &prefix);

    let mut command = base_command(workspace, input);
    command
        .args(["-f", "segment", "-segment_times"])
        .arg(points.join(","))
        .args(["-c", "copy"])
        .arg(&pattern);

    Ok(JobPlan {
        kind: JobKind::Split,
        command,
        output: PlannedOutput::Segments {
            dir: workspace.output_dir.clone(),
            prefix,
        },
    })
}

pub fn plan_extract(
    workspace: &Workspace,
    video: &Path,
    params: &ExtractParams,
) -> Result<JobPlan, StudioError> {
    let out_path = resolve_output_path(
        &workspace.output_dir,
        video,
        None,
        EXTRACT_PREFIX,
        Some(params.format.extension()),
    );

    let mut command = base_command(workspace, video);
    command.arg("-vn").arg("-ac").arg(params.channels.count());
    match params.format {
        AudioFormat::Wav => {
            command.args(["-acodec", "pcm_s16le"]);
        }
        AudioFormat::Mp3 => {
            command
                .args(["-acodec", "libmp3lame", "-ab"])
                .arg(params.bitrate.as_str());
        }
        AudioFormat::M4a => {
            command
                .args(["-acodec", "aac", "-ab"])
                .arg(params.bitrate.as_str());
        }
    }
    command.arg(&out_path);

    Ok(JobPlan {
        kind: JobKind::Extract,
        command,
        output: PlannedOutput::File(out_path),
    })
}

pub fn plan_merge(
    workspace: &Workspace,
    video: &Path,
    audio: &Path,
    params: &MergeParams,
) -> Result<JobPlan, StudioError> {
    params.validate()?;

    let out_path = resolve_output_path(
        &workspace.output_dir,
        video,
        params.custom_name.as_deref(),
        MERGE_PREFIX,
        Some(".mp4"),
    );

    let mut command = base_command(workspace, video);
    command.arg("-i").arg(audio);
    if params.compress_video {
        command
            .args(["-c:v", "libx264", "-crf"])
            .arg(params.crf.to_string())
            .args(["-preset", "medium"]);
    } else {
        command.args(["-c:v", "copy"]);
    }
    command
        .args([
            "-c:a", "aac", "-b:a", "192k", "-map", "0:v:0", "-map", "1:a:0", "-shortest",
        ])
        .arg(&out_path);

    Ok(JobPlan {
        kind: JobKind::Merge,
        command,
        output: PlannedOutput::File(out_path),
    })
}

pub fn plan_compress(
    workspace: &Workspace,
    input: &Path,
    params: &CompressParams,
) -> Result<JobPlan, StudioError> {
    params.validate()?;

    let video = is_video(input);
    let target_ext = if video { ".mp4" } else { ".mp3" };
    let out_path = resolve_output_path(
        &workspace.output_dir,
        input,
        params.custom_name.as_deref(),
        COMPRESS_PREFIX,
        Some(target_ext),
    );

    let mut command = base_command(workspace, input);
    if video {
        command
            .args(["-c:v", "libx264", "-crf"])
            .arg(video_crf(params.intensity).to_string())
            .args(["-preset", "slow", "-c:a", "aac", "-b:a", "96k"]);
    } else {
        command
            .arg("-ab")
            .arg(format!("{}k", audio_bitrate_kbps(params.intensity)));
    }
    command.arg(&out_path);

    Ok(JobPlan {
        kind: JobKind::Compress,
        command,
        output: PlannedOutput::File(out_path),
    })
}

/// A fixed list of options rendered as a dropdown or radio group.
#[derive(Debug, Clone, Serialize)]
pub struct ChoiceSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub options: Vec<&'static str>,
    pub default: &'static str,
}

/// Everything the control panel needs to render one tool's controls.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub kind: JobKind,
    pub title: &'static str,
    pub params: &'static [ParamSpec],
    pub choices: Vec<ChoiceSpec>,
}

const NO_PARAMS: &[ParamSpec] = &[];

/// Parameter catalog for every tool, in tab order.
pub fn tool_catalog() -> Vec<ToolSpec> {
    JobKind::ALL
        .into_iter()
        .map(|kind| {
            let (params, choices) = match kind {
                JobKind::UltraClean => (ULTRA_CLEAN_SPECS, Vec::new()),
                JobKind::StandardClean => (STANDARD_CLEAN_SPECS, Vec::new()),
                JobKind::Split => (NO_PARAMS, Vec::new()),
                JobKind::Extract => (NO_PARAMS, extract_choices()),
                JobKind::Merge => (MERGE_SPECS, Vec::new()),
                JobKind::Compress => (COMPRESS_SPECS, Vec::new()),
            };
            ToolSpec {
                kind,
                title: kind.title(),
                params,
                choices,
            }
        })
        .collect()
}

fn extract_choices() -> Vec<ChoiceSpec> {
    vec![
        ChoiceSpec {
            name: "format",
            label: "Format",
            options: AudioFormat::ALL.iter().map(|f| f.extension()).collect(),
            default: AudioFormat::default().extension(),
        },
        ChoiceSpec {
            name: "bitrate",
            label: "Bitrate",
            options: AudioBitrate::ALL.iter().map(|b| b.as_str()).collect(),
            default: AudioBitrate::default().as_str(),
        },
        ChoiceSpec {
            name: "channels",
            label: "Channels",
            options: Channels::ALL.iter().map(|c| c.as_str()).collect(),
            default: Channels::default().as_str(),
        },
    ]
}
