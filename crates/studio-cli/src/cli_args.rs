use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use studio_core::config::RuntimeOverrides;
use studio_core::params::{
    COMPRESS_INTENSITY, MERGE_CRF, STANDARD_GATE, STANDARD_HIGHPASS, STANDARD_NOISE_REDUCTION,
    ULTRA_ATTACK, ULTRA_GATE, ULTRA_HIGHPASS, ULTRA_LOWPASS, ULTRA_RATIO, ULTRA_RELEASE,
    ULTRA_WARMTH,
};
use studio_core::{
    AudioBitrate, AudioFormat, Channels, CompressParams, ExtractParams, JobRequest, MergeParams,
    SplitParams, StandardCleanParams, UltraCleanParams,
};

/// Top-level CLI entrypoint. Without a subcommand the web control panel starts.
#[derive(Parser, Debug, Clone)]
#[command(name = "ultra-studio", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Supported subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start the web control panel.
    Serve(ServeArgs),
    /// AI mastering: band limiting, RNN denoise, gate, speech normalisation, compander.
    UltraClean(UltraCleanArgs),
    /// Lightweight highpass, FFT denoise and gate.
    StandardClean(StandardCleanArgs),
    /// Cut a file into WAV segments at the given points.
    Split(SplitArgs),
    /// Pull the audio track out of a video.
    Extract(ExtractArgs),
    /// Replace a video's audio track.
    Merge(MergeArgs),
    /// Shrink a video or audio file.
    Compress(CompressArgs),
    /// Inspect or create the configuration file.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the configuration file location.
    Path,
    /// Write a configuration file with default values.
    Init {
        /// Overwrite an existing file.
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

/// Arguments for the web server.
#[derive(Debug, Clone, Args, Default)]
pub struct ServeArgs {
    /// Interface to bind.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on.
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Open the control panel in the default browser once listening.
    #[arg(long, action = ArgAction::SetTrue)]
    pub open: bool,

    #[command(flatten)]
    pub paths: PathArgs,
}

impl ServeArgs {
    pub fn to_runtime_overrides(&self) -> RuntimeOverrides {
        let mut overrides = self.paths.to_runtime_overrides();
        overrides.host = self.host.clone();
        overrides.port = self.port;
        if self.open {
            overrides.open_browser = Some(true);
        }
        overrides
    }
}

/// Location overrides shared by every command that touches media.
#[derive(Debug, Clone, Args, Default)]
pub struct PathArgs {
    /// Directory receiving output files.
    #[arg(long = "output-dir", value_hint = ValueHint::DirPath)]
    pub output_dir: Option<String>,

    /// ffmpeg executable to invoke.
    #[arg(long, value_hint = ValueHint::ExecutablePath)]
    pub ffmpeg: Option<String>,

    /// RNN noise model used by the ultra clean chain.
    #[arg(long = "denoise-model", value_hint = ValueHint::FilePath)]
    pub denoise_model: Option<String>,
}

impl PathArgs {
    pub fn to_runtime_overrides(&self) -> RuntimeOverrides {
        RuntimeOverrides {
            output_directory: self.output_dir.clone(),
            ffmpeg: self.ffmpeg.clone(),
            denoise_model: self.denoise_model.clone(),
            ..RuntimeOverrides::default()
        }
    }
}

/// Options shared by the one-shot job commands.
#[derive(Debug, Clone, Args, Default)]
pub struct RunArgs {
    /// Print the ffmpeg command instead of running it.
    #[arg(long, action = ArgAction::SetTrue)]
    pub dry_run: bool,

    #[command(flatten)]
    pub paths: PathArgs,
}

#[derive(Debug, Clone, Args)]
pub struct UltraCleanArgs {
    /// Audio or video file to clean.
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    #[arg(long, default_value_t = ULTRA_HIGHPASS.default)]
    pub highpass: f64,

    #[arg(long, default_value_t = ULTRA_LOWPASS.default)]
    pub lowpass: f64,

    /// Gate threshold in dB.
    #[arg(long, default_value_t = ULTRA_GATE.default, allow_negative_numbers = true)]
    pub gate: f64,

    #[arg(long, default_value_t = ULTRA_RATIO.default)]
    pub ratio: f64,

    /// Gate attack in ms.
    #[arg(long, default_value_t = ULTRA_ATTACK.default)]
    pub attack: f64,

    /// Gate release in ms.
    #[arg(long, default_value_t = ULTRA_RELEASE.default)]
    pub release: f64,

    /// Compander makeup gain.
    #[arg(long, default_value_t = ULTRA_WARMTH.default)]
    pub warmth: f64,

    /// Output file name (extension optional).
    #[arg(long)]
    pub name: Option<String>,

    #[command(flatten)]
    pub run: RunArgs,
}

impl UltraCleanArgs {
    pub fn to_request(&self) -> JobRequest {
        JobRequest::UltraClean {
            input: Some(self.input.clone()),
            params: UltraCleanParams {
                highpass_hz: self.highpass,
                lowpass_hz: self.lowpass,
                gate_threshold_db: self.gate,
                gate_ratio: self.ratio,
                attack_ms: self.attack,
                release_ms: self.release,
                warmth: self.warmth,
                custom_name: self.name.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct StandardCleanArgs {
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    #[arg(long, default_value_t = STANDARD_HIGHPASS.default)]
    pub highpass: f64,

    /// FFT denoise strength in dB.
    #[arg(long = "noise-reduction", default_value_t = STANDARD_NOISE_REDUCTION.default as u32)]
    pub noise_reduction: u32,

    #[arg(long, default_value_t = STANDARD_GATE.default, allow_negative_numbers = true)]
    pub gate: f64,

    #[arg(long)]
    pub name: Option<String>,

    #[command(flatten)]
    pub run: RunArgs,
}

impl StandardCleanArgs {
    pub fn to_request(&self) -> JobRequest {
        JobRequest::StandardClean {
            input: Some(self.input.clone()),
            params: StandardCleanParams {
                highpass_hz: self.highpass,
                noise_reduction_db: self.noise_reduction,
                gate_threshold_db: self.gate,
                custom_name: self.name.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct SplitArgs {
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Comma-separated cut points, e.g. "120, 00:05:00".
    #[arg(long = "points", value_name = "POINTS")]
    pub points: String,

    /// Segment file prefix (default "split").
    #[arg(long)]
    pub prefix: Option<String>,

    #[command(flatten)]
    pub run: RunArgs,
}

impl SplitArgs {
    pub fn to_request(&self) -> JobRequest {
        JobRequest::Split {
            input: Some(self.input.clone()),
            params: SplitParams {
                split_points: self.points.clone(),
                prefix: self.prefix.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ExtractArgs {
    /// Video to take the audio from.
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// wav, mp3 or m4a.
    #[arg(long, default_value_t = AudioFormat::default())]
    pub format: AudioFormat,

    /// 128k, 192k or 320k (ignored for wav).
    #[arg(long, default_value_t = AudioBitrate::default())]
    pub bitrate: AudioBitrate,

    /// Mono or Stereo.
    #[arg(long, default_value_t = Channels::default())]
    pub channels: Channels,

    #[command(flatten)]
    pub run: RunArgs,
}

impl ExtractArgs {
    pub fn to_request(&self) -> JobRequest {
        JobRequest::Extract {
            input: Some(self.input.clone()),
            params: ExtractParams {
                format: self.format,
                bitrate: self.bitrate,
                channels: self.channels,
            },
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct MergeArgs {
    #[arg(value_hint = ValueHint::FilePath)]
    pub video: PathBuf,

    /// Replacement audio track.
    #[arg(value_hint = ValueHint::FilePath)]
    pub audio: PathBuf,

    /// Re-encode the video with x264 instead of copying it.
    #[arg(long = "compress-video", action = ArgAction::SetTrue)]
    pub compress_video: bool,

    #[arg(long, default_value_t = MERGE_CRF.default as u32)]
    pub crf: u32,

    #[arg(long)]
    pub name: Option<String>,

    #[command(flatten)]
    pub run: RunArgs,
}

impl MergeArgs {
    pub fn to_request(&self) -> JobRequest {
        JobRequest::Merge {
            video: Some(self.video.clone()),
            audio: Some(self.audio.clone()),
            params: MergeParams {
                compress_video: self.compress_video,
                crf: self.crf,
                custom_name: self.name.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct CompressArgs {
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// 1 (light) to 10 (heavy).
    #[arg(long, default_value_t = COMPRESS_INTENSITY.default as u32)]
    pub intensity: u32,

    #[arg(long)]
    pub name: Option<String>,

    #[command(flatten)]
    pub run: RunArgs,
}

impl CompressArgs {
    pub fn to_request(&self) -> JobRequest {
        JobRequest::Compress {
            input: Some(self.input.clone()),
            params: CompressParams {
                intensity: self.intensity,
                custom_name: self.name.clone(),
            },
        }
    }
}

impl Command {
    /// The job request and shared run options for the one-shot job commands.
    pub fn job(&self) -> Option<(JobRequest, &RunArgs)> {
        match self {
            Command::UltraClean(args) => Some((args.to_request(), &args.run)),
            Command::StandardClean(args) => Some((args.to_request(), &args.run)),
            Command::Split(args) => Some((args.to_request(), &args.run)),
            Command::Extract(args) => Some((args.to_request(), &args.run)),
            Command::Merge(args) => Some((args.to_request(), &args.run)),
            Command::Compress(args) => Some((args.to_request(), &args.run)),
            Command::Serve(_) | Command::Config(_) => None,
        }
    }
}
