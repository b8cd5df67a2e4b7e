//! Per-tool job parameters, their ranges and defaults.
//!
//! The control panel renders its sliders from the [`ParamSpec`] tables below and the same
//! tables validate every value the server receives.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::StudioError;

/// Range and default of a single numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    /// `Some(1.0)` marks whole-number parameters.
    pub step: Option<f64>,
    pub default: f64,
}

impl ParamSpec {
    /// Reject values outside `min..=max`, non-finite values, and fractions for whole-number
    /// parameters.
    pub fn check(&self, value: f64) -> Result<f64, StudioError> {
        if !value.is_finite() {
            return Err(StudioError::invalid(self.name, "must be a finite number"));
        }
        if value < self.min || value > self.max {
            return Err(StudioError::invalid(
                self.name,
                format!("{value} is outside {}..={}", self.min, self.max),
            ));
        }
        if self.is_whole() && value.fract() != 0.0 {
            return Err(StudioError::invalid(self.name, "must be a whole number"));
        }
        Ok(value)
    }

    fn is_whole(&self) -> bool {
        matches!(self.step, Some(step) if step == 1.0)
    }
}

pub const ULTRA_HIGHPASS: ParamSpec = ParamSpec {
    name: "highpass",
    label: "Highpass Hz",
    min: 50.0,
    max: 500.0,
    step: None,
    default: 100.0,
};
pub const ULTRA_LOWPASS: ParamSpec = ParamSpec {
    name: "lowpass",
    label: "Lowpass Hz",
    min: 3000.0,
    max: 15000.0,
    step: None,
    default: 7500.0,
};
pub const ULTRA_GATE: ParamSpec = ParamSpec {
    name: "gate",
    label: "Gate Threshold (dB)",
    min: -60.0,
    max: -10.0,
    step: None,
    default: -30.0,
};
pub const ULTRA_RATIO: ParamSpec = ParamSpec {
    name: "ratio",
    label: "Gate Ratio",
    min: 1.0,
    max: 5.0,
    step: None,
    default: 2.0,
};
pub const ULTRA_ATTACK: ParamSpec = ParamSpec {
    name: "attack",
    label: "Attack (ms)",
    min: 0.1,
    max: 50.0,
    step: None,
    default: 5.0,
};
pub const ULTRA_RELEASE: ParamSpec = ParamSpec {
    name: "release",
    label: "Release (ms)",
    min: 10.0,
    max: 1000.0,
    step: None,
    default: 150.0,
};
pub const ULTRA_WARMTH: ParamSpec = ParamSpec {
    name: "warmth",
    label: "Warmth/Gain",
    min: 0.0,
    max: 15.0,
    step: None,
    default: 5.0,
};

pub const STANDARD_HIGHPASS: ParamSpec = ParamSpec {
    name: "highpass",
    label: "Highpass (Hz)",
    min: 50.0,
    max: 500.0,
    step: None,
    default: 200.0,
};
pub const STANDARD_NOISE_REDUCTION: ParamSpec = ParamSpec {
    name: "noise_reduction",
    label: "FFT Noise Reduction (dB)",
    min: 1.0,
    max: 48.0,
    step: Some(1.0),
    default: 12.0,
};
pub const STANDARD_GATE: ParamSpec = ParamSpec {
    name: "gate",
    label: "Gate (dB)",
    min: -60.0,
    max: -10.0,
    step: None,
    default: -30.0,
};

pub const MERGE_CRF: ParamSpec = ParamSpec {
    name: "crf",
    label: "CRF Level (Higher = Smaller File, lower quality)",
    min: 18.0,
    max: 35.0,
    step: Some(1.0),
    default: 23.0,
};

pub const COMPRESS_INTENSITY: ParamSpec = ParamSpec {
    name: "intensity",
    label: "Compression Intensity (10 = Smallest File)",
    min: 1.0,
    max: 10.0,
    step: Some(1.0),
    default: 5.0,
};

pub const ULTRA_CLEAN_SPECS: &[ParamSpec] = &[
    ULTRA_HIGHPASS,
    ULTRA_LOWPASS,
    ULTRA_GATE,
    ULTRA_RATIO,
    ULTRA_ATTACK,
    ULTRA_RELEASE,
    ULTRA_WARMTH,
];
pub const STANDARD_CLEAN_SPECS: &[ParamSpec] =
    &[STANDARD_HIGHPASS, STANDARD_NOISE_REDUCTION, STANDARD_GATE];
pub const MERGE_SPECS: &[ParamSpec] = &[MERGE_CRF];
pub const COMPRESS_SPECS: &[ParamSpec] = &[COMPRESS_INTENSITY];

/// AI mastering chain: filters, RNN denoise, gate, speech normalisation and compander.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UltraCleanParams {
    pub highpass_hz: f64,
    pub lowpass_hz: f64,
    pub gate_threshold_db: f64,
    pub gate_ratio: f64,
    pub attack_ms: f64,
    pub release_ms: f64,
    pub warmth: f64,
    #[serde(default)]
    pub custom_name: Option<String>,
}

impl Default for UltraCleanParams {
    fn default() -> Self {
        Self {
            highpass_hz: ULTRA_HIGHPASS.default,
            lowpass_hz: ULTRA_LOWPASS.default,
            gate_threshold_db: ULTRA_GATE.default,
            gate_ratio: ULTRA_RATIO.default,
            attack_ms: ULTRA_ATTACK.default,
            release_ms: ULTRA_RELEASE.default,
            warmth: ULTRA_WARMTH.default,
            custom_name: None,
        }
    }
}

impl UltraCleanParams {
    pub fn validate(&self) -> Result<(), StudioError> {
        ULTRA_HIGHPASS.check(self.highpass_hz)?;
        ULTRA_LOWPASS.check(self.lowpass_hz)?;
        ULTRA_GATE.check(self.gate_threshold_db)?;
        ULTRA_RATIO.check(self.gate_ratio)?;
        ULTRA_ATTACK.check(self.attack_ms)?;
        ULTRA_RELEASE.check(self.release_ms)?;
        ULTRA_WARMTH.check(self.warmth)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardCleanParams {
    pub highpass_hz: f64,
    pub noise_reduction_db: u32,
    pub gate_threshold_db: f64,
    #[serde(default)]
    pub custom_name: Option<String>,
}

impl Default for StandardCleanParams {
    fn default() -> Self {
        Self {
            highpass_hz: STANDARD_HIGHPASS.default,
            noise_reduction_db: STANDARD_NOISE_REDUCTION.default as u32,
            gate_threshold_db: STANDARD_GATE.default,
            custom_name: None,
        }
    }
}

impl StandardCleanParams {
    pub fn validate(&self) -> Result<(), StudioError> {
        STANDARD_HIGHPASS.check(self.highpass_hz)?;
        STANDARD_NOISE_REDUCTION.check(f64::from(self.noise_reduction_db))?;
        STANDARD_GATE.check(self.gate_threshold_db)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitParams {
    /// Comma-separated cut points, e.g. `120, 00:02:00, 05:30`.
    pub split_points: String,
    #[serde(default)]
    pub prefix: Option<String>,
}

impl SplitParams {
    /// Parse the cut points: split on commas, trim, drop empties, validate each entry.
    pub fn points(&self) -> Result<Vec<String>, StudioError> {
        if self.split_points.trim().is_empty() {
            return Err(StudioError::MissingInput("split points"));
        }

        let points: Vec<String> = self
            .split_points
            .split(',')
            .map(str::trim)
            .filter(|point| !point.is_empty())
            .map(str::to_string)
            .collect();

        if points.is_empty() {
            return Err(StudioError::invalid(
                "split_points",
                "no split points found between the commas",
            ));
        }

        if let Some(bad) = points.iter().find(|point| !is_time_point(point)) {
            return Err(StudioError::invalid(
                "split_points",
                format!("'{bad}' is not seconds (120, 12.5) or a clock time (05:30, 00:02:00)"),
            ));
        }

        Ok(points)
    }
}

fn is_time_point(value: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^(?:\d+(?:\.\d+)?|(?:\d+:)?\d{1,2}:\d{1,2}(?:\.\d+)?)$")
            .expect("split point pattern compiles")
    });
    pattern.is_match(value)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractParams {
    #[serde(default)]
    pub format: AudioFormat,
    #[serde(default)]
    pub bitrate: AudioBitrate,
    #[serde(default)]
    pub channels: Channels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeParams {
    #[serde(default)]
    pub compress_video: bool,
    pub crf: u32,
    #[serde(default)]
    pub custom_name: Option<String>,
}

impl Default for MergeParams {
    fn default() -> Self {
        Self {
            compress_video: false,
            crf: MERGE_CRF.default as u32,
            custom_name: None,
        }
    }
}

impl MergeParams {
    pub fn validate(&self) -> Result<(), StudioError> {
        MERGE_CRF.check(f64::from(self.crf))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressParams {
    pub intensity: u32,
    #[serde(default)]
    pub custom_name: Option<String>,
}

impl Default for CompressParams {
    fn default() -> Self {
        Self {
            intensity: COMPRESS_INTENSITY.default as u32,
            custom_name: None,
        }
    }
}

impl CompressParams {
    pub fn validate(&self) -> Result<(), StudioError> {
        COMPRESS_INTENSITY.check(f64::from(self.intensity))?;
        Ok(())
    }
}

/// Target container for audio extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
    M4a,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 3] = [AudioFormat::Wav, AudioFormat::Mp3, AudioFormat::M4a];

    /// Extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => ".wav",
            AudioFormat::Mp3 => ".mp3",
            AudioFormat::M4a => ".m4a",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = StudioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "mp3" => Ok(AudioFormat::Mp3),
            "m4a" => Ok(AudioFormat::M4a),
            _ => Err(StudioError::invalid(
                "format",
                format!("'{value}' is not one of .wav, .mp3, .m4a"),
            )),
        }
    }
}

/// Audio bitrate choices for lossy extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioBitrate {
    #[serde(rename = "128k")]
    K128,
    #[default]
    #[serde(rename = "192k")]
    K192,
    #[serde(rename = "320k")]
    K320,
}

impl AudioBitrate {
    pub const ALL: [AudioBitrate; 3] = [AudioBitrate::K128, AudioBitrate::K192, AudioBitrate::K320];

    pub fn as_str(self) -> &'static str {
        match self {
            AudioBitrate::K128 => "128k",
            AudioBitrate::K192 => "192k",
            AudioBitrate::K320 => "320k",
        }
    }
}

impl fmt::Display for AudioBitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioBitrate {
    type Err = StudioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "128k" => Ok(AudioBitrate::K128),
            "192k" => Ok(AudioBitrate::K192),
            "320k" => Ok(AudioBitrate::K320),
            _ => Err(StudioError::invalid(
                "bitrate",
                format!("'{value}' is not one of 128k, 192k, 320k"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channels {
    Mono,
    #[default]
    Stereo,
}

impl Channels {
    pub const ALL: [Channels; 2] = [Channels::Mono, Channels::Stereo];

    /// Value passed to `-ac`.
    pub fn count(self) -> &'static str {
        match self {
            Channels::Mono => "1",
            Channels::Stereo => "2",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channels::Mono => "Mono",
            Channels::Stereo => "Stereo",
        }
    }
}

impl fmt::Display for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channels {
    type Err = StudioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mono" | "1" => Ok(Channels::Mono),
            "stereo" | "2" => Ok(Channels::Stereo),
            _ => Err(StudioError::invalid(
                "channels",
                format!("'{value}' is not Mono or Stereo"),
            )),
        }
    }
}
