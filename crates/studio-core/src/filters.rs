//! ffmpeg audio filter-graph strings and the numeric mappings behind the compressor.

use std::path::Path;

use crate::params::{StandardCleanParams, UltraCleanParams};

/// Fixed speech normaliser stage of the mastering chain.
const SPEECHNORM: &str = "speechnorm=e=4:r=0.0005:p=0.9";
/// Compander transfer curve; the user only controls its makeup gain.
const COMPAND_POINTS: &str = "-80/-900|-45/-15|-27/-9|0/-7|20/-7";

/// Escape a file path for use inside a single-quoted filter option.
///
/// Backslashes become forward slashes, `:` is escaped for the filter parser and `'` closes,
/// escapes and reopens the quoted string.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', r"'\\''")
}

/// Full mastering chain: band limiting, RNN denoise, gate, speech normalisation, compander.
pub fn ultra_filter_chain(params: &UltraCleanParams, denoise_model: &Path) -> String {
    format!(
        "highpass=f={hp}, lowpass=f={lp}, arnndn=model='{model}', \
         agate=threshold={gate}dB:ratio={ratio}:attack={attack}:release={release}, \
         {SPEECHNORM}, compand=points={COMPAND_POINTS}:gain={warmth}",
        hp = params.highpass_hz,
        lp = params.lowpass_hz,
        model = escape_filter_path(denoise_model),
        gate = params.gate_threshold_db,
        ratio = params.gate_ratio,
        attack = params.attack_ms,
        release = params.release_ms,
        warmth = params.warmth,
    )
}

/// Lightweight chain: highpass, FFT denoise and gate.
pub fn standard_filter_chain(params: &StandardCleanParams) -> String {
    format!(
        "highpass=f={}, afftdn=nr={}, agate=threshold={}dB",
        params.highpass_hz, params.noise_reduction_db, params.gate_threshold_db
    )
}

/// x264 CRF for a compressor intensity: `18 + 2 * intensity`.
pub fn video_crf(intensity: u32) -> u32 {
    18 + intensity * 2
}

/// Audio bitrate in kbit/s for a compressor intensity, floored at 32.
pub fn audio_bitrate_kbps(intensity: u32) -> u32 {
    320u32.saturating_sub(intensity.saturating_mul(28)).max(32)
}
