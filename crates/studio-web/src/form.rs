//! Multipart job submissions: upload staging and conversion into [`JobRequest`]s.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use studio_core::naming::usable_name;
use studio_core::{
    CompressParams, ExtractParams, JobKind, JobRequest, MergeParams, SplitParams,
    StandardCleanParams, StudioError, UltraCleanParams,
};
use tempfile::TempDir;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Uploaded files and text fields of one request. Files live until the form is dropped.
#[derive(Debug)]
pub struct StagedForm {
    dir: TempDir,
    files: HashMap<String, PathBuf>,
    fields: HashMap<String, String>,
}

impl StagedForm {
    /// An empty form staged under `root`, or the system temp directory.
    pub fn new(root: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("ultra-studio-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(Self {
            dir,
            files: HashMap::new(),
            fields: HashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Where an upload for `field` named `file_name` is stored. Each field gets its own
    /// subdirectory so two uploads with the same name cannot collide.
    fn file_slot(&self, field: &str, file_name: &str) -> PathBuf {
        self.dir.path().join(field).join(file_name)
    }

    pub fn insert_file(&mut self, field: impl Into<String>, path: PathBuf) {
        self.files.insert(field.into(), path);
    }

    pub fn insert_field(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn file(&self, field: &str) -> Option<PathBuf> {
        self.files.get(field).cloned()
    }

    /// A text field with surrounding whitespace removed; blank counts as absent.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn number(&self, field: &'static str, default: f64) -> Result<f64, StudioError> {
        match self.text(field) {
            None => Ok(default),
            Some(raw) => raw
                .parse::<f64>()
                .map_err(|_| StudioError::invalid(field, format!("'{raw}' is not a number"))),
        }
    }

    fn whole(&self, field: &'static str, default: u32) -> Result<u32, StudioError> {
        match self.text(field) {
            None => Ok(default),
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| StudioError::invalid(field, format!("'{raw}' is not a whole number"))),
        }
    }

    fn flag(&self, field: &str) -> bool {
        matches!(
            self.text(field).map(str::to_ascii_lowercase).as_deref(),
            Some("true" | "on" | "1" | "yes")
        )
    }

    fn choice<T>(&self, field: &str) -> Result<T, StudioError>
    where
        T: FromStr<Err = StudioError> + Default,
    {
        self.text(field)
            .map_or_else(|| Ok(T::default()), |raw| raw.parse())
    }

    fn name(&self) -> Option<String> {
        self.text("name").map(str::to_string)
    }
}

/// Multipart fields that carry uploads. File parts under any other name are dropped.
const FILE_FIELDS: [&str; 3] = ["input", "video", "audio"];

/// Errors raised while reading the multipart body itself.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("upload rejected: {0}")]
    Multipart(#[from] MultipartError),
    #[error("failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Drain a multipart body into a [`StagedForm`].
///
/// File parts are streamed to disk under their original file name (final component only).
/// File parts without a name, as browsers send for an empty file input, are skipped, as are
/// file parts for fields no tool reads.
pub async fn stage_multipart(
    mut multipart: Multipart,
    root: Option<&Path>,
) -> Result<StagedForm, StageError> {
    let mut form = StagedForm::new(root)?;

    while let Some(mut field) = multipart.next_field().await? {
        let Some(field_name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(raw_name) => {
                if !FILE_FIELDS.contains(&field_name.as_str()) {
                    debug!(field = %field_name, "ignoring upload for unknown field");
                    continue;
                }
                let Some(file_name) = usable_name(&raw_name) else {
                    continue;
                };
                let path = form.file_slot(&field_name, &file_name);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).await?;
                }
                let mut file = File::create(&path).await?;
                let mut written = 0usize;
                while let Some(chunk) = field.chunk().await? {
                    written += chunk.len();
                    file.write_all(&chunk).await?;
                }
                file.flush().await?;
                debug!(field = %field_name, path = %path.display(), bytes = written, "staged upload");
                form.insert_file(field_name, path);
            }
            None => {
                let value = field.text().await?;
                form.insert_field(field_name, value);
            }
        }
    }

    Ok(form)
}

/// Turn a staged form into the request for `kind`. Absent numeric fields take their defaults.
pub fn build_request(kind: JobKind, form: &StagedForm) -> Result<JobRequest, StudioError> {
    let request = match kind {
        JobKind::UltraClean => {
            let defaults = UltraCleanParams::default();
            JobRequest::UltraClean {
                input: form.file("input"),
                params: UltraCleanParams {
                    highpass_hz: form.number("highpass", defaults.highpass_hz)?,
                    lowpass_hz: form.number("lowpass", defaults.lowpass_hz)?,
                    gate_threshold_db: form.number("gate", defaults.gate_threshold_db)?,
                    gate_ratio: form.number("ratio", defaults.gate_ratio)?,
                    attack_ms: form.number("attack", defaults.attack_ms)?,
                    release_ms: form.number("release", defaults.release_ms)?,
                    warmth: form.number("warmth", defaults.warmth)?,
                    custom_name: form.name(),
                },
            }
        }
        JobKind::StandardClean => {
            let defaults = StandardCleanParams::default();
            JobRequest::StandardClean {
                input: form.file("input"),
                params: StandardCleanParams {
                    highpass_hz: form.number("highpass", defaults.highpass_hz)?,
                    noise_reduction_db: form
                        .whole("noise_reduction", defaults.noise_reduction_db)?,
                    gate_threshold_db: form.number("gate", defaults.gate_threshold_db)?,
                    custom_name: form.name(),
                },
            }
        }
        JobKind::Split => JobRequest::Split {
            input: form.file("input"),
            params: SplitParams {
                split_points: form.text("split_points").unwrap_or_default().to_string(),
                prefix: form.text("prefix").map(str::to_string),
            },
        },
        JobKind::Extract => JobRequest::Extract {
            input: form.file("input"),
            params: ExtractParams {
                format: form.choice("format")?,
                bitrate: form.choice("bitrate")?,
                channels: form.choice("channels")?,
            },
        },
        JobKind::Merge => {
            let defaults = MergeParams::default();
            JobRequest::Merge {
                video: form.file("video"),
                audio: form.file("audio"),
                params: MergeParams {
                    compress_video: form.flag("compress_video"),
                    crf: form.whole("crf", defaults.crf)?,
                    custom_name: form.name(),
                },
            }
        }
        JobKind::Compress => {
            let defaults = CompressParams::default();
            JobRequest::Compress {
                input: form.file("input"),
                params: CompressParams {
                    intensity: form.whole("intensity", defaults.intensity)?,
                    custom_name: form.name(),
                },
            }
        }
    };
    Ok(request)
}
