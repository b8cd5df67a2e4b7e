use std::path::Path;

/// Container extensions treated as video. Everything else is handled as audio.
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mkv", ".mov", ".avi", ".flv", ".wmv"];

/// Returns the extension of `path` including its leading dot, or an empty string.
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Classify a file as video by its (case-insensitive) extension.
pub fn is_video(path: &Path) -> bool {
    let ext = dotted_extension(path).to_ascii_lowercase();
    VIDEO_EXTENSIONS.contains(&ext.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_video_extensions_case_insensitively() {
        assert!(is_video(Path::new("/tmp/clip.mp4")));
        assert!(is_video(Path::new("talk.MKV")));
        assert!(is_video(Path::new("a.b.Mov")));
        assert!(!is_video(Path::new("voice.wav")));
        assert!(!is_video(Path::new("voice.mp3")));
        assert!(!is_video(Path::new("no_extension")));
    }

    #[test]
    fn dotted_extension_handles_edge_cases() {
        assert_eq!(dotted_extension(Path::new("song.flac")), ".flac");
        assert_eq!(dotted_extension(Path::new("archive.tar.gz")), ".gz");
        assert_eq!(dotted_extension(Path::new("README")), "");
        assert_eq!(dotted_extension(Path::new(".bashrc")), "");
    }
}
