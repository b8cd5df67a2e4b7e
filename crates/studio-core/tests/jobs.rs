use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use studio_core::{
    AudioBitrate, AudioFormat, Channels, CompressParams, ExtractParams, JobKind, JobRequest,
    MergeParams, RecordingRunner, SplitParams, Studio, StudioError, UltraCleanParams, Workspace,
};
use tempfile::tempdir;

fn studio(root: &Path) -> (Studio, RecordingRunner) {
    let runner = RecordingRunner::new();
    let workspace = Workspace {
        output_dir: root.join("studio_output"),
        denoise_model: root.join("studio_output").join("std.rnnn"),
        ffmpeg: "ffmpeg".to_string(),
    };
    (Studio::new(workspace, Arc::new(runner.clone())), runner)
}

fn s(value: &Path) -> String {
    value.to_string_lossy().into_owned()
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

#[test]
fn extract_mp3_mono_builds_lame_command() {
    let temp = tempdir().expect("tempdir");
    let (studio, runner) = studio(temp.path());
    let input = temp.path().join("lecture.mkv");

    let report = studio
        .run(&JobRequest::Extract {
            input: Some(input.clone()),
            params: ExtractParams {
                format: AudioFormat::Mp3,
                bitrate: AudioBitrate::K320,
                channels: Channels::Mono,
            },
        })
        .expect("extract runs");

    let expected_out = temp.path().join("studio_output/extracted_lecture.mp3");
    assert_eq!(report.kind, JobKind::Extract);
    assert_eq!(report.outputs, vec![expected_out.clone()]);

    let command = runner.last().expect("command recorded");
    assert_eq!(command.program(), "ffmpeg");
    assert_eq!(
        command.args_lossy(),
        vec![
            "-y".to_string(),
            "-i".to_string(),
            s(&input),
            "-vn".to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-acodec".to_string(),
            "libmp3lame".to_string(),
            "-ab".to_string(),
            "320k".to_string(),
            s(&expected_out),
        ]
    );
}

#[test]
fn extract_wav_ignores_bitrate() {
    let temp = tempdir().expect("tempdir");
    let (studio, runner) = studio(temp.path());

    studio
        .run(&JobRequest::Extract {
            input: Some(temp.path().join("clip.mp4")),
            params: ExtractParams::default(),
        })
        .expect("extract runs");

    let args = runner.last().expect("command recorded").args_lossy();
    assert!(args.contains(&"pcm_s16le".to_string()));
    assert!(!args.contains(&"-ab".to_string()));
    assert!(args.last().unwrap().ends_with("extracted_clip.wav"));
}

#[test]
fn merge_with_compression_uses_x264() {
    let temp = tempdir().expect("tempdir");
    let (studio, runner) = studio(temp.path());
    let video = temp.path().join("broll.mov");
    let audio = temp.path().join("voice.wav");

    let report = studio
        .run(&JobRequest::Merge {
            video: Some(video.clone()),
            audio: Some(audio.clone()),
            params: MergeParams {
                compress_video: true,
                crf: 30,
                custom_name: Some("final cut".to_string()),
            },
        })
        .expect("merge runs");

    let out = temp.path().join("studio_output/final cut.mp4");
    assert_eq!(report.outputs, vec![out.clone()]);
    let args = runner.last().expect("command recorded").args_lossy();
    assert_eq!(
        args,
        vec![
            "-y".to_string(),
            "-i".to_string(),
            s(&video),
            "-i".to_string(),
            s(&audio),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-crf".to_string(),
            "30".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "192k".to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
            "-shortest".to_string(),
            s(&out),
        ]
    );
}

#[test]
fn compress_picks_container_by_media_type() {
    let temp = tempdir().expect("tempdir");
    let (studio, runner) = studio(temp.path());
    let podcast = temp.path().join("podcast.flac");

    let report = studio
        .run(&JobRequest::Compress {
            input: Some(podcast.clone()),
            params: CompressParams {
                intensity: 10,
                custom_name: None,
            },
        })
        .expect("audio compress runs");
    let out = temp.path().join("studio_output/compressed_podcast.mp3");
    assert_eq!(report.outputs, vec![out.clone()]);
    assert_eq!(
        runner.last().expect("command recorded").args_lossy(),
        argv(&["-y", "-i", &s(&podcast), "-ab", "40k", &s(&out)])
    );

    let screen = temp.path().join("screen.avi");
    let report = studio
        .run(&JobRequest::Compress {
            input: Some(screen.clone()),
            params: CompressParams::default(),
        })
        .expect("video compress runs");
    let out = temp.path().join("studio_output/compressed_screen.mp4");
    assert_eq!(report.outputs, vec![out.clone()]);
    assert_eq!(
        runner.last().expect("command recorded").args_lossy(),
        argv(&[
            "-y", "-i", &s(&screen), "-c:v", "libx264", "-crf", "28", "-preset", "slow", "-c:a",
            "aac", "-b:a", "96k", &s(&out),
        ])
    );
}

#[test]
fn merge_without_compression_copies_video_stream() {
    let temp = tempdir().expect("tempdir");
    let (studio, runner) = studio(temp.path());
    let video = temp.path().join("clip.mp4");
    let audio = temp.path().join("voice.wav");

    let report = studio
        .run(&JobRequest::Merge {
            video: Some(video.clone()),
            audio: Some(audio.clone()),
            params: MergeParams::default(),
        })
        .expect("merge runs");

    let out = temp.path().join("studio_output/merged_clip.mp4");
    assert_eq!(report.outputs, vec![out.clone()]);
    assert_eq!(
        runner.last().expect("command recorded").args_lossy(),
        argv(&[
            "-y", "-i", &s(&video), "-i", &s(&audio), "-c:v", "copy", "-c:a", "aac", "-b:a",
            "192k", "-map", "0:v:0", "-map", "1:a:0", "-shortest", &s(&out),
        ])
    );
}

#[test]
fn extract_m4a_stereo_uses_aac() {
    let temp = tempdir().expect("tempdir");
    let (studio, runner) = studio(temp.path());
    let input = temp.path().join("talk.mov");

    let report = studio
        .run(&JobRequest::Extract {
            input: Some(input.clone()),
            params: ExtractParams {
                format: AudioFormat::M4a,
                bitrate: AudioBitrate::K128,
                channels: Channels::Stereo,
            },
        })
        .expect("extract runs");

    let out = temp.path().join("studio_output/extracted_talk.m4a");
    assert_eq!(report.outputs, vec![out.clone()]);
    assert_eq!(
        runner.last().expect("command recorded").args_lossy(),
        argv(&[
            "-y", "-i", &s(&input), "-vn", "-ac", "2", "-acodec", "aac", "-ab", "128k", &s(&out),
        ])
    );
}

#[test]
fn split_collects_only_matching_segments_in_order() {
    let temp = tempdir().expect("tempdir");
    let out_dir = temp.path().join("studio_output");
    fs::create_dir_all(&out_dir).unwrap();
    for name in ["split_002.wav", "split_000.wav", "split_001.wav", "split_notes.txt", "other_000.wav"] {
        fs::write(out_dir.join(name), b"").unwrap();
    }
    let (studio, runner) = studio(temp.path());

    let report = studio
        .run(&JobRequest::Split {
            input: Some(temp.path().join("interview.wav")),
            params: SplitParams {
                split_points: " 30, ,01:00 ,".to_string(),
                prefix: None,
            },
        })
        .expect("split runs");

    let expected: Vec<PathBuf> = ["split_000.wav", "split_001.wav", "split_002.wav"]
        .iter()
        .map(|name| out_dir.join(name))
        .collect();
    assert_eq!(report.outputs, expected);

    assert_eq!(
        runner.last().expect("command recorded").args_lossy(),
        argv(&[
            "-y",
            "-i",
            &s(&temp.path().join("interview.wav")),
            "-f",
            "segment",
            "-segment_times",
            "30,01:00",
            "-c",
            "copy",
            &s(&out_dir.join("split_%03d.wav")),
        ])
    );
}

#[test]
fn missing_inputs_fail_before_any_command() {
    let temp = tempdir().expect("tempdir");
    let (studio, runner) = studio(temp.path());

    let err = studio
        .run(&JobRequest::UltraClean {
            input: None,
            params: UltraCleanParams::default(),
        })
        .unwrap_err();
    assert!(matches!(err, StudioError::MissingInput("input")));

    let err = studio
        .run(&JobRequest::Split {
            input: Some(temp.path().join("a.wav")),
            params: SplitParams {
                split_points: "   ".to_string(),
                prefix: None,
            },
        })
        .unwrap_err();
    assert_eq!(err.to_string(), "missing required input: split points");
    assert!(runner.commands().is_empty());
}

#[test]
fn failing_tool_surfaces_stderr() {
    let temp = tempdir().expect("tempdir");
    let workspace = Workspace {
        output_dir: temp.path().to_path_buf(),
        denoise_model: temp.path().join("std.rnnn"),
        ffmpeg: "ffmpeg".to_string(),
    };
    let studio = Studio::new(
        workspace,
        Arc::new(RecordingRunner::failing("Error opening input files: Invalid data")),
    );

    let err = studio
        .run(&JobRequest::UltraClean {
            input: Some(temp.path().join("noise.wav")),
            params: UltraCleanParams::default(),
        })
        .unwrap_err();
    assert!(!err.is_client_error());
    assert_eq!(
        err.to_string(),
        "FFmpeg error: Error opening input files: Invalid data"
    );
}
