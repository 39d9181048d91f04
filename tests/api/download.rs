use claims::{assert_err, assert_matches, assert_ok};
use yt_audio_dl::{
    domain::{AudioFormat, FormatChoice},
    error::{AppError, YouTubeFailure},
    youtube::ExtractorError,
};

use crate::helpers::{TestAppBuilder, audio, combined, video_info, video_url};

#[tokio::test]
async fn opus_streams_are_preferred_and_saved_under_the_title() {
    let info = video_info(
        "Never Gonna Give You Up",
        vec![
            audio("140", "m4a", "mp4a.40.2", 129.5),
            audio("251", "opus", "opus", 135.0),
            combined("18"),
        ],
    );
    let test_app = TestAppBuilder::new(info).spawn();

    let report = assert_ok!(test_app.app.download(&video_url()).await);

    assert_eq!(report.title, "Never Gonna Give You Up");
    assert!(!report.converted);
    assert_eq!(
        report.path,
        test_app.download_dir.join("Never Gonna Give You Up.opus")
    );
    assert_eq!(std::fs::read(&report.path).unwrap(), b"downloaded");

    let calls = test_app.calls.lock().unwrap();
    assert_eq!(calls.probes, 1);
    assert_matches!(&calls.downloads[0].choice, FormatChoice::Opus(f) if f.format_id == "251");
    assert!(calls.conversions.is_empty());
}

#[tokio::test]
async fn opus_in_webm_is_remuxed_without_reencoding() {
    let info = video_info(
        "Song",
        vec![
            audio("140", "m4a", "mp4a.40.2", 129.5),
            audio("251", "webm", "opus", 135.0),
        ],
    );
    let test_app = TestAppBuilder::new(info).spawn();

    let report = assert_ok!(test_app.app.download(&video_url()).await);

    assert!(report.converted);
    assert_eq!(report.path, test_app.download_dir.join("Song.opus"));
    let calls = test_app.calls.lock().unwrap();
    let (input, copy_audio) = &calls.conversions[0];
    assert!(input.to_string_lossy().ends_with(".webm"));
    assert!(*copy_audio);
}

#[tokio::test]
async fn other_audio_streams_are_converted() {
    let info = video_info("Song", vec![audio("140", "m4a", "mp4a.40.2", 129.5)]);
    let test_app = TestAppBuilder::new(info).spawn();

    let report = assert_ok!(test_app.app.download(&video_url()).await);

    assert!(report.converted);
    assert_eq!(report.path, test_app.download_dir.join("Song.opus"));
    assert_eq!(std::fs::read(&report.path).unwrap(), b"converted");
    assert_eq!(test_app.saved_files(), vec!["Song.opus".to_string()]);
    assert!(!test_app.calls.lock().unwrap().conversions[0].1);
}

#[tokio::test]
async fn audio_is_extracted_when_only_combined_streams_exist() {
    let info = video_info("Live", vec![combined("18"), combined("22")]);
    let test_app = TestAppBuilder::new(info).spawn();

    let report = assert_ok!(test_app.app.download(&video_url()).await);

    assert!(report.converted);
    let calls = test_app.calls.lock().unwrap();
    assert_eq!(
        calls.downloads[0].choice,
        FormatChoice::ExtractFromVideo(Some(combined("18")))
    );
    let (input, copy_audio) = &calls.conversions[0];
    assert!(input.to_string_lossy().ends_with(".mp4"));
    assert!(!*copy_audio);
}

#[tokio::test]
async fn extracted_audio_keeps_the_combined_stream_container_when_asked() {
    let mut webm = combined("43");
    webm.ext = "webm".into();
    let info = video_info("Live", vec![webm]);
    let test_app = TestAppBuilder::new(info)
        .audio_format(AudioFormat::Original)
        .spawn();

    let report = assert_ok!(test_app.app.download(&video_url()).await);

    assert!(!report.converted);
    assert_eq!(report.path, test_app.download_dir.join("Live.webm"));
}

#[tokio::test]
async fn the_original_container_is_kept_when_asked() {
    let info = video_info("Song", vec![audio("140", "m4a", "mp4a.40.2", 129.5)]);
    let test_app = TestAppBuilder::new(info)
        .audio_format(AudioFormat::Original)
        .spawn();

    let report = assert_ok!(test_app.app.download(&video_url()).await);

    assert!(!report.converted);
    assert_eq!(report.path, test_app.download_dir.join("Song.m4a"));
}

#[tokio::test]
async fn titles_are_sanitized_and_never_overwrite_existing_files() {
    let info = video_info("AC/DC: Back in Black?", vec![audio("251", "opus", "opus", 135.0)]);
    let test_app = TestAppBuilder::new(info).spawn();

    let first = assert_ok!(test_app.app.download(&video_url()).await);
    let second = assert_ok!(test_app.app.download(&video_url()).await);

    assert_eq!(first.path, test_app.download_dir.join("AC_DC_ Back in Black_.opus"));
    assert_eq!(
        second.path,
        test_app.download_dir.join("AC_DC_ Back in Black_ (1).opus")
    );
}

#[tokio::test]
async fn long_multibyte_titles_still_fit_the_file_name_limit() {
    let title = "日本語のタイトル".repeat(12);
    let info = video_info(&title, vec![audio("251", "opus", "opus", 135.0)]);
    let test_app = TestAppBuilder::new(info).spawn();

    let first = assert_ok!(test_app.app.download(&video_url()).await);
    let second = assert_ok!(test_app.app.download(&video_url()).await);

    for report in [&first, &second] {
        let name = report.path.file_name().unwrap().to_string_lossy();
        assert!(name.len() <= 255, "{} bytes", name.len());
        assert!(report.path.exists());
    }
    assert!(first.path.file_stem().unwrap().to_string_lossy().starts_with("日本語"));
    assert_eq!(test_app.saved_files().len(), 2);
}

#[tokio::test]
async fn staging_happens_inside_the_download_directory_and_is_cleaned_up() {
    let info = video_info("Song", vec![audio("251", "opus", "opus", 135.0)]);
    let test_app = TestAppBuilder::new(info).spawn();

    assert_ok!(test_app.app.download(&video_url()).await);

    let calls = test_app.calls.lock().unwrap();
    let staging = &calls.downloads[0].staging_dir;
    assert_eq!(staging.parent(), Some(test_app.download_dir.as_path()));
    assert!(!staging.exists());
    assert_eq!(test_app.saved_files(), vec!["Song.opus".to_string()]);
}

#[tokio::test]
async fn a_missing_directory_is_an_error_when_creation_is_off() {
    let info = video_info("Song", vec![audio("251", "opus", "opus", 135.0)]);
    let test_app = TestAppBuilder::new(info)
        .without_directory_creation()
        .spawn();

    let error = assert_err!(test_app.app.download(&video_url()).await);

    assert_matches!(error, AppError::MissingDirectory(_));
    assert_eq!(test_app.calls.lock().unwrap().probes, 0);
}

#[tokio::test]
async fn custom_cookie_files_reach_the_extractor() {
    let cookies = tempfile::NamedTempFile::new().unwrap();
    let info = video_info("Song", vec![audio("251", "opus", "opus", 135.0)]);
    let test_app = TestAppBuilder::new(info).cookie_file(cookies.path()).spawn();

    assert_ok!(test_app.app.download(&video_url()).await);

    let calls = test_app.calls.lock().unwrap();
    assert_eq!(
        calls.downloads[0].cookie_file.as_deref(),
        Some(cookies.path())
    );
}

#[tokio::test]
async fn unavailable_formats_trigger_a_format_listing() {
    let info = video_info("Song", vec![audio("251", "opus", "opus", 135.0)]);
    let test_app = TestAppBuilder::new(info)
        .download_error("ERROR: [youtube] dQw4w9WgXcQ: Requested format is not available")
        .spawn();

    let error = assert_err!(test_app.app.download(&video_url()).await);

    assert_eq!(error.failure(), YouTubeFailure::FormatUnavailable);
    assert_eq!(test_app.calls.lock().unwrap().probes, 2);
}

#[tokio::test]
async fn bot_checks_are_reported_without_a_format_listing() {
    let info = video_info("Song", vec![audio("251", "opus", "opus", 135.0)]);
    let test_app = TestAppBuilder::new(info)
        .download_error("ERROR: [youtube] dQw4w9WgXcQ: Sign in to confirm you're not a bot")
        .spawn();

    let error = assert_err!(test_app.app.download(&video_url()).await);

    assert_matches!(
        &error,
        AppError::Extractor(ExtractorError::Failed {
            failure: YouTubeFailure::BotCheck,
            ..
        })
    );
    assert_eq!(test_app.calls.lock().unwrap().probes, 1);
    assert!(test_app.saved_files().is_empty());
}

#[tokio::test]
async fn failed_conversions_leave_nothing_behind() {
    let info = video_info("Song", vec![audio("140", "m4a", "mp4a.40.2", 129.5)]);
    let test_app = TestAppBuilder::new(info).transcode_fails().spawn();

    let error = assert_err!(test_app.app.download(&video_url()).await);

    assert_matches!(error, AppError::Transcode(_));
    assert!(test_app.saved_files().is_empty());
}
