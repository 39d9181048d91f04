use claims::assert_ok;

use crate::helpers::{TestAppBuilder, audio, combined, video_info, video_url};

#[tokio::test]
async fn formats_are_listed_without_downloading() {
    let info = video_info(
        "Song",
        vec![audio("251", "webm", "opus", 135.0), combined("18")],
    );
    let test_app = TestAppBuilder::new(info).spawn();

    let formats = assert_ok!(test_app.app.list_formats(&video_url()).await);

    assert_eq!(formats.len(), 2);
    assert_eq!(formats[0].format_id, "251");
    let calls = test_app.calls.lock().unwrap();
    assert_eq!(calls.probes, 1);
    assert!(calls.downloads.is_empty());
}

#[tokio::test]
async fn listing_does_not_need_the_download_directory() {
    let test_app = TestAppBuilder::new(video_info("Song", Vec::new()))
        .without_directory_creation()
        .spawn();

    let formats = assert_ok!(test_app.app.list_formats(&video_url()).await);

    assert!(formats.is_empty());
    assert!(!test_app.download_dir.exists());
}
