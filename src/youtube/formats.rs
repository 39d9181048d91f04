use crate::domain::MediaFormat;

const HEADER: &str = "Format Code  Extension  Resolution/Bitrate  Filesize    Note";

/// Human readable listing of the formats a video offers, audio-only first.
pub fn render_format_table(formats: &[MediaFormat]) -> String {
    if formats.is_empty() {
        return "No formats available for this video.\n".to_string();
    }

    let (audio, video): (Vec<&MediaFormat>, Vec<&MediaFormat>) =
        formats.iter().partition(|f| !f.has_video());

    let mut out = format!("\nAvailable formats:\n{}\n{}\n", HEADER, "-".repeat(80));
    if !audio.is_empty() {
        out.push_str("\nAudio-only formats:\n");
        for format in audio {
            let bitrate = format
                .abr
                .map(|abr| format!("{}k", bitrate(abr)))
                .unwrap_or_else(|| "N/A".to_string());
            out.push_str(&row(format, &bitrate));
        }
    }
    if !video.is_empty() {
        out.push_str("\nVideo formats (with audio if available):\n");
        for format in video {
            let resolution = format.resolution.as_deref().unwrap_or("N/A");
            out.push_str(&row(format, resolution));
        }
    }
    out
}

/// Whole numbers keep one decimal (`128.0`), everything else prints as reported.
fn bitrate(abr: f64) -> String {
    if abr.fract() == 0.0 {
        format!("{:.1}", abr)
    } else {
        abr.to_string()
    }
}

fn row(format: &MediaFormat, quality: &str) -> String {
    let filesize = format
        .filesize
        .map(|bytes| format!("{:.1}MB", bytes as f64 / 1024.0 / 1024.0))
        .unwrap_or_else(|| "N/A".to_string());
    let line = format!(
        "{:<11} {:<9} {:<16} {:<10} {}",
        format.format_id,
        format.ext,
        quality,
        filesize,
        format.note.as_deref().unwrap_or_default()
    );
    format!("{}\n", line.trim_end())
}
