mod file_name;
mod media_format;
mod video_url;

pub use file_name::FileName;
pub use media_format::{AudioFormat, AudioQuality, FormatChoice, MediaFormat, select_audio_format};
pub use video_url::VideoUrl;
