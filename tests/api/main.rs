mod download;
mod helpers;
mod list_formats;
