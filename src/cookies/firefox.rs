use std::path::{Path, PathBuf};

use secrecy::SecretString;
use sqlx::{Connection, Row, SqliteConnection, sqlite::SqliteConnectOptions};
use tracing::{debug, instrument};

use super::{Browser, Cookie, CookieError};

const STORE: &str = "cookies.sqlite";

/// Profile directories are named `<salt>.default` / `<salt>.default-release`;
/// the release profile wins when both carry a cookie store.
pub fn find_profile(root: &Path) -> Option<PathBuf> {
    let mut profiles: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.contains(".default"))
        })
        .filter(|path| path.join(STORE).is_file())
        .collect();

    profiles.sort_by_key(|path| {
        let release = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with("default-release"));
        (!release, path.clone())
    });
    profiles.into_iter().next()
}

#[instrument(name = "Loading Firefox cookies", skip_all, fields(root = %root.display()))]
pub async fn load_cookies(root: &Path) -> Result<Vec<Cookie>, CookieError> {
    let profile = find_profile(root).ok_or(CookieError::NoProfile(Browser::Firefox))?;
    debug!("Using Firefox profile {}", profile.display());
    let cookies = read_store(&profile.join(STORE)).await?;
    if cookies.is_empty() {
        return Err(CookieError::Empty(Browser::Firefox));
    }
    Ok(cookies)
}

/// Reads YouTube cookies from a `cookies.sqlite` database.
pub async fn read_store(db: &Path) -> Result<Vec<Cookie>, CookieError> {
    // Firefox holds a lock on the live database, work on a copy.
    let scratch = tempfile::tempdir()?;
    let copy = scratch.path().join(STORE);
    tokio::fs::copy(db, &copy).await?;
    let wal = db.with_file_name(format!("{}-wal", STORE));
    if wal.is_file() {
        tokio::fs::copy(&wal, scratch.path().join(format!("{}-wal", STORE))).await?;
    }

    let mut connection = SqliteConnection::connect_with(&store_options(&copy)).await?;
    let rows = sqlx::query(
        r#"
        SELECT host, name, value, path, expiry, isSecure
        FROM moz_cookies
        WHERE host = ?1 OR host LIKE ?2
        ORDER BY id
        "#,
    )
    .bind("youtube.com")
    .bind("%.youtube.com")
    .fetch_all(&mut connection)
    .await?;
    connection.close().await?;

    rows.iter()
        .map(|row| -> Result<Cookie, CookieError> {
            Ok(Cookie {
                domain: row.try_get("host")?,
                include_subdomains: true,
                path: row.try_get("path")?,
                secure: row.try_get::<i64, _>("isSecure")? != 0,
                expires: normalise_expiry(row.try_get("expiry")?),
                name: row.try_get("name")?,
                value: SecretString::from(row.try_get::<String, _>("value")?),
            })
        })
        .collect()
}

fn store_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new().filename(path).read_only(true)
}

/// Newer Firefox releases store expiry in milliseconds.
fn normalise_expiry(expiry: i64) -> i64 {
    if expiry > 100_000_000_000 {
        expiry / 1000
    } else {
        expiry
    }
}
