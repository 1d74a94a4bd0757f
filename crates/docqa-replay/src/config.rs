use std::{env, path::Path, str::FromStr};

/// Loads `.env` from the crate directory and then from the working directory.
pub fn init() {
    let _ = dotenvy::from_path(Path::new(
        format!("{}/.env", env!("CARGO_MANIFEST_DIR")).as_str(),
    ));
    dotenvy::dotenv().ok();
}

/// Reads and parses an environment variable.
///
/// Unset variables yield `None`; unparseable ones are logged and ignored.
pub fn get_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::error!(key, value = %raw, "ignoring unparseable environment variable");
            None
        }
    }
}
