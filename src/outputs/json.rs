//! Metadata output: `{id}_meta.json`.
//!
//! The record carries everything but the body text, with the publication
//! date in the canonical `YYYY-MM-DD HH:MM:SS` layout:
//!
//! ```json
//! {
//!   "id": 1,
//!   "url": "https://www.example.com/2025/05/06/story",
//!   "title": "Rates held steady",
//!   "author": ["Jane Roe"],
//!   "date": "2025-05-06 14:30:00",
//!   "topics": ["Economy"]
//! }
//! ```

use crate::models::Article;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub fn meta_path(assets_dir: &Path, id: usize) -> PathBuf {
    assets_dir.join(format!("{id}_meta.json"))
}

/// Serialize the article's metadata next to its text.
#[instrument(level = "debug", skip_all, fields(id = article.id))]
pub async fn write_meta(article: &Article, assets_dir: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(&article.meta())?;
    let path = meta_path(assets_dir, article.id);

    if let Err(e) = fs::write(&path, json).await {
        error!(path = %path.display(), error = %e, "Failed to write metadata");
        return Err(e.into());
    }
    info!(path = %path.display(), "Wrote article metadata");
    Ok(())
}
