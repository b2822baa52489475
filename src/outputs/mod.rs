//! Article persistence.
//!
//! Each article is written as two files named by its identifier:
//!
//! ```text
//! assets_dir/
//! ├── 1_raw.txt     # full body text
//! ├── 1_meta.json   # id, url, title, author, date, topics
//! ├── 3_raw.txt     # identifiers keep the gaps left by dropped articles
//! └── 3_meta.json
//! ```
//!
//! # Submodules
//!
//! - [`raw`]: writes the body text
//! - [`json`]: writes the metadata record

use crate::models::Article;
use std::error::Error;
use std::path::Path;
use tracing::instrument;

pub mod json;
pub mod raw;

/// Write both files for `article` into `assets_dir`.
#[instrument(level = "info", skip_all, fields(id = article.id))]
pub async fn persist(article: &Article, assets_dir: &Path) -> Result<(), Box<dyn Error>> {
    raw::write_text(article, assets_dir).await?;
    json::write_meta(article, assets_dir).await?;
    Ok(())
}
