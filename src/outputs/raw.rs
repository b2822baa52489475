//! Raw text output: `{id}_raw.txt`.

use crate::models::Article;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub fn raw_path(assets_dir: &Path, id: usize) -> PathBuf {
    assets_dir.join(format!("{id}_raw.txt"))
}

#[instrument(level = "debug", skip_all, fields(id = article.id))]
pub async fn write_text(article: &Article, assets_dir: &Path) -> std::io::Result<()> {
    let path = raw_path(assets_dir, article.id);
    fs::write(&path, &article.text).await?;
    info!(path = %path.display(), bytes = article.text.len(), "Wrote article text");
    Ok(())
}
