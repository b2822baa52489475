//! Command-line interface definitions.
//!
//! Crawl parameters themselves live in the config file; these options only
//! pick the file, the output location and how the run is executed. Every
//! option can also be set through an environment variable.

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for the article crawler.
///
/// # Examples
///
/// ```sh
/// # Crawl with the defaults (./scrapper_config.json into tmp/articles)
/// awful_article_crawler
///
/// # CNN markup, four concurrent article fetches, two retries per request
/// awful_article_crawler -c cnn.yaml --site cnn --workers 4 --retries 2
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the crawl config (JSON, or YAML by extension)
    #[arg(short, long, env = "CRAWLER_CONFIG", default_value = "scrapper_config.json")]
    pub config: PathBuf,

    /// Directory that receives `{id}_raw.txt` and `{id}_meta.json`; wiped at start
    #[arg(short, long, env = "CRAWLER_ASSETS_DIR", default_value = "tmp/articles")]
    pub assets_dir: PathBuf,

    /// Markup schema to extract with
    #[arg(short, long, env = "CRAWLER_SITE", default_value = "generic")]
    pub site: String,

    /// Concurrent article fetches after discovery (1 = sequential)
    #[arg(
        short,
        long,
        env = "CRAWLER_WORKERS",
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(1..=8)
    )]
    pub workers: u8,

    /// Extra attempts for timeouts, connection errors and 5xx responses
    #[arg(short, long, env = "CRAWLER_RETRIES", default_value_t = 0)]
    pub retries: usize,

    /// Stop discovering new links after this many seconds
    #[arg(long, env = "CRAWLER_DEADLINE_SECS")]
    pub deadline_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["awful_article_crawler"]);

        assert_eq!(cli.config, PathBuf::from("scrapper_config.json"));
        assert_eq!(cli.assets_dir, PathBuf::from("tmp/articles"));
        assert_eq!(cli.site, "generic");
        assert_eq!(cli.workers, 1);
        assert_eq!(cli.retries, 0);
        assert!(cli.deadline_secs.is_none());
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "awful_article_crawler",
            "--config",
            "./cnn.yaml",
            "--assets-dir",
            "/tmp/out",
            "--site",
            "cnn",
            "--workers",
            "4",
            "--retries",
            "2",
            "--deadline-secs",
            "30",
        ]);

        assert_eq!(cli.config, PathBuf::from("./cnn.yaml"));
        assert_eq!(cli.assets_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cli.site, "cnn");
        assert_eq!(cli.workers, 4);
        assert_eq!(cli.retries, 2);
        assert_eq!(cli.deadline_secs, Some(30));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["awful_article_crawler", "-c", "run.json", "-a", "out", "-w", "8"]);

        assert_eq!(cli.config, PathBuf::from("run.json"));
        assert_eq!(cli.assets_dir, PathBuf::from("out"));
        assert_eq!(cli.workers, 8);
    }

    #[test]
    fn test_cli_rejects_worker_count_out_of_range() {
        assert!(Cli::try_parse_from(["awful_article_crawler", "--workers", "0"]).is_err());
        assert!(Cli::try_parse_from(["awful_article_crawler", "--workers", "9"]).is_err());
    }
}
