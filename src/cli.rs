//! Command-line interface definitions for the news scraper.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Most arguments can also be provided via environment variables.

use clap::Parser;

/// Command-line arguments for the news scraper.
///
/// Settings not exposed here (timeouts, user agent, pagination, cache,
/// schedule) live in the YAML configuration file. Flags given here take
/// precedence over the file.
///
/// # Examples
///
/// ```sh
/// # One run against ./config.yaml, results logged only
/// news_scraper --once
///
/// # Scheduled runs with JSON snapshots
/// news_scraper -c /etc/news_scraper.yaml -o ./out
///
/// # Override the pool size and request rate
/// news_scraper --workers 8 --rate-limit 4
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "NEWS_SCRAPER_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Directory for JSON snapshots of articles and run outcomes
    #[arg(short, long, env = "NEWS_SCRAPER_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    /// Run a single scrape and exit, even if an interval is configured
    #[arg(long)]
    pub once: bool,

    /// Worker pool size (overrides `scraper.workers`)
    #[arg(long, env = "NEWS_SCRAPER_WORKERS")]
    pub workers: Option<i64>,

    /// Requests per second across all workers (overrides `scraper.rate_limit`)
    #[arg(long, env = "NEWS_SCRAPER_RATE_LIMIT")]
    pub rate_limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(&["news_scraper"]);

        assert_eq!(cli.config, "config.yaml");
        assert!(cli.output_dir.is_none());
        assert!(!cli.once);
        assert!(cli.workers.is_none());
        assert!(cli.rate_limit.is_none());
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(&[
            "news_scraper",
            "--config",
            "/etc/scraper.yaml",
            "--output-dir",
            "./out",
            "--once",
            "--workers",
            "8",
            "--rate-limit",
            "3",
        ]);

        assert_eq!(cli.config, "/etc/scraper.yaml");
        assert_eq!(cli.output_dir.as_deref(), Some("./out"));
        assert!(cli.once);
        assert_eq!(cli.workers, Some(8));
        assert_eq!(cli.rate_limit, Some(3));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(&["news_scraper", "-c", "a.yaml", "-o", "/tmp/out"]);

        assert_eq!(cli.config, "a.yaml");
        assert_eq!(cli.output_dir.as_deref(), Some("/tmp/out"));
    }
}
