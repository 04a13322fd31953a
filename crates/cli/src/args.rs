//! Command-line arguments.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use tubewalk_core::Config;

use crate::output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "tubewalk")]
#[command(about = "Crawl YouTube recommendations and rank recent, popular, on-topic videos")]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Crawl from the given seeds and print the ranked videos
    Run(RunArgs),

    /// Load and validate the configuration, then print it with secrets redacted
    CheckConfig {
        /// Configuration file (TOML)
        #[arg(long, env = "TUBEWALK_CONFIG", value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Configuration file (TOML)
    #[arg(long, env = "TUBEWALK_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seed video or channel URL (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    pub seeds: Vec<String>,

    /// File with one seed URL per line; blank lines and `#` comments are skipped
    #[arg(long, value_name = "FILE")]
    pub seeds_file: Option<PathBuf>,

    /// Reference topic (repeatable); replaces the configured topics
    #[arg(long = "topic", value_name = "TOPIC")]
    pub topics: Vec<String>,

    #[arg(long, value_name = "N")]
    pub max_age_days: Option<u32>,

    #[arg(long, value_name = "N")]
    pub min_views: Option<u64>,

    #[arg(long, value_name = "N")]
    pub max_views: Option<u64>,

    /// Keep only videos whose title contains this keyword (case-insensitive)
    #[arg(long, value_name = "KEYWORD")]
    pub title_contains: Option<String>,

    #[arg(long, value_name = "N")]
    pub max_depth: Option<u32>,

    #[arg(long, value_name = "N")]
    pub max_frontier_size: Option<usize>,

    #[arg(long, value_name = "N")]
    pub max_videos: Option<usize>,

    #[arg(long, value_name = "N")]
    pub time_budget_secs: Option<u64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write results here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write Prometheus metrics in text format here after the run
    #[arg(long, value_name = "FILE")]
    pub metrics_out: Option<PathBuf>,
}

impl RunArgs {
    /// Command-line values take precedence over file and environment settings.
    pub fn apply_overrides(&self, config: &mut Config) {
        if !self.topics.is_empty() {
            config.topics = self.topics.clone();
        }
        if let Some(v) = self.max_age_days {
            config.filter.max_age_days = v;
        }
        if let Some(v) = self.min_views {
            config.filter.min_views = v;
        }
        if self.max_views.is_some() {
            config.filter.max_views = self.max_views;
        }
        if self.title_contains.is_some() {
            config.filter.title_contains = self.title_contains.clone();
        }
        if let Some(v) = self.max_depth {
            config.crawl.max_depth = v;
        }
        if let Some(v) = self.max_frontier_size {
            config.crawl.max_frontier_size = v;
        }
        if self.max_videos.is_some() {
            config.crawl.max_videos = self.max_videos;
        }
        if self.time_budget_secs.is_some() {
            config.crawl.time_budget_secs = self.time_budget_secs;
        }
    }

    /// Seeds from `--seed` followed by those in `--seeds-file`.
    pub fn collect_seeds(&self) -> Result<Vec<String>> {
        let mut seeds = self.seeds.clone();
        if let Some(path) = &self.seeds_file {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read seeds file {:?}", path))?;
            seeds.extend(parse_seed_lines(&contents));
        }
        Ok(seeds)
    }
}

fn parse_seed_lines(contents: &str) -> impl Iterator<Item = String> + '_ {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn run_args(args: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(["tubewalk", "run"].iter().chain(args)).unwrap();
        match cli.command {
            Command::Run(args) => args,
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_run() {
        let args = run_args(&[
            "--seed",
            "https://youtu.be/dQw4w9WgXcQ",
            "--seed",
            "https://www.youtube.com/@someone",
            "--topic",
            "espresso",
            "--format",
            "tsv",
            "--max-videos",
            "50",
        ]);
        assert_eq!(args.seeds.len(), 2);
        assert_eq!(args.topics, vec!["espresso"]);
        assert_eq!(args.format, OutputFormat::Tsv);
        assert_eq!(args.max_videos, Some(50));
    }

    #[test]
    fn test_overrides() {
        let args = run_args(&[
            "--topic",
            "a",
            "--max-age-days",
            "3",
            "--max-depth",
            "1",
            "--title-contains",
            "latte",
        ]);
        let mut config = Config::default();
        config.topics = vec!["configured".to_string()];
        config.filter.min_views = 123;
        args.apply_overrides(&mut config);

        assert_eq!(config.topics, vec!["a"]);
        assert_eq!(config.filter.max_age_days, 3);
        assert_eq!(config.filter.min_views, 123);
        assert_eq!(config.crawl.max_depth, 1);
        assert_eq!(config.filter.title_contains.as_deref(), Some("latte"));
        assert!(config.crawl.max_videos.is_none());
    }

    #[test]
    fn test_seeds_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "# morning batch\nhttps://youtu.be/dQw4w9WgXcQ\n\n  https://www.youtube.com/@someone  "
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = run_args(&["--seed", "https://youtu.be/aaaaaaaaaaa", "--seeds-file", &path]);
        let seeds = args.collect_seeds().unwrap();
        assert_eq!(
            seeds,
            vec![
                "https://youtu.be/aaaaaaaaaaa",
                "https://youtu.be/dQw4w9WgXcQ",
                "https://www.youtube.com/@someone",
            ]
        );
    }

    #[test]
    fn test_check_config_subcommand() {
        let cli = Cli::try_parse_from(["tubewalk", "check-config", "--config", "x.toml"]).unwrap();
        assert!(matches!(cli.command, Command::CheckConfig { config: Some(_) }));
    }
}
