//! Report serialization.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;

use tubewalk_core::{RankedRecord, RunReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The full run report
    Json,
    /// Ranked rows, comma separated
    Csv,
    /// Ranked rows, tab separated
    Tsv,
}

/// One ranked video as a flat row.
#[derive(Debug, Serialize)]
pub struct OutputRow<'a> {
    pub rank: usize,
    pub source_url: &'a str,
    pub title: &'a str,
    pub publish_age_days: u32,
    pub view_count: u64,
    pub relevance_score: Option<f32>,
    pub relevance_tier: &'static str,
    /// Topics joined with `; `.
    pub matched_topics: String,
    pub discovered_from: Option<String>,
    pub depth: u32,
}

impl<'a> From<&'a RankedRecord> for OutputRow<'a> {
    fn from(ranked: &'a RankedRecord) -> Self {
        let record = &ranked.record;
        Self {
            rank: ranked.rank,
            source_url: &record.source_url,
            title: &record.title,
            publish_age_days: record.publish_age_days,
            view_count: record.view_count,
            relevance_score: ranked.relevance.score,
            relevance_tier: ranked.relevance.tier.as_str(),
            matched_topics: ranked.relevance.matched_topics.join("; "),
            discovered_from: record.discovered_from.as_ref().map(|v| v.watch_url()),
            depth: record.depth,
        }
    }
}

/// Write `report` to `writer` in `format`.
pub fn write_report<W: Write>(report: &RunReport, format: OutputFormat, mut writer: W) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, report).context("Failed to write JSON report")?;
            writeln!(writer)?;
        }
        OutputFormat::Csv => write_rows(report, b',', writer)?,
        OutputFormat::Tsv => write_rows(report, b'\t', writer)?,
    }
    Ok(())
}

fn write_rows<W: Write>(report: &RunReport, delimiter: u8, writer: W) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    for ranked in &report.records {
        csv.serialize(OutputRow::from(ranked))
            .context("Failed to write row")?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tubewalk_core::fetcher::{FetcherConfig, RunClock};
    use tubewalk_core::testing::{fixtures, MockRenderer};
    use tubewalk_core::{CrawlPipeline, ProxyPool, RunRequest, StopSignal, VideoFetcher};

    /// A finished run over two pages: a seed and one recommendation.
    async fn report() -> RunReport {
        let clock = RunClock::capture();
        let renderer = Arc::new(MockRenderer::new());
        let (seed, rec) = (fixtures::video_id(1), fixtures::video_id(2));
        renderer
            .set_page(
                &seed.watch_url(),
                fixtures::WatchPage::new(seed.clone(), "Pour-over, explained")
                    .views(90_000)
                    .recommendations(vec![rec.clone()])
                    .render(&clock),
            )
            .await;
        renderer
            .set_page(
                &rec.watch_url(),
                fixtures::WatchPage::new(rec.clone(), "Tamping basics").views(20_000).render(&clock),
            )
            .await;

        let fetcher = VideoFetcher::new(renderer, Arc::new(ProxyPool::direct()), FetcherConfig::default());
        CrawlPipeline::new(Arc::new(fetcher))
            .run(
                RunRequest::new(vec![seed.watch_url()]).with_reference_time(clock.now()),
                StopSignal::new(),
            )
            .await
    }

    fn render(report: &RunReport, format: OutputFormat) -> String {
        let mut buffer = Vec::new();
        write_report(report, format, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[tokio::test]
    async fn test_csv_rows() {
        let report = report().await;
        let text = render(&report, OutputFormat::Csv);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "rank,source_url,title,publish_age_days,view_count,relevance_score,relevance_tier,matched_topics,discovered_from,depth"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,https://www.youtube.com/watch?v=vid00000001,\"Pour-over, explained\",1,90000,,unknown,,,0"));
        assert!(lines[2].ends_with(",https://www.youtube.com/watch?v=vid00000001,1"));
    }

    #[tokio::test]
    async fn test_tsv_leaves_commas_unquoted() {
        let report = report().await;
        let text = render(&report, OutputFormat::Tsv);
        assert!(text.lines().next().unwrap().starts_with("rank\tsource_url\ttitle"));
        assert!(text.contains("\tPour-over, explained\t"));
        assert!(text.contains("\tTamping basics\t"));
    }

    #[tokio::test]
    async fn test_json_report() {
        let report = report().await;
        let value: serde_json::Value = serde_json::from_str(&render(&report, OutputFormat::Json)).unwrap();
        assert_eq!(value["state"], "done");
        assert_eq!(value["run_id"], report.run_id.to_string());
        assert_eq!(value["records"][0]["rank"], 1);
        assert_eq!(value["records"][0]["title"], "Pour-over, explained");
        assert_eq!(value["records"][0]["relevance"]["tier"], "unknown");
    }
}
