//! `rv summary` — active filter description plus the server-side total.

use crate::http::HttpReviewSource;
use crate::output::{self, OutputMode};
use anyhow::{Result, bail};
use chrono::Utc;
use clap::Args;
use raves_core::config;
use raves_core::{FeedSession, Filter, ReviewSource, parse_rating_filter};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Keyword to search in review content.
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Star ratings to include, comma-joined (e.g. "4,5").
    #[arg(short, long)]
    pub stars: Option<String>,

    /// Reviews API URL (overrides RAVES_API_URL and the config file).
    #[arg(long)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
struct SummaryReport {
    filter: String,
    total: u64,
    pages: u32,
}

pub fn run_summary(args: &SummaryArgs, output: OutputMode) -> Result<()> {
    let user_config = config::load_user_config()?;
    let resolved = config::resolve_source(args.url.as_deref(), None, None, &user_config)?;
    let source = HttpReviewSource::new(&resolved);

    let filter = Filter::new(
        args.keyword.as_deref(),
        args.stars.as_deref().map(parse_rating_filter).unwrap_or_default(),
    );

    let mut session = FeedSession::new();
    let request = session.set_filter(filter.clone());
    let outcome = source.fetch(&request);
    let pages = outcome.as_ref().map(|page| page.pages).unwrap_or_default();
    session.complete(&request, outcome, Utc::now());

    let view = session.view();
    if let Some(err) = view.error {
        bail!("failed to load reviews: {err}");
    }
    let Some(total) = view.total else {
        bail!("upstream answered without a total count");
    };

    let report = SummaryReport {
        filter: filter.summary(),
        total,
        pages,
    };
    output::render_mode(output, &report, render_text, render_pretty)
}

fn render_pretty(report: &SummaryReport, w: &mut dyn Write) -> io::Result<()> {
    let noun = if report.total == 1 { "review" } else { "reviews" };
    writeln!(
        w,
        "{}: {} {noun} across {} page(s)",
        report.filter, report.total, report.pages
    )
}

fn render_text(report: &SummaryReport, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}\t{}\t{}", report.filter, report.total, report.pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_args_parse() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: SummaryArgs,
        }
        let w = Wrapper::parse_from(["test", "--keyword", "sync", "--stars", "4,5"]);
        assert_eq!(w.args.keyword.as_deref(), Some("sync"));
        assert_eq!(w.args.stars.as_deref(), Some("4,5"));
    }
}
