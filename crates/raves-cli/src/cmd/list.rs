//! `rv list` — fetch, reconcile, and display grouped reviews.

use crate::http::HttpReviewSource;
use crate::output::{self, OutputMode};
use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Args;
use raves_core::config;
use raves_core::{
    FeedSession, Filter, ReviewGroup, ReviewSource, SortOrder, parse_rating_filter,
};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Keyword to search in review content.
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Star ratings to include, comma-joined (e.g. "4,5").
    #[arg(short, long)]
    pub stars: Option<String>,

    /// Number of pages to load sequentially.
    #[arg(short = 'n', long, default_value = "1")]
    pub pages: u32,

    /// Reviews per page (1-500).
    #[arg(long)]
    pub count: Option<u32>,

    /// Sort order: -date, date, country, stars.
    #[arg(long)]
    pub sort: Option<String>,

    /// Reviews API URL (overrides RAVES_API_URL and the config file).
    #[arg(long)]
    pub url: Option<String>,
}

/// Everything one `rv list` run produced, in JSON-stable shape.
#[derive(Debug, Serialize)]
struct ListReport<'a> {
    filter: String,
    total: Option<u64>,
    shown: usize,
    has_more: bool,
    new_items_start: usize,
    groups: &'a [ReviewGroup],
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

pub fn run_list(args: &ListArgs, output: OutputMode) -> Result<()> {
    let sort = parse_sort(args.sort.as_deref())?;
    let user_config = config::load_user_config()?;
    let resolved = config::resolve_source(args.url.as_deref(), args.count, sort, &user_config)?;
    let source = HttpReviewSource::new(&resolved);

    let filter = Filter::new(
        args.keyword.as_deref(),
        args.stars.as_deref().map(parse_rating_filter).unwrap_or_default(),
    );

    let mut session = FeedSession::new();
    let now = Utc::now();

    let first = session.set_filter(filter.clone());
    let outcome = source.fetch(&first);
    session.complete(&first, outcome, now);
    if let Some(err) = session.view().error {
        bail!("failed to load reviews: {err}");
    }

    // Later pages surface their failure as a warning instead of discarding
    // what already merged.
    let mut warning = None;
    for _ in 1..args.pages {
        let request = match session.load_more() {
            Ok(request) => request,
            Err(err) => {
                tracing::debug!(%err, "stopping pagination");
                break;
            }
        };
        let outcome = source.fetch(&request);
        session.complete(&request, outcome, now);
        if let Some(err) = session.view().error {
            warning = Some(format!("page {} failed: {err}", request.page));
            break;
        }
    }

    let view = session.view();
    let report = ListReport {
        filter: filter.summary(),
        total: view.total,
        shown: session.feed().len(),
        has_more: view.has_more,
        new_items_start: view.new_items_start,
        groups: view.groups,
        warning,
    };

    output::render_mode(output, &report, render_text, render_pretty)
}

fn parse_sort(raw: Option<&str>) -> Result<Option<SortOrder>> {
    raw.map(|value| {
        value
            .parse::<SortOrder>()
            .map_err(|err| anyhow::anyhow!(err))
            .with_context(|| format!("invalid --sort value: {value}"))
    })
    .transpose()
}

fn render_pretty(report: &ListReport<'_>, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "Reviews: {}", report.filter)?;
    if let Some(total) = report.total {
        writeln!(w, "Showing {} of {total} matches", report.shown)?;
    }
    writeln!(w)?;

    if report.groups.is_empty() {
        writeln!(w, "No reviews found. Try adjusting the search or filters.")?;
    }

    for group in report.groups {
        let count = group.reviews.len();
        let noun = if count == 1 { "review" } else { "reviews" };
        output::pretty_section(w, &format!("{} ({count} {noun})", group.label))?;
        for review in &group.reviews {
            let author = review.author.as_deref().unwrap_or("anonymous");
            let headline = if review.title.is_empty() {
                truncated(&review.body, 60)
            } else {
                review.title.clone()
            };
            writeln!(
                w,
                "  {}  {}  {headline} — {author}",
                review.stars,
                review.posted_at.format("%Y-%m-%d")
            )?;
        }
        writeln!(w)?;
    }

    if report.has_more {
        writeln!(w, "More reviews available; re-run with a larger --pages.")?;
    }
    if let Some(warning) = &report.warning {
        writeln!(w, "warning: {warning}")?;
    }
    Ok(())
}

fn render_text(report: &ListReport<'_>, w: &mut dyn Write) -> io::Result<()> {
    for group in report.groups {
        for review in &group.reviews {
            writeln!(
                w,
                "{}\t{}\t{}\t{}\t{}",
                group.bucket.key(),
                review.id,
                review.posted_at.format("%Y-%m-%d"),
                review.stars,
                if review.title.is_empty() {
                    truncated(&review.body, 60)
                } else {
                    review.title.clone()
                }
            )?;
        }
    }
    if let Some(warning) = &report.warning {
        writeln!(w, "warning\t{warning}")?;
    }
    Ok(())
}

fn truncated(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_args_defaults() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: ListArgs,
        }
        let w = Wrapper::parse_from(["test"]);
        assert!(w.args.keyword.is_none());
        assert!(w.args.stars.is_none());
        assert_eq!(w.args.pages, 1);
        assert!(w.args.count.is_none());
    }

    #[test]
    fn sort_parsing_rejects_unknown_values() {
        assert!(parse_sort(Some("-date")).is_ok());
        assert!(parse_sort(None).expect("absent is fine").is_none());
        assert!(parse_sort(Some("newest")).is_err());
    }

    #[test]
    fn truncation_preserves_short_text() {
        assert_eq!(truncated("short", 60), "short");
        let long = "x".repeat(80);
        let cut = truncated(&long, 60);
        assert_eq!(cut.chars().count(), 61);
        assert!(cut.ends_with('…'));
    }
}
