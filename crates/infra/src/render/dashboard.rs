//! HTML dashboard
//!
//! The page is rendered from the series alone, so re-rendering after a
//! skipped tick or from `render` reproduces exactly what a successful tick
//! would have published for the same stored state.

use std::fmt::Write as _;

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use clout_core::{PageRenderer, RenderedPage};
use clout_domain::constants::HTML_CONTENT_TYPE;
use clout_domain::{AppConfig, CloutError, FollowerPlatform, HistoricalSeries, Result, Snapshot};
use serde::Serialize;

const LAST_UPDATED_FORMAT: &str = "%B %d, %Y at %I:%M %p %Z";
const CHART_JS_URL: &str = "https://cdn.jsdelivr.net/npm/chart.js";

const BUILDING_SUBTITLE: &str = "Focusing more on building than on social media presence!";
const CLOUT_SUBTITLE: &str = "I need to build more...";

const STYLE: &str = r"
:root {
  --bg-color: #0d1117;
  --card-bg: #161b22;
  --text-primary: #e6edf3;
  --text-secondary: #8b949e;
  --border-color: #30363d;
  --accent-github: #238636;
  --accent-twitter: #1d9bf0;
}
* { box-sizing: border-box; margin: 0; padding: 0; }
body {
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  background-color: var(--bg-color);
  color: var(--text-primary);
  line-height: 1.6;
  padding: 20px;
}
.container { max-width: 1000px; margin: 0 auto; }
header { text-align: center; margin: 40px 0; }
h1 { font-size: 2.5rem; margin-bottom: 10px; }
.subtitle { color: var(--text-secondary); font-size: 1.2rem; }
.stats-container { display: flex; flex-wrap: wrap; gap: 20px; margin-bottom: 40px; }
.stat-card, .comparison-card, .chart-container {
  background-color: var(--card-bg);
  border-radius: 10px;
  padding: 25px;
  box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1);
  border: 1px solid var(--border-color);
}
.stat-card { flex: 1; min-width: 250px; }
.stat-title { font-size: 1.2rem; margin-bottom: 15px; }
.stat-value { font-size: 3rem; font-weight: bold; margin-bottom: 10px; }
.github-card .stat-value { color: var(--accent-github); }
.follower-card .stat-value { color: var(--accent-twitter); }
.stat-description { color: var(--text-secondary); font-size: 0.9rem; }
.comparison-card { margin-bottom: 40px; text-align: center; }
.ratio {
  font-size: 2.5rem;
  font-weight: bold;
  margin: 20px 0;
  background: linear-gradient(90deg, var(--accent-github), var(--accent-twitter));
  -webkit-background-clip: text;
  -webkit-text-fill-color: transparent;
  background-clip: text;
}
.chart-container { margin-bottom: 40px; }
.chart-title { text-align: center; margin-bottom: 20px; font-size: 1.5rem; }
.footer { text-align: center; margin-top: 40px; color: var(--text-secondary); font-size: 0.9rem; }
.footer a { color: var(--text-primary); text-decoration: none; }
.footer a:hover { text-decoration: underline; }
.social-links { display: flex; justify-content: center; gap: 20px; margin-top: 10px; }
.last-updated { margin-top: 10px; font-size: 0.8rem; color: var(--text-secondary); }
@media (max-width: 600px) {
  .stats-container { flex-direction: column; }
  h1 { font-size: 2rem; }
  .stat-value { font-size: 2.5rem; }
}
";

const CHART_SCRIPT: &str = r"
const history = JSON.parse(document.getElementById('history-data').textContent);
const datasets = [{
  label: 'GitHub Commits',
  data: history.commits,
  borderColor: '#238636',
  backgroundColor: 'rgba(35, 134, 54, 0.1)',
  yAxisID: 'commits',
  tension: 0.1,
  fill: true
}];
for (const series of history.followers) {
  datasets.push({
    label: series.label,
    data: series.data,
    borderColor: series.color,
    backgroundColor: 'transparent',
    yAxisID: 'followers',
    spanGaps: true,
    tension: 0.1
  });
}
new Chart(document.getElementById('history-chart'), {
  type: 'line',
  data: { labels: history.labels, datasets },
  options: {
    responsive: true,
    interaction: { mode: 'index', intersect: false },
    scales: {
      x: { ticks: { color: '#8b949e' }, grid: { color: '#30363d' } },
      commits: { type: 'linear', position: 'left', beginAtZero: true, ticks: { color: '#238636' }, grid: { color: '#30363d' } },
      followers: { type: 'linear', position: 'right', beginAtZero: true, ticks: { color: '#1d9bf0' }, grid: { drawOnChartArea: false } }
    },
    plugins: { legend: { labels: { color: '#e6edf3' } } }
  }
});
";

/// Footer link to one of the owner's profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLink {
    pub label: String,
    pub url: String,
}

impl ProfileLink {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self { label: label.into(), url: url.into() }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardRenderer {
    timezone: Tz,
    /// Year named in the ratio text; the latest entry's year if unset.
    anchor_year: Option<i32>,
    links: Vec<ProfileLink>,
}

impl DashboardRenderer {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone, anchor_year: None, links: Vec::new() }
    }

    /// # Errors
    /// Returns `CloutError::Config` if the dashboard timezone is invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut renderer = Self::new(config.schedule.timezone()?)
            .with_anchor_year(config.schedule.commit_anchor_year)
            .with_link(ProfileLink::new(
                "GitHub",
                format!("https://github.com/{}", config.github.username),
            ));
        if let Some(twitter) = &config.twitter {
            renderer = renderer
                .with_link(ProfileLink::new("X/Twitter", format!("https://x.com/{}", twitter.username)));
        }
        if let Some(youtube) = &config.youtube {
            renderer = renderer.with_link(ProfileLink::new(
                "YouTube",
                format!("https://www.youtube.com/channel/{}", youtube.channel_id),
            ));
        }
        if let Some(bluesky) = &config.bluesky {
            renderer = renderer.with_link(ProfileLink::new(
                "Bluesky",
                format!("https://bsky.app/profile/{}", bluesky.actor()),
            ));
        }
        Ok(renderer)
    }

    pub fn with_anchor_year(mut self, year: Option<i32>) -> Self {
        self.anchor_year = year;
        self
    }

    pub fn with_link(mut self, link: ProfileLink) -> Self {
        self.links.push(link);
        self
    }

    fn year(&self, latest: Option<&Snapshot>, rendered_at: DateTime<Utc>) -> i32 {
        self.anchor_year
            .or_else(|| latest.map(|snapshot| snapshot.date().year()))
            .unwrap_or_else(|| rendered_at.with_timezone(&self.timezone).year())
    }

    fn write_page(
        &self,
        out: &mut String,
        series: &HistoricalSeries,
        latest: Option<&Snapshot>,
        rendered_at: DateTime<Utc>,
    ) -> std::fmt::Result {
        let year = self.year(latest, rendered_at);
        let commits = latest.map_or(0, Snapshot::commit_count);
        let ratio = latest.and_then(Snapshot::ratio);

        out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        out.push_str("<meta charset=\"UTF-8\">\n");
        out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
        out.push_str("<title>Commits or Clout</title>\n");
        writeln!(out, "<script src=\"{CHART_JS_URL}\"></script>")?;
        writeln!(out, "<style>{STYLE}</style>")?;
        out.push_str("</head>\n<body>\n<div class=\"container\">\n");

        out.push_str("<header>\n<h1>Commits or Clout</h1>\n");
        out.push_str("<p class=\"subtitle\">Am I building more than I'm posting?</p>\n</header>\n");

        out.push_str("<div class=\"stats-container\">\n");
        write_card(
            out,
            "github-card",
            "GitHub Commits",
            commits,
            &format!("Total commits since January 1st, {year}"),
        )?;
        if let Some(snapshot) = latest {
            for (key, count) in snapshot.follower_counts() {
                write_card(out, "follower-card", &provider_label(key), *count, "Current follower count")?;
            }
        }
        out.push_str("</div>\n");

        out.push_str("<div class=\"comparison-card\">\n<h2>Commits vs. Clout</h2>\n");
        match ratio {
            Some(ratio) => {
                writeln!(
                    out,
                    "<div class=\"ratio\">I have {ratio:.1}x as many commits in {year} as followers</div>"
                )?;
                let subtitle = if ratio > 1.0 { BUILDING_SUBTITLE } else { CLOUT_SUBTITLE };
                writeln!(out, "<p class=\"subtitle\">{}</p>", escape_html(subtitle))?;
            }
            None => {
                writeln!(
                    out,
                    "<div class=\"ratio\">No follower counts yet to compare with {year}'s commits</div>"
                )?;
            }
        }
        out.push_str("</div>\n");

        out.push_str("<div class=\"chart-container\">\n");
        out.push_str("<h2 class=\"chart-title\">History</h2>\n");
        out.push_str("<canvas id=\"history-chart\"></canvas>\n</div>\n");

        out.push_str("<div class=\"footer\">\n<div class=\"social-links\">\n");
        for link in &self.links {
            writeln!(
                out,
                "<a href=\"{}\" rel=\"noopener\">{}</a>",
                escape_html(&link.url),
                escape_html(&link.label)
            )?;
        }
        out.push_str("</div>\n");
        let stamp = rendered_at.with_timezone(&self.timezone).format(LAST_UPDATED_FORMAT).to_string();
        writeln!(out, "<p class=\"last-updated\">Last updated: {}</p>", escape_html(&stamp))?;
        out.push_str("</div>\n</div>\n");

        writeln!(
            out,
            "<script id=\"history-data\" type=\"application/json\">{}</script>",
            chart_json(series).map_err(|_| std::fmt::Error)?
        )?;
        writeln!(out, "<script>{CHART_SCRIPT}</script>")?;
        out.push_str("</body>\n</html>\n");
        Ok(())
    }
}

impl PageRenderer for DashboardRenderer {
    fn render(
        &self,
        series: &HistoricalSeries,
        latest: Option<&Snapshot>,
        rendered_at: DateTime<Utc>,
    ) -> Result<RenderedPage> {
        let mut body = String::with_capacity(16 * 1024);
        self.write_page(&mut body, series, latest, rendered_at)
            .map_err(|_| CloutError::Internal("failed to format dashboard page".into()))?;
        Ok(RenderedPage { body: body.into_bytes(), content_type: HTML_CONTENT_TYPE.to_string() })
    }
}

fn write_card(
    out: &mut String,
    class: &str,
    title: &str,
    value: u64,
    description: &str,
) -> std::fmt::Result {
    writeln!(
        out,
        "<div class=\"stat-card {class}\">\n<div class=\"stat-title\">{}</div>\n\
         <div class=\"stat-value\">{}</div>\n<div class=\"stat-description\">{}</div>\n</div>",
        escape_html(title),
        group_thousands(value),
        escape_html(description)
    )
}

fn provider_label(key: &str) -> String {
    FollowerPlatform::from_key(key).map_or_else(|| key.to_string(), |p| p.display_name().to_string())
}

fn provider_color(key: &str) -> &'static str {
    match FollowerPlatform::from_key(key) {
        Some(FollowerPlatform::Twitter) => "#1d9bf0",
        Some(FollowerPlatform::YouTube) => "#ff0000",
        Some(FollowerPlatform::Bluesky) => "#0085ff",
        None => "#8b949e",
    }
}

#[derive(Serialize)]
struct ChartData {
    labels: Vec<String>,
    commits: Vec<u64>,
    followers: Vec<FollowerSeries>,
}

#[derive(Serialize)]
struct FollowerSeries {
    label: String,
    color: &'static str,
    /// `null` on days the provider has no count.
    data: Vec<Option<u64>>,
}

/// Chart payload for embedding inside a `<script>` element.
fn chart_json(series: &HistoricalSeries) -> serde_json::Result<String> {
    let keys: std::collections::BTreeSet<&str> = series
        .iter()
        .flat_map(|snapshot| snapshot.follower_counts().keys().map(String::as_str))
        .collect();

    let data = ChartData {
        labels: series.iter().map(|s| s.date().format("%Y-%m-%d").to_string()).collect(),
        commits: series.iter().map(Snapshot::commit_count).collect(),
        followers: keys
            .into_iter()
            .map(|key| FollowerSeries {
                label: provider_label(key),
                color: provider_color(key),
                data: series.iter().map(|s| s.follower_count(key)).collect(),
            })
            .collect(),
    };

    Ok(serde_json::to_string(&data)?.replace("</", "<\\/"))
}

/// Escape text for HTML element content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
