// =============================================================================
// HTML dashboard: one Plotly candlestick per dataset with a button switcher
// =============================================================================
//
// The page is self-contained apart from plotly.js, which is loaded from the
// CDN.  Figure data is embedded as a single JSON document; one plot div is
// redrawn whenever a dataset button is pressed.  Bollinger bands are overlaid
// on a figure whenever the series has at least one defined band value.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::indicators::{EnrichedSeries, IndicatorRow};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct Figure {
    key: String,
    data: Vec<serde_json::Value>,
    layout: serde_json::Value,
}

fn build_figure(key: &str, series: &EnrichedSeries) -> Figure {
    let x: Vec<String> = series
        .iter()
        .map(|r| r.candle.open_time.format(TIME_FORMAT).to_string())
        .collect();

    let mut data = vec![json!({
        "type": "candlestick",
        "name": "OHLC",
        "x": x,
        "open": series.iter().map(|r| finite(r.candle.open)).collect::<Vec<_>>(),
        "high": series.iter().map(|r| finite(r.candle.high)).collect::<Vec<_>>(),
        "low": series.iter().map(|r| finite(r.candle.low)).collect::<Vec<_>>(),
        "close": series.iter().map(|r| finite(r.candle.close)).collect::<Vec<_>>(),
    })];

    if series.iter().any(|r| r.bb_mid_20.is_some()) {
        let bands: [(&str, fn(&IndicatorRow) -> Option<f64>); 3] = [
            ("BB Up (20,2)", |r| r.bb_up_20_2),
            ("BB Mid (20)", |r| r.bb_mid_20),
            ("BB Lo (20,2)", |r| r.bb_lo_20_2),
        ];
        for (name, column) in bands {
            data.push(json!({
                "type": "scatter",
                "mode": "lines",
                "name": name,
                "opacity": 0.5,
                "x": x,
                "y": series.iter().map(|r| column(r).and_then(finite)).collect::<Vec<_>>(),
            }));
        }
    }

    Figure {
        key: key.to_string(),
        data,
        layout: json!({
            "title": { "text": key },
            "xaxis": { "rangeslider": { "visible": false } },
            "template": "plotly_white",
            "height": 540,
        }),
    }
}

/// JSON has no NaN; missing points are drawn as gaps.
fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Render the dashboard page for `datasets`, skipping empty series.
pub fn render_dashboard<'a>(
    title: &str,
    datasets: impl IntoIterator<Item = (&'a str, &'a EnrichedSeries)>,
) -> Result<String> {
    let figures: Vec<Figure> = datasets
        .into_iter()
        .filter(|(_, s)| !s.is_empty())
        .map(|(key, s)| build_figure(key, s))
        .collect();

    // "</" inside a <script> block would end it early.
    let payload = serde_json::to_string(&figures)
        .context("failed to serialise dashboard figures")?
        .replace("</", "<\\/");
    let title = html_escape(title);

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{PLOTLY_CDN}"></script>
</head>
<body style="font-family:Arial,sans-serif">
<h2>{title}</h2>
<p>Select a series below.</p>
<div id="buttons"></div>
<div id="figure"></div>
<script>
const figures = {payload};
function showFig(idx) {{
  const f = figures[idx];
  if (!f) return;
  Plotly.react('figure', f.data, f.layout);
  document.querySelectorAll('#buttons button').forEach((b, i) => {{
    b.style.fontWeight = (i === idx) ? 'bold' : 'normal';
  }});
}}
(function () {{
  const container = document.getElementById('buttons');
  figures.forEach((f, idx) => {{
    const btn = document.createElement('button');
    btn.textContent = f.key;
    btn.style.marginRight = '8px';
    btn.onclick = () => showFig(idx);
    container.appendChild(btn);
  }});
  showFig(0);
}})();
</script>
</body>
</html>
"#
    ))
}

/// Render and write the dashboard to `path`, creating parent directories.
pub fn write_dashboard<'a>(
    path: impl AsRef<Path>,
    title: &str,
    datasets: impl IntoIterator<Item = (&'a str, &'a EnrichedSeries)>,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let html = render_dashboard(title, datasets)?;
    std::fs::write(path, html)
        .with_context(|| format!("failed to write dashboard to {}", path.display()))?;

    info!(path = %path.display(), "dashboard written");
    Ok(())
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
