use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::analyzer::SummonerAnalysis;
use crate::model::file_stem;
use crate::stats::binomial_pmf_all;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 500.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const Y_TICKS: usize = 5;

#[derive(Debug, Error)]
#[error("failed writing plot {path}")]
pub struct PlotError {
    path: PathBuf,
    #[source]
    source: io::Error,
}

/// Probability mass function of the null hypothesis with the observed first
/// blood count marked, rendered as SVG.
#[derive(Debug, Clone)]
pub struct PmfPlot {
    pub summoner: String,
    pub trials: u64,
    pub observed: u64,
    pub p_null: f64,
}

impl PmfPlot {
    pub fn from_analysis(analysis: &SummonerAnalysis, p_null: f64) -> Self {
        Self {
            summoner: analysis.summoner.clone(),
            trials: analysis.counts.matches,
            observed: analysis.counts.first_bloods,
            p_null,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.svg", file_stem(&self.summoner))
    }

    /// Upper end of the x axis: about four times the expected count, widened
    /// so the observed marker stays visible.
    pub fn x_max(&self) -> u64 {
        let expected_span = (4.0 * self.p_null * self.trials as f64).ceil() as u64;
        expected_span
            .max(self.observed + 1)
            .max(1)
            .min(self.trials.max(1))
    }

    pub fn render(&self) -> String {
        let pmf = binomial_pmf_all(self.trials, self.p_null);
        let x_max = self.x_max();
        let shown = &pmf[..=(x_max.min(self.trials) as usize)];
        let y_max = shown.iter().copied().fold(0.0_f64, f64::max).max(1e-12) * 1.1;

        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let sx = |x: f64| MARGIN_LEFT + x / x_max as f64 * plot_w;
        let sy = |y: f64| MARGIN_TOP + plot_h - y / y_max * plot_h;

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
        );
        let _ = writeln!(svg, r##"<rect width="100%" height="100%" fill="#eaeaf2"/>"##);
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="30" text-anchor="middle" font-size="18">Distribution of first blood kills</text>"#,
            WIDTH / 2.0
        );

        // grid + y ticks
        for i in 0..=Y_TICKS {
            let value = y_max * i as f64 / Y_TICKS as f64;
            let y = sy(value);
            let _ = writeln!(
                svg,
                r#"<line x1="{MARGIN_LEFT}" y1="{y:.2}" x2="{:.2}" y2="{y:.2}" stroke="white"/>"#,
                MARGIN_LEFT + plot_w
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.2}" y="{:.2}" text-anchor="end" font-size="11">{value:.3}</text>"#,
                MARGIN_LEFT - 6.0,
                y + 4.0
            );
        }
        for tick in x_ticks(x_max) {
            let x = sx(tick as f64);
            let _ = writeln!(
                svg,
                r#"<line x1="{x:.2}" y1="{MARGIN_TOP}" x2="{x:.2}" y2="{:.2}" stroke="white"/>"#,
                MARGIN_TOP + plot_h
            );
            let _ = writeln!(
                svg,
                r#"<text x="{x:.2}" y="{:.2}" text-anchor="middle" font-size="11">{tick}</text>"#,
                MARGIN_TOP + plot_h + 16.0
            );
        }

        // area for x <= observed
        let fill_to = self.observed.min(x_max) as usize;
        let mut area = format!("{:.2},{:.2}", sx(0.0), sy(0.0));
        for (k, p) in shown.iter().enumerate().take(fill_to + 1) {
            let _ = write!(area, " {:.2},{:.2}", sx(k as f64), sy(*p));
        }
        let _ = write!(area, " {:.2},{:.2}", sx(fill_to as f64), sy(0.0));
        let _ = writeln!(
            svg,
            r##"<polygon points="{area}" fill="#4c72b0" fill-opacity="0.5"/>"##
        );

        let line = shown
            .iter()
            .enumerate()
            .map(|(k, p)| format!("{:.2},{:.2}", sx(k as f64), sy(*p)))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            svg,
            r##"<polyline points="{line}" fill="none" stroke="#4c72b0" stroke-width="2"/>"##
        );

        if self.observed <= x_max {
            let x = sx(self.observed as f64);
            let _ = writeln!(
                svg,
                r#"<line x1="{x:.2}" y1="{MARGIN_TOP}" x2="{x:.2}" y2="{:.2}" stroke="red" stroke-width="2"/>"#,
                MARGIN_TOP + plot_h
            );
        }

        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{:.2}" text-anchor="middle" font-size="13">Number of first bloods</text>"#,
            MARGIN_LEFT + plot_w / 2.0,
            HEIGHT - 15.0
        );
        let _ = writeln!(
            svg,
            r#"<text x="20" y="{:.2}" text-anchor="middle" font-size="13" transform="rotate(-90 20 {:.2})">Probability</text>"#,
            MARGIN_TOP + plot_h / 2.0,
            MARGIN_TOP + plot_h / 2.0
        );

        let legend_x = MARGIN_LEFT + plot_w - 250.0;
        let legend_y = MARGIN_TOP + 20.0;
        let _ = writeln!(
            svg,
            r##"<line x1="{legend_x:.2}" y1="{legend_y:.2}" x2="{:.2}" y2="{legend_y:.2}" stroke="#4c72b0" stroke-width="2"/>"##,
            legend_x + 20.0
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" font-size="12">H0: B({}, {:.2})</text>"#,
            legend_x + 26.0,
            legend_y + 4.0,
            self.trials,
            self.p_null
        );
        let _ = writeln!(
            svg,
            r#"<line x1="{legend_x:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="red" stroke-width="2"/>"#,
            legend_y + 20.0,
            legend_x + 20.0,
            legend_y + 20.0
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" font-size="12">{}: {} first blood kills</text>"#,
            legend_x + 26.0,
            legend_y + 24.0,
            escape_xml(&self.summoner),
            self.observed
        );
        svg.push_str("</svg>\n");
        svg
    }

    pub fn write(&self, path: &Path) -> Result<PathBuf, PlotError> {
        let wrap = |source| PlotError {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                fs::create_dir_all(parent).map_err(wrap)?;
                log::info!("Created '{}'", parent.display());
            }
        }
        fs::write(path, self.render()).map_err(wrap)?;
        Ok(path.to_path_buf())
    }
}

fn x_ticks(x_max: u64) -> Vec<u64> {
    let step = match x_max {
        0..=10 => 1,
        11..=25 => 5,
        26..=60 => 10,
        61..=150 => 25,
        _ => (x_max / 6).max(1),
    };
    (0..=x_max).step_by(step as usize).collect()
}

fn escape_xml(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
