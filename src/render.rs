use ndarray::{ArrayView1, ArrayView2};

/// Grey ramp from darkest to brightest
const RAMP: &[u8] = b" .:-=+*#%@";

fn level(v: f64, lo: f64, hi: f64) -> char {
    let t = if hi > lo { (v - lo) / (hi - lo) } else { 0f64 };
    let idx = (t * (RAMP.len() - 1) as f64).round() as usize;
    RAMP[idx.min(RAMP.len() - 1)] as char
}

/// Draw a matrix as text, one character per cell, scaled to its own range.
/// Each cell is printed twice so the aspect ratio looks right in a terminal.
pub fn render_grid(grid: &ArrayView2<f64>) -> String {
    let lo = grid.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = grid.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut out = String::with_capacity(grid.len() * 2 + grid.nrows());
    for row in grid.rows() {
        for &v in row {
            let c = level(v, lo, hi);
            out.push(c);
            out.push(c);
        }
        out.push('\n');
    }

    out
}

/// Text histogram with `bins` equal-width bins
pub fn render_histogram(values: &ArrayView1<f64>, bins: usize) -> String {
    const WIDTH: usize = 50;

    if values.is_empty() || bins == 0 {
        return String::new();
    }

    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let step = if hi > lo { (hi - lo) / bins as f64 } else { 1f64 };

    let mut counts = vec![0usize; bins];
    for &v in values {
        let b = (((v - lo) / step) as usize).min(bins - 1);
        counts[b] += 1;
    }

    let most = counts.iter().copied().max().unwrap_or(0).max(1);

    counts
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let start = lo + i as f64 * step;
            format!(
                "{:>9.2} | {:<width$} {}\n",
                start,
                "#".repeat(c * WIDTH / most),
                c,
                width = WIDTH
            )
        })
        .collect()
}
