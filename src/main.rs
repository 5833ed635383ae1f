pub mod algebra;
pub mod error;
pub mod parsing;
pub mod render;
pub mod report;

use algebra::reshape::{self, Order};
use algebra::{filter, linalg, summary, vectorized};
use clap::Parser;
use error::{MatrixError, Result};
use ndarray::{s, Array1};
use parsing::mnist::{self, IMAGE_SIDE};
use parsing::Dataset;
use report::Report;
use std::fs::File;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One step of the walkthrough
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    All,
    Reshape,
    RowStats,
    ColumnFilter,
    Binarize,
    GreyArea,
    Vectorize,
    Algebra,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The path of the digits CSV (<label>,<pixel0>,...,<pixel783>)
    #[arg(short, long, default_value = "mnist_train.csv")]
    data_path: PathBuf,

    /// Fetch the CSV from this URL if it is not present yet
    #[arg(short, long, default_value = mnist::DEFAULT_URL)]
    url: String,

    /// Download the dataset before running
    #[arg(long, default_value_t = false)]
    download: bool,

    /// Number of images to keep from the top of the file
    #[arg(short, long, default_value_t = 1000)]
    rows: usize,

    /// Which step to run
    #[arg(short, long, value_enum, default_value_t = Step::All)]
    step: Step,

    /// Columns with a standard deviation at or below this are dropped
    #[arg(long, default_value_t = 60.0)]
    sd_threshold: f64,

    /// Pixels above this intensity become 1 when binarizing
    #[arg(short, long, default_value_t = 255.0 / 2.0)]
    binarize_threshold: f64,

    /// Lower bound of the "grey" intensity band
    #[arg(long, default_value_t = 50.0)]
    grey_low: f64,

    /// Upper bound of the "grey" intensity band
    #[arg(long, default_value_t = 205.0)]
    grey_high: f64,

    /// Image drawn in the reshape step
    #[arg(short = 'i', long, default_value_t = 3)]
    digit_index: usize,

    /// Fill order for the reshape demonstration
    #[arg(short, long, value_enum, default_value_t = Order::ColumnMajor)]
    order: Order,

    /// Seed of the random matrix used in the algebra step
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Export the collected results as JSON
    #[arg(short = 'w', long, default_value = None)]
    report_path: Option<PathBuf>,

    /// Export the per-digit intensity summaries as CSV
    #[arg(long, default_value = None)]
    summary_path: Option<PathBuf>,
}

impl Args {
    fn runs(&self, step: Step) -> bool {
        self.step == Step::All || self.step == step
    }
}

/// Vectors become matrices: fill order, the recycling pitfall, and an image as a grid
fn step_reshape(args: &Args, dataset: &Dataset, report: &mut Report) -> Result<()> {
    let seq: Vec<f64> = (1..=15).map(|x| x as f64).collect();

    let filled = reshape::reshape(&seq, 5, 3, args.order)?;
    println!("1..15 as a 5x3 matrix ({:?}):\n{}", args.order, filled);

    let by_row = reshape::reshape(&seq, 3, 5, Order::RowMajor)?;
    let by_col = reshape::reshape(&seq, 5, 3, Order::ColumnMajor)?;
    report.set("row_major_is_transpose", by_col == by_row.t());

    // 12 values cannot fill 15 cells; the strict version refuses, the permissive one recycles
    if let Err(e) = reshape::reshape(&seq[..12], 5, 3, args.order) {
        warn!("{}", e);
    }
    let recycled = reshape::reshape_recycled(&seq[..12], 5, 3, args.order)?;
    println!("1..12 recycled into 5x3:\n{}", recycled);

    match dataset.image(args.digit_index) {
        Some(image) => {
            let label = dataset.labels[args.digit_index];
            // The grid is filled column-major, so its transpose is the upright image
            let grid = reshape::digit_grid(image)?;
            println!(
                "Image {} (label {}):\n{}",
                args.digit_index,
                label,
                render::render_grid(&grid.t())
            );
            let average = summary::col_means(&dataset.rows_with_label(label).view())?;
            let average = reshape::digit_grid(average.view())?;
            println!(
                "Average of all {}s:\n{}",
                label,
                render::render_grid(&average.t())
            );
            report.set("digit_label", label);
        }
        None => warn!(index = args.digit_index, "no such image, skipping the drawing"),
    }

    Ok(())
}

/// Row totals and averages, summarized by digit
fn step_row_stats(args: &Args, dataset: &Dataset, report: &mut Report) -> Result<()> {
    let x = dataset.pixels.view();

    let sums = summary::row_sums(&x);
    let means = summary::row_means(&x)?;
    let by_label = summary::summary_by_label(means.view(), dataset.labels.view())?;

    let shown = sums.len().min(5);
    println!("Total ink of the first images: {}", sums.slice(s![..shown]));
    println!("Average intensity by digit:");
    for (digit, s) in &by_label {
        println!(
            "  {}: min {:6.1}  q1 {:6.1}  median {:6.1}  q3 {:6.1}  max {:6.1}",
            digit, s.min, s.lower_quartile, s.median, s.upper_quartile, s.max
        );
    }

    // Same reduction through the generic per-row apply
    let via_apply = summary::apply_rows(&x, |row| row.mean().unwrap_or(0f64));
    let agrees = via_apply
        .iter()
        .zip(means.iter())
        .all(|(a, b)| (a - b).abs() < 1e-9);
    report.set("apply_matches_row_means", agrees);
    report.set_summaries("row_means_by_label", &by_label);

    if let Some(path) = &args.summary_path {
        report::write_summaries(File::create(path)?, &by_label)?;
        info!(path = %path.display(), "wrote per-digit summaries");
    }

    Ok(())
}

/// Columns that barely vary (the image border) carry no information
fn step_column_filter(args: &Args, dataset: &Dataset, report: &mut Report) -> Result<()> {
    let x = dataset.pixels.view();
    let sds = summary::col_sds(&x)?;

    let grid = reshape::digit_grid(sds.view())?;
    println!(
        "Column standard deviations laid out as an image:\n{}",
        render::render_grid(&grid.t())
    );
    println!("{}", render::render_histogram(&sds.view(), 12));

    let (kept, idx) = filter::select_columns_by_sd(&x, args.sd_threshold)?;
    println!(
        "{} of {} columns have sd > {}; reduced matrix is {}x{}",
        idx.len(),
        x.ncols(),
        args.sd_threshold,
        kept.nrows(),
        kept.ncols()
    );
    report.set("kept_columns", idx.len());

    let brightest = summary::apply_cols(&x, |col| col.fold(0f64, |acc, &v| acc.max(v)));
    let never_inked = brightest.iter().filter(|&&v| v == 0f64).count();
    println!("{} pixel positions are blank in every image", never_inked);
    report.set("blank_columns", never_inked);

    Ok(())
}

/// Thresholding: wipe faint pixels, then reduce to ink / no ink
fn step_binarize(args: &Args, dataset: &Dataset, report: &mut Report) -> Result<()> {
    let x = dataset.pixels.view();

    let faint = filter::zero_below(&x, 50f64);
    let bin = filter::binarize(&x, args.binarize_threshold);
    let nonzero = filter::count_nonzero_by_column(&faint.view());
    let shown = nonzero.len().min(IMAGE_SIDE);
    println!(
        "Non-zero pixels per column after removing values below 50 (first grid column): {}",
        nonzero.slice(s![..shown])
    );

    if let Some(image) = bin.rows().into_iter().nth(args.digit_index) {
        let grid = reshape::digit_grid(image)?;
        println!(
            "Image {} binarized at {}:\n{}",
            args.digit_index,
            args.binarize_threshold,
            render::render_grid(&grid.t())
        );
    }

    let ink = bin.sum() / bin.len().max(1) as f64;
    println!("Share of pixels above {}: {:.3}", args.binarize_threshold, ink);
    report.set("ink_share", ink);

    Ok(())
}

/// The exercise on pixels that are neither background nor full ink
fn step_grey_area(args: &Args, dataset: &Dataset, report: &mut Report) -> Result<()> {
    let x = dataset.pixels.view();
    let p = summary::proportion_in_range(&x, dataset.labels.view(), args.grey_low, args.grey_high)?;

    println!(
        "Proportion of pixels in ({}, {}): {:.4}",
        args.grey_low, args.grey_high, p.overall
    );
    for (digit, share) in &p.by_label {
        println!("  {}: {:.4}", digit, share);
    }

    let cleared = filter::zero_between(&x, args.grey_low, args.grey_high);
    let left = summary::proportion_in_range(&cleared.view(), dataset.labels.view(), args.grey_low, args.grey_high)?;
    report.set("grey_area_cleared", left.overall == 0f64);
    report.set_proportion("grey_area", &p);

    Ok(())
}

/// Row and column arithmetic without loops
fn step_vectorize(_args: &Args, dataset: &Dataset, report: &mut Report) -> Result<()> {
    let x = dataset.pixels.view();

    let centered = vectorized::center_columns(&x)?;
    let scaled = vectorized::standardize_columns(&x)?;
    let rows = vectorized::standardize_rows(&x)?;

    let max_col_mean = summary::col_means(&centered.view())?
        .iter()
        .fold(0f64, |acc, v| acc.max(v.abs()));
    println!("Largest |column mean| after centering: {:e}", max_col_mean);
    println!(
        "Standardized matrix range: [{:.2}, {:.2}]",
        scaled.iter().copied().fold(f64::INFINITY, f64::min),
        scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    );

    let first_row_sd = summary::row_sds(&rows.view())?.get(0).copied();
    report.set("max_centered_col_mean", max_col_mean);
    if let Some(sd) = first_row_sd {
        report.set("first_row_sd_after_scaling", sd);
    }

    Ok(())
}

/// Transpose, products, inverse and QR on a small random matrix and on the pixels
fn step_algebra(args: &Args, dataset: &Dataset, report: &mut Report) -> Result<()> {
    let x = linalg::random_matrix(100, 10, args.seed);

    let t = linalg::transpose(&x.view());
    let prod = linalg::matmul(&t.view(), &x.view())?;
    let cp = linalg::crossprod(&x.view());
    let symmetric = linalg::is_symmetric(&cp.view(), 1e-9);
    println!("x is {:?}; crossprod(x) is {:?}, symmetric: {}", x.dim(), cp.dim(), symmetric);

    let inv = linalg::inverse(&cp.view())?;
    let identity = inv.dot(&prod);
    let off_identity = identity
        .indexed_iter()
        .map(|((i, j), v)| (v - if i == j { 1f64 } else { 0f64 }).abs())
        .fold(0f64, f64::max);
    println!("max |solve(crossprod(x)) %*% crossprod(x) - I| = {:e}", off_identity);

    let qr = linalg::qr(&x.view())?;
    println!("QR: q is {:?}, r is {:?}, rank {}", qr.q.dim(), qr.r.dim(), qr.rank());

    // Least squares through QR: recover y = x * (1, 2, ..., 10)
    let beta = Array1::from_iter((1..=x.ncols()).map(|b| b as f64));
    let coef = qr.solve_least_squares(&x.dot(&beta).view())?;
    println!("Recovered coefficients: {:.3}", coef);

    // Pixel cross product is only rank deficient, never asymmetric
    let pixel_cp = linalg::crossprod(&dataset.pixels.view());
    report.set("pixel_crossprod_symmetric", linalg::is_symmetric(&pixel_cp.view(), 1e-6));
    report.set("crossprod_symmetric", symmetric);
    report.set("inverse_error", off_identity);
    report.set("qr_rank", qr.rank());

    Ok(())
}

/// Run the selected steps on an already loaded table, writing the report if asked to
fn run_steps(args: &Args, dataset: &Dataset) -> Result<Report> {
    if dataset.nrows() == 0 {
        return Err(MatrixError::Empty);
    }

    let mut report = Report::new();
    report.set("images", dataset.nrows());

    let steps: [(Step, fn(&Args, &Dataset, &mut Report) -> Result<()>); 7] = [
        (Step::Reshape, step_reshape),
        (Step::RowStats, step_row_stats),
        (Step::ColumnFilter, step_column_filter),
        (Step::Binarize, step_binarize),
        (Step::GreyArea, step_grey_area),
        (Step::Vectorize, step_vectorize),
        (Step::Algebra, step_algebra),
    ];

    for (step, f) in steps.iter().filter(|(s, _)| args.runs(*s)) {
        info!(?step, "running step");
        f(args, dataset, &mut report)?;
    }

    debug!("report:\n{}", report.to_pretty());

    if let Some(path) = &args.report_path {
        report.write(path)?;
        info!(path = %path.display(), "wrote report");
    }

    Ok(report)
}

fn run(args: &Args) -> Result<Report> {
    if args.download {
        mnist::download_dataset(&args.url, &args.data_path)?;
    }

    let dataset = mnist::parse_dataset(&args.data_path, Some(args.rows))?;
    info!(
        images = dataset.nrows(),
        pixels = dataset.pixels.ncols(),
        "loaded pixel matrix"
    );

    run_steps(args, &dataset)
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "digit_matrix=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
