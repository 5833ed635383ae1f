use super::Dataset;
use crate::error::{MatrixError, Result};
use csv::{ReaderBuilder, StringRecord};
use ndarray::{Array1, Array2};
use std::fs::File;
use std::io::{self, BufWriter, Read};
use std::path::Path;
use tracing::{debug, info};

pub const NUM_FEATURES: usize = 784;
pub const IMAGE_SIDE: usize = 28;
const LINE_SIZE: usize = 785;
const NUM_CLASSES: usize = 10;
pub const GREYSCALE_SIZE: f64 = 255f64;

/// Training split in the <label>,<pixel0>,...,<pixel783> layout
pub const DEFAULT_URL: &str = "https://pjreddie.com/media/files/mnist_train.csv";

/// Parse one record into its pixels and label, checking the value ranges
fn parse_record(record: &StringRecord, line: usize) -> Result<(Vec<f64>, usize)> {
    if record.len() != LINE_SIZE {
        return Err(MatrixError::MalformedRecord {
            line,
            reason: format!("expected {} fields, found {}", LINE_SIZE, record.len()),
        });
    }

    let mut values = Vec::with_capacity(LINE_SIZE);

    for (column, field) in record.iter().enumerate() {
        let val = field
            .trim()
            .parse::<f64>()
            .map_err(|_| MatrixError::MalformedRecord {
                line,
                reason: format!("field {} ('{}') is not a number", column, field),
            })?;
        values.push(val);
    }

    let label = values[0];
    if label.fract() != 0f64 || label < 0f64 || label >= NUM_CLASSES as f64 {
        return Err(MatrixError::LabelOutOfRange { line, value: label });
    }

    let pixels = values.split_off(1);
    if let Some((column, &value)) = pixels
        .iter()
        .enumerate()
        .find(|(_, &v)| !(0f64..=GREYSCALE_SIZE).contains(&v))
    {
        return Err(MatrixError::PixelOutOfRange {
            line,
            column,
            value,
        });
    }

    Ok((pixels, label as usize))
}

/// A header line starts with a non-numeric field (e.g. "label")
fn is_header(record: &StringRecord) -> bool {
    record
        .get(0)
        .map_or(false, |x| x.trim().parse::<f64>().is_err())
}

/// Stack the flattened rows into an `nrows x 784` matrix
fn pixel_matrix(pixels: Vec<f64>, nrows: usize) -> Result<Array2<f64>> {
    let actual = pixels.len();

    Array2::from_shape_vec((nrows, NUM_FEATURES), pixels).map_err(|_| {
        MatrixError::LengthMismatch {
            expected: nrows * NUM_FEATURES,
            actual,
        }
    })
}

/// Read the table from any source, keeping at most `limit` images
pub fn parse_reader<R: Read>(reader: R, limit: Option<usize>) -> Result<Dataset> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let limit = limit.unwrap_or(usize::MAX);

    let mut pixels = Vec::new();
    let mut labels = Vec::new();
    let mut record = StringRecord::new();
    let mut first = true;

    while labels.len() < limit && rdr.read_record(&mut record)? {
        let line = record.position().map_or(0, |p| p.line() as usize);

        if first {
            first = false;
            if is_header(&record) {
                debug!(line, "skipping header");
                continue;
            }
        }
        // Trailing blank lines
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }

        let (row, label) = parse_record(&record, line)?;
        pixels.extend(row);
        labels.push(label);
    }

    let nrows = labels.len();
    let pixels = pixel_matrix(pixels, nrows)?;

    info!(images = nrows, "parsed digits table");

    Ok(Dataset {
        pixels,
        labels: Array1::from(labels),
    })
}

/// Return the table stored at `path`
pub fn parse_dataset<P: AsRef<Path>>(path: P, limit: Option<usize>) -> Result<Dataset> {
    let file = File::open(path.as_ref())?;
    parse_reader(file, limit)
}

/// Fetch the CSV once. An existing file at `path` is left untouched
pub fn download_dataset<P: AsRef<Path>>(url: &str, path: P) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        info!(path = %path.display(), "dataset already present, skipping download");
        return Ok(());
    }

    info!(url, path = %path.display(), "downloading dataset");

    let response = ureq::get(url).call().map_err(|e| MatrixError::Http {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let mut out = BufWriter::new(File::create(path)?);
    let bytes = io::copy(&mut response.into_reader(), &mut out)?;

    debug!(bytes, "download finished");

    Ok(())
}
