use super::format_err;
use crate::{Grid, GridError, GridSpec, Sample, SampleKind, SpatialRef, C};
use geo::Coord;
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

#[derive(Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<(C, bool)>,
    yll: Option<(C, bool)>,
    cellsize: Option<C>,
    nodata: Option<C>,
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub(super) fn read<T: Sample>(path: &Path, srs: SpatialRef) -> Result<Grid<T>, GridError> {
    let reader = BufReader::new(File::open(path)?);
    let mut header = Header::default();
    let mut values: Vec<C> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let mut tokens = line.split_whitespace().peekable();
        let Some(first) = tokens.peek() else { continue };
        if values.is_empty() && first.parse::<C>().is_err() {
            let key = first.to_ascii_lowercase();
            tokens.next();
            let value: C = tokens
                .next()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| format_err(path, format!("bad header line {line:?}")))?;
            match key.as_str() {
                "ncols" => header.ncols = Some(value as usize),
                "nrows" => header.nrows = Some(value as usize),
                "xllcorner" => header.xll = Some((value, false)),
                "xllcenter" => header.xll = Some((value, true)),
                "yllcorner" => header.yll = Some((value, false)),
                "yllcenter" => header.yll = Some((value, true)),
                "cellsize" => header.cellsize = Some(value),
                "nodata_value" => header.nodata = Some(value),
                _ => return Err(format_err(path, format!("unknown header key {key:?}"))),
            }
            continue;
        }
        for token in tokens {
            let value = token
                .parse()
                .map_err(|_| format_err(path, format!("bad sample {token:?}")))?;
            values.push(value);
        }
    }

    let missing = |key| format_err(path, format!("missing header key {key}"));
    let cols = header.ncols.ok_or_else(|| missing("ncols"))?;
    let rows = header.nrows.ok_or_else(|| missing("nrows"))?;
    let cell_size = header.cellsize.ok_or_else(|| missing("cellsize"))?;
    let (xll, x_center) = header.xll.ok_or_else(|| missing("xllcorner"))?;
    let (yll, y_center) = header.yll.ok_or_else(|| missing("yllcorner"))?;
    let half = cell_size / 2.0;
    let origin = Coord {
        x: if x_center { xll - half } else { xll },
        y: (if y_center { yll - half } else { yll }) + rows as C * cell_size,
    };

    let raw_nodata = header.nodata.unwrap_or(crate::NODATA_F64);
    let nodata = T::try_from_f64(raw_nodata)
        .ok_or_else(|| format_err(path, format!("nodata {raw_nodata} out of range")))?;
    let cells = values
        .into_iter()
        .map(|v| {
            if v == raw_nodata {
                Ok(nodata)
            } else {
                T::try_from_f64(v).ok_or_else(|| format_err(path, format!("sample {v} out of range")))
            }
        })
        .collect::<Result<Vec<T>, GridError>>()?;

    Grid::from_vec(GridSpec::new(cols, rows, cell_size, origin, srs), nodata, cells)
}

pub(super) fn write<T: Sample>(path: &Path, grid: &Grid<T>) -> Result<(), GridError> {
    let spec = grid.spec();
    let mut out = BufWriter::new(File::create(path)?);
    let ll = spec.vertex(0, spec.rows);
    writeln!(out, "ncols {}", spec.cols)?;
    writeln!(out, "nrows {}", spec.rows)?;
    writeln!(out, "xllcorner {}", ll.x)?;
    writeln!(out, "yllcorner {}", ll.y)?;
    writeln!(out, "cellsize {}", spec.cell_size)?;
    writeln!(out, "nodata_value {}", grid.nodata().as_f64())?;
    for row in grid.cells().chunks(spec.cols.max(1)) {
        let mut first = true;
        for &value in row {
            if !first {
                out.write_all(b" ")?;
            }
            first = false;
            let value = if grid.is_nodata_value(value) {
                grid.nodata()
            } else {
                value
            };
            match T::KIND {
                SampleKind::Float32 => write!(out, "{}", value.as_f64())?,
                SampleKind::Int32 | SampleKind::UInt8 => write!(out, "{:.0}", value.as_f64())?,
            }
        }
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
