use crate::{Grid, GridError, GridSpec, Sample};
use log::debug;

/// Cell size difference (in linear units) below which two grids are
/// considered to share a resolution.
const CELL_SIZE_TOLERANCE: f64 = 0.05;

/// Returns `src` resampled onto `target`.
///
/// Intended for categorical data:
///
/// - When the source is finer than the target, each target cell
///   takes the maximum of the source samples whose centers fall in it.
/// - Otherwise each target cell takes the source sample under its
///   center (nearest neighbor).
///
/// Reprojection is not supported; `src` and `target` must share a
/// spatial reference.
pub fn resample<T: Sample>(src: &Grid<T>, target: &GridSpec) -> Result<Grid<T>, GridError> {
    let src_spec = src.spec();
    if src_spec.srs != target.srs {
        return Err(GridError::Srs(
            src_spec.srs.to_string(),
            target.srs.to_string(),
        ));
    }
    if src_spec.is_coregistered(target) {
        return Ok(src.clone());
    }

    let mut out = Grid::new(target.clone(), src.nodata());
    if target.cell_size - src_spec.cell_size > CELL_SIZE_TOLERANCE {
        debug!(
            "aggregating {} -> {} (maximum)",
            src_spec.cell_size, target.cell_size
        );
        for (idx, value) in src.iter() {
            let Some(value) = value else { continue };
            let (col, row) = src_spec.col_row(idx);
            let Some((tc, tr)) = target.cell_at(src_spec.cell_center(col, row)) else {
                continue;
            };
            let tidx = target.index(tc, tr);
            match out.get_index(tidx) {
                Some(current) if current.as_f64() >= value.as_f64() => {}
                _ => out.set_index(tidx, value),
            }
        }
    } else {
        debug!(
            "sampling {} -> {} (nearest)",
            src_spec.cell_size, target.cell_size
        );
        for row in 0..target.rows {
            for col in 0..target.cols {
                let center = target.cell_center(col, row);
                if let Some(value) = src_spec
                    .cell_at(center)
                    .and_then(|(sc, sr)| src.get(sc, sr))
                {
                    out.set(col, row, value);
                }
            }
        }
    }
    Ok(out)
}
