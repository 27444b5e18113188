//! Raster file I/O.
//!
//! The format is picked from the file extension:
//!
//! - `.asc`: ESRI ASCII grid.
//! - `.bil`: ESRI band-interleaved-by-line, single band, with a
//!   `.hdr` sidecar.
//!
//! Both formats store the spatial reference in a `.prj` sidecar.

mod ascii;
mod bil;

use crate::{Grid, GridError, Sample, SpatialRef};
use log::debug;
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Ascii,
    Bil,
}

fn format_of(path: &Path) -> Result<Format, GridError> {
    match path
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("asc") => Ok(Format::Ascii),
        Some("bil") => Ok(Format::Bil),
        _ => Err(GridError::UnsupportedFormat(path.to_owned())),
    }
}

/// Reads the grid stored at `path`.
pub fn read<T: Sample, P: AsRef<Path>>(path: P) -> Result<Grid<T>, GridError> {
    let path = path.as_ref();
    let format = format_of(path)?;
    let srs = read_prj(path).map_err(at(path))?;
    debug!("reading {path:?}");
    match format {
        Format::Ascii => ascii::read(path, srs),
        Format::Bil => bil::read(path, srs),
    }
    .map_err(at(path))
}

/// Writes `grid` to `path`, replacing any existing file.
pub fn write<T: Sample, P: AsRef<Path>>(path: P, grid: &Grid<T>) -> Result<(), GridError> {
    let path = path.as_ref();
    let format = format_of(path)?;
    debug!("writing {path:?}");
    write_files(path, format, grid).map_err(at(path))
}

fn write_files<T: Sample>(path: &Path, format: Format, grid: &Grid<T>) -> Result<(), GridError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    match format {
        Format::Ascii => ascii::write(path, grid)?,
        Format::Bil => bil::write(path, grid)?,
    }
    fs::write(prj_path(path), grid.spec().srs.to_wkt())?;
    Ok(())
}

/// Attaches `path` to bare I/O errors.
fn at(path: &Path) -> impl FnOnce(GridError) -> GridError + '_ {
    move |e| match e {
        GridError::Io(source) => GridError::File {
            path: path.to_owned(),
            source,
        },
        e => e,
    }
}

/// Removes `path` and its sidecars, if present.
pub fn remove<P: AsRef<Path>>(path: P) -> Result<(), GridError> {
    let path = path.as_ref();
    for p in [
        path.to_owned(),
        prj_path(path),
        path.with_extension("hdr"),
    ] {
        match fs::remove_file(&p) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn prj_path(path: &Path) -> PathBuf {
    path.with_extension("prj")
}

fn read_prj(path: &Path) -> Result<SpatialRef, GridError> {
    match fs::read_to_string(prj_path(path)) {
        Ok(wkt) => SpatialRef::from_wkt(&wkt).ok_or_else(|| GridError::Format {
            path: prj_path(path),
            msg: "unrecognized WKT".to_string(),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(SpatialRef::unknown()),
        Err(e) => Err(e.into()),
    }
}

fn format_err(path: &Path, msg: impl Into<String>) -> GridError {
    GridError::Format {
        path: path.to_owned(),
        msg: msg.into(),
    }
}
