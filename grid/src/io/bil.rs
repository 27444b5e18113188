use super::format_err;
use crate::{Grid, GridError, GridSpec, Sample, SampleKind, SpatialRef, C};
use byteorder::{BigEndian as BE, ByteOrder, LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use geo::Coord;
use std::{
    collections::HashMap,
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pixel {
    F32,
    I32,
    I16,
    U8,
}

impl Pixel {
    fn of(kind: SampleKind) -> Self {
        match kind {
            SampleKind::Float32 => Pixel::F32,
            SampleKind::Int32 => Pixel::I32,
            SampleKind::UInt8 => Pixel::U8,
        }
    }

    fn header(self) -> (u32, &'static str) {
        match self {
            Pixel::F32 => (32, "FLOAT"),
            Pixel::I32 => (32, "SIGNEDINT"),
            Pixel::I16 => (16, "SIGNEDINT"),
            Pixel::U8 => (8, "UNSIGNEDINT"),
        }
    }

    fn read<B: ByteOrder, R: Read>(self, rdr: &mut R) -> std::io::Result<C> {
        Ok(match self {
            Pixel::F32 => C::from(rdr.read_f32::<B>()?),
            Pixel::I32 => C::from(rdr.read_i32::<B>()?),
            Pixel::I16 => C::from(rdr.read_i16::<B>()?),
            Pixel::U8 => C::from(rdr.read_u8()?),
        })
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub(super) fn read<T: Sample>(path: &Path, srs: SpatialRef) -> Result<Grid<T>, GridError> {
    let hdr_path = path.with_extension("hdr");
    let hdr: HashMap<String, String> = fs::read_to_string(&hdr_path)?
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let key = tokens.next()?.to_ascii_uppercase();
            let value = tokens.next()?.to_string();
            Some((key, value))
        })
        .collect();
    let num = |key: &str| -> Result<C, GridError> {
        hdr.get(key)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| format_err(&hdr_path, format!("missing or bad {key}")))
    };

    let cols = num("NCOLS")? as usize;
    let rows = num("NROWS")? as usize;
    if hdr.get("NBANDS").map_or(false, |v| v != "1") {
        return Err(format_err(&hdr_path, "only single band rasters are supported"));
    }
    if hdr
        .get("LAYOUT")
        .map_or(false, |v| !v.eq_ignore_ascii_case("BIL"))
    {
        return Err(format_err(&hdr_path, "only BIL layout is supported"));
    }
    let cell_size = num("XDIM")?;
    if (num("YDIM")? - cell_size).abs() > cell_size * 1e-6 {
        return Err(format_err(&hdr_path, "non-square cells"));
    }
    let origin = Coord {
        x: num("ULXMAP")? - cell_size / 2.0,
        y: num("ULYMAP")? + cell_size / 2.0,
    };
    let pixel = match (
        num("NBITS").unwrap_or(8.0) as u32,
        hdr.get("PIXELTYPE").map(String::as_str),
    ) {
        (32, Some("FLOAT")) => Pixel::F32,
        (32, _) => Pixel::I32,
        (16, _) => Pixel::I16,
        (8, _) => Pixel::U8,
        (bits, _) => {
            return Err(format_err(&hdr_path, format!("unsupported NBITS {bits}")));
        }
    };
    let big_endian = hdr.get("BYTEORDER").map_or(false, |v| v == "M");

    let nodata_raw = hdr.get("NODATA").and_then(|v| v.parse::<C>().ok());
    let nodata = match nodata_raw {
        Some(v) => T::try_from_f64(v)
            .ok_or_else(|| format_err(&hdr_path, format!("nodata {v} out of range")))?,
        None => default_nodata::<T>()
            .ok_or_else(|| format_err(&hdr_path, "missing NODATA"))?,
    };

    let mut file = BufReader::new(File::open(path)?);
    let mut cells = Vec::with_capacity(cols * rows);
    for _ in 0..(cols * rows) {
        let raw = if big_endian {
            pixel.read::<BE, _>(&mut file)?
        } else {
            pixel.read::<LE, _>(&mut file)?
        };
        let value = if Some(raw) == nodata_raw {
            nodata
        } else {
            T::try_from_f64(raw)
                .ok_or_else(|| format_err(path, format!("sample {raw} out of range")))?
        };
        cells.push(value);
    }

    Grid::from_vec(GridSpec::new(cols, rows, cell_size, origin, srs), nodata, cells)
}

pub(super) fn write<T: Sample>(path: &Path, grid: &Grid<T>) -> Result<(), GridError> {
    let spec = grid.spec();
    let pixel = Pixel::of(T::KIND);
    let (nbits, pixel_type) = pixel.header();
    let ul = spec.cell_center(0, 0);

    let mut hdr = BufWriter::new(File::create(path.with_extension("hdr"))?);
    writeln!(hdr, "BYTEORDER      I")?;
    writeln!(hdr, "LAYOUT         BIL")?;
    writeln!(hdr, "NROWS          {}", spec.rows)?;
    writeln!(hdr, "NCOLS          {}", spec.cols)?;
    writeln!(hdr, "NBANDS         1")?;
    writeln!(hdr, "NBITS          {nbits}")?;
    writeln!(hdr, "PIXELTYPE      {pixel_type}")?;
    writeln!(hdr, "ULXMAP         {}", ul.x)?;
    writeln!(hdr, "ULYMAP         {}", ul.y)?;
    writeln!(hdr, "XDIM           {}", spec.cell_size)?;
    writeln!(hdr, "YDIM           {}", spec.cell_size)?;
    writeln!(hdr, "NODATA         {}", grid.nodata().as_f64())?;
    hdr.flush()?;

    let mut out = BufWriter::new(File::create(path)?);
    for &value in grid.cells() {
        let value = if grid.is_nodata_value(value) {
            grid.nodata()
        } else {
            value
        };
        write_sample(&mut out, pixel, value.as_f64())?;
    }
    out.flush()?;
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn write_sample<W: Write>(out: &mut W, pixel: Pixel, value: C) -> std::io::Result<()> {
    match pixel {
        Pixel::F32 => out.write_f32::<LE>(value as f32),
        Pixel::I32 => out.write_i32::<LE>(value as i32),
        Pixel::I16 => out.write_i16::<LE>(value as i16),
        Pixel::U8 => out.write_u8(value as u8),
    }
}

fn default_nodata<T: Sample>() -> Option<T> {
    T::try_from_f64(match T::KIND {
        SampleKind::Float32 => crate::NODATA_F64,
        SampleKind::Int32 => C::from(crate::NODATA_I32),
        SampleKind::UInt8 => C::from(crate::NODATA_U8),
    })
}
