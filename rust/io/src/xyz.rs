// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plain-text point formats (`.xyz`, `.xyzn`, `.xyzrgb`, `.pts`, `.txt`)

use crate::error::{IoError, Result};
use crate::text::{is_skippable, lines, parse_numbers};
use nalgebra::{Point3, Vector3};
use scan_lite_core::PointCloud;
use std::io::Write;

/// How the columns of a text point file are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XyzLayout {
    /// 3 columns: xyz; 6: xyz + normal; 9: xyz + normal + rgb
    Auto,
    /// xyz + normal
    Xyzn,
    /// xyz + rgb in `0..=1`
    Xyzrgb,
    /// Optional leading count line, then `x y z [intensity] [r g b]` with
    /// 8-bit colors
    Pts,
}

impl XyzLayout {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "xyz" | "txt" => Some(XyzLayout::Auto),
            "xyzn" => Some(XyzLayout::Xyzn),
            "xyzrgb" => Some(XyzLayout::Xyzrgb),
            "pts" => Some(XyzLayout::Pts),
            _ => None,
        }
    }
}

/// Column offsets of the optional attributes
#[derive(Debug, Clone, Copy, PartialEq)]
struct Columns {
    count: usize,
    normal: Option<usize>,
    color: Option<usize>,
    color_scale: f64,
}

impl Columns {
    fn resolve(layout: XyzLayout, count: usize, line: usize) -> Result<Self> {
        let columns = |normal, color, color_scale| Columns {
            count,
            normal,
            color,
            color_scale,
        };
        match (layout, count) {
            (_, n) if n < 3 => Err(IoError::parse(line, format!("expected at least 3 columns, found {}", n))),
            (XyzLayout::Auto, 6..=8) => Ok(columns(Some(3), None, 1.0)),
            (XyzLayout::Auto, n) if n >= 9 => Ok(columns(Some(3), Some(6), 1.0)),
            (XyzLayout::Auto, _) => Ok(columns(None, None, 1.0)),
            (XyzLayout::Xyzn, n) if n >= 6 => Ok(columns(Some(3), None, 1.0)),
            (XyzLayout::Xyzn, n) => Err(IoError::parse(line, format!("xyzn needs 6 columns, found {}", n))),
            (XyzLayout::Xyzrgb, n) if n >= 6 => Ok(columns(None, Some(3), 1.0)),
            (XyzLayout::Xyzrgb, n) => Err(IoError::parse(line, format!("xyzrgb needs 6 columns, found {}", n))),
            (XyzLayout::Pts, 6) => Ok(columns(None, Some(3), 255.0)),
            (XyzLayout::Pts, n) if n >= 7 => Ok(columns(None, Some(4), 255.0)),
            (XyzLayout::Pts, _) => Ok(columns(None, None, 1.0)),
        }
    }
}

/// Parse a text point file.
///
/// The first data line fixes the column layout; every later line must have
/// at least as many columns.
pub fn read_xyz(bytes: &[u8], layout: XyzLayout) -> Result<PointCloud> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut colors = Vec::new();
    let mut columns: Option<Columns> = None;
    let mut fields = Vec::with_capacity(9);

    for (number, line) in lines(bytes) {
        if is_skippable(line) {
            continue;
        }
        parse_numbers(line, &mut fields).ok_or_else(|| IoError::parse(number, "invalid number"))?;

        // A lone integer before any point is the .pts point count
        if layout == XyzLayout::Pts && columns.is_none() && fields.len() == 1 {
            continue;
        }

        let cols = match columns {
            Some(c) => c,
            None => {
                let c = Columns::resolve(layout, fields.len(), number)?;
                columns = Some(c);
                c
            }
        };
        if fields.len() < cols.count {
            return Err(IoError::parse(
                number,
                format!("expected {} columns, found {}", cols.count, fields.len()),
            ));
        }

        positions.push(Point3::new(fields[0], fields[1], fields[2]));
        if let Some(i) = cols.normal {
            normals.push(Vector3::new(fields[i], fields[i + 1], fields[i + 2]));
        }
        if let Some(i) = cols.color {
            let s = cols.color_scale;
            colors.push([
                (fields[i] / s) as f32,
                (fields[i + 1] / s) as f32,
                (fields[i + 2] / s) as f32,
            ]);
        }
    }

    let mut cloud = PointCloud::from_positions(positions);
    if !normals.is_empty() {
        cloud.normals = Some(normals);
    }
    if !colors.is_empty() {
        cloud.colors = Some(colors);
    }
    Ok(cloud)
}

/// Write `x y z [nx ny nz] [r g b]` lines
pub fn write_xyz<W: Write>(cloud: &PointCloud, mut out: W) -> Result<()> {
    for (i, p) in cloud.positions.iter().enumerate() {
        write!(out, "{} {} {}", p.x, p.y, p.z)?;
        if let Some(n) = cloud.normal(i) {
            write!(out, " {} {} {}", n.x, n.y, n.z)?;
        }
        if let Some(c) = cloud.colors.as_ref().and_then(|c| c.get(i)) {
            write!(out, " {} {} {}", c[0], c[1], c[2])?;
        }
        writeln!(out)?;
    }
    Ok(())
}
