// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Scan-Lite IO
//!
//! File codecs for the scan-lite pipeline: point clouds in (`.xyz` family,
//! `.ply`, `.pcd`, `.las`), meshes in (`.obj`, `.stl`, `.ply` with faces),
//! point clouds and section drawings out (`.xyz`, `.ply`, `.svg`, `.dxf`)
//! and JSON results.
//!
//! Compressed or vendor formats (LAZ, E57, IFC) are rejected with
//! [`IoError::UnsupportedFormat`].
//!
//! ```rust,ignore
//! use scan_lite_io::{read_point_cloud, write_section, SectionFormat};
//!
//! let cloud = read_point_cloud("scan.ply".as_ref())?;
//! write_section("plan.svg".as_ref(), &section, SectionFormat::Svg)?;
//! ```

mod error;
mod text;

pub mod dxf;
pub mod las;
pub mod obj;
pub mod pcd;
pub mod ply;
pub mod stl;
pub mod svg;
pub mod xyz;

pub use dxf::render_dxf;
pub use error::{IoError, Result};
pub use las::read_las;
pub use obj::read_obj;
pub use pcd::read_pcd;
pub use ply::{read_ply, write_ply, PlyData};
pub use stl::read_stl;
pub use svg::render_svg;
pub use xyz::{read_xyz, write_xyz, XyzLayout};

use scan_lite_core::{Mesh, PointCloud, SectionResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Lower-case extension without the dot
pub fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

fn unsupported(path: &Path) -> IoError {
    IoError::UnsupportedFormat(match extension(path).as_str() {
        "" => path.display().to_string(),
        ext => format!(".{}", ext),
    })
}

/// Load a point cloud, dispatching on the file extension
pub fn read_point_cloud(path: &Path) -> Result<PointCloud> {
    let ext = extension(path);
    let layout = XyzLayout::from_extension(&ext);
    let cloud = match (layout, ext.as_str()) {
        (Some(layout), _) => read_xyz(&fs::read(path)?, layout)?,
        (None, "ply") => read_ply(&fs::read(path)?)?.cloud,
        (None, "pcd") => read_pcd(&fs::read(path)?)?,
        (None, "las") => read_las(path)?,
        _ => return Err(unsupported(path)),
    };
    if cloud.is_empty() {
        return Err(IoError::Empty(path.display().to_string()));
    }
    tracing::debug!(path = %path.display(), points = cloud.len(), "loaded point cloud");
    Ok(cloud)
}

/// Load a triangle mesh, dispatching on the file extension
pub fn read_mesh(path: &Path) -> Result<Mesh> {
    let ext = extension(path);
    if !matches!(ext.as_str(), "obj" | "stl" | "ply") {
        return Err(unsupported(path));
    }

    let bytes = fs::read(path)?;
    let mesh = match ext.as_str() {
        "obj" => read_obj(&bytes)?,
        "stl" => read_stl(&bytes)?,
        _ => read_ply(&bytes)?.mesh.unwrap_or_default(),
    };
    if mesh.triangle_count() == 0 {
        return Err(IoError::Empty(path.display().to_string()));
    }
    tracing::debug!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "loaded mesh"
    );
    Ok(mesh)
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}

/// Write a point cloud as `.xyz`-family text or ASCII `.ply`
pub fn write_point_cloud(path: &Path, cloud: &PointCloud) -> Result<()> {
    let ext = extension(path);
    let is_ply = ext == "ply";
    if !is_ply && XyzLayout::from_extension(&ext).is_none() {
        return Err(unsupported(path));
    }

    create_parent(path)?;
    let mut out = BufWriter::new(fs::File::create(path)?);
    if is_ply {
        write_ply(cloud, &mut out)?;
    } else {
        write_xyz(cloud, &mut out)?;
    }
    out.flush()?;
    Ok(())
}

/// Drawing format of a section export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SectionFormat {
    #[default]
    Svg,
    Dxf,
}

impl SectionFormat {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "svg" => Ok(SectionFormat::Svg),
            "dxf" => Ok(SectionFormat::Dxf),
            other => Err(IoError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Render and write a section drawing
pub fn write_section(path: &Path, section: &SectionResult, format: SectionFormat) -> Result<()> {
    let text = match format {
        SectionFormat::Svg => render_svg(section),
        SectionFormat::Dxf => render_dxf(&section.segments),
    };
    create_parent(path)?;
    fs::write(path, text)?;
    Ok(())
}

/// Write a result record as pretty-printed JSON
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    create_parent(path)?;
    let mut out = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer_pretty(&mut out, value)?;
    out.flush()?;
    Ok(())
}

/// Size of a written file in bytes
pub fn file_size(path: &Path) -> Result<u64> {
    Ok(fs::metadata(path)?.len())
}
