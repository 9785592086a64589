//! PLY export of regularized triangulations.
//!
//! Triangulations are written as ASCII PLY with 2D positions and one RGB
//! colour per vertex, the rounded regularized value. External tools can
//! render them with Gouraud shading, and [`load`] reads them back.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point2;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use crate::algo::tv::calculus::{ColorMode, Value};
use crate::algo::tv::TvTriangulation;
use crate::error::{Result, TvError};
use crate::mesh::{build_from_triangles, to_face_vertex, HalfEdgeMesh, MeshIndex};

/// Load a coloured triangulation from a PLY file.
///
/// Returns the mesh and one value per vertex; vertices without colour
/// properties get zero.
///
/// # Example
///
/// ```no_run
/// use tvmesh::algo::tv::{TvOptions, TvTriangulation};
/// use tvmesh::algo::tv::calculus::ColorMode;
/// use tvmesh::io::ply;
/// use tvmesh::mesh::HalfEdgeMesh;
///
/// let (mesh, values): (HalfEdgeMesh, _) = ply::load("regularized.ply").unwrap();
/// let tvt = TvTriangulation::from_mesh(mesh, values, ColorMode::Color, &TvOptions::default()).unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<(HalfEdgeMesh<I>, Vec<Value>)> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let (positions, faces, values) = read(&mut reader).map_err(|message| TvError::LoadError {
        path: path.to_path_buf(),
        message,
    })?;
    let mesh = build_from_triangles(&positions, &faces)?;
    Ok((mesh, values))
}

type PlyData = (Vec<Point2<f64>>, Vec<[usize; 3]>, Vec<Value>);

fn read<R: std::io::BufRead>(reader: &mut R) -> std::result::Result<PlyData, String> {
    let parser = Parser::<DefaultElement>::new();
    let ply = parser.read_ply(reader).map_err(|e| e.to_string())?;

    let vertex_element = ply
        .payload
        .get("vertex")
        .ok_or_else(|| "PLY file has no vertex element".to_string())?;

    let mut positions = Vec::with_capacity(vertex_element.len());
    let mut values = Vec::with_capacity(vertex_element.len());
    for vertex in vertex_element {
        let x = get_float_property(vertex, "x").ok_or_else(|| "vertex missing x coordinate".to_string())?;
        let y = get_float_property(vertex, "y").ok_or_else(|| "vertex missing y coordinate".to_string())?;
        positions.push(Point2::new(x, y));
        let channel = |name: &str| get_float_property(vertex, name).unwrap_or(0.0);
        values.push(Value::new(channel("red"), channel("green"), channel("blue")));
    }

    let face_element = ply
        .payload
        .get("face")
        .ok_or_else(|| "PLY file has no face element".to_string())?;

    let mut faces = Vec::with_capacity(face_element.len());
    for face in face_element {
        let indices = get_list_property(face, "vertex_indices")
            .or_else(|| get_list_property(face, "vertex_index"))
            .ok_or_else(|| "face missing vertex_indices property".to_string())?;
        if indices.len() != 3 {
            return Err(format!("face with {} vertices, only triangles are supported", indices.len()));
        }
        faces.push([indices[0], indices[1], indices[2]]);
    }

    Ok((positions, faces, values))
}

fn get_float_property(element: &DefaultElement, name: &str) -> Option<f64> {
    match element.get(name)? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

fn get_list_property(element: &DefaultElement, name: &str) -> Option<Vec<usize>> {
    match element.get(name)? {
        Property::ListInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        _ => None,
    }
}

/// Save a triangulation with its regularized colours (ASCII PLY).
///
/// # Example
///
/// ```no_run
/// use tvmesh::algo::tv::{TvOptions, TvTriangulation};
/// use tvmesh::io::{self, ply};
///
/// let raster = io::load("input.png").unwrap();
/// let tvt: TvTriangulation = TvTriangulation::from_raster(&raster, &TvOptions::default()).unwrap();
/// ply::save(&tvt, "triangulation.ply").unwrap();
/// ```
pub fn save<P: AsRef<Path>, I: MeshIndex>(tvt: &TvTriangulation<I>, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write(tvt, &mut writer)?;
    writer.flush()?;
    log::info!("Saved triangulation to {}", path.display());
    Ok(())
}

fn write<W: Write, I: MeshIndex>(tvt: &TvTriangulation<I>, writer: &mut W) -> Result<()> {
    let (vertices, faces) = to_face_vertex(tvt.mesh());

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment Generated by tvmesh")?;
    writeln!(writer, "comment TV energy {}", tvt.energy())?;
    writeln!(writer, "element vertex {}", vertices.len())?;
    writeln!(writer, "property double x")?;
    writeln!(writer, "property double y")?;
    writeln!(writer, "property uchar red")?;
    writeln!(writer, "property uchar green")?;
    writeln!(writer, "property uchar blue")?;
    writeln!(writer, "element face {}", faces.len())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    let mode = tvt.color_mode();
    for (p, u) in vertices.iter().zip(tvt.values()) {
        let byte = |c: usize| u[c].round().clamp(0.0, 255.0) as u8;
        let [r, g, b] = match mode {
            ColorMode::Grayscale => [byte(0); 3],
            ColorMode::Color => [byte(0), byte(1), byte(2)],
        };
        writeln!(writer, "{} {} {} {} {}", p.x, p.y, r, g, b)?;
    }

    for f in &faces {
        writeln!(writer, "3 {} {} {}", f[0], f[1], f[2])?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::tv::TvOptions;
    use crate::io::Raster;

    fn sample() -> TvTriangulation {
        let mut raster = Raster::new(3, 2, ColorMode::Color);
        raster.set(0, 0, [255, 0, 0]);
        raster.set(2, 1, [10, 20, 30]);
        TvTriangulation::from_raster(&raster, &TvOptions::default()).unwrap()
    }

    #[test]
    fn test_header_and_counts() {
        let tvt = sample();
        let mut buffer = Vec::new();
        write(&tvt, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.starts_with("ply\nformat ascii 1.0\n"));
        assert!(text.contains("element vertex 6\n"));
        assert!(text.contains("element face 4\n"));
        assert!(text.contains("\n0 0 255 0 0\n"));
        assert!(text.contains("\n2 1 10 20 30\n"));
    }

    #[test]
    fn test_read_back() {
        let tvt = sample();
        let mut buffer = Vec::new();
        write(&tvt, &mut buffer).unwrap();

        let (positions, faces, values) = read(&mut buffer.as_slice()).unwrap();
        let mesh: HalfEdgeMesh = build_from_triangles(&positions, &faces).unwrap();
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_faces(), 4);
        assert!(mesh.is_valid());
        assert_eq!(values, tvt.values());
        assert_eq!(to_face_vertex(&mesh), to_face_vertex(tvt.mesh()));
    }

    #[test]
    fn test_save_and_load_file() {
        let tvt = sample();
        let path = std::env::temp_dir().join(format!("tvmesh-ply-{}.ply", std::process::id()));
        save(&tvt, &path).unwrap();
        let (mesh, values): (HalfEdgeMesh, _) = load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let reloaded =
            TvTriangulation::from_mesh(mesh, values, ColorMode::Color, &TvOptions::default()).unwrap();
        assert!((reloaded.energy() - tvt.energy()).abs() < 1e-9);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load::<_, u32>("/nonexistent/tvmesh.ply");
        assert!(matches!(result, Err(TvError::Io(_))));
    }
}
