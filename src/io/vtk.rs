//! VTK output for P1 fields on 1D meshes.
//!
//! Each snapshot is written as a VTU (XML UnstructuredGrid) file with one
//! VTK_LINE cell per element, and a ParaView `.pvd` collection indexes the
//! snapshots by time.
//!
//! # Example
//!
//! ```ignore
//! use ad_rs::io::export_state;
//!
//! // Writes conc_0000.vtu, conc_0001.vtu, ... and conc.pvd
//! export_state("results/conc.pvd", &mesh, &x.u, &x.m, "concentration")?;
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::mesh::Mesh1D;
use crate::time::TimeDependentVector;

/// Error type for VTK operations.
#[derive(Debug, Error)]
pub enum VtkError {
    /// I/O error during file operations.
    #[error("VTK I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A point field does not have one value per mesh vertex.
    #[error("Field '{name}' has {actual} values, mesh has {expected} vertices")]
    FieldLength {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// VTK cell type for a two-point segment.
const VTK_LINE: u8 = 3;

/// VTK XML writer helper.
struct VtkWriter<W: Write> {
    writer: BufWriter<W>,
    indent: usize,
}

impl<W: Write> VtkWriter<W> {
    fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            indent: 0,
        }
    }

    fn write_indent(&mut self) -> std::io::Result<()> {
        for _ in 0..self.indent {
            write!(self.writer, "  ")?;
        }
        Ok(())
    }

    fn write_header(&mut self, file_type: &str) -> std::io::Result<()> {
        writeln!(self.writer, "<?xml version=\"1.0\"?>")?;
        writeln!(
            self.writer,
            "<VTKFile type=\"{}\" version=\"0.1\" byte_order=\"LittleEndian\">",
            file_type
        )?;
        self.indent += 1;
        Ok(())
    }

    fn write_footer(&mut self) -> std::io::Result<()> {
        self.indent -= 1;
        writeln!(self.writer, "</VTKFile>")?;
        self.writer.flush()?;
        Ok(())
    }

    fn start_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> std::io::Result<()> {
        self.write_indent()?;
        write!(self.writer, "<{}", name)?;
        for (key, value) in attrs {
            write!(self.writer, " {}=\"{}\"", key, value)?;
        }
        writeln!(self.writer, ">")?;
        self.indent += 1;
        Ok(())
    }

    fn end_element(&mut self, name: &str) -> std::io::Result<()> {
        self.indent -= 1;
        self.write_indent()?;
        writeln!(self.writer, "</{}>", name)?;
        Ok(())
    }

    fn empty_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> std::io::Result<()> {
        self.write_indent()?;
        write!(self.writer, "<{}", name)?;
        for (key, value) in attrs {
            write!(self.writer, " {}=\"{}\"", key, value)?;
        }
        writeln!(self.writer, "/>")?;
        Ok(())
    }

    /// Values of one DataArray, `per_line` to a line.
    fn write_values<T: std::fmt::Display>(
        &mut self,
        data: &[T],
        per_line: usize,
    ) -> std::io::Result<()> {
        self.indent += 1;
        self.write_indent()?;
        for (i, v) in data.iter().enumerate() {
            write!(self.writer, "{}", v)?;
            if i + 1 < data.len() {
                if (i + 1) % per_line == 0 {
                    writeln!(self.writer)?;
                    self.write_indent()?;
                } else {
                    write!(self.writer, " ")?;
                }
            }
        }
        writeln!(self.writer)?;
        self.indent -= 1;
        self.write_indent()?;
        writeln!(self.writer, "</DataArray>")?;
        Ok(())
    }

    fn write_data_array_f64(&mut self, name: &str, data: &[f64]) -> std::io::Result<()> {
        self.write_indent()?;
        writeln!(
            self.writer,
            "<DataArray type=\"Float64\" Name=\"{}\" format=\"ascii\">",
            name
        )?;
        let formatted: Vec<String> = data.iter().map(|v| format!("{:.10e}", v)).collect();
        self.write_values(&formatted, 6)
    }

    fn write_data_array_i32(&mut self, name: &str, data: &[i32]) -> std::io::Result<()> {
        self.write_indent()?;
        writeln!(
            self.writer,
            "<DataArray type=\"Int32\" Name=\"{}\" format=\"ascii\">",
            name
        )?;
        self.write_values(data, 20)
    }

    fn write_data_array_u8(&mut self, name: &str, data: &[u8]) -> std::io::Result<()> {
        self.write_indent()?;
        writeln!(
            self.writer,
            "<DataArray type=\"UInt8\" Name=\"{}\" format=\"ascii\">",
            name
        )?;
        self.write_values(data, 20)
    }

    /// Vertices embedded in 3D as (x, 0, 0).
    fn write_points(&mut self, vertices: &[f64]) -> std::io::Result<()> {
        self.start_element("Points", &[])?;
        self.write_indent()?;
        writeln!(
            self.writer,
            "<DataArray type=\"Float64\" NumberOfComponents=\"3\" format=\"ascii\">"
        )?;
        let formatted: Vec<String> = vertices
            .iter()
            .map(|x| format!("{:.10e} 0.0 0.0", x))
            .collect();
        self.write_values(&formatted, 2)?;
        self.end_element("Points")
    }

    fn write_cells(&mut self, n_elements: usize) -> std::io::Result<()> {
        self.start_element("Cells", &[])?;

        let connectivity: Vec<i32> = (0..n_elements)
            .flat_map(|k| [k as i32, k as i32 + 1])
            .collect();
        self.write_data_array_i32("connectivity", &connectivity)?;

        let offsets: Vec<i32> = (1..=n_elements).map(|k| (2 * k) as i32).collect();
        self.write_data_array_i32("offsets", &offsets)?;

        let types = vec![VTK_LINE; n_elements];
        self.write_data_array_u8("types", &types)?;

        self.end_element("Cells")
    }

    fn write_field_data(&mut self, name: &str, value: f64) -> std::io::Result<()> {
        self.start_element("FieldData", &[])?;
        self.write_indent()?;
        writeln!(
            self.writer,
            "<DataArray type=\"Float64\" Name=\"{}\" NumberOfTuples=\"1\" format=\"ascii\">",
            name
        )?;
        self.write_values(&[format!("{:.10e}", value)], 1)?;
        self.end_element("FieldData")
    }
}

/// Write P1 point fields on `mesh` to a single VTU file.
pub fn write_vtu(
    path: impl AsRef<Path>,
    mesh: &Mesh1D,
    fields: &[(&str, &[f64])],
    time: f64,
) -> Result<(), VtkError> {
    let n_points = mesh.n_dofs();
    for (name, values) in fields {
        if values.len() != n_points {
            return Err(VtkError::FieldLength {
                name: name.to_string(),
                expected: n_points,
                actual: values.len(),
            });
        }
    }

    let file = File::create(path)?;
    let mut writer = VtkWriter::new(file);

    writer.write_header("UnstructuredGrid")?;
    writer.start_element("UnstructuredGrid", &[])?;
    writer.write_field_data("TIME", time)?;
    writer.start_element(
        "Piece",
        &[
            ("NumberOfPoints", &n_points.to_string()),
            ("NumberOfCells", &mesh.n_elements.to_string()),
        ],
    )?;

    writer.write_points(&mesh.vertices)?;
    writer.write_cells(mesh.n_elements)?;

    let scalars = fields.first().map(|(name, _)| *name).unwrap_or("");
    writer.start_element("PointData", &[("Scalars", scalars)])?;
    for (name, values) in fields {
        writer.write_data_array_f64(name, values)?;
    }
    writer.end_element("PointData")?;

    writer.end_element("Piece")?;
    writer.end_element("UnstructuredGrid")?;
    writer.write_footer()?;
    Ok(())
}

/// Write a ParaView collection referencing `(time, file)` entries.
///
/// Entry paths are written relative to the collection's directory when
/// possible.
pub fn write_pvd(path: impl AsRef<Path>, entries: &[(f64, PathBuf)]) -> Result<(), VtkError> {
    let path = path.as_ref();
    let parent = path.parent().unwrap_or(Path::new(""));

    let file = File::create(path)?;
    let mut writer = VtkWriter::new(file);
    writer.write_header("Collection")?;
    writer.start_element("Collection", &[])?;
    for (time, entry) in entries {
        let relative = entry.strip_prefix(parent).unwrap_or(entry);
        writer.empty_element(
            "DataSet",
            &[
                ("timestep", &format!("{:.10e}", time)),
                ("part", "0"),
                ("file", &relative.to_string_lossy()),
            ],
        )?;
    }
    writer.end_element("Collection")?;
    writer.write_footer()?;
    Ok(())
}

/// Snapshot file name `<stem>_<frame>.vtu` next to `base`.
pub fn series_path(base: impl AsRef<Path>, frame: usize) -> PathBuf {
    let base = base.as_ref();
    let stem = base.file_stem().unwrap_or_default().to_string_lossy();
    let parent = base.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}_{:04}.vtu", stem, frame))
}

/// Write a state history and its parameter field.
///
/// Every stamp of `state` becomes one VTU file holding the snapshot under
/// `name` together with the parameter; `path` receives the `.pvd`
/// collection. Returns the collection path.
pub fn export_state(
    path: impl AsRef<Path>,
    mesh: &Mesh1D,
    state: &TimeDependentVector,
    parameter: &[f64],
    name: &str,
) -> Result<PathBuf, VtkError> {
    let collection = path.as_ref().with_extension("pvd");
    let mut entries = Vec::with_capacity(state.n_steps());
    for (frame, (t, snapshot)) in state.iter().enumerate() {
        let file = series_path(&collection, frame);
        write_vtu(&file, mesh, &[(name, snapshot), ("parameter", parameter)], t)?;
        entries.push((t, file));
    }
    write_pvd(&collection, &entries)?;
    log::debug!(
        "Exported {} snapshots of '{}' to {}",
        entries.len(),
        name,
        collection.display()
    );
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TimeGrid;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_write_vtu_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.vtu");
        let mesh = Mesh1D::uniform(0.0, 1.0, 3).unwrap();
        let u = vec![0.0, 1.0, 2.0, 3.0];

        write_vtu(&path, &mesh, &[("u", u.as_slice())], 0.5).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("UnstructuredGrid"));
        assert!(content.contains("NumberOfPoints=\"4\""));
        assert!(content.contains("NumberOfCells=\"3\""));
        assert!(content.contains("Name=\"u\""));
        assert!(content.contains("Name=\"TIME\""));
    }

    #[test]
    fn test_field_length_checked() {
        let dir = tempdir().unwrap();
        let mesh = Mesh1D::uniform(0.0, 1.0, 3).unwrap();
        let result = write_vtu(dir.path().join("bad.vtu"), &mesh, &[("u", &[1.0, 2.0][..])], 0.0);
        assert!(matches!(
            result,
            Err(VtkError::FieldLength {
                expected: 4,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_series_naming() {
        let path = series_path("out/conc.pvd", 42);
        assert_eq!(path, PathBuf::from("out/conc_0042.vtu"));
    }

    #[test]
    fn test_export_state_writes_collection() {
        let dir = tempdir().unwrap();
        let mesh = Mesh1D::uniform(0.0, 1.0, 4).unwrap();
        let grid = TimeGrid::arange(0.0, 0.2, 0.1).unwrap();
        let mut u = TimeDependentVector::new(grid, mesh.n_dofs());
        u.at_mut(2).iter_mut().for_each(|v| *v = 1.0);
        let m = vec![0.25; mesh.n_dofs()];
        let before = u.clone();

        let pvd = export_state(dir.path().join("conc"), &mesh, &u, &m, "concentration").unwrap();

        assert_eq!(u, before);
        assert_eq!(pvd, dir.path().join("conc.pvd"));
        let collection = fs::read_to_string(&pvd).unwrap();
        assert_eq!(collection.matches("<DataSet").count(), 3);
        assert!(collection.contains("file=\"conc_0002.vtu\""));
        for frame in 0..3 {
            let vtu = fs::read_to_string(dir.path().join(format!("conc_{:04}.vtu", frame))).unwrap();
            assert!(vtu.contains("Name=\"concentration\""));
            assert!(vtu.contains("Name=\"parameter\""));
        }
    }
}
