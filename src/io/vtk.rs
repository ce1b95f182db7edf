use crate::allocators::DimAllocator;
use crate::connectivity::{Connectivity, Hex27Connectivity, Hex8Connectivity, Quad4d2Connectivity, Quad9d2Connectivity};
use crate::mesh::Mesh;
use crate::postprocess::{component_interpretation, names, DataComponentInterpretation};
use crate::{Real, SmallDim};
use eyre::{eyre, WrapErr};
use log::info;
use nalgebra::{try_convert, DVector, DefaultAllocator};
use std::convert::TryInto;
use std::path::{Path, PathBuf};
use vtkio::model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, DataSet, Piece, UnstructuredGridPiece, Version, VertexNumbers,
    Vtk,
};

/// Represents connectivity that is supported by VTK.
///
/// All supported connectivities store their nodes in VTK order.
pub trait VtkCellConnectivity: Connectivity {
    fn num_nodes(&self) -> usize {
        self.vertex_indices().len()
    }

    fn cell_type(&self) -> CellType;
}

impl VtkCellConnectivity for Quad4d2Connectivity {
    fn cell_type(&self) -> CellType {
        CellType::Quad
    }
}

impl VtkCellConnectivity for Quad9d2Connectivity {
    fn cell_type(&self) -> CellType {
        CellType::BiquadraticQuad
    }
}

impl VtkCellConnectivity for Hex8Connectivity {
    fn cell_type(&self) -> CellType {
        CellType::Hexahedron
    }
}

impl VtkCellConnectivity for Hex27Connectivity {
    fn cell_type(&self) -> CellType {
        CellType::TriquadraticHexahedron
    }
}

#[derive(Debug, Clone)]
struct PointAttribute<T> {
    name: String,
    num_components: usize,
    values: Vec<T>,
}

fn to_f64<T: Real>(values: impl IntoIterator<Item = T>) -> eyre::Result<Vec<f64>> {
    values
        .into_iter()
        .map(|x| try_convert(x).ok_or_else(|| eyre!("Value {} cannot be represented as f64", x)))
        .collect()
}

/// Builds a VTK unstructured grid from a finite element mesh and per-vertex data.
pub struct FiniteElementMeshDataSetBuilder<'a, T, D, C>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    mesh: &'a Mesh<T, D, C>,
    // Only used for exporting directly to file
    title: Option<String>,
    point_attributes: Vec<PointAttribute<T>>,
}

impl<'a, T, D, C> FiniteElementMeshDataSetBuilder<'a, T, D, C>
where
    T: Real,
    D: SmallDim,
    C: VtkCellConnectivity,
    DefaultAllocator: DimAllocator<T, D>,
{
    pub fn from_mesh(mesh: &'a Mesh<T, D, C>) -> Self {
        Self {
            mesh,
            title: None,
            point_attributes: Vec::new(),
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }

    /// Adds a scalar field with one value per mesh vertex.
    pub fn with_point_scalar_attributes(mut self, name: impl Into<String>, values: &[T]) -> Self {
        self.point_attributes.push(PointAttribute {
            name: name.into(),
            num_components: 1,
            values: values.to_vec(),
        });
        self
    }

    /// Adds a vector field with `dim` consecutive components per mesh vertex.
    ///
    /// Vectors with fewer than three components are padded with zeros.
    pub fn with_point_vector_attributes(mut self, name: impl Into<String>, dim: usize, values: &[T]) -> Self {
        assert!(dim >= 1 && dim <= 3, "VTK vectors must have between 1 and 3 components");
        self.point_attributes.push(PointAttribute {
            name: name.into(),
            num_components: dim,
            values: values.to_vec(),
        });
        self
    }

    pub fn try_build(&self) -> eyre::Result<DataSet> {
        assert!(D::dim() <= 3, "Unable to support dimensions larger than 3.");
        let num_vertices = self.mesh.vertices().len();

        let mut points = Vec::with_capacity(3 * num_vertices);
        for v in self.mesh.vertices() {
            points.extend(to_f64(v.coords.iter().copied())?);
            points.extend(std::iter::repeat(0.0).take(3 - D::dim()));
        }

        // Vertices is laid out as follows: N, i_1, i_2, ... i_N,
        // so for e.g. quads this becomes 4 followed by the four indices making up the quad
        let mut vertices: Vec<u32> = Vec::new();
        let mut cell_types = Vec::new();
        for cell in self.mesh.connectivity() {
            vertices.push(
                cell.num_nodes()
                    .try_into()
                    .wrap_err("Cell node count does not fit in u32")?,
            );
            for &idx in cell.vertex_indices() {
                vertices.push(idx.try_into().wrap_err("Vertex index does not fit in u32")?);
            }
            cell_types.push(cell.cell_type());
        }

        let mut point_data = Vec::with_capacity(self.point_attributes.len());
        for attribute in &self.point_attributes {
            let expected_len = attribute.num_components * num_vertices;
            if attribute.values.len() != expected_len {
                return Err(eyre!(
                    "Attribute '{}' has {} values, expected {}",
                    attribute.name,
                    attribute.values.len(),
                    expected_len
                ));
            }
            let values = to_f64(attribute.values.iter().copied())?;
            if attribute.num_components == 1 {
                point_data.push(Attribute::scalars(attribute.name.clone(), 1).with_data(values));
            } else {
                let mut padded = Vec::with_capacity(3 * num_vertices);
                for chunk in values.chunks(attribute.num_components) {
                    padded.extend_from_slice(chunk);
                    padded.extend(std::iter::repeat(0.0).take(3 - attribute.num_components));
                }
                point_data.push(Attribute::vectors(attribute.name.clone()).with_data(padded));
            }
        }

        let piece = UnstructuredGridPiece {
            points: points.into(),
            cells: Cells {
                cell_verts: VertexNumbers::Legacy {
                    num_cells: self.mesh.connectivity().len() as u32,
                    vertices,
                },
                types: cell_types,
            },
            data: Attributes {
                point: point_data,
                cell: Vec::new(),
            },
        };

        Ok(DataSet::UnstructuredGrid {
            meta: None,
            pieces: vec![Piece::Inline(Box::new(piece))],
        })
    }

    /// Convenience function for directly exporting the dataset to a legacy ASCII VTK file.
    pub fn try_export(&self, filename: impl AsRef<Path>) -> eyre::Result<()> {
        let filepath = filename.as_ref();
        let fallback_title = filepath
            .file_stem()
            .map(|os_str| os_str.to_string_lossy().to_string())
            .unwrap_or_else(|| "untitled".to_string());
        let dataset = self.try_build()?;
        Vtk {
            version: Version { major: 4, minor: 1 },
            // If we don't have a title then just make the filepath the title
            title: self.title.clone().unwrap_or(fallback_title),
            byte_order: ByteOrder::BigEndian,
            data: dataset,
            file_path: None,
        }
        .export_ascii(filepath)
        .map_err(|err| eyre!("Failed to write VTK file {}: {}", filepath.display(), err))
    }
}

/// The solution and derived wall distance fields of a run, written as one VTK file.
pub struct WallDistanceOutput<'a, T, D, C>
where
    T: Real,
    D: SmallDim,
    DefaultAllocator: DimAllocator<T, D>,
{
    mesh: &'a Mesh<T, D, C>,
    solution: &'a [T],
    derived: &'a [DVector<T>],
}

impl<'a, T, D, C> WallDistanceOutput<'a, T, D, C>
where
    T: Real,
    D: SmallDim,
    C: VtkCellConnectivity,
    DefaultAllocator: DimAllocator<T, D>,
{
    /// Panics unless there is one solution value and one derived vector of length `dim + 2`
    /// per mesh vertex.
    pub fn new(mesh: &'a Mesh<T, D, C>, solution: &'a [T], derived: &'a [DVector<T>]) -> Self {
        assert_eq!(mesh.vertices().len(), solution.len(), "Need one solution value per vertex");
        assert_eq!(mesh.vertices().len(), derived.len(), "Need one derived vector per vertex");
        assert!(
            derived.iter().all(|v| v.len() == D::dim() + 2),
            "Derived vectors must have dim + 2 components"
        );
        Self {
            mesh,
            solution,
            derived,
        }
    }

    /// The conventional file name for the given spatial dimension.
    pub fn file_name() -> String {
        format!("solution-{}d.vtk", D::dim())
    }

    /// Writes the fields `solution`, `direction`, `s_min` and `s_max` to
    /// `directory/solution-{dim}d.vtk` and returns the path of the written file.
    pub fn write(&self, directory: impl AsRef<Path>) -> eyre::Result<PathBuf> {
        let directory = directory.as_ref();
        std::fs::create_dir_all(directory)
            .wrap_err_with(|| format!("Failed to create output directory {}", directory.display()))?;
        let path = directory.join(Self::file_name());

        let dim = D::dim();
        let names = names(dim);
        let interpretation = component_interpretation(dim);
        let mut builder = FiniteElementMeshDataSetBuilder::from_mesh(self.mesh)
            .with_title(format!("Wall distance ({}D)", dim))
            .with_point_scalar_attributes("solution", self.solution);

        // Consecutive vector components sharing a name form one vector field
        let mut component = 0;
        while component < names.len() {
            let name = names[component];
            let mut num_components = 1;
            if interpretation[component] == DataComponentInterpretation::PartOfVector {
                while component + num_components < names.len()
                    && names[component + num_components] == name
                    && interpretation[component + num_components] == DataComponentInterpretation::PartOfVector
                {
                    num_components += 1;
                }
            }

            let values: Vec<T> = self
                .derived
                .iter()
                .flat_map(|v| v.rows(component, num_components).iter().copied().collect::<Vec<_>>())
                .collect();
            builder = if num_components == 1 && interpretation[component] == DataComponentInterpretation::Scalar {
                builder.with_point_scalar_attributes(name, &values)
            } else {
                builder.with_point_vector_attributes(name, num_components, &values)
            };
            component += num_components;
        }

        builder.try_export(&path)?;
        info!("Wrote {}", path.display());
        Ok(path)
    }
}
