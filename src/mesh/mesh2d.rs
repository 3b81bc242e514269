//! Logically Cartesian quadrilateral meshes.
//!
//! A mesh is an nx × ny grid of quads whose vertex positions may be moved
//! freely, so elements can be distorted (parametric). It carries vertex
//! coordinates, per-element vertex lists in counter-clockwise order, and
//! an edge table that records, for every edge, which element faces meet
//! there; the transport operator walks this table for its numerical
//! fluxes. Construction rejects any element whose bilinear map folds over
//! (non-positive Jacobian determinant), and the mesh never changes after
//! that.
//!
//! Faces are numbered counter-clockwise starting at the bottom: face 0
//! runs v0→v1, face 1 runs v1→v2, face 2 runs v2→v3 and face 3 closes
//! the loop v3→v0.

use thiserror::Error;

/// Error type for mesh construction.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Zero elements requested in some direction.
    #[error("invalid mesh dimensions: {nx} x {ny} elements")]
    InvalidDimensions { nx: usize, ny: usize },

    /// Domain bounds are empty or reversed.
    #[error("invalid domain bounds: [{x0}, {x1}] x [{y0}, {y1}]")]
    InvalidBounds { x0: f64, x1: f64, y0: f64, y1: f64 },

    /// Vertex array does not match the logical grid.
    #[error("expected {expected} vertices for the logical grid, found {found}")]
    VertexCount { expected: usize, found: usize },

    /// An element's bilinear map is degenerate or inverted.
    #[error("element {element} has non-positive Jacobian determinant {det_j}")]
    DegenerateElement { element: usize, det_j: f64 },
}

/// One side of an edge: an element together with the local face it shows
/// to that edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementFace {
    pub element: usize,
    /// Local face number, 0-3
    pub face: usize,
}

impl ElementFace {
    pub fn new(element: usize, face: usize) -> Self {
        Self { element, face }
    }
}

/// An edge of the mesh and the element faces meeting at it.
#[derive(Clone, Debug)]
pub struct Edge {
    /// Endpoint vertex indices, stored with the smaller index first
    pub vertices: (usize, usize),
    /// One adjacent element face; every edge has at least this one
    pub left: ElementFace,
    /// The face on the far side, absent on the domain boundary
    pub right: Option<ElementFace>,
}

impl Edge {
    pub fn is_boundary(&self) -> bool {
        self.right.is_none()
    }
}

/// Quadrilateral mesh with edge connectivity, immutable once built.
#[derive(Clone)]
pub struct Mesh2D {
    /// (x, y) position of each vertex
    pub vertices: Vec<(f64, f64)>,

    /// Vertex indices of each element, counter-clockwise from the
    /// bottom-left corner; index i maps to the reference corner at
    /// (r, s) = (±1, ±1) in the same rotational order
    pub elements: Vec<[usize; 4]>,

    /// All edges with their adjacency
    pub edges: Vec<Edge>,

    /// element_edges[k][f]: index into `edges` for face f of element k
    pub element_edges: Vec<[usize; 4]>,

    /// Logical grid dimensions
    pub nx: usize,
    pub ny: usize,

    pub n_elements: usize,
    pub n_edges: usize,
    pub n_vertices: usize,

    /// Count of boundary edges; zero on a doubly periodic mesh
    pub n_boundary_edges: usize,
}

impl Mesh2D {
    /// Create a uniform rectangular mesh of [x0, x1] × [y0, y1] with a
    /// closed boundary.
    pub fn rectangle(
        x0: f64,
        x1: f64,
        y0: f64,
        y1: f64,
        nx: usize,
        ny: usize,
    ) -> Result<Self, MeshError> {
        let vertices = Self::grid_vertices(x0, x1, y0, y1, nx, ny)?;
        Self::from_vertices(vertices, nx, ny)
    }

    /// Create a uniform doubly-periodic mesh (no boundary edges).
    pub fn periodic(
        x0: f64,
        x1: f64,
        y0: f64,
        y1: f64,
        nx: usize,
        ny: usize,
    ) -> Result<Self, MeshError> {
        let vertices = Self::grid_vertices(x0, x1, y0, y1, nx, ny)?;
        let elements = Self::grid_elements(nx, ny);
        let mesh = Self::build(vertices, elements, nx, ny, true);
        mesh.validate()?;
        Ok(mesh)
    }

    /// Create a closed-boundary mesh from explicit vertex positions on a
    /// logical (nx+1) × (ny+1) grid (row-major, x fastest).
    ///
    /// This is the distorted / parametric mesh entry point: vertex
    /// positions are arbitrary as long as every element remains
    /// non-degenerate.
    pub fn from_vertices(
        vertices: Vec<(f64, f64)>,
        nx: usize,
        ny: usize,
    ) -> Result<Self, MeshError> {
        if nx == 0 || ny == 0 {
            return Err(MeshError::InvalidDimensions { nx, ny });
        }
        let expected = (nx + 1) * (ny + 1);
        if vertices.len() != expected {
            return Err(MeshError::VertexCount {
                expected,
                found: vertices.len(),
            });
        }

        let elements = Self::grid_elements(nx, ny);
        let mesh = Self::build(vertices, elements, nx, ny, false);
        mesh.validate()?;
        Ok(mesh)
    }

    fn grid_vertices(
        x0: f64,
        x1: f64,
        y0: f64,
        y1: f64,
        nx: usize,
        ny: usize,
    ) -> Result<Vec<(f64, f64)>, MeshError> {
        if nx == 0 || ny == 0 {
            return Err(MeshError::InvalidDimensions { nx, ny });
        }
        if x1 <= x0 || y1 <= y0 {
            return Err(MeshError::InvalidBounds { x0, x1, y0, y1 });
        }

        let dx = (x1 - x0) / nx as f64;
        let dy = (y1 - y0) / ny as f64;

        let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
        for j in 0..=ny {
            for i in 0..=nx {
                vertices.push((x0 + i as f64 * dx, y0 + j as f64 * dy));
            }
        }
        Ok(vertices)
    }

    fn grid_elements(nx: usize, ny: usize) -> Vec<[usize; 4]> {
        let mut elements = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let v0 = j * (nx + 1) + i;
                let v1 = v0 + 1;
                let v2 = v1 + (nx + 1);
                let v3 = v0 + (nx + 1);
                elements.push([v0, v1, v2, v3]);
            }
        }
        elements
    }

    /// Build edge connectivity for a structured grid.
    fn build(
        vertices: Vec<(f64, f64)>,
        elements: Vec<[usize; 4]>,
        nx: usize,
        ny: usize,
        periodic: bool,
    ) -> Self {
        let n_elements = elements.len();
        let n_vertices = vertices.len();

        let mut edges = Vec::new();
        let mut element_edges = vec![[0usize; 4]; n_elements];

        let elem_idx = |i: usize, j: usize| -> usize { j * nx + i };

        // Horizontal edges (bottom/top faces). For periodic meshes the
        // j = 0 row also serves as the top face of the j = ny-1 row.
        let j_range = if periodic { ny } else { ny + 1 };
        for j in 0..j_range {
            for i in 0..nx {
                let edge_idx = edges.len();
                let v0 = j * (nx + 1) + i;
                let v1 = v0 + 1;

                let below = if j > 0 {
                    Some(elem_idx(i, j - 1))
                } else if periodic {
                    Some(elem_idx(i, ny - 1))
                } else {
                    None
                };
                let above = if j < ny { Some(elem_idx(i, j)) } else { None };

                if let Some(k) = below {
                    element_edges[k][2] = edge_idx;
                }
                if let Some(k) = above {
                    element_edges[k][0] = edge_idx;
                }

                let (left, right) = match (below, above) {
                    (Some(b), Some(a)) => {
                        (ElementFace::new(b, 2), Some(ElementFace::new(a, 0)))
                    }
                    (Some(b), None) => (ElementFace::new(b, 2), None),
                    (None, Some(a)) => (ElementFace::new(a, 0), None),
                    (None, None) => unreachable!(),
                };

                edges.push(Edge {
                    vertices: (v0.min(v1), v0.max(v1)),
                    left,
                    right,
                });
            }
        }

        // Vertical edges (left/right faces)
        let i_range = if periodic { nx } else { nx + 1 };
        for j in 0..ny {
            for i in 0..i_range {
                let edge_idx = edges.len();
                let v0 = j * (nx + 1) + i;
                let v1 = v0 + (nx + 1);

                let west = if i > 0 {
                    Some(elem_idx(i - 1, j))
                } else if periodic {
                    Some(elem_idx(nx - 1, j))
                } else {
                    None
                };
                let east = if i < nx { Some(elem_idx(i, j)) } else { None };

                if let Some(k) = west {
                    element_edges[k][1] = edge_idx;
                }
                if let Some(k) = east {
                    element_edges[k][3] = edge_idx;
                }

                let (left, right) = match (west, east) {
                    (Some(w), Some(e)) => {
                        (ElementFace::new(w, 1), Some(ElementFace::new(e, 3)))
                    }
                    (Some(w), None) => (ElementFace::new(w, 1), None),
                    (None, Some(e)) => (ElementFace::new(e, 3), None),
                    (None, None) => unreachable!(),
                };

                edges.push(Edge {
                    vertices: (v0.min(v1), v0.max(v1)),
                    left,
                    right,
                });
            }
        }

        let n_edges = edges.len();
        let n_boundary_edges = edges.iter().filter(|e| e.is_boundary()).count();

        Self {
            vertices,
            elements,
            edges,
            element_edges,
            nx,
            ny,
            n_elements,
            n_edges,
            n_vertices,
            n_boundary_edges,
        }
    }

    /// Check that every element's bilinear map is orientation-preserving.
    ///
    /// The determinant is sampled on a 5 × 5 reference grid including the
    /// corners; for a bilinear map the determinant is linear in each
    /// coordinate, so corner positivity is the sharp condition and the
    /// interior samples guard round-off.
    fn validate(&self) -> Result<(), MeshError> {
        const SAMPLES: [f64; 5] = [-1.0, -0.5, 0.0, 0.5, 1.0];

        for k in 0..self.n_elements {
            for &s in &SAMPLES {
                for &r in &SAMPLES {
                    let det = self.jacobian_determinant(k, r, s);
                    if det <= 0.0 {
                        return Err(MeshError::DegenerateElement {
                            element: k,
                            det_j: det,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Corner coordinates of element k, counter-clockwise.
    pub fn element_vertices(&self, k: usize) -> [(f64, f64); 4] {
        self.elements[k].map(|v| self.vertices[v])
    }

    /// Bilinear isoparametric map from reference coordinates
    /// (r, s) ∈ [-1, 1]² of element k to physical (x, y).
    pub fn reference_to_physical(&self, k: usize, r: f64, s: f64) -> (f64, f64) {
        let verts = self.element_vertices(k);
        let weights = [
            0.25 * (1.0 - r) * (1.0 - s),
            0.25 * (1.0 + r) * (1.0 - s),
            0.25 * (1.0 + r) * (1.0 + s),
            0.25 * (1.0 - r) * (1.0 + s),
        ];

        let mut x = 0.0;
        let mut y = 0.0;
        for (w, (vx, vy)) in weights.iter().zip(verts) {
            x += w * vx;
            y += w * vy;
        }
        (x, y)
    }

    /// Jacobian entries (x_r, x_s, y_r, y_s) of the bilinear map at (r, s).
    #[inline]
    pub fn jacobian(&self, k: usize, r: f64, s: f64) -> (f64, f64, f64, f64) {
        let verts = self.element_vertices(k);
        let (x0, y0) = verts[0];
        let (x1, y1) = verts[1];
        let (x2, y2) = verts[2];
        let (x3, y3) = verts[3];

        let x_r = ((1.0 - s) * (x1 - x0) + (1.0 + s) * (x2 - x3)) / 4.0;
        let x_s = ((1.0 - r) * (x3 - x0) + (1.0 + r) * (x2 - x1)) / 4.0;
        let y_r = ((1.0 - s) * (y1 - y0) + (1.0 + s) * (y2 - y3)) / 4.0;
        let y_s = ((1.0 - r) * (y3 - y0) + (1.0 + r) * (y2 - y1)) / 4.0;

        (x_r, x_s, y_r, y_s)
    }

    /// Jacobian determinant of the bilinear map at (r, s).
    #[inline]
    pub fn jacobian_determinant(&self, k: usize, r: f64, s: f64) -> f64 {
        let (x_r, x_s, y_r, y_s) = self.jacobian(k, r, s);
        x_r * y_s - x_s * y_r
    }

    /// Index into `edges` for the given element face.
    pub fn edge_for_face(&self, element: usize, face: usize) -> usize {
        self.element_edges[element][face]
    }

    /// The element face on the far side of the given face, if any.
    pub fn neighbor(&self, element: usize, face: usize) -> Option<ElementFace> {
        let edge = &self.edges[self.element_edges[element][face]];
        if edge.left.element == element && edge.left.face == face {
            edge.right
        } else {
            Some(edge.left)
        }
    }

    /// Whether the given element face lies on the domain boundary.
    pub fn is_boundary_face(&self, element: usize, face: usize) -> bool {
        self.edges[self.element_edges[element][face]].is_boundary()
    }

    /// Shortest edge in the mesh, the length scale of CFL estimates.
    pub fn h_min(&self) -> f64 {
        self.edges
            .iter()
            .map(|e| {
                let (xa, ya) = self.vertices[e.vertices.0];
                let (xb, yb) = self.vertices[e.vertices.1];
                (xb - xa).hypot(yb - ya)
            })
            .fold(f64::INFINITY, f64::min)
    }
}
