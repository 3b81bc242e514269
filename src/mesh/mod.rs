//! Mesh representation for quadrilateral elements.

pub mod mesh2d;

pub use mesh2d::{Edge, ElementFace, Mesh2D, MeshError};
