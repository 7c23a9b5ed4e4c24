//! Decoder for STL mesh files.
//!
//! Both variants of the format are supported: the textual one (ASCII STL)
//! and the fixed-layout binary one. [`parse`] sniffs the input and picks the
//! right decoder:
//!
//! ```
//! let input = b"solid cube
//!   facet normal 0 0 1
//!     outer loop
//!       vertex 0 0 0
//!       vertex 1 0 0
//!       vertex 0 1 0
//!     endloop
//!   endfacet
//! endsolid cube";
//!
//! let facets = stl_mesh::parse(input).unwrap();
//! assert_eq!(facets.len(), 1);
//! assert_eq!(facets[0].normal, stl_mesh::Vertex::new(0.0, 0.0, 1.0));
//! ```

use std::fs;
use std::io;
use std::path::Path;

pub use error::Error;
pub use error::Expected;
pub use error::FloatError;
pub use error::Result;

pub mod ascii;
pub mod binary;
mod error;
pub mod serializer;

/// A point (or a direction) in 3D space.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vertex {
    pub const fn new(x: f32, y: f32, z: f32) -> Vertex {
        Vertex { x, y, z }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f32; 3]> for Vertex {
    fn from([x, y, z]: [f32; 3]) -> Vertex {
        Vertex { x, y, z }
    }
}

impl From<Vertex> for [f32; 3] {
    fn from(v: Vertex) -> [f32; 3] {
        v.to_array()
    }
}

/// A triangle of the mesh, as stored in the file.
///
/// Facets handed out by this crate are always complete: their three vertices
/// and their normal have been decoded.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Facet {
    pub normal: Vertex,
    /// Corners of the triangle, in file order.
    pub vertices: [Vertex; 3],
    complete: bool,
}

impl Facet {
    pub fn new(normal: Vertex, vertices: [Vertex; 3]) -> Facet {
        Facet {
            normal,
            vertices,
            complete: true,
        }
    }

    /// A facet of which only the normal is known yet.
    pub(crate) fn pending(normal: Vertex) -> Facet {
        Facet {
            normal,
            ..Facet::default()
        }
    }

    pub(crate) fn finish(mut self, vertices: [Vertex; 3]) -> Facet {
        self.vertices = vertices;
        self.complete = true;
        self
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Which variant of the format an input was decoded as.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Format {
    Ascii,
    Binary,
}

/// A decoded STL file.
#[derive(Clone, Debug, PartialEq)]
pub struct Stl {
    format: Format,
    name: Option<String>,
    facets: Vec<Facet>,
}

impl Stl {
    pub fn from_raw_parts(format: Format, name: Option<String>, facets: Vec<Facet>) -> Self {
        assert!(facets.iter().all(Facet::is_complete));
        Self {
            format,
            name,
            facets,
        }
    }

    /// Decodes an in-memory STL file.
    ///
    /// Inputs starting with `solid` are tried as ASCII first. Some binary
    /// files have a header that happens to start with `solid` too, so when
    /// the ASCII grammar does not match, the whole buffer is decoded again as
    /// binary. If that fails as well, the ASCII error is returned.
    pub fn from_bytes(input: &[u8]) -> Result<Stl> {
        if input.len() < ascii::SENTINEL.len() {
            return Err(Error::InputTooSmall { len: input.len() });
        }

        if !ascii::test_format(input) {
            tracing::debug!("no ascii sentinel, decoding as binary");
            return Ok(Stl::binary(binary::parse(input)?));
        }

        let ascii_err = match ascii::parse_solid(input) {
            Ok((name, facets)) => {
                return Ok(Stl {
                    format: Format::Ascii,
                    name,
                    facets,
                })
            }
            Err(err) => err,
        };

        tracing::debug!(%ascii_err, "not ascii after all, falling back to binary");
        match binary::parse(input) {
            Ok(facets) => Ok(Stl::binary(facets)),
            Err(binary_err) => {
                tracing::debug!(%binary_err, "binary fallback failed");
                Err(ascii_err)
            }
        }
    }

    /// Wrapping `r` in a [`std::io::BufReader`] is not needed: the whole
    /// input is read at once.
    pub fn from_reader<R>(mut r: R) -> Result<Stl>
    where
        R: io::Read,
    {
        let mut input = Vec::new();
        r.read_to_end(&mut input)?;
        Stl::from_bytes(&input)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Stl> {
        let input = fs::read(path)?;
        Stl::from_bytes(&input)
    }

    fn binary(facets: Vec<Facet>) -> Stl {
        Stl {
            format: Format::Binary,
            name: None,
            facets,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// The name given after `solid` in ASCII files.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    pub fn into_facets(self) -> Vec<Facet> {
        self.facets
    }
}

/// Returns the facets of the given in-memory STL file, in file order.
///
/// See [`Stl::from_bytes`] for how the variant is chosen.
pub fn parse(input: &[u8]) -> Result<Vec<Facet>> {
    Stl::from_bytes(input).map(Stl::into_facets)
}

/// Returns the facets of the STL file at `path`, in file order.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Facet>> {
    Stl::from_file(path).map(Stl::into_facets)
}
