use crate::ascii;
use crate::binary::HEADER_SIZE;
use crate::Stl;
use crate::Vertex;
use std::fmt;
use std::io;

/// Serialize an STL file into the ASCII variant.
///
/// Coordinates are written in scientific notation. Non-finite coordinates
/// cannot be read back.
///
/// The name is only written when it reads back as is (see
/// [`ascii::is_valid_name`]), otherwise the solid is written nameless.
#[derive(Debug)]
pub struct DisplayAscii<'a> {
    stl: &'a Stl,
}

impl Stl {
    pub fn display_ascii(&self) -> DisplayAscii<'_> {
        DisplayAscii { stl: self }
    }
}

struct AsciiVertex(Vertex);

impl fmt::Display for AsciiVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:e} {:e} {:e}", self.0.x, self.0.y, self.0.z)
    }
}

impl fmt::Display for DisplayAscii<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .stl
            .name()
            .filter(|name| ascii::is_valid_name(name))
            .unwrap_or("");
        writeln!(f, "solid {}", name)?;
        for facet in self.stl.facets() {
            writeln!(f, "  facet normal {}", AsciiVertex(facet.normal))?;
            writeln!(f, "    outer loop")?;
            for vertex in facet.vertices {
                writeln!(f, "      vertex {}", AsciiVertex(vertex))?;
            }
            writeln!(f, "    endloop")?;
            writeln!(f, "  endfacet")?;
        }
        write!(f, "endsolid {}", name)
    }
}

impl Stl {
    /// The name is not written: binary files have none.
    ///
    /// Wrapping `w` in a [`std::io::BufWriter`] is recommended.
    pub fn serialize_binary<W: io::Write>(&self, mut w: W) -> io::Result<()> {
        let count = u32::try_from(self.facets().len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "too many facets for a binary STL file",
            )
        })?;

        // All zeros, so that it is never mistaken for "solid".
        w.write_all(&[0; HEADER_SIZE])?;
        w.write_all(&u32::to_le_bytes(count))?;

        for facet in self.facets() {
            let vertices = std::iter::once(facet.normal).chain(facet.vertices);
            for vertex in vertices {
                w.write_all(&f32::to_le_bytes(vertex.x))?;
                w.write_all(&f32::to_le_bytes(vertex.y))?;
                w.write_all(&f32::to_le_bytes(vertex.z))?;
            }
            w.write_all(&u16::to_le_bytes(0))?; // attribute byte count
        }

        Ok(())
    }
}
