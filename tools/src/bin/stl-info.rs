use anyhow::Result;
use std::io::Write as _;
use stl_mesh::Format;

const USAGE: &str = "Usage: stl-info [options] [in-stl] <in.stl";

fn main() -> Result<()> {
    let options = getopts::Options::new();
    let (matches, _trace_guard) = stl_mesh_tools::parse_args(options, USAGE, 1)?;

    let stl = stl_mesh_tools::read_stl(matches.free.first())?;

    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();

    let format = match stl.format() {
        Format::Ascii => "ascii",
        Format::Binary => "binary",
    };
    writeln!(stdout, "Format:      {format}")?;
    if let Some(name) = stl.name() {
        writeln!(stdout, "Name:        {name}")?;
    }
    writeln!(stdout, "Facet count: {}", stl.facets().len())?;
    if let Some(bb) = stl_mesh_tools::bounding_box(&stl) {
        for (axis, (min, max)) in ["X", "Y", "Z"].into_iter().zip(bb) {
            writeln!(stdout, "{axis} range:     {min:12.4} .. {max:12.4}")?;
        }
    }

    Ok(())
}
