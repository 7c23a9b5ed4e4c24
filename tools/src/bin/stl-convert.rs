use anyhow::Context as _;
use anyhow::Result;
use stl_mesh::Stl;
use stl_mesh_tools::OutputFormat;

const USAGE: &str = "Usage: stl-convert [options] [in-stl [out-stl]] <in.stl >out.stl";

fn main() -> Result<()> {
    let mut options = getopts::Options::new();
    options.optopt(
        "f",
        "format",
        "output variant, 'ascii' or 'binary' (default: binary)",
        "VARIANT",
    );
    options.optopt("n", "name", "name of the solid, for ascii output", "NAME");

    let (matches, _trace_guard) = stl_mesh_tools::parse_args(options, USAGE, 2)?;

    let format: OutputFormat = matches
        .opt_get("f")
        .context("invalid value for option 'format'")?
        .unwrap_or(OutputFormat::Binary);

    let new_name = matches.opt_str("n");
    if let Some(name) = &new_name {
        anyhow::ensure!(
            stl_mesh::ascii::is_valid_name(name),
            "invalid solid name {:?}, expected letters, digits, '_' or '.'",
            name,
        );
    }

    let stl = stl_mesh_tools::read_stl(matches.free.first())?;
    tracing::info!(
        from = ?stl.format(),
        to = ?format,
        facet_count = stl.facets().len(),
        "converting"
    );

    let name = new_name.or_else(|| stl.name().map(String::from));
    let stl = Stl::from_raw_parts(stl.format(), name, stl.into_facets());

    let output = stl_mesh_tools::writer(matches.free.get(1))?;
    stl_mesh_tools::write_stl(output, &stl, format).context("failed to write STL")?;

    Ok(())
}
