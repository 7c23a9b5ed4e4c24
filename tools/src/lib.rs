use anyhow::Context as _;
use anyhow::Result;
use itertools::Itertools as _;
use std::env;
use std::fs;
use std::io;
use std::str::FromStr;
use stl_mesh::Facet;
use stl_mesh::Stl;
use stl_mesh::Vertex;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::Registry;
use tracing_tree::HierarchicalLayer;

pub const VERSION: &str = env!("STL_MESH_VERSION");

/// Adds the options common to all tools, parses the command line, and sets up
/// logging.
///
/// Exits the process when `-h` or `-V` is given.
pub fn parse_args(
    mut options: getopts::Options,
    usage: &str,
    max_free_args: usize,
) -> Result<(getopts::Matches, Option<tracing_chrome::FlushGuard>)> {
    options.optflag("h", "help", "print this help menu");
    options.optopt("t", "trace", "emit a chrome trace", "FILE");
    options.optflag("V", "version", "print version information");

    let matches = options.parse(env::args().skip(1))?;

    if matches.opt_present("h") {
        eprintln!("{}", options.usage(usage));
        std::process::exit(0);
    }
    if matches.opt_present("V") {
        eprintln!("stl-mesh-tools {VERSION}");
        std::process::exit(0);
    }
    if matches.free.len() > max_free_args {
        anyhow::bail!("too many arguments\n\n{}", options.usage(usage));
    }

    let guard = init_tracing(matches.opt_str("t"));

    Ok((matches, guard))
}

/// Log filtering is configured through the `LOG` environment variable, e.g.
/// `LOG=stl_mesh=debug`.
fn init_tracing(chrome_trace: Option<String>) -> Option<tracing_chrome::FlushGuard> {
    let registry = Registry::default().with(EnvFilter::from_env("LOG")).with(
        HierarchicalLayer::new(4)
            .with_targets(true)
            .with_bracketed_fields(true),
    );
    match chrome_trace {
        Some(filename) => {
            let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .file(filename)
                .build();
            registry.with(chrome_layer).init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

/// Reads an STL file from the given path, or from stdin when there is none or
/// when it is `-`.
pub fn read_stl(path: Option<&String>) -> Result<Stl> {
    match path.map(String::as_str) {
        None | Some("-") => {
            let stdin = io::stdin();
            let stdin = stdin.lock();
            Stl::from_reader(stdin).context("failed to read STL from stdin")
        }
        Some(path) => {
            Stl::from_file(path).with_context(|| format!("failed to read STL file {:?}", path))
        }
    }
}

/// Opens the given path for writing, or stdout when there is none or when it
/// is `-`.
pub fn writer(path: Option<&String>) -> Result<Box<dyn io::Write>> {
    Ok(match path.map(String::as_str) {
        None | Some("-") => Box::new(io::BufWriter::new(io::stdout())),
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("failed to create output file {:?}", path))?;
            Box::new(io::BufWriter::new(file))
        }
    })
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Ascii,
    Binary,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "ascii" | "txt" => OutputFormat::Ascii,
            "binary" | "bin" | "stl" => OutputFormat::Binary,
            _ => anyhow::bail!("unknown STL variant {:?}, expected 'ascii' or 'binary'", s),
        })
    }
}

/// Errors out instead of writing an ASCII file that cannot be read back.
pub fn write_stl<W: io::Write>(mut w: W, stl: &Stl, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Ascii => {
            if let Some(index) = stl.facets().iter().position(|facet| !is_finite(facet)) {
                anyhow::bail!(
                    "facet #{index} has non-finite coordinates, which ascii STL cannot hold"
                );
            }
            writeln!(w, "{}", stl.display_ascii())?;
        }
        OutputFormat::Binary => stl.serialize_binary(&mut w)?,
    }
    w.flush()?;
    Ok(())
}

fn is_finite(facet: &Facet) -> bool {
    std::iter::once(facet.normal)
        .chain(facet.vertices)
        .flat_map(Vertex::to_array)
        .all(f32::is_finite)
}

/// Per-axis `(min, max)` of all vertices, or `None` for an empty mesh.
pub fn bounding_box(stl: &Stl) -> Option<[(f32, f32); 3]> {
    let vertices = || stl.facets().iter().flat_map(|facet| facet.vertices);
    let x = vertices().map(|v| v.x).minmax_by(f32::total_cmp);
    let y = vertices().map(|v| v.y).minmax_by(f32::total_cmp);
    let z = vertices().map(|v| v.z).minmax_by(f32::total_cmp);
    Some([x.into_option()?, y.into_option()?, z.into_option()?])
}
