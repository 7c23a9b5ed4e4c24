use std::env;
use std::process::Command;

fn git(args: &[&str]) -> Option<Vec<u8>> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(output.stdout)
}

fn main() {
    let crate_version = env::var("CARGO_PKG_VERSION").unwrap();

    let git_commit = git(&["rev-parse", "HEAD"]).map(|hash| {
        let mut hash = String::from_utf8_lossy(&hash).into_owned();
        hash.truncate(7);
        hash
    });
    let git_clean_tree = git(&["status", "-s"]).map_or(true, |status| status.is_empty());

    let version = match git_commit {
        Some(git_commit) if git_clean_tree => format!("{crate_version}-{git_commit}"),
        Some(git_commit) => format!("{crate_version}-{git_commit}+dirty"),
        None => crate_version,
    };

    println!("cargo:rustc-env=STL_MESH_VERSION={version}");
}
