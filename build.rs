use std::error::Error;
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn Error>> {
    // VERGEN_GIT_DESCRIBE feeds the version string in cli.rs; tags are not required, so the
    // match pattern is set to something that never hits and we always get the short sha
    EmitBuilder::builder()
        .fail_on_error()
        .git_sha(true)
        .git_describe(true, false, Some("graphite-no-tag-match"))
        .emit()?;

    // source and manifest edits should mark the build dirty
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-changed=src");

    Ok(())
}
