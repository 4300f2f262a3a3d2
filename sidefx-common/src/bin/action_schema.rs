// ABOUTME: emits a json schema for the five action documents to stdout.
// ABOUTME: intended for editors and external validators of test scripts.

fn main() -> Result<(), serde_json::Error> {
    let schema = schemars::schema_for!(sidefx_common::Action);
    let json = serde_json::to_string_pretty(&schema)?;
    println!("{json}");
    Ok(())
}
