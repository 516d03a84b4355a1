use anyhow::Result;
use sis_etl::{ETLOptions, RosterETL};

fn main() -> Result<()> {
    let opts = ETLOptions::from_env().with_progress(true).with_progress_label("Processing SIS extracts");

    let summary = RosterETL::from_options(opts).run()?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
