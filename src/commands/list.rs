use crate::config::Config;
use crate::output::OutputFormat;

pub fn handle_list_command(config: &Config, json_output: bool) -> anyhow::Result<()> {
    let checks = config.checks.as_slice();
    if json_output {
        println!("{}", checks.to_json()?);
    } else {
        println!("{}", checks.to_table());
    }
    Ok(())
}
