use crate::commands::common::{
    format_record_lines, read_mirror_records, record_to_list_item, Context, MirrorListItem,
};
use crate::error::CliError;

pub fn run_list(as_json: bool, context: &Context) -> Result<(), CliError> {
    let mirror = context.open_mirror()?;
    let records = read_mirror_records(&mirror)?;

    if as_json {
        let json_items = records
            .iter()
            .map(record_to_list_item)
            .collect::<Vec<MirrorListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if records.is_empty() {
        println!("Mirror at {} is empty.", mirror.root().display());
    } else {
        for line in format_record_lines(&records) {
            println!("{line}");
        }
    }

    Ok(())
}
