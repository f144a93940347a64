pub mod analyze;
pub mod roll;

use std::path::Path;

use hd_mechanics::Roll;

/// Read an evaluated roll from a JSON file and check it is well formed.
fn load_roll(path: &Path) -> Result<Roll, String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let roll: Roll = serde_json::from_str(&source)
        .map_err(|e| format!("{} is not a valid roll: {e}", path.display()))?;
    roll.validate().map_err(|e| e.to_string())?;
    Ok(roll)
}

fn group_label(group_id: Option<usize>, kept: bool) -> String {
    match group_id {
        Some(id) if kept => format!("#{id}"),
        Some(id) => format!("#{id} (dropped)"),
        None => "—".to_string(),
    }
}
