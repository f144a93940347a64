use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use hd_mechanics::RollAnalyzer;

pub fn run(file: &Path) -> Result<(), String> {
    let roll = super::load_roll(file)?;
    let decomposition = RollAnalyzer::decompose(&roll).map_err(|e| e.to_string())?;

    println!("  {} {}", "Roll total:".bold(), roll.total());

    if decomposition.is_pass_through() {
        println!("  No target dice. Heroic dice would pass through.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Die", "Faces", "Chain", "Depth", "Group", "Exploded"]);

    for (idx, die) in decomposition.target_dice.iter().enumerate() {
        let chain: Vec<String> = die.chain.iter().map(u32::to_string).collect();
        table.add_row(vec![
            idx.to_string(),
            format!("d{}", die.faces),
            chain.join(" → "),
            die.chain_depth.to_string(),
            super::group_label(die.group_id, die.group_kept),
            if die.exploded { "yes" } else { "" }.to_string(),
        ]);
    }

    println!("{table}");
    println!();
    if let Some(pos) = decomposition.target_index {
        println!("  Target term:  {pos}");
    }
    println!("  Keep rule:    {}", decomposition.keep_rule);
    println!("  Multiplier:   {}", decomposition.target_multiplier);
    println!("  Non-target:   {}", decomposition.non_target_value);
    println!(
        "  Explodes:     {}",
        if decomposition.should_explode { "yes" } else { "no" }
    );

    Ok(())
}
