use std::cmp::Ordering;
use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use hd_mechanics::{
    AllocationMode, EngineConfig, HeroDiceEngine, HeroRequest, HeroRollOutcome, InMemoryActor,
    RngRoller,
};

/// Flags of the `roll` subcommand.
pub struct RollOptions {
    pub heroic: u32,
    pub bonus: u32,
    pub mode: String,
    pub faces: u32,
    pub seed: u64,
    pub balance: Option<u32>,
    pub healing: bool,
    pub house_rule: bool,
    pub json: bool,
}

pub async fn run(file: &Path, opts: &RollOptions) -> Result<(), String> {
    let roll = super::load_roll(file)?;

    let mode = AllocationMode::from_str_tag(&opts.mode).ok_or_else(|| {
        format!(
            "unknown mode '{}' (expected increase or decrease)",
            opts.mode
        )
    })?;

    let config = EngineConfig::default()
        .with_hero_die_faces(opts.faces)
        .with_healing_house_rule(opts.house_rule);
    let mut actor = InMemoryActor::new("hero").with_resource(
        config.resource_key.clone(),
        opts.balance.unwrap_or(opts.heroic),
    );

    let mut request = HeroRequest::new(opts.heroic, mode).with_bonus(opts.bonus);
    if opts.healing {
        request = request.healing();
    }

    let mut engine = HeroDiceEngine::new(config, RngRoller::seeded(opts.seed));
    let outcome = engine
        .process(&roll, &request, &mut actor)
        .await
        .map_err(|e| e.to_string())?;
    tracing::debug!(total = outcome.total, "roll command finished");

    if opts.json {
        let json = serde_json::to_string_pretty(&outcome)
            .map_err(|e| format!("serialization failed: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &HeroRollOutcome) {
    if outcome.is_pass_through() {
        println!("  No target dice. Heroic dice pass through.");
        println!("  {} {}", "Total:".bold(), outcome.total);
        return;
    }

    let heroic: Vec<String> = outcome
        .distribution
        .heroic_results
        .iter()
        .map(|h| h.result.to_string())
        .collect();
    println!(
        "  {} [{}] {}",
        "Heroic dice".bold(),
        heroic.join(", "),
        format!("({})", outcome.distribution.mode).dimmed()
    );

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Die", "Result", "Heroic", "Group", "Kept"]);

    for (pos, die) in outcome.explosive_dice.iter().enumerate() {
        let applied: Vec<String> = die
            .heroic_allocated
            .iter()
            .map(|h| h.result.to_string())
            .collect();
        let kept = if die.removed {
            "removed"
        } else if outcome.kept_dice.contains(&pos) {
            "yes"
        } else {
            ""
        };
        table.add_row(vec![
            die.die_index.to_string(),
            die.to_string(),
            applied.join(" + "),
            super::group_label(die.group_id, die.group_kept),
            kept.to_string(),
        ]);
    }

    println!("{table}");
    println!();
    println!("  Keep rule:    {}", outcome.keep_rule);
    println!(
        "  Kept dice:    {} × {} = {}",
        outcome.dice_total, outcome.target_multiplier, outcome.target_group_total
    );
    println!("  Non-target:   {}", outcome.non_target_value);

    let unused = outcome.distribution.unused_hero_indexes();
    if !unused.is_empty() {
        println!(
            "  {}",
            format!("{} heroic dice had no effect", unused.len()).dimmed()
        );
    }

    let delta = outcome.total - outcome.original_total;
    let delta = match delta.cmp(&0) {
        Ordering::Greater => format!("+{delta}").green(),
        Ordering::Less => delta.to_string().red(),
        Ordering::Equal => "±0".normal(),
    };
    println!(
        "  {} {} → {} ({delta})",
        "Total:".bold(),
        outcome.original_total,
        outcome.total
    );
}
