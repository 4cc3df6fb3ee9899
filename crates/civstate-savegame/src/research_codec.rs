//! Research records: `[research]` with one `r%d` record per player or team.
//!
//! Players already own a record by the time this runs; `add_player` creates
//! it from the pooled-research setting. Loading only fills existing records,
//! so teammates can never end up with duplicated progress.

use crate::codec::{bools_to_string, string_to_bools};
use crate::context::{LoadContext, SaveContext};
use crate::error::LoadError;
use crate::secfile::SectionFileError;
use civstate_core::technology::ResearchKey;
use civstate_core::types::{PlayerId, TeamId, TechId};
use std::collections::BTreeSet;

fn key_of(kind: &str, number: i64) -> Option<ResearchKey> {
    match kind {
        "player" => PlayerId::try_from(number).ok().map(ResearchKey::Player),
        "team" => TeamId::try_from(number).ok().map(ResearchKey::Team),
        _ => None,
    }
}

pub(crate) fn load_research(ctx: &mut LoadContext) -> Result<(), LoadError> {
    let ruleset = ctx.ruleset;
    let count = ctx.file.lookup_int_default(0, "research.count");
    let mut seen = BTreeSet::new();

    for i in 0..count.max(0) {
        let base = format!("research.r{}", i);
        let file = &ctx.file;
        let kind = file.lookup_str_default("", &format!("{}.kind", base));
        let number = file.lookup_int_default(-1, &format!("{}.number", base));
        let Some(key) = key_of(kind, number) else {
            ctx.diag
                .warn(format!("Research record {} has invalid key {} {}", i, kind, number));
            continue;
        };
        if !seen.insert(key) {
            ctx.diag
                .warn(format!("Research record for {} appears twice, skipped", key));
            continue;
        }
        let Some(research) = ctx.state.researches.get_mut(&key) else {
            ctx.diag.warn(format!(
                "Research record for {} belongs to no player, skipped",
                key
            ));
            continue;
        };

        let mut tech_named = |field: &str| -> Option<TechId> {
            let name = file.lookup_str_default("", &format!("{}.{}", base, field));
            if name.is_empty() || name == "None" {
                return None;
            }
            let tech = ruleset.tech_by_name(name);
            if tech.is_none() {
                ctx.diag
                    .warn(format!("Research of {} names unknown technology '{}'", key, name));
            }
            tech
        };
        research.researching = tech_named("researching_name");
        research.goal = tech_named("goal_name");
        research.bulbs_researched = file.lookup_int_default(0, &format!("{}.bulbs", base)) as i32;
        research.techs_researched =
            file.lookup_int_default(0, &format!("{}.techs", base)).max(0) as u32;

        let done = file.lookup_str_default("", &format!("{}.done", base));
        match string_to_bools(done) {
            Some(bits) => {
                for (index, _) in bits.iter().enumerate().filter(|(_, known)| **known) {
                    match ctx.names.tech(index as i64) {
                        Some(tech) => research.set_known(tech),
                        None => ctx.diag.warn(format!(
                            "Research of {} lost unknown technology {}",
                            key, index
                        )),
                    }
                }
            }
            None => ctx
                .diag
                .warn(format!("Research of {} has an invalid technology list", key)),
        }
        research.recompute_prereqs(ruleset);
    }

    for research in ctx.state.researches.values() {
        for tech in 0..research.inventions.len() {
            if research.is_known(tech) {
                ctx.state.info.global_advances.set(tech);
            }
        }
    }
    tracing::debug!(records = ctx.state.researches.len(), "research loaded");
    Ok(())
}

pub(crate) fn save_research(ctx: &mut SaveContext) -> Result<(), SectionFileError> {
    let ruleset = ctx.ruleset;
    let researches = &ctx.state.researches;
    let file = &mut ctx.file;
    let tech_name = |tech: Option<TechId>| {
        tech.and_then(|t| ruleset.techs.get(t))
            .map(|t| t.name.as_str())
            .unwrap_or("")
    };

    file.insert_int("research.count", researches.len() as i64)?;
    for (i, research) in researches.values().enumerate() {
        let base = format!("research.r{}", i);
        let (kind, number) = match research.key {
            ResearchKey::Player(slot) => ("player", i64::from(slot)),
            ResearchKey::Team(team) => ("team", i64::from(team)),
        };
        file.insert_str(&format!("{}.kind", base), kind)?;
        file.insert_int(&format!("{}.number", base), number)?;
        file.insert_str(
            &format!("{}.researching_name", base),
            tech_name(research.researching),
        )?;
        file.insert_str(&format!("{}.goal_name", base), tech_name(research.goal))?;
        file.insert_int(
            &format!("{}.bulbs", base),
            i64::from(research.bulbs_researched),
        )?;
        file.insert_int(
            &format!("{}.techs", base),
            i64::from(research.techs_researched),
        )?;
        file.insert_str(
            &format!("{}.done", base),
            &bools_to_string((0..ruleset.techs.len()).map(|t| research.is_known(t))),
        )?;
    }
    Ok(())
}
