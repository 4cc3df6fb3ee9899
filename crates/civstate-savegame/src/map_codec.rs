//! Map tile codec.
//!
//! Per-tile attributes are stored as one entry per map row. Character rows
//! hold one character per tile, token rows hold comma separated numbers
//! with `-` for "none", and bit rows pack four bits per hex character with
//! one row per group of four bits.
//!
//! Rows are tolerant: a missing or short row is reported and the affected
//! tiles keep their defaults. Terrain rows are the exception and fail the
//! load.

use crate::codec::{flags_to_hex, hex_to_flags, tile_at};
use crate::context::{LoadContext, SaveContext};
use crate::error::{Diagnostics, LoadError};
use crate::secfile::{SectionFile, SectionFileError};
use civstate_core::bitset::BitVector;
use civstate_core::map::{Map, StartPosition};
use civstate_core::types::{PlayerId, TileIndex, MAX_PLAYER_SLOTS};

/// Character used for a tile without a resource.
pub const RESOURCE_NONE: char = '.';

/// Token used for "none" in token rows.
const TOKEN_NONE: &str = "-";

/// Player slots covered by one known-bits line.
const KNOWN_LINE_SLOTS: usize = 32;

/// Whether a missing row is worth a warning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MissingRow {
    Warn,
    Ignore,
}

// ============================================================================
// Row helpers
// ============================================================================

/// Key of a bit row: `{prefix}{group:02}_{y:04}`.
pub(crate) fn bit_row_key(prefix: &str, group: usize, y: u32) -> String {
    format!("{}{:02}_{:04}", prefix, group, y)
}

/// Decode one character per tile from rows named by `key`.
pub(crate) fn load_char_rows(
    file: &SectionFile,
    diag: &mut Diagnostics,
    xsize: u32,
    ysize: u32,
    missing: MissingRow,
    key: impl Fn(u32) -> String,
    mut decode: impl FnMut(TileIndex, char, &mut Diagnostics),
) {
    for y in 0..ysize {
        let path = key(y);
        let row = match file.lookup_str(&path) {
            Ok(row) => row,
            Err(SectionFileError::Missing(_)) => {
                if missing == MissingRow::Warn {
                    diag.warn(format!("Map row '{}' is missing", path));
                }
                continue;
            }
            Err(err) => {
                diag.warn(format!("Map row '{}' is unreadable: {}", path, err));
                continue;
            }
        };
        let len = row.chars().count();
        if len < xsize as usize {
            diag.warn(format!(
                "Map row '{}' has {} of {} tiles",
                path, len, xsize
            ));
        }
        for (x, ch) in row.chars().take(xsize as usize).enumerate() {
            let index = (y as usize) * (xsize as usize) + x;
            decode(index, ch, diag);
        }
    }
}

/// Encode one character per tile into rows named by `key`.
pub(crate) fn save_char_rows(
    file: &mut SectionFile,
    xsize: u32,
    ysize: u32,
    key: impl Fn(u32) -> String,
    encode: impl Fn(TileIndex) -> char,
) -> Result<(), SectionFileError> {
    for y in 0..ysize {
        let row: String = (0..xsize as usize)
            .map(|x| encode((y as usize) * (xsize as usize) + x))
            .collect();
        file.insert_str(&key(y), &row)?;
    }
    Ok(())
}

/// Decode comma separated tokens per tile. `-` decodes to `None`.
pub(crate) fn load_token_rows(
    file: &SectionFile,
    diag: &mut Diagnostics,
    xsize: u32,
    ysize: u32,
    key: impl Fn(u32) -> String,
    mut decode: impl FnMut(TileIndex, Option<i64>, &mut Diagnostics),
) {
    for y in 0..ysize {
        let path = key(y);
        let Ok(row) = file.lookup_str(&path) else {
            diag.warn(format!("Map row '{}' is missing", path));
            continue;
        };
        let tokens: Vec<&str> = row.split(',').map(str::trim).collect();
        if tokens.len() < xsize as usize {
            diag.warn(format!(
                "Map row '{}' has {} of {} tiles",
                path,
                tokens.len(),
                xsize
            ));
        }
        for (x, token) in tokens.into_iter().take(xsize as usize).enumerate() {
            let index = (y as usize) * (xsize as usize) + x;
            if token == TOKEN_NONE {
                decode(index, None, diag);
            } else {
                match token.parse::<i64>() {
                    Ok(n) => decode(index, Some(n), diag),
                    Err(_) => diag.warn(format!(
                        "Invalid token '{}' in map row '{}'",
                        token, path
                    )),
                }
            }
        }
    }
}

/// Encode comma separated tokens per tile.
pub(crate) fn save_token_rows(
    file: &mut SectionFile,
    xsize: u32,
    ysize: u32,
    key: impl Fn(u32) -> String,
    encode: impl Fn(TileIndex) -> Option<i64>,
) -> Result<(), SectionFileError> {
    for y in 0..ysize {
        let row: Vec<String> = (0..xsize as usize)
            .map(|x| match encode((y as usize) * (xsize as usize) + x) {
                Some(n) => n.to_string(),
                None => TOKEN_NONE.to_string(),
            })
            .collect();
        file.insert_str(&key(y), &row.join(","))?;
    }
    Ok(())
}

/// Decode `nbits` bits per tile from bit rows `{prefix}{group}_{y}`.
///
/// Bits of a missing or invalid character stay clear.
pub(crate) fn load_bit_rows(
    file: &SectionFile,
    diag: &mut Diagnostics,
    prefix: &str,
    xsize: u32,
    ysize: u32,
    nbits: usize,
) -> Vec<BitVector> {
    let count = (xsize as usize) * (ysize as usize);
    let mut bits = vec![BitVector::new(nbits); count];
    for group in 0..nbits.div_ceil(4) {
        load_char_rows(
            file,
            diag,
            xsize,
            ysize,
            MissingRow::Warn,
            |y| bit_row_key(prefix, group, y),
            |index, ch, diag| match hex_to_flags(ch) {
                Some(flags) => {
                    for (i, set) in flags.into_iter().enumerate() {
                        let bit = group * 4 + i;
                        if set && bit < nbits {
                            bits[index].set(bit);
                        }
                    }
                }
                None => diag.warn(format!(
                    "Invalid character '{}' in row group {} of '{}'",
                    ch, group, prefix
                )),
            },
        );
    }
    bits
}

/// Encode `nbits` bits per tile into bit rows. Slots past `nbits` in the
/// last group are written as zero.
pub(crate) fn save_bit_rows(
    file: &mut SectionFile,
    prefix: &str,
    xsize: u32,
    ysize: u32,
    nbits: usize,
    get: impl Fn(TileIndex, usize) -> bool,
) -> Result<(), SectionFileError> {
    for group in 0..nbits.div_ceil(4) {
        save_char_rows(
            file,
            xsize,
            ysize,
            |y| bit_row_key(prefix, group, y),
            |index| {
                let flags = [0usize, 1, 2, 3].map(|i| {
                    let bit = group * 4 + i;
                    bit < nbits && get(index, bit)
                });
                flags_to_hex(flags)
            },
        )?;
    }
    Ok(())
}

// ============================================================================
// Loading
// ============================================================================

fn terrain_key(y: u32) -> String {
    format!("map.t{:04}", y)
}

fn resource_key(y: u32) -> String {
    format!("map.res{:04}", y)
}

fn known_key(line: usize, group: usize, y: u32) -> String {
    format!("map.k{:02}_{:04}", line * 8 + group, y)
}

/// Slots of one known-bits group: `line * 32 + group * 4 ..` four slots.
fn known_group_slots(line: usize, group: usize) -> impl Iterator<Item = usize> {
    let first = line * KNOWN_LINE_SLOTS + group * 4;
    first..first + 4
}

/// Load the `[map]` section into `ctx.state.map`. Players must be loaded.
pub(crate) fn load_map(ctx: &mut LoadContext) -> Result<(), LoadError> {
    let xsize = ctx.file.lookup_int("map.xsize")?;
    let ysize = ctx.file.lookup_int("map.ysize")?;
    let (Ok(xsize), Ok(ysize)) = (u32::try_from(xsize), u32::try_from(ysize)) else {
        return Err(LoadError::Corrupt(format!(
            "invalid map size {}x{}",
            xsize, ysize
        )));
    };
    if xsize == 0 || ysize == 0 {
        return Err(LoadError::Corrupt(format!(
            "invalid map size {}x{}",
            xsize, ysize
        )));
    }

    let ruleset = ctx.ruleset;
    let mut map = Map::new(xsize, ysize, 0, ruleset.extras.len());
    map.wrap_x = ctx.file.lookup_bool_default(false, "map.wrapx");

    load_terrain_rows(&ctx.file, &ctx.names.terrain, &mut map)?;

    load_char_rows(
        &ctx.file,
        &mut ctx.diag,
        xsize,
        ysize,
        MissingRow::Warn,
        resource_key,
        |index, ch, diag| {
            if ch == RESOURCE_NONE {
                return;
            }
            match ruleset.resource_by_identifier(ch) {
                Some(resource) => map.tiles[index].resource = Some(resource),
                None => diag.warn(format!("Unknown resource identifier '{}'", ch)),
            }
        },
    );

    let extras = load_bit_rows(
        &ctx.file,
        &mut ctx.diag,
        "map.e",
        xsize,
        ysize,
        ctx.names.extras.len(),
    );
    for (tile, bits) in map.tiles.iter_mut().zip(extras) {
        for bit in bits.iter_ones() {
            if let Some(extra) = ctx.names.extras.get(bit).copied().flatten() {
                tile.extras.set(extra);
            }
        }
    }

    load_ownership(ctx, &mut map);
    load_known(ctx, &mut map);
    load_start_positions(ctx, &mut map)?;

    map.assign_continents(ruleset);
    tracing::debug!(
        continents = map.num_continents,
        oceans = map.num_oceans,
        "map loaded"
    );
    ctx.state.map = map;
    Ok(())
}

/// Terrain rows are strict: every row must exist, be complete and use known
/// identifiers.
fn load_terrain_rows(
    file: &SectionFile,
    table: &std::collections::HashMap<char, usize>,
    map: &mut Map,
) -> Result<(), LoadError> {
    for y in 0..map.ysize {
        let path = terrain_key(y);
        let row = file.lookup_str(&path)?;
        let chars: Vec<char> = row.chars().collect();
        if chars.len() < map.xsize as usize {
            return Err(LoadError::Corrupt(format!(
                "terrain row '{}' has {} of {} tiles",
                path,
                chars.len(),
                map.xsize
            )));
        }
        for (x, ch) in chars.into_iter().take(map.xsize as usize).enumerate() {
            let terrain = table.get(&ch).copied().ok_or(LoadError::UnknownTerrain {
                identifier: ch,
                x: x as u32,
                y,
            })?;
            let index = (y as usize) * (map.xsize as usize) + x;
            map.tiles[index].terrain = terrain;
        }
    }
    Ok(())
}

fn load_ownership(ctx: &mut LoadContext, map: &mut Map) {
    let (xsize, ysize) = (map.xsize, map.ysize);
    let tile_count = map.tile_count();
    let players = ctx.state.used_slots();
    let valid_owner = |n: i64| {
        PlayerId::try_from(n)
            .ok()
            .filter(|slot| players.contains(*slot))
    };

    load_token_rows(
        &ctx.file,
        &mut ctx.diag,
        xsize,
        ysize,
        |y| format!("map.owner{:04}", y),
        |index, token, diag| {
            let Some(n) = token else { return };
            match valid_owner(n) {
                Some(slot) => map.tiles[index].owner = Some(slot),
                None => diag.warn(format!("Tile {} owned by unknown player {}", index, n)),
            }
        },
    );
    load_token_rows(
        &ctx.file,
        &mut ctx.diag,
        xsize,
        ysize,
        |y| format!("map.source{:04}", y),
        |index, token, diag| {
            let Some(n) = token else { return };
            match usize::try_from(n).ok().filter(|t| *t < tile_count) {
                Some(source) => map.tiles[index].claimer = Some(source),
                None => diag.warn(format!("Tile {} claimed by invalid tile {}", index, n)),
            }
        },
    );
    load_token_rows(
        &ctx.file,
        &mut ctx.diag,
        xsize,
        ysize,
        |y| format!("map.eowner{:04}", y),
        |index, token, diag| {
            let Some(n) = token else { return };
            match valid_owner(n) {
                Some(slot) => map.tiles[index].extras_owner = Some(slot),
                None => diag.warn(format!(
                    "Extras on tile {} owned by unknown player {}",
                    index, n
                )),
            }
        },
    );

    // Worked tiles go to a scratch array; cities claim them when they load.
    let mut worked = vec![None; tile_count];
    load_token_rows(
        &ctx.file,
        &mut ctx.diag,
        xsize,
        ysize,
        |y| format!("map.worked{:04}", y),
        |index, token, diag| {
            let Some(n) = token else { return };
            match u32::try_from(n).ok().filter(|id| *id != 0) {
                Some(id) => worked[index] = Some(id),
                None => diag.warn(format!("Tile {} worked by invalid city {}", index, n)),
            }
        },
    );
    ctx.worked_tiles = worked;
}

fn load_known(ctx: &mut LoadContext, map: &mut Map) {
    let used = ctx.state.used_slots();
    let (xsize, ysize) = (map.xsize, map.ysize);
    for line in 0..MAX_PLAYER_SLOTS / KNOWN_LINE_SLOTS {
        for group in 0..KNOWN_LINE_SLOTS / 4 {
            let slots: Vec<usize> = known_group_slots(line, group).collect();
            if !slots.iter().any(|s| used.contains(*s as PlayerId)) {
                continue;
            }
            load_char_rows(
                &ctx.file,
                &mut ctx.diag,
                xsize,
                ysize,
                MissingRow::Ignore,
                |y| known_key(line, group, y),
                |index, ch, diag| match hex_to_flags(ch) {
                    Some(flags) => {
                        for (slot, set) in slots.iter().zip(flags) {
                            if set {
                                map.tiles[index].known.insert(*slot as PlayerId);
                            }
                        }
                    }
                    None => diag.warn(format!("Invalid known character '{}'", ch)),
                },
            );
        }
    }
}

fn load_start_positions(ctx: &mut LoadContext, map: &mut Map) -> Result<(), LoadError> {
    let count = ctx.file.lookup_int_default(0, "map.startpos_count");
    for i in 0..count.max(0) {
        let x = ctx.file.lookup_int(&format!("map.startpos{}.x", i));
        let y = ctx.file.lookup_int(&format!("map.startpos{}.y", i));
        let tile = match (x, y) {
            (Ok(x), Ok(y)) => tile_at(map, x, y),
            _ => None,
        };
        let Some(tile) = tile else {
            ctx.diag.warn(format!("Start position {} has invalid coordinates", i));
            continue;
        };
        let nation = ctx
            .file
            .lookup_str_default("", &format!("map.startpos{}.nation", i))
            .to_string();
        let nation = if nation.is_empty() {
            None
        } else if ctx.ruleset.has_nation(&nation) {
            Some(nation)
        } else {
            ctx.diag.warn(format!(
                "Start position {} names unknown nation '{}'",
                i, nation
            ));
            None
        };
        map.start_positions.push(StartPosition { tile, nation });
    }
    Ok(())
}

// ============================================================================
// Saving
// ============================================================================

/// Write the `[map]` section.
pub(crate) fn save_map(ctx: &mut SaveContext) -> Result<(), SectionFileError> {
    let map = &ctx.state.map;
    let ruleset = ctx.ruleset;
    let file = &mut ctx.file;
    let (xsize, ysize) = (map.xsize, map.ysize);

    file.insert_int("map.xsize", xsize as i64)?;
    file.insert_int("map.ysize", ysize as i64)?;
    file.insert_bool("map.wrapx", map.wrap_x)?;

    save_char_rows(file, xsize, ysize, terrain_key, |index| {
        ruleset
            .terrains
            .get(map.tiles[index].terrain)
            .map(|t| t.identifier)
            .unwrap_or('?')
    })?;
    save_char_rows(file, xsize, ysize, resource_key, |index| {
        map.tiles[index]
            .resource
            .and_then(|r| ruleset.resources.get(r))
            .map(|r| r.identifier)
            .unwrap_or(RESOURCE_NONE)
    })?;
    save_bit_rows(file, "map.e", xsize, ysize, ruleset.extras.len(), |index, bit| {
        map.tiles[index].extras.get(bit)
    })?;

    save_token_rows(
        file,
        xsize,
        ysize,
        |y| format!("map.owner{:04}", y),
        |index| map.tiles[index].owner.map(i64::from),
    )?;
    save_token_rows(
        file,
        xsize,
        ysize,
        |y| format!("map.source{:04}", y),
        |index| map.tiles[index].claimer.map(|t| t as i64),
    )?;
    save_token_rows(
        file,
        xsize,
        ysize,
        |y| format!("map.eowner{:04}", y),
        |index| map.tiles[index].extras_owner.map(i64::from),
    )?;
    save_token_rows(
        file,
        xsize,
        ysize,
        |y| format!("map.worked{:04}", y),
        |index| map.tiles[index].worked_by.map(i64::from),
    )?;

    let used = ctx.state.used_slots();
    for line in 0..MAX_PLAYER_SLOTS / KNOWN_LINE_SLOTS {
        for group in 0..KNOWN_LINE_SLOTS / 4 {
            let slots: Vec<usize> = known_group_slots(line, group).collect();
            if !slots.iter().any(|s| used.contains(*s as PlayerId)) {
                continue;
            }
            save_char_rows(
                file,
                xsize,
                ysize,
                |y| known_key(line, group, y),
                |index| {
                    let known = map.tiles[index].known;
                    let flags = [0usize, 1, 2, 3].map(|i| known.contains(slots[i] as PlayerId));
                    flags_to_hex(flags)
                },
            )?;
        }
    }

    file.insert_int("map.startpos_count", map.start_positions.len() as i64)?;
    for (i, pos) in map.start_positions.iter().enumerate() {
        let coord = map.coord_of(pos.tile);
        file.insert_int(&format!("map.startpos{}.x", i), coord.x as i64)?;
        file.insert_int(&format!("map.startpos{}.y", i), coord.y as i64)?;
        file.insert_str(
            &format!("map.startpos{}.nation", i),
            pos.nation.as_deref().unwrap_or(""),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_rows_pack_four_per_char() {
        let mut file = SectionFile::new();
        save_bit_rows(&mut file, "map.e", 2, 1, 6, |index, bit| {
            (index == 0 && bit == 0) || (index == 1 && (bit == 3 || bit == 5))
        })
        .unwrap();
        assert_eq!(file.lookup_str("map.e00_0000").unwrap(), "18");
        assert_eq!(file.lookup_str("map.e01_0000").unwrap(), "02");

        let mut diag = Diagnostics::new();
        let bits = load_bit_rows(&file, &mut diag, "map.e", 2, 1, 6);
        assert!(diag.is_empty());
        assert_eq!(bits[0].iter_ones().collect::<Vec<_>>(), vec![0]);
        assert_eq!(bits[1].iter_ones().collect::<Vec<_>>(), vec![3, 5]);
    }

    #[test]
    fn test_bit_rows_tolerate_missing_and_short_rows() {
        let mut file = SectionFile::new();
        file.insert_str("map.e00_0000", "f").unwrap();
        let mut diag = Diagnostics::new();
        let bits = load_bit_rows(&file, &mut diag, "map.e", 3, 2, 4);

        assert_eq!(bits[0].count_ones(), 4);
        assert!(bits[1].none());
        assert!(bits[3].none());
        assert!(diag.mentions("has 1 of 3 tiles"));
        assert!(diag.mentions("'map.e00_0001' is missing"));
    }

    #[test]
    fn test_token_rows() {
        let mut file = SectionFile::new();
        save_token_rows(
            &mut file,
            3,
            1,
            |y| format!("map.owner{:04}", y),
            |index| if index == 1 { Some(12) } else { None },
        )
        .unwrap();
        assert_eq!(file.lookup_str("map.owner0000").unwrap(), "-,12,-");

        file.insert_str("map.owner0000", "-,x,4").unwrap();
        let mut diag = Diagnostics::new();
        let mut seen = Vec::new();
        load_token_rows(
            &file,
            &mut diag,
            3,
            1,
            |y| format!("map.owner{:04}", y),
            |index, token, _| seen.push((index, token)),
        );
        assert_eq!(seen, vec![(0, None), (2, Some(4))]);
        assert!(diag.mentions("Invalid token 'x'"));
    }

    #[test]
    fn test_ignored_rows_are_silent() {
        let file = SectionFile::new();
        let mut diag = Diagnostics::new();
        load_char_rows(
            &file,
            &mut diag,
            2,
            2,
            MissingRow::Ignore,
            |y| format!("map.k00_{:04}", y),
            |_, _, _| {},
        );
        assert!(diag.is_empty());
    }

    #[test]
    fn test_known_bits_written_only_for_used_groups() {
        use crate::config::{LoadOptions, SaveOptions};
        use crate::context::NameTables;
        use civstate_core::game_state::GameState;
        use civstate_core::player::Player;
        use civstate_core::ruleset::Ruleset;

        let ruleset = Ruleset::classic();
        let grass = ruleset.terrain_by_name("Grassland").unwrap();
        let mut state = GameState::new(&ruleset);
        state.map = Map::new(2, 2, grass, ruleset.extras.len());
        for slot in [5, 40] {
            state.add_player(Player::new(slot, "P", 2), ruleset.techs.len());
        }
        state.map.tiles[0].known.insert(5);
        state.map.tiles[3].known.insert(5);
        state.map.tiles[3].known.insert(40);

        let save_options = SaveOptions::default();
        let mut save = SaveContext::new(&ruleset, &state, &save_options);
        save_map(&mut save).unwrap();
        let keys: Vec<&str> = save
            .file
            .section("map")
            .unwrap()
            .entries()
            .map(|(key, _)| key)
            .filter(|key| key.starts_with('k'))
            .collect();
        assert_eq!(keys, vec!["k01_0000", "k01_0001", "k10_0000", "k10_0001"]);
        assert_eq!(save.file.lookup_str("map.k01_0000").unwrap(), "20");
        assert_eq!(save.file.lookup_str("map.k10_0001").unwrap(), "01");

        let options = LoadOptions::default();
        let mut ctx = LoadContext::new(save.file.clone(), &ruleset, &options);
        ctx.names = NameTables::load(&ctx.file, &ruleset, &mut ctx.diag).unwrap();
        for slot in [5, 40] {
            ctx.state
                .add_player(Player::new(slot, "P", 2), ruleset.techs.len());
        }
        load_map(&mut ctx).unwrap();
        for (loaded, saved) in ctx.state.map.tiles.iter().zip(&state.map.tiles) {
            assert_eq!(loaded.known, saved.known);
        }
        assert!(ctx.diag.is_empty());
    }

    #[test]
    fn test_known_group_slots() {
        assert_eq!(known_group_slots(0, 0).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(known_group_slots(1, 2).collect::<Vec<_>>(), vec![40, 41, 42, 43]);
        assert_eq!(known_key(1, 2, 7), "map.k10_0007");
    }
}
