//! Map system - the tile grid, start positions and continent numbering.

use crate::bitset::{BitVector, PlayerSet};
use crate::coord::{Direction8, MapCoord};
use crate::ruleset::Ruleset;
use crate::types::{
    CityId, ExtraId, PlayerId, ResourceId, TerrainClass, TerrainId, TileIndex,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A single map tile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Row-major index of the tile.
    pub index: TileIndex,
    /// Terrain type. Every tile has exactly one.
    pub terrain: TerrainId,
    /// Optional resource.
    pub resource: Option<ResourceId>,
    /// One bit per ruleset extra.
    pub extras: BitVector,
    /// Owning player, if inside someone's borders.
    pub owner: Option<PlayerId>,
    /// Tile whose border source claims this tile.
    pub claimer: Option<TileIndex>,
    /// Owner of the extras on the tile (bases).
    pub extras_owner: Option<PlayerId>,
    /// City working this tile.
    pub worked_by: Option<CityId>,
    /// Players that know this tile.
    pub known: PlayerSet,
    /// Continent number: positive for land, negative for ocean, 0 if unset.
    pub continent: i32,
}

impl Tile {
    /// Create a tile with no extras.
    pub fn new(index: TileIndex, terrain: TerrainId, num_extras: usize) -> Self {
        Self {
            index,
            terrain,
            resource: None,
            extras: BitVector::new(num_extras),
            owner: None,
            claimer: None,
            extras_owner: None,
            worked_by: None,
            known: PlayerSet::empty(),
            continent: 0,
        }
    }

    /// Check if the tile carries an extra.
    pub fn has_extra(&self, extra: ExtraId) -> bool {
        self.extras.get(extra)
    }
}

/// A start position for a nation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPosition {
    pub tile: TileIndex,
    /// Nation the position is reserved for; `None` means any nation.
    pub nation: Option<String>,
}

/// The game map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Map {
    /// Number of columns.
    pub xsize: u32,
    /// Number of rows.
    pub ysize: u32,
    /// Whether the map wraps east-west.
    pub wrap_x: bool,
    /// Tiles in row-major order.
    pub tiles: Vec<Tile>,
    pub start_positions: Vec<StartPosition>,
    /// Number of land continents found by the last numbering pass.
    pub num_continents: u32,
    /// Number of oceans found by the last numbering pass.
    pub num_oceans: u32,
}

impl Default for Map {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

impl Map {
    /// Create a map filled with one terrain.
    pub fn new(xsize: u32, ysize: u32, terrain: TerrainId, num_extras: usize) -> Self {
        let count = (xsize as usize) * (ysize as usize);
        let tiles = (0..count)
            .map(|index| Tile::new(index, terrain, num_extras))
            .collect();
        Self {
            xsize,
            ysize,
            wrap_x: false,
            tiles,
            start_positions: Vec::new(),
            num_continents: 0,
            num_oceans: 0,
        }
    }

    /// Total number of tiles.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn tile(&self, index: TileIndex) -> Option<&Tile> {
        self.tiles.get(index)
    }

    pub fn tile_mut(&mut self, index: TileIndex) -> Option<&mut Tile> {
        self.tiles.get_mut(index)
    }

    /// Tile index of a coordinate, applying east-west wrap if enabled.
    pub fn index_of(&self, coord: MapCoord) -> Option<TileIndex> {
        let (xsize, ysize) = (self.xsize as i32, self.ysize as i32);
        if xsize == 0 || coord.y < 0 || coord.y >= ysize {
            return None;
        }
        let x = if self.wrap_x {
            coord.x.rem_euclid(xsize)
        } else if coord.x < 0 || coord.x >= xsize {
            return None;
        } else {
            coord.x
        };
        Some((coord.y * xsize + x) as TileIndex)
    }

    /// Coordinate of a tile index.
    pub fn coord_of(&self, index: TileIndex) -> MapCoord {
        let xsize = self.xsize.max(1) as usize;
        MapCoord::new((index % xsize) as i32, (index / xsize) as i32)
    }

    /// Neighbouring tile in a direction.
    pub fn step(&self, index: TileIndex, dir: Direction8) -> Option<TileIndex> {
        self.index_of(self.coord_of(index).step(dir))
    }

    /// All neighbours of a tile.
    pub fn adjacent(&self, index: TileIndex) -> impl Iterator<Item = TileIndex> + '_ {
        Direction8::ALL
            .into_iter()
            .filter_map(move |dir| self.step(index, dir))
    }

    /// Squared real distance between two tiles, honouring wrap.
    pub fn sq_distance(&self, a: TileIndex, b: TileIndex) -> u32 {
        let (ca, cb) = (self.coord_of(a), self.coord_of(b));
        let mut dx = (ca.x - cb.x).abs();
        if self.wrap_x {
            dx = dx.min(self.xsize as i32 - dx);
        }
        let dy = (ca.y - cb.y).abs();
        (dx * dx + dy * dy) as u32
    }

    /// Chebyshev ("move") distance between two tiles, honouring wrap.
    pub fn distance(&self, a: TileIndex, b: TileIndex) -> u32 {
        let (ca, cb) = (self.coord_of(a), self.coord_of(b));
        let mut dx = (ca.x - cb.x).abs();
        if self.wrap_x {
            dx = dx.min(self.xsize as i32 - dx);
        }
        dx.max((ca.y - cb.y).abs()) as u32
    }

    /// Tiles within a squared radius of a center tile, center first.
    pub fn tiles_within_radius_sq(&self, center: TileIndex, radius_sq: u32) -> Vec<TileIndex> {
        let mut result = vec![center];
        let c = self.coord_of(center);
        let r = (radius_sq as f64).sqrt() as i32;
        for dy in -r..=r {
            for dx in -r..=r {
                if (dx == 0 && dy == 0) || (dx * dx + dy * dy) as u32 > radius_sq {
                    continue;
                }
                if let Some(index) = self.index_of(MapCoord::new(c.x + dx, c.y + dy)) {
                    if !result.contains(&index) {
                        result.push(index);
                    }
                }
            }
        }
        result
    }

    /// Number continents and oceans with an 8-connected flood fill.
    ///
    /// Land bodies get 1, 2, 3... and water bodies get -1, -2, -3... in the
    /// order their first tile appears in row-major order.
    pub fn assign_continents(&mut self, ruleset: &Ruleset) {
        for tile in &mut self.tiles {
            tile.continent = 0;
        }
        let mut continents = 0i32;
        let mut oceans = 0i32;

        for start in 0..self.tiles.len() {
            if self.tiles[start].continent != 0 {
                continue;
            }
            let class = ruleset.terrain_class(self.tiles[start].terrain);
            let number = match class {
                TerrainClass::Land => {
                    continents += 1;
                    continents
                }
                TerrainClass::Oceanic => {
                    oceans += 1;
                    -oceans
                }
            };

            let mut queue = VecDeque::from([start]);
            self.tiles[start].continent = number;
            while let Some(index) = queue.pop_front() {
                let neighbours: Vec<_> = self.adjacent(index).collect();
                for next in neighbours {
                    let tile = &mut self.tiles[next];
                    if tile.continent == 0 && ruleset.terrain_class(tile.terrain) == class {
                        tile.continent = number;
                        queue.push_back(next);
                    }
                }
            }
        }

        self.num_continents = continents as u32;
        self.num_oceans = oceans.unsigned_abs();
    }

    /// Closest tile to `from` satisfying a predicate, ties broken by the lower
    /// tile index. Searches the whole map.
    pub fn find_nearest(
        &self,
        from: TileIndex,
        mut accept: impl FnMut(&Tile) -> bool,
    ) -> Option<TileIndex> {
        self.tiles
            .iter()
            .filter(|tile| accept(tile))
            .map(|tile| (self.sq_distance(from, tile.index), tile.index))
            .min()
            .map(|(_, index)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn island_map(ruleset: &Ruleset) -> Map {
        let ocean = ruleset.terrain_by_name("Ocean").unwrap();
        let grass = ruleset.terrain_by_name("Grassland").unwrap();
        let mut map = Map::new(5, 5, ocean, ruleset.extras.len());
        for index in [6, 7, 12, 18, 24] {
            map.tiles[index].terrain = grass;
        }
        map
    }

    #[test]
    fn test_index_and_coord_roundtrip() {
        let map = Map::new(4, 3, 0, 0);
        for index in 0..map.tile_count() {
            assert_eq!(map.index_of(map.coord_of(index)), Some(index));
        }
        assert_eq!(map.index_of(MapCoord::new(4, 0)), None);
        assert_eq!(map.index_of(MapCoord::new(0, -1)), None);
    }

    #[test]
    fn test_wrap_x() {
        let mut map = Map::new(4, 3, 0, 0);
        map.wrap_x = true;
        assert_eq!(map.index_of(MapCoord::new(-1, 0)), Some(3));
        assert_eq!(map.step(3, Direction8::East), Some(0));
        assert_eq!(map.distance(0, 3), 1);
    }

    #[test]
    fn test_radius_includes_center_first() {
        let map = Map::new(5, 5, 0, 0);
        let tiles = map.tiles_within_radius_sq(12, 2);
        assert_eq!(tiles[0], 12);
        assert_eq!(tiles.len(), 9);
        assert_eq!(map.tiles_within_radius_sq(12, 5).len(), 21);
    }

    #[test]
    fn test_continent_numbering() {
        let ruleset = Ruleset::classic();
        let mut map = island_map(&ruleset);
        map.assign_continents(&ruleset);

        // 6, 7, 12 and 18 are diagonally connected, 24 too.
        assert_eq!(map.num_continents, 1);
        assert_eq!(map.num_oceans, 1);
        assert_eq!(map.tiles[6].continent, 1);
        assert_eq!(map.tiles[24].continent, 1);
        assert_eq!(map.tiles[0].continent, -1);
    }

    #[test]
    fn test_separate_islands() {
        let ruleset = Ruleset::classic();
        let ocean = ruleset.terrain_by_name("Ocean").unwrap();
        let grass = ruleset.terrain_by_name("Grassland").unwrap();
        let mut map = Map::new(5, 1, ocean, 0);
        map.tiles[0].terrain = grass;
        map.tiles[4].terrain = grass;
        map.assign_continents(&ruleset);
        assert_eq!(map.tiles[0].continent, 1);
        assert_eq!(map.tiles[4].continent, 2);
        assert_eq!(map.num_continents, 2);
    }

    #[test]
    fn test_find_nearest() {
        let ruleset = Ruleset::classic();
        let map = island_map(&ruleset);
        let grass = ruleset.terrain_by_name("Grassland").unwrap();
        assert_eq!(map.find_nearest(0, |t| t.terrain == grass), Some(6));
        assert_eq!(map.find_nearest(0, |_| false), None);
    }
}
