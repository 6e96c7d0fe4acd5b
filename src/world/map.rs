//! Row-major tile map

use super::Sprite;

/// Shared definition of a tile type, referenced by index from each tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileData {
    pub name: String,
    pub texture_index: u32,
    pub frame_index: u16,
}

impl TileData {
    pub fn new(name: impl Into<String>, texture_index: u32, frame_index: u16) -> Self {
        Self {
            name: name.into(),
            texture_index,
            frame_index,
        }
    }

    pub fn sprite(&self) -> Sprite {
        Sprite::new(self.texture_index).with_frame(self.frame_index)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tile {
    pub column: u32,
    pub row: u32,
    pub tile_data_index: usize,
    pub sprite: Sprite,
}

/// Grid of tiles stored row by row: the tile at `(column, row)` lives at
/// `column + row * columns`.
#[derive(Debug, Clone)]
pub struct Map {
    rows: u32,
    columns: u32,
    tile_size: u32,
    tiles: Vec<Tile>,
}

impl Map {
    pub fn new(rows: u32, columns: u32, tile_size: u32) -> Self {
        let mut tiles = Vec::with_capacity(rows as usize * columns as usize);
        for row in 0..rows {
            for column in 0..columns {
                tiles.push(Tile {
                    column,
                    row,
                    ..Default::default()
                });
            }
        }

        Self {
            rows,
            columns,
            tile_size,
            tiles,
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Source tile edge length in texture pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }

    /// Whether signed coordinates fall inside the map.
    pub fn is_in_map(&self, column: i64, row: i64) -> bool {
        column >= 0 && row >= 0 && column < self.columns as i64 && row < self.rows as i64
    }

    fn index_of(&self, column: u32, row: u32) -> Option<usize> {
        (column < self.columns && row < self.rows)
            .then(|| column as usize + row as usize * self.columns as usize)
    }

    pub fn tile_at(&self, column: u32, row: u32) -> Option<&Tile> {
        self.index_of(column, row).map(|i| &self.tiles[i])
    }

    pub fn tile_at_mut(&mut self, column: u32, row: u32) -> Option<&mut Tile> {
        self.index_of(column, row).map(move |i| &mut self.tiles[i])
    }

    /// Assign a tile type. Returns false when the coordinates are outside the map.
    pub fn paint(&mut self, column: u32, row: u32, data_index: usize, data: &TileData) -> bool {
        match self.tile_at_mut(column, row) {
            Some(tile) => {
                tile.tile_data_index = data_index;
                tile.sprite = data.sprite();
                true
            }
            None => false,
        }
    }

    /// Fill every tile with one tile type.
    pub fn fill(&mut self, data_index: usize, data: &TileData) {
        let sprite = data.sprite();
        for tile in &mut self.tiles {
            tile.tile_data_index = data_index;
            tile.sprite = sprite;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_layout() {
        let map = Map::new(4, 6, 16);
        assert_eq!(map.tiles().len(), 24);
        // Column 5, row 2 of a 6-column map is index 17.
        let tile = &map.tiles()[17];
        assert_eq!((tile.column, tile.row), (5, 2));
        assert_eq!(map.tile_at(5, 2), Some(tile));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut map = Map::new(2, 3, 16);
        assert!(map.tile_at(3, 0).is_none());
        assert!(map.tile_at(0, 2).is_none());
        assert!(map.tile_at_mut(3, 1).is_none());
        assert!(!map.is_in_map(-1, 0));
        assert!(!map.is_in_map(0, 2));
        assert!(map.is_in_map(2, 1));
    }

    #[test]
    fn test_paint_and_fill() {
        let mut map = Map::new(2, 2, 16);
        let grass = TileData::new("grass", 1, 0);
        let water = TileData::new("water", 2, 3);

        map.fill(0, &grass);
        assert!(map.tiles().iter().all(|t| t.sprite.texture_index == 1));

        assert!(map.paint(1, 1, 1, &water));
        assert!(!map.paint(2, 1, 1, &water));
        let tile = map.tile_at(1, 1).unwrap();
        assert_eq!(tile.tile_data_index, 1);
        assert_eq!(tile.sprite, Sprite::new(2).with_frame(3));
    }
}
