//! Packed-field codecs.
//!
//! Small total mappings between game values and the characters used to
//! store them compactly. Decoders return `None` for characters outside the
//! table; callers treat that as a corrupt record.

use civstate_core::coord::{Direction8, MapCoord};
use civstate_core::map::Map;
use civstate_core::types::TileIndex;
use civstate_core::unit::{Activity, Order};

// ============================================================================
// Coordinates
// ============================================================================

/// Tile at stored coordinates. Values outside `i32` are not on any map.
pub fn tile_at(map: &Map, x: i64, y: i64) -> Option<TileIndex> {
    let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
        return None;
    };
    map.index_of(MapCoord::new(x, y))
}

// ============================================================================
// Directions
// ============================================================================

/// Directions as numeric keypad digits.
const DIRECTION_CHARS: [(Direction8, char); 8] = [
    (Direction8::NorthWest, '7'),
    (Direction8::North, '8'),
    (Direction8::NorthEast, '9'),
    (Direction8::West, '4'),
    (Direction8::East, '6'),
    (Direction8::SouthWest, '1'),
    (Direction8::South, '2'),
    (Direction8::SouthEast, '3'),
];

pub fn direction_to_char(dir: Direction8) -> char {
    DIRECTION_CHARS
        .iter()
        .find(|(d, _)| *d == dir)
        .map(|(_, c)| *c)
        .unwrap_or('?')
}

pub fn char_to_direction(ch: char) -> Option<Direction8> {
    DIRECTION_CHARS
        .iter()
        .find(|(_, c)| *c == ch)
        .map(|(d, _)| *d)
}

// ============================================================================
// Activities
// ============================================================================

/// One canonical character per activity.
const ACTIVITY_CHARS: [(Activity, char); 16] = [
    (Activity::Idle, 'w'),
    (Activity::Pollution, 'p'),
    (Activity::Mine, 'm'),
    (Activity::Irrigate, 'i'),
    (Activity::Fortified, 'f'),
    (Activity::Sentry, 's'),
    (Activity::Pillage, 'e'),
    (Activity::Explore, 'x'),
    (Activity::Transform, 'o'),
    (Activity::Fortifying, 'y'),
    (Activity::Fallout, 'u'),
    (Activity::Base, 'b'),
    (Activity::GenRoad, 'R'),
    (Activity::Convert, 'c'),
    (Activity::Cultivate, 'k'),
    (Activity::Plant, 'n'),
];

pub fn activity_to_char(activity: Activity) -> char {
    ACTIVITY_CHARS
        .iter()
        .find(|(a, _)| *a == activity)
        .map(|(_, c)| *c)
        .unwrap_or('?')
}

pub fn char_to_activity(ch: char) -> Option<Activity> {
    ACTIVITY_CHARS
        .iter()
        .find(|(_, c)| *c == ch)
        .map(|(a, _)| *a)
}

// ============================================================================
// Orders
// ============================================================================

/// Tag character of an order in `orders_list`.
pub fn order_tag(order: &Order) -> char {
    match order {
        Order::Move(_) => 'm',
        Order::Activity { .. } => 'a',
        Order::PerformAction(_) => 'p',
        Order::FullMovePoints => 'f',
        Order::ReturnHome => 'h',
    }
}

/// Tag characters that name a known order kind.
pub const ORDER_TAGS: &str = "mapfh";

// ============================================================================
// Packed flags
// ============================================================================

/// Pack four flags into one hex digit; flag `i` is bit `1 << i`.
pub fn flags_to_hex(flags: [bool; 4]) -> char {
    let value = flags
        .iter()
        .enumerate()
        .filter(|(_, set)| **set)
        .fold(0u32, |acc, (i, _)| acc | (1 << i));
    std::char::from_digit(value, 16).unwrap_or('0')
}

/// Unpack a hex digit into four flags.
pub fn hex_to_flags(ch: char) -> Option<[bool; 4]> {
    let value = ch.to_digit(16)?;
    Some([0, 1, 2, 3].map(|i| value & (1 << i) != 0))
}

// ============================================================================
// Flag strings
// ============================================================================

/// One `'0'`/`'1'` character per flag.
pub fn bools_to_string(flags: impl IntoIterator<Item = bool>) -> String {
    flags
        .into_iter()
        .map(|set| if set { '1' } else { '0' })
        .collect()
}

/// Decode a [`bools_to_string`] string. Any other character is invalid.
pub fn string_to_bools(text: &str) -> Option<Vec<bool>> {
    text.chars()
        .map(|ch| match ch {
            '0' => Some(false),
            '1' => Some(true),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Quoted blocks
// ============================================================================

/// Errors from decoding a quoted block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("malformed block: {0}")]
    Malformed(String),
    #[error("block length {len} exceeds the limit of {max} bytes")]
    TooLong { len: usize, max: usize },
}

/// Encode bytes as `<length>:<hex bytes separated by spaces>`.
pub fn quote_block(data: &[u8]) -> String {
    let hex: Vec<String> = data.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}:{}", data.len(), hex.join(" "))
}

/// Decode a [`quote_block`] string, refusing blocks longer than `max_len`.
pub fn unquote_block(text: &str, max_len: usize) -> Result<Vec<u8>, BlockError> {
    let (len, body) = text
        .split_once(':')
        .ok_or_else(|| BlockError::Malformed("missing length prefix".to_string()))?;
    let len: usize = len
        .trim()
        .parse()
        .map_err(|_| BlockError::Malformed(format!("invalid length '{}'", len)))?;
    if len > max_len {
        return Err(BlockError::TooLong { len, max: max_len });
    }

    let bytes = body
        .split_whitespace()
        .map(|tok| {
            if tok.len() != 2 {
                return Err(BlockError::Malformed(format!("invalid byte '{}'", tok)));
            }
            u8::from_str_radix(tok, 16)
                .map_err(|_| BlockError::Malformed(format!("invalid byte '{}'", tok)))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    if bytes.len() != len {
        return Err(BlockError::Malformed(format!(
            "declared {} bytes but found {}",
            len,
            bytes.len()
        )));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_at_rejects_wide_coordinates() {
        let map = Map::new(4, 4, 0, 0);
        assert_eq!(tile_at(&map, 1, 2), Some(9));
        assert_eq!(tile_at(&map, (1 << 32) + 1, 2), None);
        assert_eq!(tile_at(&map, 1, i64::MIN), None);
    }

    #[test]
    fn test_direction_chars_invert() {
        for dir in Direction8::ALL {
            assert_eq!(char_to_direction(direction_to_char(dir)), Some(dir));
        }
        assert_eq!(char_to_direction('5'), None);
        assert_eq!(char_to_direction('x'), None);
    }

    #[test]
    fn test_activity_chars_invert() {
        for activity in Activity::ALL {
            assert_eq!(char_to_activity(activity_to_char(activity)), Some(activity));
        }
        assert_eq!(char_to_activity('?'), None);
    }

    #[test]
    fn test_activity_chars_unique() {
        let mut chars: Vec<char> = ACTIVITY_CHARS.iter().map(|(_, c)| *c).collect();
        chars.sort_unstable();
        chars.dedup();
        assert_eq!(chars.len(), ACTIVITY_CHARS.len());
    }

    #[test]
    fn test_all_flag_combinations_invert() {
        for value in 0u8..16 {
            let flags = [0, 1, 2, 3].map(|i| value & (1 << i) != 0);
            let ch = flags_to_hex(flags);
            assert_eq!(hex_to_flags(ch), Some(flags));
        }
        assert_eq!(flags_to_hex([true, false, false, true]), '9');
        assert_eq!(flags_to_hex([true, true, true, true]), 'f');
        assert_eq!(hex_to_flags('g'), None);
    }

    #[test]
    fn test_flag_strings() {
        assert_eq!(bools_to_string([true, false, true]), "101");
        assert_eq!(string_to_bools("0110"), Some(vec![false, true, true, false]));
        assert_eq!(string_to_bools(""), Some(vec![]));
        assert_eq!(string_to_bools("01x"), None);
    }

    #[test]
    fn test_quote_block() {
        assert_eq!(quote_block(&[0x0a, 0xff, 0x10]), "3:0a ff 10");
        assert_eq!(quote_block(&[]), "0:");
        assert_eq!(unquote_block("3:0a ff 10", 16).unwrap(), vec![0x0a, 0xff, 0x10]);
        assert_eq!(unquote_block("0:", 0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_unquote_block_fails_loudly() {
        assert_eq!(
            unquote_block("3:0a ff 10", 2),
            Err(BlockError::TooLong { len: 3, max: 2 })
        );
        assert!(matches!(
            unquote_block("3:0a ff", 16),
            Err(BlockError::Malformed(_))
        ));
        assert!(matches!(
            unquote_block("0a ff", 16),
            Err(BlockError::Malformed(_))
        ));
        assert!(matches!(
            unquote_block("1:zz", 16),
            Err(BlockError::Malformed(_))
        ));
    }

    #[test]
    fn test_order_tags_known() {
        let orders = [
            Order::Move(Direction8::North),
            Order::Activity {
                activity: Activity::Sentry,
                target: None,
            },
            Order::FullMovePoints,
            Order::ReturnHome,
        ];
        for order in orders {
            assert!(ORDER_TAGS.contains(order_tag(&order)));
        }
    }
}
