//! Extraction of list items from free-form model output.

/// Characters accepted as a bullet or list marker.
const BULLET_MARKERS: &[char] = &[
    '*', '-', '+', '•', 'o', 'O', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b',
    'c', 'd',
];

/// Return the text of every line that starts with a bullet marker followed by
/// a space, in order. Other lines are dropped.
///
/// Only the first character is inspected, so `"1. Foo"` is not an item
/// (second character is `.`) while `"1 Foo"` is.
pub fn parse_bullet_points(text: &str) -> Vec<String> {
    text.lines().filter_map(bullet_item).map(str::to_string).collect()
}

fn bullet_item(line: &str) -> Option<&str> {
    let mut chars = line.char_indices();
    let (_, marker) = chars.next()?;
    let (space_at, space) = chars.next()?;

    if BULLET_MARKERS.contains(&marker) && space == ' ' {
        Some(&line[space_at + 1..])
    } else {
        None
    }
}
