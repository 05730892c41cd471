use nalgebra_glm::{vec3, Vec3};
use nom::bytes::complete::{take_till, take_till1, take_until};
use nom::character::complete::{char, multispace1};
use nom::combinator::rest;
use nom::multi::many0;
use nom::sequence::{delimited, preceded, separated_pair};
use nom::IResult;

use crate::bsp::ascii_lossy;

/// One brace block of the entity lump: key/value pairs in the order they first appeared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entity {
    pairs: Vec<(String, String)>,
}

impl Entity {
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// A repeated key replaces the earlier value without moving it.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn class_name(&self) -> Option<&str> {
        self.get("classname")
    }

    /// The `origin` key as three world-space floats.
    pub fn origin(&self) -> Option<Vec3> {
        let mut coords = self.get("origin")?.split_whitespace().map(str::parse::<f32>);
        let x = coords.next()?.ok()?;
        let y = coords.next()?.ok()?;
        let z = coords.next()?.ok()?;
        Some(vec3(x, y, z))
    }
}

/// Contents of the next `{ ... }` block, skipping anything before it.
fn block(input: &str) -> IResult<&str, &str> {
    preceded(
        take_until("{"),
        delimited(char('{'), take_till(|c: char| c == '}'), char('}')),
    )(input)
}

fn key_value(line: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(take_till1(|c: char| c.is_whitespace()), multispace1, rest)(line)
}

fn entity(body: &str) -> Entity {
    let mut entity = Entity::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok((_, (key, value))) = key_value(line) {
            entity.insert(key.trim_matches('"'), value.trim_matches('"'));
        }
    }
    entity
}

/// Splits entity text into blocks and each block into key/value lines.
///
/// Blocks do not nest, and an unterminated trailing block is ignored. Lines with a single token
/// are ignored, and blocks left without any pairs are dropped.
pub fn parse_entities(text: &str) -> Vec<Entity> {
    let blocks = match many0(block)(text) {
        Ok((_, blocks)) => blocks,
        Err(_) => Vec::new(),
    };
    blocks
        .into_iter()
        .map(entity)
        .filter(|entity| !entity.is_empty())
        .collect()
}

/// Decodes raw entity lump bytes. Trailing NULs are dropped and non-ASCII bytes replaced.
pub fn decode_entities(lump: &[u8]) -> Vec<Entity> {
    let end = lump.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    parse_entities(&ascii_lossy(&lump[..end]))
}

#[cfg(test)]
mod tests {
    use nalgebra_glm::vec3;

    use super::{block, decode_entities, key_value, parse_entities, Entity};

    #[test]
    fn block_skips_leading_text() {
        assert_eq!(block("junk { a b } rest"), Ok((" rest", " a b ")));
        assert!(block("{ never closed").is_err());
    }

    #[test]
    fn key_value_splits_at_first_whitespace() {
        assert_eq!(
            key_value("\"origin\"   \"1 2 3\""),
            Ok(("", ("\"origin\"", "\"1 2 3\""))),
        );
        assert!(key_value("lonely").is_err());
    }

    #[test]
    fn parses_blocks() {
        let text = "{\n\"classname\" \"worldspawn\"\n\"message\" \"The Outer Base\"\n}\n\
                    {\n\"classname\" \"info_player_start\"\n\"origin\" \"-64 128 24\"\n}\n";
        let entities = parse_entities(text);
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].class_name(), Some("worldspawn"));
        assert_eq!(entities[0].get("message"), Some("The Outer Base"));
        assert_eq!(entities[1].origin(), Some(vec3(-64.0, 128.0, 24.0)));
    }

    #[test]
    fn single_entity() {
        let entities = parse_entities("{\n\"classname\" \"worldspawn\"\n}");
        let mut expected = Entity::new();
        expected.insert("classname", "worldspawn");
        assert_eq!(entities, vec![expected]);
    }

    #[test]
    fn drops_empty_and_unterminated_blocks() {
        assert!(parse_entities("{ }").is_empty());
        assert!(parse_entities("{\nsolo\n}").is_empty());
        let entities = parse_entities("{\n\"a\" \"1\"\n}\n{\n\"b\" \"2\"\n");
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].get("a"), Some("1"));
        assert!(parse_entities("").is_empty());
    }

    #[test]
    fn repeated_key_overwrites_in_place() {
        let entities = parse_entities("{\n\"a\" \"1\"\n\"b\" \"2\"\n\"a\" \"3\"\n}");
        let pairs: Vec<_> = entities[0].iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn decodes_lump_bytes() {
        let entities = decode_entities(b"{\n\"classname\" \"light\"\n\"light\" \"300\"\n}\n\0\0");
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].get("light"), Some("300"));
        assert!(decode_entities(&[0; 4]).is_empty());
    }

    #[test]
    fn origin_needs_three_numbers() {
        let mut entity = Entity::new();
        entity.insert("origin", "1 2");
        assert_eq!(entity.origin(), None);
        entity.insert("origin", "1 two 3");
        assert_eq!(entity.origin(), None);
    }
}
