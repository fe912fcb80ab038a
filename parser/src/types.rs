use std::fmt;

use nom::multi::count;
use nom::number::complete::{le_f32, le_i32};
use serde::Serialize;

use crate::error::{ErrorKind, IResult, failure};
use crate::text::parse_long_string;

/// Maps a class name to its index in the object table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassIndex {
    pub class_name: String,
    pub index: i32,
}

/// One replicated property of a cached class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassNetCacheProperty {
    pub index: i32,
    pub id: i32,
}

/// Network cache entry for a class: its object index, parent, and the
/// properties it replicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassNetCache {
    pub object_index: i32,
    pub parent_id: i32,
    pub id: i32,
    pub properties: Vec<ClassNetCacheProperty>,
}

/// Seek point into the network stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Keyframe {
    /// Seconds since the start of the recording
    pub time: f32,
    pub frame: i32,
    /// Bit offset into the network stream
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugString {
    pub frame_number: i32,
    pub username: String,
    pub text: String,
}

/// A labelled point on the replay timeline, e.g. a goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickMark {
    pub label: String,
    pub frame: i32,
}

/// Reads an `i32` element count, rejecting negative values.
pub(crate) fn parse_count(i: &[u8]) -> IResult<&[u8], usize> {
    let (i, n) = le_i32(i)?;
    let n = usize::try_from(n).map_err(|_| failure(ErrorKind::NegativeCount { count: n }))?;
    Ok((i, n))
}

pub fn parse_class_index(i: &[u8]) -> IResult<&[u8], ClassIndex> {
    let (i, class_name) = parse_long_string(i)?;
    let (i, index) = le_i32(i)?;
    Ok((i, ClassIndex { class_name, index }))
}

pub fn parse_class_net_cache_property(i: &[u8]) -> IResult<&[u8], ClassNetCacheProperty> {
    let (i, index) = le_i32(i)?;
    let (i, id) = le_i32(i)?;
    Ok((i, ClassNetCacheProperty { index, id }))
}

pub fn parse_class_net_cache(i: &[u8]) -> IResult<&[u8], ClassNetCache> {
    let (i, object_index) = le_i32(i)?;
    let (i, parent_id) = le_i32(i)?;
    let (i, id) = le_i32(i)?;
    let (i, property_count) = parse_count(i)?;
    let (i, properties) = count(parse_class_net_cache_property, property_count)(i)?;
    Ok((
        i,
        ClassNetCache {
            object_index,
            parent_id,
            id,
            properties,
        },
    ))
}

pub fn parse_keyframe(i: &[u8]) -> IResult<&[u8], Keyframe> {
    let (i, time) = le_f32(i)?;
    let (i, frame) = le_i32(i)?;
    let (i, position) = le_i32(i)?;
    Ok((
        i,
        Keyframe {
            time,
            frame,
            position,
        },
    ))
}

pub fn parse_debug_string(i: &[u8]) -> IResult<&[u8], DebugString> {
    let (i, frame_number) = le_i32(i)?;
    let (i, username) = parse_long_string(i)?;
    let (i, text) = parse_long_string(i)?;
    Ok((
        i,
        DebugString {
            frame_number,
            username,
            text,
        },
    ))
}

pub fn parse_tick_mark(i: &[u8]) -> IResult<&[u8], TickMark> {
    let (i, label) = parse_long_string(i)?;
    let (i, frame) = le_i32(i)?;
    Ok((i, TickMark { label, frame }))
}

impl fmt::Display for ClassIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.class_name, self.index)
    }
}

impl fmt::Display for ClassNetCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "object {} (id {}, parent {}):",
            self.object_index, self.id, self.parent_id
        )?;
        for prop in &self.properties {
            write!(f, " {}=>{}", prop.index, prop.id)?;
        }
        Ok(())
    }
}

impl fmt::Display for Keyframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}s frame {} @ bit {}",
            self.time, self.frame, self.position
        )
    }
}

impl fmt::Display for DebugString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.frame_number, self.username, self.text)
    }
}

impl fmt::Display for TickMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ frame {}", self.label, self.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::ReplayBytes;

    #[test]
    fn keyframe_fields_survive_the_wire() {
        let keyframe = Keyframe {
            time: 1.5,
            frame: 10,
            position: 3,
        };
        let bytes = ReplayBytes::new()
            .f32(keyframe.time)
            .i32(keyframe.frame)
            .i32(keyframe.position)
            .into_vec();
        let (rest, parsed) = parse_keyframe(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, keyframe);
    }

    #[test]
    fn class_index() {
        let bytes = ReplayBytes::new()
            .string("TAGame.Ball_TA")
            .i32(17)
            .into_vec();
        let (rest, parsed) = parse_class_index(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.class_name, "TAGame.Ball_TA");
        assert_eq!(parsed.index, 17);
    }

    #[test]
    fn class_net_cache_reads_inline_properties() {
        let bytes = ReplayBytes::new()
            .i32(5)
            .i32(2)
            .i32(9)
            .i32(2)
            .i32(30)
            .i32(1)
            .i32(31)
            .i32(2)
            .into_vec();
        let (rest, parsed) = parse_class_net_cache(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            parsed,
            ClassNetCache {
                object_index: 5,
                parent_id: 2,
                id: 9,
                properties: vec![
                    ClassNetCacheProperty { index: 30, id: 1 },
                    ClassNetCacheProperty { index: 31, id: 2 },
                ],
            }
        );
    }

    #[test]
    fn class_net_cache_rejects_negative_property_count() {
        let bytes = ReplayBytes::new().i32(0).i32(0).i32(0).i32(-3).into_vec();
        let err = ErrorKind::from(parse_class_net_cache(&bytes).unwrap_err());
        assert!(matches!(err, ErrorKind::NegativeCount { count: -3 }));
    }

    #[test]
    fn class_net_cache_truncated_properties() {
        let bytes = ReplayBytes::new().i32(0).i32(0).i32(0).i32(2).i32(1).i32(1).into_vec();
        let err = ErrorKind::from(parse_class_net_cache(&bytes).unwrap_err());
        assert!(matches!(err, ErrorKind::TruncatedStream { .. }));
    }

    #[test]
    fn debug_string_mixes_encodings() {
        let bytes = ReplayBytes::new()
            .i32(44)
            .utf16_string("Jöhn")
            .string("hello")
            .into_vec();
        let (rest, parsed) = parse_debug_string(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.frame_number, 44);
        assert_eq!(parsed.username, "Jöhn");
        assert_eq!(parsed.text, "hello");
    }

    #[test]
    fn tick_mark() {
        let bytes = ReplayBytes::new().string("Team0Goal").i32(812).into_vec();
        let (rest, parsed) = parse_tick_mark(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            parsed,
            TickMark {
                label: "Team0Goal".to_string(),
                frame: 812
            }
        );
    }
}
