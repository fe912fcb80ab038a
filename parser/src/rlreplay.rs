use std::fmt;
use std::path::Path;

use nom::bytes::complete::take;
use nom::combinator::cond;
use nom::multi::count;
use nom::number::complete::{le_i32, le_u32};
use serde::Serialize;
use tracing::{Level, debug, span, trace};

use crate::error::{ErrorKind, IResult};
use crate::property::{
    LengthMismatch, Property, PropertyType, find_property, length_mismatches, parse_property_list,
};
use crate::text::parse_long_string;
use crate::types::{
    ClassIndex, ClassNetCache, DebugString, Keyframe, TickMark, parse_class_index,
    parse_class_net_cache, parse_count, parse_debug_string, parse_keyframe, parse_tick_mark,
};

/// Oldest engine version whose header carries a net version.
pub const NET_VERSION_MIN_ENGINE: u32 = 868;
/// Oldest licensee version whose header carries a net version.
pub const NET_VERSION_MIN_LICENSEE: u32 = 18;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayHeader {
    length: i32,
    crc: u32,
    engine_version: u32,
    licensee_version: u32,
    net_version: Option<u32>,
    /// Game class name, e.g. `TAGame.Replay_Soccar_TA`
    tag: String,
    properties: Vec<Property>,
}

impl ReplayHeader {
    /// Declared header size in bytes. Not checked against the data.
    pub fn length(&self) -> i32 {
        self.length
    }

    /// Stored checksum. Not verified.
    pub fn crc(&self) -> u32 {
        self.crc
    }

    pub fn engine_version(&self) -> u32 {
        self.engine_version
    }

    pub fn licensee_version(&self) -> u32 {
        self.licensee_version
    }

    /// Present only for engine >= 868 and licensee >= 18.
    pub fn net_version(&self) -> Option<u32> {
        self.net_version
    }

    pub fn tag(&self) -> &str {
        self.tag.as_ref()
    }

    pub fn properties(&self) -> &[Property] {
        self.properties.as_ref()
    }

    pub fn find_property(&self, name: &str, typ: PropertyType) -> Option<&Property> {
        find_property(&self.properties, name, typ)
    }

    pub fn length_mismatches(&self) -> Vec<LengthMismatch> {
        length_mismatches(&self.properties)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayBody {
    length: i32,
    crc: u32,
    levels: Vec<String>,
    keyframes: Vec<Keyframe>,
    #[serde(skip)]
    network_stream: Vec<u8>,
    debug_strings: Vec<DebugString>,
    tick_marks: Vec<TickMark>,
    packages: Vec<String>,
    objects: Vec<String>,
    names: Vec<String>,
    class_indices: Vec<ClassIndex>,
    class_net_caches: Vec<ClassNetCache>,
}

impl ReplayBody {
    /// Declared body size in bytes. Not checked against the data.
    pub fn length(&self) -> i32 {
        self.length
    }

    /// Stored checksum. Not verified.
    pub fn crc(&self) -> u32 {
        self.crc
    }

    pub fn levels(&self) -> &[String] {
        self.levels.as_ref()
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        self.keyframes.as_ref()
    }

    /// Raw replicated frame data. This crate does not interpret it.
    pub fn network_stream(&self) -> &[u8] {
        self.network_stream.as_ref()
    }

    pub fn debug_strings(&self) -> &[DebugString] {
        self.debug_strings.as_ref()
    }

    pub fn tick_marks(&self) -> &[TickMark] {
        self.tick_marks.as_ref()
    }

    pub fn packages(&self) -> &[String] {
        self.packages.as_ref()
    }

    pub fn objects(&self) -> &[String] {
        self.objects.as_ref()
    }

    pub fn names(&self) -> &[String] {
        self.names.as_ref()
    }

    pub fn class_indices(&self) -> &[ClassIndex] {
        self.class_indices.as_ref()
    }

    pub fn class_net_caches(&self) -> &[ClassNetCache] {
        self.class_net_caches.as_ref()
    }
}

/// A fully decoded replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayFile {
    header: ReplayHeader,
    body: ReplayBody,
}

impl ReplayFile {
    /// Reads and decodes the replay at `path`. The file is closed before this
    /// returns, on success or failure.
    pub fn from_file(path: &Path) -> Result<ReplayFile, ErrorKind> {
        let contents = std::fs::read(path)?;
        Self::from_bytes(&contents)
    }

    pub fn from_bytes(data: &[u8]) -> Result<ReplayFile, ErrorKind> {
        let span = span!(Level::DEBUG, "replay decode", bytes = data.len());
        let _enter = span.enter();

        let (remaining, replay) = parse_replay(data)?;
        if !remaining.is_empty() {
            debug!(trailing = remaining.len(), "ignoring bytes after replay body");
        }
        Ok(replay)
    }

    pub fn header(&self) -> &ReplayHeader {
        &self.header
    }

    pub fn body(&self) -> &ReplayBody {
        &self.body
    }

    pub fn properties(&self) -> &[Property] {
        self.header.properties()
    }

    pub fn find_property(&self, name: &str, typ: PropertyType) -> Option<&Property> {
        self.header.find_property(name, typ)
    }

    pub fn network_stream(&self) -> &[u8] {
        self.body.network_stream()
    }
}

fn has_net_version(engine_version: u32, licensee_version: u32) -> bool {
    engine_version >= NET_VERSION_MIN_ENGINE && licensee_version >= NET_VERSION_MIN_LICENSEE
}

pub fn parse_header(i: &[u8]) -> IResult<&[u8], ReplayHeader> {
    let (i, length) = le_i32(i)?;
    let (i, crc) = le_u32(i)?;
    let (i, engine_version) = le_u32(i)?;
    let (i, licensee_version) = le_u32(i)?;
    let (i, net_version) = cond(has_net_version(engine_version, licensee_version), le_u32)(i)?;
    let (i, tag) = parse_long_string(i)?;
    let (i, properties) = parse_property_list(i)?;

    trace!(
        engine_version,
        licensee_version,
        properties = properties.len(),
        "parsed header"
    );

    Ok((
        i,
        ReplayHeader {
            length,
            crc,
            engine_version,
            licensee_version,
            net_version,
            tag,
            properties,
        },
    ))
}

/// Parses an `i32` count followed by that many elements.
fn parse_section<'a, O>(
    i: &'a [u8],
    section: &'static str,
    parser: impl FnMut(&'a [u8]) -> IResult<&'a [u8], O>,
) -> IResult<&'a [u8], Vec<O>> {
    let (i, n) = parse_count(i)?;
    let (i, items) = count(parser, n)(i)?;
    trace!(section, count = n, "parsed section");
    Ok((i, items))
}

pub fn parse_body(i: &[u8]) -> IResult<&[u8], ReplayBody> {
    let (i, length) = le_i32(i)?;
    let (i, crc) = le_u32(i)?;
    let (i, levels) = parse_section(i, "levels", parse_long_string)?;
    let (i, keyframes) = parse_section(i, "keyframes", parse_keyframe)?;
    let (i, stream_len) = parse_count(i)?;
    let (i, network_stream) = take(stream_len)(i)?;
    trace!(bytes = stream_len, "captured network stream");
    let (i, debug_strings) = parse_section(i, "debug strings", parse_debug_string)?;
    let (i, tick_marks) = parse_section(i, "tick marks", parse_tick_mark)?;
    let (i, packages) = parse_section(i, "packages", parse_long_string)?;
    let (i, objects) = parse_section(i, "objects", parse_long_string)?;
    let (i, names) = parse_section(i, "names", parse_long_string)?;
    let (i, class_indices) = parse_section(i, "class indices", parse_class_index)?;
    let (i, class_net_caches) = parse_section(i, "class net caches", parse_class_net_cache)?;

    Ok((
        i,
        ReplayBody {
            length,
            crc,
            levels,
            keyframes,
            network_stream: network_stream.to_vec(),
            debug_strings,
            tick_marks,
            packages,
            objects,
            names,
            class_indices,
            class_net_caches,
        },
    ))
}

pub fn parse_replay(i: &[u8]) -> IResult<&[u8], ReplayFile> {
    let (i, header) = parse_header(i)?;
    let (i, body) = parse_body(i)?;
    Ok((i, ReplayFile { header, body }))
}

impl fmt::Display for ReplayFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = &self.header;
        writeln!(f, "Header length: {}", header.length)?;
        writeln!(f, "Header CRC: {:#010x}", header.crc)?;
        writeln!(f, "Engine version: {}", header.engine_version)?;
        writeln!(f, "Licensee version: {}", header.licensee_version)?;
        match header.net_version {
            Some(v) => writeln!(f, "Net version: {v}")?,
            None => writeln!(f, "Net version: -")?,
        }
        writeln!(f, "Tag: {}", header.tag)?;
        writeln!(f)?;
        for property in &header.properties {
            write!(f, "{property}")?;
        }
        writeln!(f)?;

        let body = &self.body;
        writeln!(f, "Body length: {}", body.length)?;
        writeln!(f, "Body CRC: {:#010x}", body.crc)?;
        writeln!(f, "Network stream: {} bytes", body.network_stream.len())?;
        write_section(f, "Levels", &body.levels)?;
        write_section(f, "Keyframes", &body.keyframes)?;
        write_section(f, "Debug strings", &body.debug_strings)?;
        write_section(f, "Tick marks", &body.tick_marks)?;
        write_section(f, "Packages", &body.packages)?;
        write_section(f, "Objects", &body.objects)?;
        write_section(f, "Names", &body.names)?;
        write_section(f, "Class indices", &body.class_indices)?;
        write_section(f, "Class net caches", &body.class_net_caches)
    }
}

fn write_section<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    items: &[T],
) -> fmt::Result {
    writeln!(f, "{title} ({}):", items.len())?;
    for item in items {
        writeln!(f, "  {item}")?;
    }
    Ok(())
}
