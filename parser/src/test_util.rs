//! Byte builder for synthetic replays.

use crate::text::SENTINEL;

#[derive(Default)]
pub(crate) struct ReplayBytes {
    buf: Vec<u8>,
}

impl ReplayBytes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn i32(mut self, v: i32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i64(mut self, v: i64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f32(mut self, v: f32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.buf.push(v);
        self
    }

    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.buf.extend_from_slice(data);
        self
    }

    /// Single-byte string with its null terminator. Empty input is written as
    /// a bare zero length.
    pub fn string(self, s: &str) -> Self {
        if s.is_empty() {
            return self.i32(0);
        }
        let mut data: Vec<u8> = s.chars().map(|c| c as u8).collect();
        data.push(0);
        self.i32(data.len() as i32).bytes(&data)
    }

    pub fn utf16_string(self, s: &str) -> Self {
        let mut units: Vec<u16> = s.encode_utf16().collect();
        units.push(0);
        let mut this = self.i32(-(units.len() as i32));
        for unit in units {
            this.buf.extend_from_slice(&unit.to_le_bytes());
        }
        this
    }

    pub fn none(self) -> Self {
        self.string(SENTINEL)
    }

    /// Property header with the given name; the caller appends the payload.
    pub fn property(self, name: &str, tag: &str, declared_length: i32) -> Self {
        self.string(name).string(tag).i32(declared_length).i32(0)
    }

    pub fn int_property(self, name: &str, v: i32) -> Self {
        self.property(name, "IntProperty", 4).i32(v)
    }

    pub fn str_property(self, name: &str, v: &str) -> Self {
        let len = 4 + v.len() as i32 + 1;
        self.property(name, "StrProperty", len).string(v)
    }

    pub fn qword_property(self, name: &str, v: i64) -> Self {
        self.property(name, "QWordProperty", 8).i64(v)
    }

    pub fn bool_property(self, name: &str, v: u8) -> Self {
        self.property(name, "BoolProperty", 0).u8(v)
    }

    pub fn byte_property(self, name: &str, typ: &str, v: &str) -> Self {
        let len = 4 + typ.len() as i32 + 1 + 4 + v.len() as i32 + 1;
        self.property(name, "ByteProperty", len).string(typ).string(v)
    }

    /// Header integers that precede the optional net version.
    pub fn header_prefix(self, engine_version: u32, licensee_version: u32) -> Self {
        self.i32(0)
            .u32(0xDEAD_BEEF)
            .u32(engine_version)
            .u32(licensee_version)
    }

    /// Body with every section empty.
    pub fn empty_body(self) -> Self {
        let mut this = self.i32(0).u32(0);
        for _ in 0..10 {
            this = this.i32(0);
        }
        this
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}
