pub trait BencodeEncode {
    fn bencode(&self, buf: &mut Vec<u8>);
}

impl BencodeEncode for i64 {
    fn bencode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(b"i");

        let mut buffer = itoa::Buffer::new();
        buf.extend_from_slice(buffer.format(*self).as_bytes());
        buf.extend_from_slice(b"e");
    }
}

impl BencodeEncode for u32 {
    fn bencode(&self, buf: &mut Vec<u8>) {
        i64::from(*self).bencode(buf);
    }
}

impl BencodeEncode for u16 {
    fn bencode(&self, buf: &mut Vec<u8>) {
        i64::from(*self).bencode(buf);
    }
}

impl BencodeEncode for &[u8] {
    fn bencode(&self, buf: &mut Vec<u8>) {
        let mut buffer = itoa::Buffer::new();
        buf.extend_from_slice(buffer.format(self.len()).as_bytes());
        buf.extend_from_slice(b":");
        buf.extend_from_slice(self);
    }
}

impl BencodeEncode for &str {
    fn bencode(&self, buf: &mut Vec<u8>) {
        self.as_bytes().bencode(buf);
    }
}

/// Encode a dictionary; `pairs` must already be in key order
pub fn encode_dict<K: BencodeEncode, V: BencodeEncode>(
    pairs: &[(K, V)],
    buf: &mut Vec<u8>,
) {
    buf.extend_from_slice(b"d");
    for (key, value) in pairs {
        key.bencode(buf);
        value.bencode(buf);
    }
    buf.extend_from_slice(b"e");
}
