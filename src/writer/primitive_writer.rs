use byteorder::{LittleEndian, WriteBytesExt};
use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;
use std::io::{self, Read, Write};

/// Write signed byte
pub fn write_i8<W: Write>(w: &mut W, value: i8) -> io::Result<()> {
    w.write_i8(value)
}

/// Write unsigned byte
pub fn write_u8<W: Write>(w: &mut W, value: u8) -> io::Result<()> {
    w.write_u8(value)
}

/// Write signed 32
pub fn write_int<W: Write>(w: &mut W, value: i32) -> io::Result<()> {
    w.write_i32::<LittleEndian>(value)
}

/// Write 64 bits float
pub fn write_f64<W: Write>(w: &mut W, value: f64) -> io::Result<()> {
    w.write_f64::<LittleEndian>(value)
}

/// Write bool as a single byte
pub fn write_bool<W: Write>(w: &mut W, value: bool) -> io::Result<()> {
    w.write_u8(u8::from(value))
}

/// Write `n` bytes of `fill`.
pub fn write_placeholder<W: Write>(w: &mut W, n: usize, fill: u8) -> io::Result<()> {
    log::debug!("placeholder: {n}");
    io::copy(&mut io::repeat(fill).take(n as u64), w)?;
    Ok(())
}

/// Encode String as Windows-1252
fn make_bytes(s: &str) -> Cow<'_, [u8]> {
    let (bytes, _encoding_used, had_errors) = WINDOWS_1252.encode(s);
    if had_errors {
        log::warn!("String {s:?} has characters without Windows-1252 representation");
    }
    bytes
}

/// Size of string encoded as Int.
/// [i32 string_len][string_len bytes]
pub fn write_int_sized_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    let bytes = make_bytes(s);
    write_int(w, bytes.len() as i32)?;
    w.write_all(&bytes)
}

/// String in a field of `size` bytes, truncated and padded with zeros.
/// [u8 string_len][size bytes field]
pub fn write_byte_size_string<W: Write>(w: &mut W, s: &str, size: usize) -> io::Result<()> {
    let bytes = make_bytes(s);
    let len = bytes.len().min(size).min(u8::MAX as usize);
    if len < bytes.len() {
        log::warn!("String {s:?} truncated to {len} bytes");
    }
    write_u8(w, len as u8)?;
    w.write_all(&bytes[..len])?;
    write_placeholder(w, size - len, 0x00)
}

/// Size of string encoded as Int, followed by the string size as a byte.
/// [i32 string_len + 1][u8 string_len][string_len bytes]
pub fn write_int_byte_sized_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    let bytes = make_bytes(s);
    let len = bytes.len().min(u8::MAX as usize);
    if len < bytes.len() {
        log::warn!("String {s:?} truncated to {len} bytes");
    }
    write_int(w, len as i32 + 1)?;
    write_u8(w, len as u8)?;
    w.write_all(&bytes[..len])
}

#[cfg(test)]
mod tests {
    use crate::parser::primitive_parser::{
        parse_byte_size_string, parse_int_byte_sized_string, parse_int_sized_string,
    };
    use crate::writer::primitive_writer::{
        write_byte_size_string, write_int_byte_sized_string, write_int_sized_string,
        write_placeholder,
    };

    #[test]
    fn test_write_byte_size_string() {
        let mut buf = Vec::new();
        write_byte_size_string(&mut buf, "FICHIER GUITAR PRO v5.10", 30).unwrap();
        assert_eq!(buf.len(), 31);
        assert_eq!(buf[0], 24);
        assert_eq!(&buf[25..], &[0; 6]);
        let (rest, res) = parse_byte_size_string(30)(&buf).unwrap();
        assert_eq!(res, "FICHIER GUITAR PRO v5.10");
        assert!(rest.is_empty());
    }

    #[test]
    fn test_write_byte_size_string_truncates() {
        let mut buf = Vec::new();
        write_byte_size_string(&mut buf, "abcdef", 4).unwrap();
        assert_eq!(buf, vec![4, b'a', b'b', b'c', b'd']);
    }

    #[test]
    fn test_write_int_byte_sized_string() {
        let mut buf = Vec::new();
        write_int_byte_sized_string(&mut buf, "hi").unwrap();
        assert_eq!(buf, vec![0x03, 0x00, 0x00, 0x00, 0x02, b'h', b'i']);
        let (rest, res) = parse_int_byte_sized_string(&buf).unwrap();
        assert_eq!(res, "hi");
        assert!(rest.is_empty());
    }

    #[test]
    fn test_write_windows_1252_string() {
        let mut buf = Vec::new();
        write_int_sized_string(&mut buf, "é€").unwrap();
        assert_eq!(buf, vec![0x02, 0x00, 0x00, 0x00, 0xE9, 0x80]);
        let (_rest, res) = parse_int_sized_string(&buf).unwrap();
        assert_eq!(res, "é€");
    }

    #[test]
    fn test_write_placeholder() {
        let mut buf = Vec::new();
        write_placeholder(&mut buf, 3, 0xFF).unwrap();
        write_placeholder(&mut buf, 0, 0xFF).unwrap();
        assert_eq!(buf, vec![0xFF; 3]);
    }
}
