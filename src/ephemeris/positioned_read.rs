//! Positioned reads on a shared file.
//!
//! Handles running on different threads read coefficients from the same
//! [`File`]. A seek followed by a read would let two threads interleave and
//! corrupt each other's data, so every read goes through a single
//! read-at-offset call that never touches the shared file cursor.
use std::{fs::File, io};

#[cfg(unix)]
pub(crate) fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
pub(crate) fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod positioned_read_test {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_at_offset() {
        let mut tmp = tempfile::tempfile().unwrap();
        tmp.write_all(b"0123456789abcdef").unwrap();

        let mut buf = [0u8; 4];
        read_exact_at(&tmp, &mut buf, 10).unwrap();
        assert_eq!(&buf, b"abcd");
        read_exact_at(&tmp, &mut buf, 0).unwrap();
        assert_eq!(&buf, b"0123");

        let err = read_exact_at(&tmp, &mut buf, 14).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
