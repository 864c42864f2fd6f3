//! Liveness probe for a fail2ban server socket.
//!
//! fail2ban's control socket speaks pickled Python command tuples terminated
//! by an end-of-command marker. The probe sends the serialized `ping`
//! command and requires the exact serialized `pong` reply, byte for byte.
//! Both frames are fixed 40-byte strings; neither side of the exchange is
//! interpreted, only compared.

mod error;

pub use error::{Error, Result};

use std::io::{Read, Write};

/// Serialized `ping` command, including the `<F2B_END_COMMAND>` terminator.
pub const PING: [u8; 40] = [
    0x80, 0x04, 0x95, 0x0b, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x5d, 0x94, 0x8c, 0x04,
    0x70, 0x69, 0x6e, 0x67, 0x94, 0x61, 0x2e, 0x3c, 0x46, 0x32, 0x42, 0x5f, 0x45, 0x4e, 0x44,
    0x5f, 0x43, 0x4f, 0x4d, 0x4d, 0x41, 0x4e, 0x44, 0x3e, 0x00,
];

/// Serialized `pong` reply the server must produce.
pub const PONG: [u8; 40] = [
    0x80, 0x04, 0x95, 0x0c, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x4b, 0x00, 0x8c, 0x04,
    0x70, 0x6f, 0x6e, 0x67, 0x94, 0x86, 0x94, 0x2e, 0x3c, 0x46, 0x32, 0x42, 0x5f, 0x45, 0x4e,
    0x44, 0x5f, 0x43, 0x4f, 0x4d, 0x4d, 0x41, 0x4e, 0x44, 0x3e,
];

/// Sends PING over the connected stream and checks for PONG.
///
/// # Errors
///
/// * [`Error::Ping`] — writing the challenge frame failed.
/// * [`Error::Pong`] — the response was short or unreadable (includes a
///   connection closed before all 40 bytes arrived).
/// * [`Error::UnexpectedResponse`] — 40 bytes arrived but differ from the
///   expected reply.
pub fn check<S: Read + Write>(stream: &mut S) -> Result<()> {
    stream.write_all(&PING).map_err(|source| Error::Ping { source })?;

    let mut response = [0u8; PONG.len()];
    stream
        .read_exact(&mut response)
        .map_err(|source| Error::Pong { source })?;
    if response != PONG {
        return Err(Error::UnexpectedResponse);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read, Write};

    /// Byte stream with a scripted read side and a capturing write side.
    struct Scripted {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Scripted {
        fn replying(reply: &[u8]) -> Self {
            Self {
                input: Cursor::new(reply.to_vec()),
                output: Vec::new(),
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Read for BrokenPipe {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn exact_pong_succeeds_and_ping_was_sent() {
        let mut stream = Scripted::replying(&PONG);
        check(&mut stream).unwrap();
        assert_eq!(stream.output, PING);
    }

    #[test]
    fn single_differing_byte_is_a_protocol_error() {
        let mut reply = PONG;
        reply[17] ^= 0x01;
        let mut stream = Scripted::replying(&reply);
        let err = check(&mut stream).unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse));
    }

    #[test]
    fn short_response_is_an_io_error() {
        let mut stream = Scripted::replying(&PONG[..39]);
        let err = check(&mut stream).unwrap_err();
        match err {
            Error::Pong { source } => {
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("expected Pong error, got {other:?}"),
        }
    }

    #[test]
    fn write_failure_is_a_ping_error() {
        let err = check(&mut BrokenPipe).unwrap_err();
        assert!(matches!(err, Error::Ping { .. }));
    }
}
