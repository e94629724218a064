//! Forward-only byte plumbing used to turn a concatenated `xctrace export` capture into a single
//! logical XML document.
//!
//! - [`CompositeReader`] stitches several readers into one.
//! - [`FilterReader`] elides marker byte sequences (e.g. repeated document declarations), even
//!   when they straddle two reads.
//! - [`ProgressReader`] reports how much of a source of known length has been consumed.
//!
//! None of these readers seek or buffer a whole source.

mod composite;
mod filter;
mod progress;

pub use self::composite::CompositeReader;
pub use self::filter::FilterReader;
pub use self::progress::{NoProgress, ProgressReader, ProgressSink};

use std::io::{self, Read};

/// Reads until `buf` is full or `inner` reports end-of-stream.
///
/// `exhausted` latches once `inner` returns `0`, after which `inner` is never read again.
pub(crate) fn read_fully<R: Read + ?Sized>(
    inner: &mut R,
    exhausted: &mut bool,
    buf: &mut [u8],
) -> io::Result<usize> {
    let mut filled = 0;

    while filled < buf.len() && !*exhausted {
        match inner.read(&mut buf[filled..]) {
            Ok(0) => *exhausted = true,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}
