use std::fmt;
use std::io::{self, Read};

use log::trace;

/// Exposes an ordered list of readers as one contiguous, forward-only reader.
///
/// When the current reader reports end-of-stream, reading moves on to the next one. Exhausted
/// readers are dropped and never polled again.
pub struct CompositeReader<'a> {
    sources: Vec<Box<dyn Read + 'a>>,
    current: usize,
}

impl<'a> CompositeReader<'a> {
    pub fn new(sources: Vec<Box<dyn Read + 'a>>) -> Self {
        CompositeReader { sources, current: 0 }
    }

    /// Number of sources that have not been exhausted yet.
    pub fn remaining_sources(&self) -> usize {
        self.sources.len() - self.current
    }
}

impl fmt::Debug for CompositeReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeReader")
            .field("sources", &self.sources.len())
            .field("current", &self.current)
            .finish()
    }
}

impl Read for CompositeReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;

        while filled < buf.len() && self.current < self.sources.len() {
            match self.sources[self.current].read(&mut buf[filled..]) {
                Ok(0) => {
                    trace!("Composite source {} exhausted", self.current);
                    self.sources[self.current] = Box::new(io::empty());
                    self.current += 1;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::test_utils::{Trickle, read_in_chunks};
    use pretty_assertions::assert_eq;

    fn sources() -> Vec<Vec<u8>> {
        vec![
            b"<root>".to_vec(),
            Vec::new(),
            (0..=250_u8).collect(),
            b"x".to_vec(),
            b"</root>".to_vec(),
        ]
    }

    #[test]
    fn test_composition_preserves_order_for_any_chunk_size() {
        let sources = sources();
        let expected: Vec<u8> = sources.concat();

        for chunk in 1..=expected.len() + 1 {
            let readers = sources
                .iter()
                .map(|s| Box::new(s.as_slice()) as Box<dyn Read + '_>)
                .collect();

            let out = read_in_chunks(CompositeReader::new(readers), chunk);
            assert_eq!(out.len(), expected.len(), "chunk size {}", chunk);
            assert_eq!(out, expected, "chunk size {}", chunk);
        }
    }

    #[test]
    fn test_short_reads_do_not_skip_a_source() {
        let sources = sources();
        let expected: Vec<u8> = sources.concat();

        let readers = sources
            .iter()
            .map(|s| Box::new(Trickle::new(s, 3)) as Box<dyn Read + '_>)
            .collect();

        assert_eq!(read_in_chunks(CompositeReader::new(readers), 64), expected);
    }

    #[test]
    fn test_exhausted_sources_are_not_reread() {
        let sources: Vec<Box<dyn Read>> = vec![Box::new(&b"ab"[..]), Box::new(&b"cd"[..])];
        let mut reader = CompositeReader::new(sources);
        let mut buf = [0_u8; 8];

        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], b"abcd");
        assert_eq!(reader.remaining_sources(), 0);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }
}
