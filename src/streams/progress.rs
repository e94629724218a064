use std::io::{self, Read};

/// Receives consumption progress as a whole percentage in `0..=100`.
pub trait ProgressSink {
    fn report(&mut self, percent: u8);
}

impl<F: FnMut(u8)> ProgressSink for F {
    fn report(&mut self, percent: u8) {
        self(percent)
    }
}

/// Discards progress reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: u8) {}
}

/// Reports `floor(consumed / total * 100)` to a [`ProgressSink`] after every read.
///
/// Values are clamped to `100`, so a source that grows while being read never reports more.
/// A source with a known length of `0` reports `100` on its first read.
#[derive(Debug)]
pub struct ProgressReader<R, P> {
    inner: R,
    total: u64,
    consumed: u64,
    sink: P,
}

impl<R: Read, P: ProgressSink> ProgressReader<R, P> {
    pub fn new(inner: R, total: u64, sink: P) -> Self {
        ProgressReader {
            inner,
            total,
            consumed: 0,
            sink,
        }
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }

        let percent = u128::from(self.consumed) * 100 / u128::from(self.total);
        percent.min(100) as u8
    }
}

impl<R: Read, P: ProgressSink> Read for ProgressReader<R, P> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed += n as u64;

        let percent = self.percent();
        self.sink.report(percent);

        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::test_utils::read_in_chunks;

    fn reports(data: &[u8], chunk: usize) -> Vec<u8> {
        let mut reported = Vec::new();
        let reader = ProgressReader::new(data, data.len() as u64, |p: u8| reported.push(p));
        read_in_chunks(reader, chunk);
        reported
    }

    #[test]
    fn test_progress_is_monotonic_and_ends_at_100() {
        let data = vec![7_u8; 1013];

        for chunk in [1, 3, 64, 1000, 4096] {
            let reported = reports(&data, chunk);

            assert!(
                reported.windows(2).all(|w| w[0] <= w[1]),
                "chunk {}: {:?}",
                chunk,
                reported
            );
            assert_eq!(reported.last(), Some(&100));
        }
    }

    #[test]
    fn test_progress_reaches_100_only_once_everything_was_read() {
        let data = vec![0_u8; 200];
        let mut reported = Vec::new();
        let mut reader = ProgressReader::new(&data[..], 200, |p: u8| reported.push(p));
        let mut buf = [0_u8; 199];

        reader.read_exact(&mut buf).unwrap();
        assert_eq!(reader.consumed(), 199);
        drop(reader);

        assert!(reported.iter().all(|&p| p < 100), "{:?}", reported);
        assert_eq!(reported.last(), Some(&99));
    }

    #[test]
    fn test_progress_of_empty_source() {
        assert_eq!(reports(&[], 16), vec![100]);
    }

    #[test]
    fn test_progress_is_clamped_when_source_is_longer_than_announced() {
        let data = vec![0_u8; 50];
        let mut reported = Vec::new();
        let reader = ProgressReader::new(&data[..], 10, |p: u8| reported.push(p));
        read_in_chunks(reader, 20);

        assert!(reported.iter().all(|&p| p <= 100));
        assert_eq!(reported.last(), Some(&100));
    }
}
