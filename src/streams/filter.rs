use std::io::{self, Read};

use log::trace;

use super::read_fully;

/// A reader that removes every occurrence of a set of marker byte sequences from `inner`.
///
/// A staging window of `max(marker length) - 1` bytes is kept filled behind whatever was just
/// placed in the caller's buffer, so a marker that starts at the end of one read and finishes in
/// the next is still seen whole and removed. No byte of a marker is ever handed to the caller.
///
/// Markers are tried in the order they were given; for a given marker the leftmost occurrence
/// is removed first. After a removal the scan restarts, since closing the gap can form a new
/// occurrence.
#[derive(Debug)]
pub struct FilterReader<R> {
    inner: R,
    markers: Vec<Vec<u8>>,
    staging: Box<[u8]>,
    staged: usize,
    inner_exhausted: bool,
}

impl<R: Read> FilterReader<R> {
    pub fn new<I, M>(inner: R, markers: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Vec<u8>>,
    {
        let markers: Vec<Vec<u8>> = markers
            .into_iter()
            .map(Into::into)
            .filter(|marker: &Vec<u8>| !marker.is_empty())
            .collect();

        let window = markers
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .saturating_sub(1);

        FilterReader {
            inner,
            markers,
            staging: vec![0_u8; window].into_boxed_slice(),
            staged: 0,
            inner_exhausted: false,
        }
    }

    pub fn markers(&self) -> &[Vec<u8>] {
        &self.markers
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn drain_staging_into(&mut self, out: &mut [u8]) -> usize {
        let n = self.staged.min(out.len());
        out[..n].copy_from_slice(&self.staging[..n]);
        self.staging.copy_within(n..self.staged, 0);
        self.staged -= n;
        n
    }

    fn refill_staging(&mut self) -> io::Result<()> {
        let staged = self.staged;
        self.staged += read_fully(
            &mut self.inner,
            &mut self.inner_exhausted,
            &mut self.staging[staged..],
        )?;
        Ok(())
    }

    /// Removes `len` bytes starting at `start` from the logical sequence `out[..filled] ++ staging`.
    /// `start` always lies inside `out[..filled]`. Returns the new `filled`.
    fn splice(&mut self, out: &mut [u8], filled: usize, start: usize, len: usize) -> usize {
        let end = start + len;

        if end <= filled {
            out.copy_within(end..filled, start);
            filled - len
        } else {
            let in_staging = end - filled;
            self.staging.copy_within(in_staging..self.staged, 0);
            self.staged -= in_staging;
            start
        }
    }
}

impl<R: Read> Read for FilterReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;

        while filled < buf.len() && (self.staged > 0 || !self.inner_exhausted) {
            filled += self.drain_staging_into(&mut buf[filled..]);

            if filled < buf.len() {
                filled += read_fully(
                    &mut self.inner,
                    &mut self.inner_exhausted,
                    &mut buf[filled..],
                )?;
            }

            self.refill_staging()?;

            while let Some((start, len)) =
                find_marker(&self.markers, &buf[..filled], &self.staging[..self.staged])
            {
                trace!("Eliding {} byte marker at output offset {}", len, start);
                filled = self.splice(buf, filled, start, len);
            }
        }

        Ok(filled)
    }
}

/// Finds the first marker (in declaration order) that starts inside `head` within the
/// contiguous sequence `head ++ tail`. Returns `(start, marker length)`.
fn find_marker(markers: &[Vec<u8>], head: &[u8], tail: &[u8]) -> Option<(usize, usize)> {
    let total = head.len() + tail.len();
    let byte_at = |i: usize| {
        if i < head.len() {
            head[i]
        } else {
            tail[i - head.len()]
        }
    };

    for marker in markers {
        if marker.len() > total {
            continue;
        }

        let starts = head.len().min(total - marker.len() + 1);

        for start in 0..starts {
            if marker
                .iter()
                .enumerate()
                .all(|(offset, &b)| byte_at(start + offset) == b)
            {
                return Some((start, marker.len()));
            }
        }
    }

    None
}
