/// Random-access index of equal-length frames cut from one decoded asset.
///
/// Built once per load and never mutated afterwards, so the polling loop can read
/// it through an `Arc` without locking. The trailing partial frame is dropped.
#[derive(Debug, Clone)]
pub struct FrameIndex {
    samples: Vec<f32>,
    frame_size: usize,
}

impl FrameIndex {
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn len(&self) -> usize {
        if self.frame_size == 0 {
            0
        } else {
            self.samples.len() / self.frame_size
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frame `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<&[f32]> {
        if index >= self.len() {
            return None;
        }
        let start = index * self.frame_size;
        Some(&self.samples[start..start + self.frame_size])
    }

    /// Concatenated samples of every frame.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::ChunksExact<'_, f32> {
        self.samples.chunks_exact(self.frame_size.max(1))
    }
}

/// Split `samples` into `floor(len / frame_size)` frames of exactly `frame_size`.
pub fn segment(mut samples: Vec<f32>, frame_size: usize) -> FrameIndex {
    if frame_size == 0 {
        return FrameIndex { samples: Vec::new(), frame_size };
    }
    let kept = samples.len() / frame_size * frame_size;
    let dropped = samples.len() - kept;
    samples.truncate(kept);
    samples.shrink_to_fit();

    log::debug!(
        "Segmented {} frames of {} samples ({} trailing samples dropped)",
        kept / frame_size,
        frame_size,
        dropped
    );

    FrameIndex { samples, frame_size }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32).collect()
    }

    #[test]
    fn frame_count_is_floor_and_remainder_dropped() {
        for (count, size) in [(0, 4), (3, 4), (4, 4), (10, 4), (5000, 1024), (4096, 1024)] {
            let index = segment(ramp(count), size);
            assert_eq!(index.len(), count / size, "{count}/{size}");
            assert!(index.iter().all(|f| f.len() == size));
        }
    }

    #[test]
    fn frames_are_contiguous_slices_in_order() {
        let index = segment(ramp(11), 4);
        assert_eq!(index.get(0), Some(&[0.0, 1.0, 2.0, 3.0][..]));
        assert_eq!(index.get(1), Some(&[4.0, 5.0, 6.0, 7.0][..]));
        assert_eq!(index.get(2), None);
    }

    #[test]
    fn lookup_past_end_is_absent() {
        let index = segment(ramp(2048), 1024);
        assert!(index.get(1).is_some());
        assert!(index.get(2).is_none());
        assert!(index.get(usize::MAX).is_none());
    }

    #[test]
    fn zero_frame_size_yields_empty_index() {
        let index = segment(ramp(16), 0);
        assert!(index.is_empty());
        assert!(index.get(0).is_none());
    }
}
