use std::time::Duration;

/// Frame containing the sample under `position` for a track at `sample_rate`.
///
/// Integer arithmetic keeps the mapping monotonic in `position`. The result may
/// point past the frame index; lookups treat that as "no frame".
pub fn frame_index_for_time(position: Duration, sample_rate: u32, frame_size: usize) -> usize {
    frame_index_for_micros(position.as_micros(), sample_rate, frame_size)
}

pub fn frame_index_for_micros(micros: u128, sample_rate: u32, frame_size: usize) -> usize {
    if frame_size == 0 {
        return 0;
    }
    let sample = micros * sample_rate as u128 / 1_000_000;
    usize::try_from(sample / frame_size as u128).unwrap_or(usize::MAX)
}

/// Start time of `frame`, rounded up to the microsecond so it maps back to `frame`.
pub fn time_for_frame(frame: usize, sample_rate: u32, frame_size: usize) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    let rate = sample_rate as u128;
    let micros = (frame as u128 * frame_size as u128 * 1_000_000).div_ceil(rate);
    Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX))
}
