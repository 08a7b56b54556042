use xmc_core::derive_substream_seed;

const INITIAL_STATE_STREAM: u64 = 0;
const SAMPLER_STREAM: u64 = 1;

/// Seed used to draw the initial walker population.
pub fn initial_state_seed(master_seed: u64) -> u64 {
    derive_substream_seed(master_seed, INITIAL_STATE_STREAM)
}

/// Seed of the proposal stream for a run segment starting at `start_iteration`.
///
/// A resumed run starts a new segment, so it never replays the proposals of
/// the segment that produced the checkpoint.
pub fn sampler_seed(master_seed: u64, start_iteration: usize) -> u64 {
    let stream = derive_substream_seed(master_seed, SAMPLER_STREAM);
    derive_substream_seed(stream, start_iteration as u64)
}
