use crate::constraints::Constraints;
use crate::timeline::PolyphonyInterval;

/// Keys held during `interval` that fall outside the playable range.
pub fn out_of_range(interval: &PolyphonyInterval, constraints: &Constraints) -> Vec<u8> {
    split_by_range(&interval.keys(), constraints).1
}

/// Split sorted keys into `(playable, out_of_range)`.
pub fn split_by_range(keys: &[u8], constraints: &Constraints) -> (Vec<u8>, Vec<u8>) {
    keys.iter().copied().partition(|&key| constraints.in_range(key))
}
