//! Static partitioning of the flat cell index space among workers.

use std::ops::Range;

use crate::schema::ConfigError;

/// Split `0..cells` into `workers` contiguous half-open ranges.
///
/// Every worker gets `cells / workers` cells; the last one also absorbs the
/// remainder (up to `workers - 1` extra cells). The result depends only on
/// the two arguments.
///
/// Fails if `workers` is zero or exceeds `cells`, since a worker would be
/// left with an empty range.
pub fn partition(cells: usize, workers: usize) -> Result<Vec<Range<usize>>, ConfigError> {
    if workers == 0 {
        return Err(ConfigError::InvalidWorkerCount);
    }
    if cells < workers {
        return Err(ConfigError::TooManyWorkers { workers, cells });
    }

    let delta = cells / workers;
    let ranges = (0..workers)
        .map(|i| {
            let start = i * delta;
            let end = if i == workers - 1 { cells } else { start + delta };
            start..end
        })
        .collect();

    Ok(ranges)
}
