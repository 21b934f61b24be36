use std::path::PathBuf;

use futures::Stream;

/// Default directory reduce outputs are written under.
pub const REDUCE_PATH: &str = "reduce";

pub fn merge_reduce_name(index: usize) -> String {
    format!("reduce-{}", index)
}

/// Lazily yields the output path of every reduce partition, in index order.
///
/// The stream can be consumed only once and ends after `num_reduce_jobs` items.
pub fn fan_reduce_file_paths(num_reduce_jobs: usize, reduce_dir: PathBuf) -> impl Stream<Item = String> {
    async_stream::stream! {
        for index in 0..num_reduce_jobs {
            yield reduce_dir.join(merge_reduce_name(index)).to_string_lossy().into_owned();
        }
    }
}
