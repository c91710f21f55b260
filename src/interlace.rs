/// (first row, step) of the four interlace passes.
const PASSES: [(usize, usize); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

/// Order in which image rows are stored in the data stream.
pub fn row_order(height: usize, interlaced: bool) -> Vec<usize> {
    if !interlaced {
        return (0..height).collect();
    }
    PASSES
        .iter()
        .flat_map(|&(start, step)| (start..height).step_by(step))
        .collect()
}
