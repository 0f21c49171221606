use crate::config::Geometry;

mod hybrid;
mod properties;

/// A small cache with 64 byte lines
pub(crate) fn geometry(sets: usize, ways: usize) -> Geometry {
    Geometry {
        sets,
        ways,
        line_size: 64,
    }
}
