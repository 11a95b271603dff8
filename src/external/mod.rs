mod distance_matrix;

pub use distance_matrix::DistanceMatrixProvider;
