use std::path::PathBuf;

mod wall_distance_2d;
mod wall_distance_3d;

fn data_output_path() -> PathBuf {
    PathBuf::from("data/integration_tests/")
}
