use eyre::WrapErr;
use log::{info, LevelFilter};
use nalgebra::U2;
use walldist::pipeline::WallDistanceProblem;
use walldist::settings::WallDistanceSettings;

fn main() -> eyre::Result<()> {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .init();

    let report = WallDistanceProblem::<U2>::new(WallDistanceSettings::default())
        .run()
        .wrap_err("Wall distance computation failed")?;
    info!(
        "Solved {} DOFs on {} cells in {} CG iterations, output written to {}",
        report.num_dofs,
        report.num_cells,
        report.cg_iterations,
        report.output_path.display()
    );
    Ok(())
}
