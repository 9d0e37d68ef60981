#![allow(non_snake_case)]

use std::path::PathBuf;
use ndarray as nd;
use whooie::{ mkdir, write_npz };
use deuteron::{ bvp::BvpOptions, plot, radial };

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();

    let params = radial::Params::default();
    log::info!(
        "solving with V0 = {} MeV, R = {} fm, E = {} MeV on [{}, {}] fm",
        params.depth, params.radius, params.e_bound, params.r_min, params.r_max,
    );
    let sol = radial::solve(&params, BvpOptions::default())?;
    if sol.success {
        log::info!(
            "{} ({} nodes, {} iterations)",
            sol.message(), sol.x.len(), sol.niter,
        );
    } else {
        log::warn!("solver did not converge: {}", sol.message());
    }

    let r_disp: nd::Array1<f64> = params.display_mesh(500);
    let (r_disp, v) = radial::potential_curve(&params, &r_disp);

    let P: nd::Array1<f64> = sol.y.row(0).to_owned();
    let dP: nd::Array1<f64> = sol.y.row(1).to_owned();

    let outdir = PathBuf::from("output");
    mkdir!(outdir);
    write_npz!(
        outdir.join("deuteron.npz"),
        arrays: {
            "r" => &sol.x,
            "P" => &P,
            "dP" => &dP,
            "r_disp" => &r_disp,
            "V" => &v,
        }
    );
    let fig = outdir.join("deuteron.png");
    plot::render(
        &fig, &sol.x, &P, &r_disp, &v, &plot::PlotConfig::default())?;
    log::info!("wrote {}", fig.display());
    Ok(())
}
