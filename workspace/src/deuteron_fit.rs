#![allow(non_snake_case)]

use std::path::PathBuf;
use ndarray as nd;
use whooie::{ mkdir, write_npz };
use deuteron::{ bvp::BvpOptions, plot, radial, shoot, utils };

const DEPTH_MAX: f64 = 100.0; // MeV

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();

    let params = radial::Params::default();
    let fit = shoot::fit_ground_depth(&params, DEPTH_MAX)?;
    log::info!(
        "shooting: V0 = {:.6} MeV after {} iterations",
        fit.depth, fit.niter,
    );

    let sol
        = radial::solve_depth(
            &fit.params(&params), &fit.shot.r, &fit.shot.y, BvpOptions::default())?;
    if sol.success() {
        log::info!(
            "collocation: V0 = {:.6} MeV ({} nodes, max residual {:.2e})",
            sol.depth, sol.r.len(), sol.bvp.max_rms_residual(),
        );
    } else {
        log::warn!("solver did not converge: {}", sol.bvp.message());
    }
    let nodes = sol.nodes()?;
    if !nodes.is_empty() {
        log::warn!("wavefunction has {} interior nodes", nodes.len());
    }
    let P: nd::Array1<f64> = utils::wf_normalized(&sol.r, &sol.y.row(0))?;

    let fitted = params.with_depth(sol.depth);
    let (r_disp, v)
        = radial::potential_curve(&fitted, &fitted.display_mesh(500));

    let P_shoot: nd::Array1<f64> = fit.shot.y.row(0).to_owned();
    let V0: nd::Array1<f64> = nd::array![fit.depth, sol.depth];

    let outdir = PathBuf::from("output");
    mkdir!(outdir);
    write_npz!(
        outdir.join("deuteron_fit.npz"),
        arrays: {
            "r" => &sol.r,
            "P" => &P,
            "r_shoot" => &fit.shot.r,
            "P_shoot" => &P_shoot,
            "V0" => &V0,
            "r_disp" => &r_disp,
            "V" => &v,
        }
    );
    let fig = outdir.join("deuteron_fit.png");
    plot::render(&fig, &sol.r, &P, &r_disp, &v, &plot::PlotConfig::default())?;
    log::info!("wrote {}", fig.display());
    Ok(())
}
