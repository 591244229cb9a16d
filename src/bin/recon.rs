// ----------------------------------- CLI -----------------------------------
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[clap(name = "recon", about = "ML-EM and OSEM reconstruction of a stored problem")]
pub struct Cli {

    /// Directory containing the problem, as written by `simulate`
    pub problem_dir: PathBuf,

    /// TOML file with iteration counts and subsets. Defaults are used if absent
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for reconstructed images [default: <PROBLEM_DIR>/recon]
    #[clap(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Independently produced final EM image to compare against
    #[clap(long)]
    pub reference_em: Option<PathBuf>,

    /// Independently produced final OSEM image to compare against
    #[clap(long)]
    pub reference_osem: Option<PathBuf>,

    /// Do not draw progress bars
    #[clap(short, long)]
    pub quiet: bool,

    #[cfg(not(feature = "serial"))]
    /// Maximum number of rayon threads
    #[clap(short = 'j', long, default_value = "4")]
    pub num_threads: usize,
}

// --------------------------------------------------------------------------------

use std::error::Error;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use emrecon::{
    config::{read_config_file, Config},
    fom::{all_close, convergence, image_rmse, iteration_ends},
    io::problem::Problem,
    progress::ProgressBar,
    utils::{group_digits, timing::Timer},
    run_em, run_osem, EmSettings, Image, OsemSettings,
};

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    let mut timer = Timer::new();

    #[cfg(not(feature = "serial"))]
    // Set the maximum number of threads used by rayon for parallel iteration
    match rayon::ThreadPoolBuilder::new().num_threads(args.num_threads).build_global() {
        Err(e) => println!("{}", e),
        Ok(_)  => println!("Using up to {} threads.", args.num_threads),
    }

    let config = match &args.config {
        Some(path) => read_config_file(path)?,
        None       => Config::default(),
    };

    timer.start(&format!("Reading problem from {}", args.problem_dir.display()));
    let problem = Problem::read_from_dir(&args.problem_dir)?;
    timer.done();
    let (image, sinogram) = (problem.image, problem.sinogram);
    println!("Image {}x{}, sinogram {}x{}, {} non-zero matrix elements",
             image.nx, image.ny, sinogram.nphi, sinogram.ns, group_digits(problem.matrix.nnz()));

    let out_dir = args.out_dir.clone().unwrap_or_else(|| args.problem_dir.join("recon"));
    create_dir_all(&out_dir)?;

    let total_counts = problem.total_counts();
    let initial = problem.initial_image();
    println!("Total measured counts: {:.2}", total_counts);
    println!("Initial image total  : {:.2}", initial.sum());

    let bar = |total: usize, label: &str| if args.quiet { ProgressBar::hidden() } else { ProgressBar::new(total, label) };

    // ----- ML-EM ---------------------------------------------------------------------
    let iterations = config.em.iterations;
    let settings = EmSettings::new(iterations, total_counts).with_epsilon(config.epsilon);
    timer.start(&format!("ML-EM, {iterations} iterations"));
    let em = run_em(&problem.matrix, problem.measured.view(), &initial, settings, &mut bar(iterations, "EM"));
    timer.done();
    let final_em = match em {
        Err(e) => { eprintln!("ML-EM reconstruction failed: {e}"); None }
        Ok(em) => {
            for (n, image) in em.images.iter().enumerate() {
                image.write_to_raw_file(&out_dir.join(format!("em_{:02}.raw", n + 1)))?;
            }
            em.sensitivity.write_to_raw_file(&out_dir.join("sensitivity.raw"))?;
            if let Some(truth) = &problem.truth {
                write_convergence(&out_dir.join("em.rmse"), &convergence(&em.images, truth), &[])?;
            }
            timer.done_with_message("  Wrote EM images");
            em.images.last().cloned()
        }
    };

    // ----- OSEM ----------------------------------------------------------------------
    let (iterations, subsets) = (config.osem.iterations, config.osem.subsets);
    let settings = OsemSettings::new(iterations, subsets, total_counts).with_epsilon(config.epsilon);
    timer.start(&format!("OSEM, {iterations} iterations x {subsets} subsets"));
    let osem = run_osem(&problem.matrix, problem.measured.view(), &initial, settings, &mut bar(iterations * subsets, "OSEM"));
    timer.done();
    let final_osem = match osem {
        Err(e) => { eprintln!("OSEM reconstruction failed: {e}"); None }
        Ok(osem) => {
            for (n, image) in osem.images.iter().enumerate() {
                image.write_to_raw_file(&out_dir.join(format!("osem_{:02}.raw", n + 1)))?;
            }
            osem.estimate.write_to_raw_file(&out_dir.join("osem_estimate.raw"))?;
            if let Some(truth) = &problem.truth {
                let ends = iteration_ends(osem.images.len(), subsets);
                write_convergence(&out_dir.join("osem.rmse"), &convergence(&osem.images, truth), &ends)?;
            }
            timer.done_with_message("  Wrote OSEM images");
            osem.images.last().cloned()
        }
    };

    // ----- Comparisons ---------------------------------------------------------------
    println!("\n--- Comparison of results ---");
    let em_label   = format!("EM ({} iterations)", config.em.iterations);
    let osem_label = format!("OSEM ({}x{} sub-iterations)", iterations, subsets);
    for (label, result, reference) in [
        (em_label  , &final_em  , &args.reference_em),
        (osem_label, &final_osem, &args.reference_osem),
    ] {
        println!("\n{label}:");
        let Some(result) = result else { println!("  not available"); continue };
        if let Some(truth) = &problem.truth {
            println!("  RMSE vs truth    : {}", show(image_rmse(result, truth)));
        }
        if let Some(path) = reference {
            let reference = Image::from_raw_file(path, image)?;
            let (a, b) = (result.to_2d(), reference.to_2d());
            println!("  RMSE vs reference: {}", show(image_rmse(result, &reference)));
            println!("  Matches reference: {}", all_close(a.view(), b.view(), 1e-5, 1e-8));
        }
    }
    println!("\nImages written to {}", out_dir.display());
    Ok(())
}

fn show(rmse: Option<f64>) -> String {
    rmse.map_or_else(|| "unavailable".into(), |x| format!("{x:.6}"))
}

/// One line per image: its 1-based position and RMSE, with `*` on the images
/// listed in `marked`
fn write_convergence(path: &Path, rmses: &[Option<f64>], marked: &[usize]) -> std::io::Result<()> {
    let mut buf = BufWriter::new(File::create(path)?);
    for (n, rmse) in rmses.iter().enumerate() {
        let n = n + 1;
        let mark = if marked.contains(&n) { " *" } else { "" };
        writeln!(buf, "{n:4} {}{mark}", show(*rmse))?;
    }
    buf.flush()
}
