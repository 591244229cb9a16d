// ----------------------------------- CLI -----------------------------------
use clap::Parser;

use emrecon::utils::parse_pair;

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum PhantomKind {
    /// Hot and cold disks in a uniform background
    Disks,
    /// Shepp-Logan head phantom
    SheppLogan,
}

#[derive(Parser, Debug, Clone)]
#[clap(name = "simulate", about = "Generate a synthetic parallel-beam reconstruction problem")]
pub struct Cli {

    /// Directory in which to write the problem
    pub out_dir: PathBuf,

    /// Number of pixels along x and y
    #[clap(short, long, value_parser = parse_pair::<usize>, default_value = "64,64")]
    pub n_pixels: (usize, usize),

    /// Number of projection angles over 180 degrees
    #[clap(short = 'a', long, default_value = "60")]
    pub angles: usize,

    /// Number of radial bins per angle
    #[clap(short, long, default_value = "96")]
    pub bins: usize,

    /// Expected total number of counts in the sinogram
    #[clap(short, long, default_value = "1e6")]
    pub counts: f64,

    /// Seed for the Poisson noise
    #[clap(short, long, default_value = "1")]
    pub seed: u64,

    /// Activity distribution to image
    #[clap(short, long, value_enum, default_value_t = PhantomKind::Disks)]
    pub phantom: PhantomKind,

    /// Store noiseless data instead of Poisson counts
    #[clap(long)]
    pub noiseless: bool,
}

// --------------------------------------------------------------------------------

use std::error::Error;
use std::path::PathBuf;

use emrecon::{
    geometry::parallel_beam,
    io::problem::Problem,
    phantom::{poisson_noise, scale_to_counts, Phantom},
    utils::{group_digits, timing::Timer},
    ImageLayout, SinogramLayout, SystemMatrix,
};

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    let mut timer = Timer::new();

    let (nx, ny) = args.n_pixels;
    let image    = ImageLayout::new(nx, ny);
    let sinogram = SinogramLayout::new(args.angles, args.bins);

    timer.start("Building system matrix");
    let matrix = parallel_beam(image, sinogram)?;
    timer.done();
    println!("{} x {} system matrix with {} non-zero elements",
             group_digits(matrix.n_bins()), group_digits(matrix.n_pixels()), group_digits(matrix.nnz()));

    timer.start("Rendering phantom and simulating data");
    let phantom = match args.phantom {
        PhantomKind::Disks      => Phantom::disks(),
        PhantomKind::SheppLogan => Phantom::shepp_logan(),
    };
    let (truth, expected) = scale_to_counts(&matrix, &phantom.render(image), args.counts);
    let measured = if args.noiseless { expected } else { poisson_noise(expected.view(), args.seed) };
    timer.done();
    println!("Total measured counts: {}", group_digits(measured.sum().round()));

    timer.start(&format!("Writing problem to {}", args.out_dir.display()));
    Problem::new(image, sinogram, matrix, measured, Some(truth))?.write_to_dir(&args.out_dir)?;
    timer.done();
    Ok(())
}
