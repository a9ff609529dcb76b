use kdio::store::{BlockWriter, Compression};
use kdio::{Layout, PointSet, Positions, PrimitiveValues, WriteOptions};
use rand::prelude::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, clap::Args)]
pub struct SampleArgs {
    /// Number of points to generate.
    #[arg(short = 'n', long, default_value_t = 100)]
    pub points: usize,
    /// Dimensions of every point.
    #[arg(short, long, default_value_t = 3)]
    pub dims: usize,
    #[arg(short, long, default_value_t = Layout::Flat)]
    pub layout: Layout,
    /// Compress coordinate and value blocks with bzip2.
    #[arg(long)]
    pub bzip2: bool,
    /// Seed for the point generator; the same seed always yields the same points.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

/// Points scattered uniformly in `[-100, 100)` along every axis, each with an opaque ARGB
/// colour.
pub fn sample_points(
    num_dimensions: usize,
    num_points: usize,
    seed: u64,
) -> anyhow::Result<PointSet<u32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let coordinates = (0..num_points * num_dimensions)
        .map(|_| rng.random_range(-100.0..100.0))
        .collect();
    let colours = (0..num_points)
        .map(|_| 0xff00_0000 | (rng.random::<u32>() & 0x00ff_ffff))
        .collect();
    Ok(PointSet::try_new(
        Positions::flat(num_dimensions, coordinates)?,
        colours,
    )?)
}

pub fn exec_sample(store: &dyn BlockWriter, path: &str, args: &SampleArgs) -> anyhow::Result<()> {
    let points = sample_points(args.dims, args.points, args.seed)?;
    let compression = if args.bzip2 {
        Compression::bzip2()
    } else {
        Compression::Raw
    };
    WriteOptions::default()
        .with_layout(args.layout)
        .with_compression(compression)
        .write(
            &points,
            &PrimitiveValues::<u32>::with_compression(compression),
            store,
            path,
        )?;
    println!(
        "Wrote {} points of {} dimensions to {} ({} layout)",
        points.num_points(),
        points.num_dimensions(),
        path,
        args.layout
    );
    Ok(())
}
