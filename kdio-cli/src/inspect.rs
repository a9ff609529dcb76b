use itertools::Itertools;
use kdio::store::{BlockReader, Compression};
use kdio::{PrimitiveValues, StructureInfo, read_point_set};

pub fn exec_inspect(store: &dyn BlockReader, path: &str) -> anyhow::Result<()> {
    let info = StructureInfo::read(store, path)?;
    let coordinates = info.coordinates();
    println!("structure:      {}", info.path());
    println!("format version: {}", info.format_version());
    println!("codec version:  {}", info.codec_version());
    println!("layout:         {}", info.layout());
    println!("dimensions:     {}", info.num_dimensions());
    println!("points:         {}", info.num_points());
    println!(
        "coordinates:    {} [{}] in blocks of [{}], {} block(s), {}",
        info.coordinates_path(),
        coordinates.dimensions().iter().join(", "),
        coordinates.block_size().iter().join(", "),
        info.block_shape().block_count(),
        compression_name(coordinates.compression())
    );
    Ok(())
}

pub fn exec_dump(store: &dyn BlockReader, path: &str, limit: Option<usize>) -> anyhow::Result<()> {
    let points = read_point_set(&PrimitiveValues::<u32>::new(), store, path)?;
    let limit = limit.unwrap_or(usize::MAX);
    for (i, (coordinates, value)) in points.iter().take(limit).enumerate() {
        println!(
            "{:>8}  ({})  #{:08x}",
            i,
            coordinates.iter().map(|c| format!("{c:.6}")).join(", "),
            value
        );
    }
    if points.num_points() > limit {
        println!("... {} more", points.num_points() - limit);
    }
    Ok(())
}

fn compression_name(compression: Compression) -> String {
    match compression {
        Compression::Raw => "raw".to_string(),
        Compression::Bzip2 { block_size } => format!("bzip2 (level {block_size})"),
    }
}
