//! Subcommand handlers
//!
//! Every handler writes its result to the given output so it can be captured in tests;
//! diagnostics go through `tracing` to stderr.

use crate::cli::Command;
use geoshape_lib::dbf::{DbfWriter, FieldDescriptor, infer_character_fields, write_cpg};
use geoshape_lib::{
    DataError, IndexConfig, PointD, ProjectionType, RecordSource, RectD, SpatialIndex, tile,
};
use std::io::Write;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

pub fn run(command: Command, out: &mut impl Write) -> Result<(), CliError> {
    #[cfg(feature = "profiling")]
    profiling::scope!("geoshape::run");

    match command {
        Command::Project {
            projection,
            inverse,
            x,
            y,
        } => project(projection, inverse, PointD::new(x, y), out),
        Command::Pixel { lon, lat, zoom } => {
            let (px, py) = tile::geodetic_to_pixel(PointD::new(lon, lat), zoom)?;
            writeln!(out, "{px} {py}")?;
            Ok(())
        }
        Command::Tile { lon, lat, zoom } => {
            let (tx, ty) = tile::tile_from_geodetic(PointD::new(lon, lat), zoom)?;
            writeln!(out, "{tx} {ty}")?;
            Ok(())
        }
        Command::TileCenter {
            tile_x,
            tile_y,
            zoom,
        } => {
            let center = tile::tile_center_to_geodetic(tile_x, tile_y, zoom)?;
            writeln!(out, "{} {}", center.x, center.y)?;
            Ok(())
        }
        Command::TileBounds {
            tile_x,
            tile_y,
            zoom,
        } => {
            let bounds = tile::tile_bounds_geodetic(tile_x, tile_y, zoom)?;
            writeln!(
                out,
                "{} {} {} {}",
                bounds.left(),
                bounds.top(),
                bounds.right(),
                bounds.bottom()
            )?;
            Ok(())
        }
        Command::Scale { zoom, scale } => match (zoom, scale) {
            (Some(zoom), _) => {
                writeln!(out, "{}", tile::zoom_level_to_scale(zoom)?)?;
                Ok(())
            }
            (None, Some(scale)) => {
                writeln!(out, "{}", tile::scale_to_zoom_level(scale))?;
                Ok(())
            }
            (None, None) => Err(CliError::Input("either --zoom or --scale is required".into())),
        },
        Command::WriteTable {
            output,
            fields,
            rows,
        } => write_table(&output, fields, &rows, out),
        Command::QueryPoints {
            bounds,
            points,
            at,
            radius,
            max_depth,
        } => query_points(bounds, &points, at, radius, max_depth, out),
    }
}

fn project(
    projection: ProjectionType,
    inverse: bool,
    point: PointD,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let projection = projection.create();
    let result = if inverse {
        projection.to_geodetic(point)
    } else {
        projection.to_projected(point)
    };
    writeln!(out, "{} {}", result.x, result.y)?;
    Ok(())
}

/// Split a row on commas; cells are used verbatim apart from surrounding whitespace
fn split_row(row: &str) -> Vec<String> {
    row.split(',').map(|cell| cell.trim().to_string()).collect()
}

fn write_table(
    output: &Path,
    fields: Vec<FieldDescriptor>,
    rows: &[String],
    out: &mut impl Write,
) -> Result<(), CliError> {
    let mut rows: Vec<Vec<String>> = rows.iter().map(|r| split_row(r)).collect();

    let fields = if fields.is_empty() {
        if rows.is_empty() {
            return Err(CliError::Input(
                "give --field definitions or a header --row".into(),
            ));
        }
        let names = rows.remove(0);
        infer_character_fields(&names, &rows)?
    } else {
        fields
    };

    let mut table = DbfWriter::create(output, fields)?;
    for (i, row) in rows.iter().enumerate() {
        table.write_row(row).map_err(|e| match e {
            DataError::SchemaMismatch { expected, actual } => CliError::Input(format!(
                "row {} has {actual} values but the table has {expected} fields",
                i + 1
            )),
            other => other.into(),
        })?;
    }
    let row_count = table.row_count();
    let field_count = table.fields().len();
    table.close()?;
    let cpg = write_cpg(output)?;

    tracing::info!("Wrote {} rows to {}", row_count, output.with_extension("dbf").display());
    writeln!(
        out,
        "{} rows, {} fields -> {} (+ {})",
        row_count,
        field_count,
        output.with_extension("dbf").display(),
        cpg.display()
    )?;
    Ok(())
}

fn query_points(
    bounds: Option<RectD>,
    points: &[PointD],
    at: PointD,
    radius: Option<f64>,
    max_depth: u32,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let config = IndexConfig {
        max_depth,
        ..IndexConfig::default()
    };
    let source = RecordSource::Points(&points);
    let index = match bounds {
        Some(bounds) => SpatialIndex::build(source, bounds, &config)?,
        None => SpatialIndex::build_with_extent(source, &config)?,
    };

    let info = index.info();
    tracing::debug!(
        "Index over {} points: {} nodes, {} leaves",
        info.record_count,
        info.node_count,
        info.leaf_count
    );

    let candidates = match radius {
        Some(radius) if radius < 0.0 || radius.is_nan() => {
            return Err(CliError::Input(format!("radius must be >= 0, got {radius}")));
        }
        Some(radius) => index.query_radius(at, radius),
        None => index.query_point(at).map(<[usize]>::to_vec),
    };

    match candidates {
        Some(records) if !records.is_empty() => {
            let list: Vec<String> = records.iter().map(|r| r.to_string()).collect();
            writeln!(out, "{}", list.join(" "))?;
        }
        _ => writeln!(out, "none")?,
    }
    Ok(())
}
