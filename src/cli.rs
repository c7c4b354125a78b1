use clap::{Parser, Subcommand};
use geoshape_lib::{FieldDescriptor, FieldType, PointD, ProjectionType, RectD};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
/// GeoShape Tools - Tile math, projections, spatial lookup and attribute tables from the command line
pub struct Settings {
    /// Log at debug level regardless of RUST_LOG
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a coordinate between geodetic (lon, lat) and projected space
    #[clap(allow_negative_numbers = true)]
    Project {
        /// Projection to apply: none or mercator
        #[clap(short, long, default_value = "mercator")]
        projection: ProjectionType,
        /// Projected to geodetic instead of geodetic to projected
        #[clap(long)]
        inverse: bool,
        x: f64,
        y: f64,
    },

    /// Pixel coordinate of a geodetic point
    #[clap(allow_negative_numbers = true)]
    Pixel {
        lon: f64,
        lat: f64,
        #[clap(short, long)]
        zoom: i32,
    },

    /// Tile containing a geodetic point
    #[clap(allow_negative_numbers = true)]
    Tile {
        lon: f64,
        lat: f64,
        #[clap(short, long)]
        zoom: i32,
    },

    /// Geodetic center of a tile
    TileCenter {
        tile_x: i64,
        tile_y: i64,
        #[clap(short, long)]
        zoom: i32,
    },

    /// Geodetic bounds of a tile
    TileBounds {
        tile_x: i64,
        tile_y: i64,
        #[clap(short, long)]
        zoom: i32,
    },

    /// Convert between zoom level and scale (pixels per projected degree)
    Scale {
        #[clap(short, long, conflicts_with = "scale", required_unless_present = "scale")]
        zoom: Option<i32>,
        #[clap(short, long)]
        scale: Option<f64>,
    },

    /// Write a dBASE attribute table and its .cpg sidecar
    ///
    /// Without --field the first --row is taken as the column names and every
    /// column becomes a character field wide enough for its longest value.
    WriteTable {
        /// Output path; the extension is replaced with .dbf
        #[clap(short, long)]
        output: PathBuf,
        /// Field as NAME:TYPE:LENGTH[:DECIMALS], TYPE one of C N D L M
        #[clap(short, long = "field", value_parser = parse_field)]
        fields: Vec<FieldDescriptor>,
        /// Comma separated cell values, one per field
        #[clap(short, long = "row")]
        rows: Vec<String>,
    },

    /// Index points and list the candidates at a location
    #[clap(allow_negative_numbers = true)]
    QueryPoints {
        /// Index bounds as MINX,MINY,MAXX,MAXY; defaults to the points' extent
        #[clap(short, long, allow_hyphen_values = true, value_parser = parse_bounds)]
        bounds: Option<RectD>,
        /// Point record as X,Y; record numbers follow argument order
        #[clap(
            short,
            long = "point",
            required = true,
            allow_hyphen_values = true,
            value_parser = parse_point
        )]
        points: Vec<PointD>,
        /// Location to look up, as X,Y
        #[clap(short, long, allow_hyphen_values = true, value_parser = parse_point)]
        at: PointD,
        /// Search every leaf within this distance instead of the single leaf at --at
        #[clap(short, long)]
        radius: Option<f64>,
        /// Depth of the quadtree leaves
        #[clap(long, default_value_t = geoshape_lib::DEFAULT_MAX_DEPTH)]
        max_depth: u32,
    },
}

fn parse_numbers<const N: usize>(s: &str) -> Result<[f64; N], String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{v}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    values
        .try_into()
        .map_err(|v: Vec<f64>| format!("expected {N} comma separated numbers, got {}", v.len()))
}

pub fn parse_point(s: &str) -> Result<PointD, String> {
    let [x, y] = parse_numbers::<2>(s)?;
    Ok(PointD::new(x, y))
}

pub fn parse_bounds(s: &str) -> Result<RectD, String> {
    let [min_x, min_y, max_x, max_y] = parse_numbers::<4>(s)?;
    let rect = RectD::from_ltrb(min_x, min_y, max_x, max_y);
    if !rect.is_valid() || rect.is_empty() {
        return Err(format!("'{s}' does not describe a rectangle with area"));
    }
    Ok(rect)
}

pub fn parse_field(s: &str) -> Result<FieldDescriptor, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let (name, code, length, decimals) = match parts.as_slice() {
        [name, code, length] => (*name, *code, *length, "0"),
        [name, code, length, decimals] => (*name, *code, *length, *decimals),
        _ => return Err(format!("'{s}' is not NAME:TYPE:LENGTH[:DECIMALS]")),
    };

    let mut chars = code.chars();
    let field_type = match (chars.next(), chars.next()) {
        (Some(c), None) => FieldType::try_from(c).map_err(|e| e.to_string())?,
        _ => return Err(format!("field type '{code}' must be a single letter")),
    };
    let length = length
        .parse::<u8>()
        .map_err(|e| format!("field length '{length}': {e}"))?;
    let decimals = decimals
        .parse::<u8>()
        .map_err(|e| format!("decimal count '{decimals}': {e}"))?;

    FieldDescriptor::new(name, field_type, length, decimals).map_err(|e| e.to_string())
}
