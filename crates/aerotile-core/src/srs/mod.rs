//! Projected spatial reference handling.
//!
//! The coordinate system is configured as a WKT1 string and otherwise treated
//! as opaque. It still has to parse: a descriptor that cannot be understood
//! must fail loudly instead of producing a raster with wrong metadata. Only
//! projected Transverse Mercator systems are accepted, which is what the
//! GeoTIFF writer knows how to encode as GeoKeys.

mod geokeys;
pub mod wkt;

use thiserror::Error;

pub use geokeys::{GeoKey, GeoKeyDirectory, GeoKeyValue};
pub use wkt::{WktNode, WktParseError, WktValue};

/// Guatemala Transverse Mercator (GTM) on WGS84, the default target system.
pub const GTM_WKT: &str = concat!(
    r#"PROJCS["GTM","#,
    r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],"#,
    r#"PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],"#,
    r#"PROJECTION["Transverse_Mercator"],"#,
    r#"PARAMETER["False_Easting",500000.0],"#,
    r#"PARAMETER["False_Northing",0.0],"#,
    r#"PARAMETER["Central_Meridian",-90.5],"#,
    r#"PARAMETER["Scale_Factor",0.9998],"#,
    r#"PARAMETER["Latitude_Of_Origin",0.0],"#,
    r#"UNIT["Meter",1.0]]"#
);

/// Errors raised when a coordinate system descriptor cannot be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpatialReferenceError {
    #[error("failed to parse SRS definition: {0}")]
    Parse(#[from] WktParseError),

    #[error("expected a projected coordinate system (PROJCS), found {0}")]
    NotProjected(String),

    #[error("SRS definition is missing {0}")]
    Missing(&'static str),

    #[error("unsupported projection '{0}', only Transverse_Mercator is supported")]
    UnsupportedProjection(String),

    #[error("invalid {what} in SRS definition: {value}")]
    InvalidValue { what: &'static str, value: f64 },
}

/// Geographic base of a projected system.
#[derive(Debug, Clone, PartialEq)]
pub struct GeographicCs {
    pub name: String,
    pub datum: String,
    pub spheroid: String,
    pub semi_major_axis: f64,
    pub inverse_flattening: f64,
    pub prime_meridian: f64,
}

impl GeographicCs {
    /// Whether the datum is WGS 84, which has a registered GeoTIFF code.
    pub fn is_wgs84(&self) -> bool {
        let datum = normalize(&self.datum);
        datum.contains("wgs_1984") || datum.contains("wgs84") || datum.contains("wgs_84")
    }
}

/// Transverse Mercator projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    pub false_easting: f64,
    pub false_northing: f64,
    pub central_meridian: f64,
    pub scale_factor: f64,
    pub latitude_of_origin: f64,
}

/// Linear unit of the projected axes.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearUnit {
    pub name: String,
    pub meters: f64,
}

impl LinearUnit {
    pub fn is_meter(&self) -> bool {
        self.meters == 1.0
    }
}

/// A parsed projected coordinate system.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialReference {
    root: WktNode,
    pub name: String,
    pub geographic: GeographicCs,
    pub projection: TransverseMercator,
    pub unit: LinearUnit,
}

impl SpatialReference {
    /// Parse and validate a WKT1 `PROJCS` definition.
    pub fn from_wkt(input: &str) -> Result<Self, SpatialReferenceError> {
        let root = wkt::parse(input)?;
        if !root.is("PROJCS") {
            return Err(SpatialReferenceError::NotProjected(root.keyword.clone()));
        }

        let name = root
            .name()
            .ok_or(SpatialReferenceError::Missing("PROJCS name"))?
            .to_string();

        let geographic = parse_geographic(&root)?;

        let projection_name = root
            .child("PROJECTION")
            .and_then(WktNode::name)
            .ok_or(SpatialReferenceError::Missing("PROJECTION"))?;
        if normalize(projection_name) != "transverse_mercator" {
            return Err(SpatialReferenceError::UnsupportedProjection(
                projection_name.to_string(),
            ));
        }

        let projection = TransverseMercator {
            false_easting: parameter(&root, "false_easting", 0.0)?,
            false_northing: parameter(&root, "false_northing", 0.0)?,
            central_meridian: parameter(&root, "central_meridian", 0.0)?,
            scale_factor: parameter(&root, "scale_factor", 1.0)?,
            latitude_of_origin: parameter(&root, "latitude_of_origin", 0.0)?,
        };
        if projection.scale_factor <= 0.0 {
            return Err(SpatialReferenceError::InvalidValue {
                what: "scale factor",
                value: projection.scale_factor,
            });
        }

        let unit_node = root
            .child("UNIT")
            .ok_or(SpatialReferenceError::Missing("linear UNIT"))?;
        let unit = LinearUnit {
            name: unit_node.name().unwrap_or_default().to_string(),
            meters: positive(unit_node.number(1), "linear unit")?,
        };

        Ok(Self {
            root,
            name,
            geographic,
            projection,
            unit,
        })
    }

    /// Export the definition as compact WKT.
    pub fn to_wkt(&self) -> String {
        self.root.to_string()
    }

    /// The parsed WKT tree.
    pub fn root(&self) -> &WktNode {
        &self.root
    }
}

fn parse_geographic(root: &WktNode) -> Result<GeographicCs, SpatialReferenceError> {
    let geogcs = root
        .child("GEOGCS")
        .ok_or(SpatialReferenceError::Missing("GEOGCS"))?;
    let datum = geogcs
        .child("DATUM")
        .ok_or(SpatialReferenceError::Missing("DATUM"))?;
    let spheroid = datum
        .child("SPHEROID")
        .ok_or(SpatialReferenceError::Missing("SPHEROID"))?;

    let semi_major_axis = positive(spheroid.number(1), "semi-major axis")?;
    let inverse_flattening = spheroid
        .number(2)
        .ok_or(SpatialReferenceError::Missing("inverse flattening"))?;
    if !(inverse_flattening >= 0.0 && inverse_flattening.is_finite()) {
        return Err(SpatialReferenceError::InvalidValue {
            what: "inverse flattening",
            value: inverse_flattening,
        });
    }

    let prime_meridian = geogcs
        .child("PRIMEM")
        .and_then(|p| p.number(1))
        .unwrap_or(0.0);

    Ok(GeographicCs {
        name: geogcs.name().unwrap_or_default().to_string(),
        datum: datum.name().unwrap_or_default().to_string(),
        spheroid: spheroid.name().unwrap_or_default().to_string(),
        semi_major_axis,
        inverse_flattening,
        prime_meridian,
    })
}

/// Look up `PARAMETER["name", value]`, matching names case-insensitively.
fn parameter(root: &WktNode, name: &str, default: f64) -> Result<f64, SpatialReferenceError> {
    let found = root
        .children("PARAMETER")
        .find(|p| p.name().map(normalize).as_deref() == Some(name));

    match found {
        None => Ok(default),
        Some(node) => match node.number(1) {
            Some(v) if v.is_finite() => Ok(v),
            Some(v) => Err(SpatialReferenceError::InvalidValue {
                what: "projection parameter",
                value: v,
            }),
            None => Err(SpatialReferenceError::Missing("projection parameter value")),
        },
    }
}

fn positive(value: Option<f64>, what: &'static str) -> Result<f64, SpatialReferenceError> {
    match value {
        Some(v) if v > 0.0 && v.is_finite() => Ok(v),
        Some(v) => Err(SpatialReferenceError::InvalidValue { what, value: v }),
        None => Err(SpatialReferenceError::Missing(what)),
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}
