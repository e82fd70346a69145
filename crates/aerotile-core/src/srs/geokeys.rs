//! GeoTIFF GeoKey directory encoding for a [`SpatialReference`].
//!
//! A GeoKey directory is a `u16` array: a four-value header
//! `[version=1, revision=1, minor=0, key_count]` followed by one
//! `[key_id, location, count, value_or_offset]` entry per key. `location` is
//! `0` when the value is stored inline, or the tag holding the value
//! (`GeoDoubleParamsTag` or `GeoAsciiParamsTag`). ASCII values are
//! `|`-terminated and the count includes the terminator.

use super::SpatialReference;

// Directory `location` values: the tags holding double and ASCII GeoKeys.
const GEO_DOUBLE_PARAMS_TAG: u16 = 34736;
const GEO_ASCII_PARAMS_TAG: u16 = 34737;

const USER_DEFINED: u16 = 32767;
const MODEL_TYPE_PROJECTED: u16 = 1;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const GCS_WGS_84: u16 = 4326;
const ANGULAR_DEGREE: u16 = 9102;
const LINEAR_METER: u16 = 9001;
const CT_TRANSVERSE_MERCATOR: u16 = 1;

/// GeoKey identifiers written by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u16)]
pub enum GeoKey {
    ModelType = 1024,
    RasterType = 1025,
    Citation = 1026,
    GeographicType = 2048,
    GeogCitation = 2049,
    GeogGeodeticDatum = 2050,
    GeogAngularUnits = 2054,
    GeogEllipsoid = 2056,
    GeogSemiMajorAxis = 2057,
    GeogInvFlattening = 2059,
    GeogPrimeMeridianLong = 2061,
    ProjectedCSType = 3072,
    PCSCitation = 3073,
    Projection = 3074,
    ProjCoordTrans = 3075,
    ProjLinearUnits = 3076,
    ProjLinearUnitSize = 3077,
    ProjNatOriginLong = 3080,
    ProjNatOriginLat = 3081,
    ProjFalseEasting = 3082,
    ProjFalseNorthing = 3083,
    ProjScaleAtNatOrigin = 3092,
}

/// A decoded GeoKey value, as stored in the directory.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoKeyValue {
    Short(u16),
    Double(f64),
    Ascii(String),
}

/// Encoded payloads for the three GeoTIFF key tags.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeoKeyDirectory {
    /// `GeoKeyDirectoryTag` (34735) payload.
    pub directory: Vec<u16>,
    /// `GeoDoubleParamsTag` payload.
    pub doubles: Vec<f64>,
    /// `GeoAsciiParamsTag` payload.
    pub ascii: String,
}

impl GeoKeyDirectory {
    /// Encode a user-defined Transverse Mercator projected system.
    pub fn from_srs(srs: &SpatialReference) -> Self {
        let mut builder = Builder::default();
        let geog = &srs.geographic;
        let tm = &srs.projection;

        builder.short(GeoKey::ModelType, MODEL_TYPE_PROJECTED);
        builder.short(GeoKey::RasterType, RASTER_PIXEL_IS_AREA);
        builder.ascii(GeoKey::Citation, &srs.name);

        if geog.is_wgs84() {
            builder.short(GeoKey::GeographicType, GCS_WGS_84);
        } else {
            builder.short(GeoKey::GeographicType, USER_DEFINED);
            builder.short(GeoKey::GeogGeodeticDatum, USER_DEFINED);
            builder.short(GeoKey::GeogEllipsoid, USER_DEFINED);
            builder.double(GeoKey::GeogSemiMajorAxis, geog.semi_major_axis);
            builder.double(GeoKey::GeogInvFlattening, geog.inverse_flattening);
            builder.double(GeoKey::GeogPrimeMeridianLong, geog.prime_meridian);
        }
        builder.ascii(GeoKey::GeogCitation, &geog.name);
        builder.short(GeoKey::GeogAngularUnits, ANGULAR_DEGREE);

        builder.short(GeoKey::ProjectedCSType, USER_DEFINED);
        builder.ascii(GeoKey::PCSCitation, &srs.name);
        builder.short(GeoKey::Projection, USER_DEFINED);
        builder.short(GeoKey::ProjCoordTrans, CT_TRANSVERSE_MERCATOR);
        if srs.unit.is_meter() {
            builder.short(GeoKey::ProjLinearUnits, LINEAR_METER);
        } else {
            builder.short(GeoKey::ProjLinearUnits, USER_DEFINED);
            builder.double(GeoKey::ProjLinearUnitSize, srs.unit.meters);
        }
        builder.double(GeoKey::ProjNatOriginLong, tm.central_meridian);
        builder.double(GeoKey::ProjNatOriginLat, tm.latitude_of_origin);
        builder.double(GeoKey::ProjFalseEasting, tm.false_easting);
        builder.double(GeoKey::ProjFalseNorthing, tm.false_northing);
        builder.double(GeoKey::ProjScaleAtNatOrigin, tm.scale_factor);

        builder.finish()
    }

    /// Number of keys in the directory.
    pub fn len(&self) -> usize {
        self.directory.get(3).copied().unwrap_or(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a key's value.
    pub fn get(&self, key: GeoKey) -> Option<GeoKeyValue> {
        let entry = self
            .directory
            .get(4..)?
            .chunks_exact(4)
            .find(|entry| entry[0] == key as u16)?;

        let (location, count, value) = (entry[1], entry[2] as usize, entry[3] as usize);
        match location {
            0 => Some(GeoKeyValue::Short(entry[3])),
            GEO_DOUBLE_PARAMS_TAG => self.doubles.get(value).copied().map(GeoKeyValue::Double),
            GEO_ASCII_PARAMS_TAG => {
                let s = self.ascii.get(value..value + count)?;
                Some(GeoKeyValue::Ascii(s.trim_end_matches('|').to_string()))
            }
            _ => None,
        }
    }
}

#[derive(Default)]
struct Builder {
    entries: Vec<[u16; 4]>,
    doubles: Vec<f64>,
    ascii: String,
}

impl Builder {
    fn short(&mut self, key: GeoKey, value: u16) {
        self.entries.push([key as u16, 0, 1, value]);
    }

    fn double(&mut self, key: GeoKey, value: f64) {
        let offset = self.doubles.len() as u16;
        self.doubles.push(value);
        self.entries
            .push([key as u16, GEO_DOUBLE_PARAMS_TAG, 1, offset]);
    }

    fn ascii(&mut self, key: GeoKey, value: &str) {
        let value = ascii_param(value);
        let offset = self.ascii.len() as u16;
        self.ascii.push_str(&value);
        self.ascii.push('|');
        self.entries.push([
            key as u16,
            GEO_ASCII_PARAMS_TAG,
            (value.len() + 1) as u16,
            offset,
        ]);
    }

    fn finish(mut self) -> GeoKeyDirectory {
        self.entries.sort_by_key(|entry| entry[0]);

        let mut directory = vec![1, 1, 0, self.entries.len() as u16];
        directory.extend(self.entries.iter().flatten());

        GeoKeyDirectory {
            directory,
            doubles: self.doubles,
            ascii: self.ascii,
        }
    }
}

/// Make a citation storable in `GeoAsciiParamsTag`.
///
/// TIFF ASCII fields hold 7-bit printable text only, and `|` is the GeoTIFF
/// value separator. Anything else is replaced with `_` and `|` with `/`.
fn ascii_param(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '|' => '/',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srs::GTM_WKT;

    fn gtm() -> GeoKeyDirectory {
        GeoKeyDirectory::from_srs(&SpatialReference::from_wkt(GTM_WKT).unwrap())
    }

    #[test]
    fn test_locations_match_tiff_tags() {
        use tiff::tags::Tag;

        assert_eq!(GEO_DOUBLE_PARAMS_TAG, Tag::GeoDoubleParamsTag.to_u16());
        assert_eq!(GEO_ASCII_PARAMS_TAG, Tag::GeoAsciiParamsTag.to_u16());
    }

    #[test]
    fn test_header() {
        let keys = gtm();
        assert_eq!(&keys.directory[..3], &[1, 1, 0]);
        assert_eq!(keys.directory.len(), 4 + keys.len() * 4);
        assert!(!keys.is_empty());
    }

    #[test]
    fn test_keys_sorted() {
        let keys = gtm();
        let ids: Vec<u16> = keys.directory[4..].chunks(4).map(|e| e[0]).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_projection_values() {
        let keys = gtm();

        assert_eq!(keys.get(GeoKey::ModelType), Some(GeoKeyValue::Short(1)));
        assert_eq!(keys.get(GeoKey::GeographicType), Some(GeoKeyValue::Short(4326)));
        assert_eq!(keys.get(GeoKey::ProjCoordTrans), Some(GeoKeyValue::Short(1)));
        assert_eq!(keys.get(GeoKey::ProjLinearUnits), Some(GeoKeyValue::Short(9001)));
        assert_eq!(
            keys.get(GeoKey::ProjNatOriginLong),
            Some(GeoKeyValue::Double(-90.5))
        );
        assert_eq!(
            keys.get(GeoKey::ProjFalseEasting),
            Some(GeoKeyValue::Double(500000.0))
        );
        assert_eq!(
            keys.get(GeoKey::ProjScaleAtNatOrigin),
            Some(GeoKeyValue::Double(0.9998))
        );
        assert_eq!(
            keys.get(GeoKey::Citation),
            Some(GeoKeyValue::Ascii("GTM".to_string()))
        );
        assert_eq!(
            keys.get(GeoKey::GeogCitation),
            Some(GeoKeyValue::Ascii("GCS_WGS_1984".to_string()))
        );
        assert_eq!(keys.get(GeoKey::GeogSemiMajorAxis), None);
    }

    #[test]
    fn test_user_defined_ellipsoid() {
        let wkt = GTM_WKT
            .replace("D_WGS_1984", "D_Clarke_1866")
            .replace("6378137.0,298.257223563", "6378206.4,294.9786982");
        let keys = GeoKeyDirectory::from_srs(&SpatialReference::from_wkt(&wkt).unwrap());

        assert_eq!(
            keys.get(GeoKey::GeographicType),
            Some(GeoKeyValue::Short(32767))
        );
        assert_eq!(
            keys.get(GeoKey::GeogSemiMajorAxis),
            Some(GeoKeyValue::Double(6378206.4))
        );
    }

    #[test]
    fn test_non_ascii_names_are_replaced() {
        let wkt = GTM_WKT.replacen(r#"PROJCS["GTM""#, r#"PROJCS["Transversal de Mercátor|GT""#, 1);
        let keys = GeoKeyDirectory::from_srs(&SpatialReference::from_wkt(&wkt).unwrap());

        assert!(keys.ascii.is_ascii());
        assert_eq!(
            keys.get(GeoKey::Citation),
            Some(GeoKeyValue::Ascii("Transversal de Merc_tor/GT".to_string()))
        );
        assert_eq!(
            keys.get(GeoKey::GeogCitation),
            Some(GeoKeyValue::Ascii("GCS_WGS_1984".to_string()))
        );
    }

    #[test]
    fn test_ascii_param() {
        assert_eq!(ascii_param("GTM"), "GTM");
        assert_eq!(ascii_param("a|b"), "a/b");
        assert_eq!(ascii_param("Zürich\tGrid"), "Z_rich_Grid");
    }

    #[test]
    fn test_ascii_layout() {
        let keys = gtm();
        assert_eq!(keys.ascii, "GTM|GCS_WGS_1984|GTM|");
    }
}
