// src/gps.rs
//
// EXIF geotag extraction. A photo without location is the normal case, so
// nothing in here returns an error to the caller.

use exif::{Exif, In, Reader, Tag, Value};
use std::io::Cursor;

use crate::types::Location;

#[derive(Debug, Clone, PartialEq)]
pub enum GpsLookup {
    Found(Location),
    /// No EXIF block, or no latitude/longitude tags in it.
    Absent,
    /// Metadata is present but could not be decoded.
    Malformed(String),
}

impl GpsLookup {
    pub fn location(&self) -> Option<Location> {
        match self {
            GpsLookup::Found(loc) => Some(*loc),
            _ => None,
        }
    }
}

/// Read the GPS position from an encoded image (JPEG, TIFF, PNG, WebP, HEIF).
pub fn extract_location(bytes: &[u8]) -> GpsLookup {
    let mut cursor = Cursor::new(bytes);
    let exif = match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return GpsLookup::Absent,
        Err(e) => return GpsLookup::Malformed(e.to_string()),
    };
    location_from_exif(&exif)
}

fn location_from_exif(exif: &Exif) -> GpsLookup {
    let (lat_field, lng_field) = match (
        exif.get_field(Tag::GPSLatitude, In::PRIMARY),
        exif.get_field(Tag::GPSLongitude, In::PRIMARY),
    ) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => return GpsLookup::Absent,
    };

    let lat_ref = reference(exif, Tag::GPSLatitudeRef).unwrap_or('N');
    let lng_ref = reference(exif, Tag::GPSLongitudeRef).unwrap_or('E');

    let lat = match dms_triplet(&lat_field.value) {
        Some(dms) => decimal_from_dms(dms, lat_ref),
        None => return GpsLookup::Malformed("latitude is not a DMS rational triplet".into()),
    };
    let lng = match dms_triplet(&lng_field.value) {
        Some(dms) => decimal_from_dms(dms, lng_ref),
        None => return GpsLookup::Malformed("longitude is not a DMS rational triplet".into()),
    };

    if !lat.is_finite() || !lng.is_finite() {
        return GpsLookup::Malformed("non-finite coordinate".into());
    }

    GpsLookup::Found(Location { lat, lng })
}

fn reference(exif: &Exif, tag: Tag) -> Option<char> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(parts) => parts
            .first()
            .and_then(|s| s.first())
            .map(|&c| (c as char).to_ascii_uppercase()),
        _ => None,
    }
}

fn dms_triplet(value: &Value) -> Option<[f64; 3]> {
    match value {
        Value::Rational(parts) if parts.len() >= 3 => Some([
            parts[0].to_f64(),
            parts[1].to_f64(),
            parts[2].to_f64(),
        ]),
        _ => None,
    }
}

/// Degrees/minutes/seconds to signed decimal degrees. South and west are negative.
pub fn decimal_from_dms(dms: [f64; 3], reference: char) -> f64 {
    let decimal = dms[0] + dms[1] / 60.0 + dms[2] / 3600.0;
    match reference {
        'S' | 'W' => -decimal,
        _ => decimal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use image::{ImageFormat, Rgb, RgbImage};

    /// Little-endian TIFF with only a GPS IFD.
    fn tiff_with_gps(lat: [(u32, u32); 3], lat_ref: u8, lng: [(u32, u32); 3], lng_ref: u8) -> Vec<u8> {
        const GPS_IFD: u32 = 26;
        const LAT_DATA: u32 = 80;
        const LNG_DATA: u32 = 104;

        let mut buf = Vec::new();
        buf.extend_from_slice(b"II");
        buf.extend_from_slice(&42u16.to_le_bytes());
        buf.extend_from_slice(&8u32.to_le_bytes());

        // IFD0: one entry pointing at the GPS IFD.
        buf.extend_from_slice(&1u16.to_le_bytes());
        entry(&mut buf, 0x8825, 4, 1, GPS_IFD.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(buf.len(), GPS_IFD as usize);

        buf.extend_from_slice(&4u16.to_le_bytes());
        entry(&mut buf, 1, 2, 2, [lat_ref, 0, 0, 0]);
        entry(&mut buf, 2, 5, 3, LAT_DATA.to_le_bytes());
        entry(&mut buf, 3, 2, 2, [lng_ref, 0, 0, 0]);
        entry(&mut buf, 4, 5, 3, LNG_DATA.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(buf.len(), LAT_DATA as usize);

        for (num, den) in lat.iter().chain(lng.iter()) {
            buf.extend_from_slice(&num.to_le_bytes());
            buf.extend_from_slice(&den.to_le_bytes());
        }
        buf
    }

    fn entry(buf: &mut Vec<u8>, tag: u16, typ: u16, count: u32, value: [u8; 4]) {
        buf.extend_from_slice(&tag.to_le_bytes());
        buf.extend_from_slice(&typ.to_le_bytes());
        buf.extend_from_slice(&count.to_le_bytes());
        buf.extend_from_slice(&value);
    }

    #[test]
    fn test_dms_fixture_south_west() {
        let bytes = tiff_with_gps(
            [(37, 1), (46, 1), (2964, 100)],
            b'S',
            [(122, 1), (25, 1), (984, 100)],
            b'W',
        );

        let loc = assert_matches!(extract_location(&bytes), GpsLookup::Found(loc) => loc);
        assert!((loc.lat - -37.7749).abs() < 1e-4, "lat = {}", loc.lat);
        assert!((loc.lng - -122.4194).abs() < 1e-4, "lng = {}", loc.lng);
    }

    #[test]
    fn test_dms_fixture_north_east() {
        let bytes = tiff_with_gps(
            [(48, 1), (51, 1), (2952, 100)],
            b'N',
            [(2, 1), (17, 1), (4020, 100)],
            b'E',
        );

        let loc = extract_location(&bytes).location().unwrap();
        assert!((loc.lat - 48.858).abs() < 1e-3);
        assert!((loc.lng - 2.2945).abs() < 1e-3);
    }

    #[test]
    fn test_image_without_metadata_has_no_location() {
        let img = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, ImageFormat::Png).unwrap();

        let lookup = extract_location(png.get_ref());
        assert_eq!(lookup.location(), None);
        assert_matches!(lookup, GpsLookup::Absent);
    }

    #[test]
    fn test_garbage_never_panics() {
        assert_eq!(extract_location(b"definitely not an image").location(), None);
        assert_eq!(extract_location(&[]).location(), None);
    }

    #[test]
    fn test_decimal_sign() {
        assert_eq!(decimal_from_dms([10.0, 30.0, 0.0], 'N'), 10.5);
        assert_eq!(decimal_from_dms([10.0, 30.0, 0.0], 'W'), -10.5);
    }
}
