//! GPS coordinates as sent by the mobile client.

use std::fmt;

use serde::Deserialize;

/// A coordinate exactly as it arrived: the app sends numbers, older builds sent strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawCoordinate {
    Number(f64),
    Text(String),
}

/// A validated coordinate that keeps the caller's textual form.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    text: String,
}

impl Coordinate {
    pub fn parse(raw: &RawCoordinate) -> Option<Self> {
        let text = match raw {
            RawCoordinate::Number(n) if n.is_finite() => n.to_string(),
            RawCoordinate::Number(_) => return None,
            RawCoordinate::Text(s) => {
                let s = s.trim();
                let value: f64 = s.parse().ok()?;
                if !value.is_finite() {
                    return None;
                }
                s.to_string()
            }
        };
        Some(Self { text })
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub latitude: Coordinate,
    pub longitude: Coordinate,
}

impl GeoPoint {
    /// Both halves must be present and numeric, otherwise there is no location.
    pub fn from_parts(
        latitude: Option<&RawCoordinate>,
        longitude: Option<&RawCoordinate>,
    ) -> Option<Self> {
        Some(Self {
            latitude: Coordinate::parse(latitude?)?,
            longitude: Coordinate::parse(longitude?)?,
        })
    }

    pub fn maps_link(&self) -> String {
        format!(
            "https://www.google.com/maps?q={},{}",
            self.latitude, self.longitude
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawCoordinate {
        RawCoordinate::Text(s.to_string())
    }

    #[test]
    fn numbers_and_strings_are_accepted() {
        let point = GeoPoint::from_parts(
            Some(&RawCoordinate::Number(-23.5505)),
            Some(&text(" -46.6333 ")),
        )
        .unwrap();
        assert_eq!(point.latitude.as_str(), "-23.5505");
        assert_eq!(point.longitude.as_str(), "-46.6333");
        assert_eq!(
            point.maps_link(),
            "https://www.google.com/maps?q=-23.5505,-46.6333"
        );
    }

    #[test]
    fn zero_is_a_real_coordinate() {
        let point = GeoPoint::from_parts(
            Some(&RawCoordinate::Number(0.0)),
            Some(&RawCoordinate::Number(0.0)),
        )
        .unwrap();
        assert_eq!(point.maps_link(), "https://www.google.com/maps?q=0,0");

        let point = GeoPoint::from_parts(Some(&text("0")), Some(&text("0"))).unwrap();
        assert_eq!(point.maps_link(), "https://www.google.com/maps?q=0,0");
    }

    #[test]
    fn half_a_location_is_no_location() {
        assert!(GeoPoint::from_parts(Some(&RawCoordinate::Number(1.0)), None).is_none());
        assert!(GeoPoint::from_parts(None, Some(&RawCoordinate::Number(1.0))).is_none());
    }

    #[test]
    fn non_numeric_text_is_rejected() {
        assert!(Coordinate::parse(&text("")).is_none());
        assert!(Coordinate::parse(&text("rua tal")).is_none());
        assert!(Coordinate::parse(&text("NaN")).is_none());
        assert!(Coordinate::parse(&text("inf")).is_none());
    }

    #[test]
    fn deserializes_either_form() {
        let raw: Vec<RawCoordinate> = serde_json::from_str(r#"[12.5, "13.25"]"#).unwrap();
        assert_eq!(raw, vec![RawCoordinate::Number(12.5), text("13.25")]);
    }
}
