//! The fixed set of geolocation attributes rules may reference.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A recognized geolocation attribute.
///
/// Rules are validated against this closed set at build/load time, so a
/// rule that reaches the scoring path can never name an unknown attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Country,
    CountryCode,
    City,
    Continent,
    ContinentCode,
    Region,
    RegionCode,
    Latitude,
    Longitude,
    IsEu,
    Postal,
    CallingCode,
    Capital,
    Borders,
    CountryFlag,
    Asn,
    Org,
    Isp,
    Domain,
    TimezoneId,
    TimezoneAbbr,
    TimezoneIsDst,
    TimezoneOffset,
    TimezoneUtc,
    CurrentTime,
}

impl Attribute {
    /// Every attribute in the schema.
    pub const ALL: [Attribute; 25] = [
        Attribute::Country,
        Attribute::CountryCode,
        Attribute::City,
        Attribute::Continent,
        Attribute::ContinentCode,
        Attribute::Region,
        Attribute::RegionCode,
        Attribute::Latitude,
        Attribute::Longitude,
        Attribute::IsEu,
        Attribute::Postal,
        Attribute::CallingCode,
        Attribute::Capital,
        Attribute::Borders,
        Attribute::CountryFlag,
        Attribute::Asn,
        Attribute::Org,
        Attribute::Isp,
        Attribute::Domain,
        Attribute::TimezoneId,
        Attribute::TimezoneAbbr,
        Attribute::TimezoneIsDst,
        Attribute::TimezoneOffset,
        Attribute::TimezoneUtc,
        Attribute::CurrentTime,
    ];

    /// The attribute's wire name, as used in rule documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Country => "country",
            Attribute::CountryCode => "country_code",
            Attribute::City => "city",
            Attribute::Continent => "continent",
            Attribute::ContinentCode => "continent_code",
            Attribute::Region => "region",
            Attribute::RegionCode => "region_code",
            Attribute::Latitude => "latitude",
            Attribute::Longitude => "longitude",
            Attribute::IsEu => "is_eu",
            Attribute::Postal => "postal",
            Attribute::CallingCode => "calling_code",
            Attribute::Capital => "capital",
            Attribute::Borders => "borders",
            Attribute::CountryFlag => "country_flag",
            Attribute::Asn => "asn",
            Attribute::Org => "org",
            Attribute::Isp => "isp",
            Attribute::Domain => "domain",
            Attribute::TimezoneId => "timezone_id",
            Attribute::TimezoneAbbr => "timezone_abbr",
            Attribute::TimezoneIsDst => "timezone_is_dst",
            Attribute::TimezoneOffset => "timezone_offset",
            Attribute::TimezoneUtc => "timezone_utc",
            Attribute::CurrentTime => "current_time",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .iter()
            .find(|a| a.as_str() == s)
            .copied()
            .ok_or(())
    }
}

/// Check whether a name belongs to the attribute schema.
pub fn is_valid_attribute(name: &str) -> bool {
    name.parse::<Attribute>().is_ok()
}

/// The geolocation attributes resolved for one IP address.
///
/// Produced by a [`GeoResolver`](crate::resolver::GeoResolver) and treated
/// as read-only for the duration of one scoring call. Attributes the
/// resolver could not determine are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeBag {
    values: HashMap<Attribute, String>,
}

impl AttributeBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute's value, replacing any previous value.
    pub fn insert(&mut self, attribute: Attribute, value: impl Into<String>) {
        self.values.insert(attribute, value.into());
    }

    /// Get an attribute's value, if resolved.
    pub fn get(&self, attribute: Attribute) -> Option<&str> {
        self.values.get(&attribute).map(String::as_str)
    }

    /// Whether the bag holds a value for the attribute.
    pub fn contains(&self, attribute: Attribute) -> bool {
        self.values.contains_key(&attribute)
    }

    /// Number of resolved attributes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no attributes were resolved.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the resolved attributes.
    pub fn iter(&self) -> impl Iterator<Item = (Attribute, &str)> {
        self.values.iter().map(|(a, v)| (*a, v.as_str()))
    }
}

impl FromIterator<(Attribute, String)> for AttributeBag {
    fn from_iter<T: IntoIterator<Item = (Attribute, String)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_attribute_names() {
        assert!(is_valid_attribute("country"));
        assert!(is_valid_attribute("timezone_id"));
        assert!(is_valid_attribute("isp"));
        assert!(!is_valid_attribute("hostname"));
        assert!(!is_valid_attribute(""));
        assert!(!is_valid_attribute("Country"));
    }

    #[test]
    fn test_roundtrip_names() {
        for attr in Attribute::ALL {
            assert_eq!(attr.as_str().parse::<Attribute>(), Ok(attr));
        }
    }

    #[test]
    fn test_serde_wire_names() {
        let json = serde_json::to_string(&Attribute::CountryCode).unwrap();
        assert_eq!(json, "\"country_code\"");

        let attr: Attribute = serde_json::from_str("\"timezone_is_dst\"").unwrap();
        assert_eq!(attr, Attribute::TimezoneIsDst);
    }

    #[test]
    fn test_bag_insert_and_get() {
        let mut bag = AttributeBag::new();
        bag.insert(Attribute::Country, "United States");
        bag.insert(Attribute::City, "New York City");

        assert_eq!(bag.get(Attribute::Country), Some("United States"));
        assert_eq!(bag.get(Attribute::Isp), None);
        assert!(bag.contains(Attribute::City));
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn test_bag_replace() {
        let mut bag = AttributeBag::new();
        bag.insert(Attribute::Country, "UK");
        bag.insert(Attribute::Country, "France");
        assert_eq!(bag.get(Attribute::Country), Some("France"));
        assert_eq!(bag.len(), 1);
    }
}
