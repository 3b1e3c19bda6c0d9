//! Region class map.
//!
//! Classes are kept in an explicitly ordered list. The classification half-width
//! used to de-threshold predicted region masks is derived from the sorted codes,
//! so it never depends on map iteration order.

use serde::{Deserialize, Serialize};

use crate::core::{LayoutError, LayoutResult};

/// Maps an intensity code in `0..=255` into the normalized `-1..=1` mask range.
#[inline]
pub fn code_to_unit(code: f32) -> f32 {
    code * (2.0 / 255.0) - 1.0
}

/// One region class and its reserved intensity code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    /// Class name, as written in the annotation `type`.
    pub name: String,
    /// Intensity code used in rasterized masks.
    pub code: u8,
}

impl ClassEntry {
    pub fn new(name: impl Into<String>, code: u8) -> Self {
        Self {
            name: name.into(),
            code,
        }
    }
}

/// Ordered mapping from region class name to intensity code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassMap {
    entries: Vec<ClassEntry>,
}

impl ClassMap {
    /// Creates a class map keeping the given order.
    pub fn new(entries: Vec<ClassEntry>) -> Self {
        Self { entries }
    }

    /// Parses `name=code` pairs separated by commas, e.g. `paragraph=64,marginalia=192`.
    pub fn parse(spec: &str) -> LayoutResult<Self> {
        let mut entries = Vec::new();
        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, code) = pair
                .split_once('=')
                .ok_or_else(|| LayoutError::invalid_field("classes", "name=code", pair))?;
            let code = code
                .trim()
                .parse::<u8>()
                .map_err(|_| LayoutError::invalid_field("classes", "a code in 0..=255", code))?;
            entries.push(ClassEntry::new(name.trim(), code));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ClassEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the code of a class by name.
    pub fn code(&self, name: &str) -> Option<u8> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.code)
    }

    /// Keeps only the named classes, in the order given by `names`.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> LayoutResult<Self> {
        let entries = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.entries
                    .iter()
                    .find(|e| e.name == name)
                    .cloned()
                    .ok_or_else(|| {
                        LayoutError::config_error_detailed(
                            "class map",
                            format!("unknown region class '{name}'"),
                        )
                    })
            })
            .collect::<LayoutResult<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Half of the smallest gap between adjacent sorted codes.
    ///
    /// Returns `None` when fewer than two classes are defined.
    pub fn half_width(&self) -> Option<f32> {
        let mut codes: Vec<u8> = self.entries.iter().map(|e| e.code).collect();
        codes.sort_unstable();
        codes
            .windows(2)
            .map(|w| f32::from(w[1] - w[0]))
            .reduce(f32::min)
            .map(|gap| gap / 2.0)
    }

    /// Checks names and codes. At least two classes are required unless only
    /// text lines are processed.
    pub fn validate(&self, only_lines: bool) -> LayoutResult<()> {
        if !only_lines && self.entries.len() < 2 {
            return Err(LayoutError::config_error_detailed(
                "class map",
                format!(
                    "at least 2 region classes are required, got {}",
                    self.entries.len()
                ),
            ));
        }
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.name.is_empty() {
                return Err(LayoutError::config_error_detailed(
                    "class map",
                    format!("class #{i} has an empty name"),
                ));
            }
            if let Some(other) = self.entries[..i].iter().find(|e| e.name == entry.name) {
                return Err(LayoutError::config_error_detailed(
                    "class map",
                    format!("class '{}' is defined twice", other.name),
                ));
            }
            if let Some(other) = self.entries[..i].iter().find(|e| e.code == entry.code) {
                return Err(LayoutError::config_error_detailed(
                    "class map",
                    format!(
                        "codes must be distinct, '{}' and '{}' share {}",
                        other.name, entry.name, entry.code
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_width_uses_sorted_codes() {
        // Declaration order must not matter.
        let a = ClassMap::parse("marginalia=192,paragraph=64,page-number=128").unwrap();
        let b = ClassMap::parse("paragraph=64,page-number=128,marginalia=192").unwrap();
        assert_eq!(a.half_width(), Some(32.0));
        assert_eq!(a.half_width(), b.half_width());
    }

    #[test]
    fn test_half_width_takes_minimum_gap() {
        let map = ClassMap::parse("a=10,b=200,c=30").unwrap();
        assert_eq!(map.half_width(), Some(10.0));
        assert_eq!(ClassMap::parse("a=10").unwrap().half_width(), None);
    }

    #[test]
    fn test_validate_rules() {
        assert!(ClassMap::parse("a=64").unwrap().validate(false).is_err());
        assert!(ClassMap::parse("a=64").unwrap().validate(true).is_ok());
        assert!(ClassMap::default().validate(true).is_ok());
        assert!(ClassMap::parse("a=64,b=64").unwrap().validate(false).is_err());
        assert!(ClassMap::parse("a=64,a=128").unwrap().validate(false).is_err());
        assert!(ClassMap::parse("a=64,b=128").unwrap().validate(false).is_ok());
    }

    #[test]
    fn test_parse_rejects_bad_pairs() {
        assert!(ClassMap::parse("paragraph").is_err());
        assert!(ClassMap::parse("paragraph=300").is_err());
        let map = ClassMap::parse(" paragraph = 64 , note=128 ,").unwrap();
        assert_eq!(map.code("note"), Some(128));
        assert_eq!(map.entries()[0].name, "paragraph");
    }

    #[test]
    fn test_select_keeps_requested_order() {
        let map = ClassMap::parse("a=10,b=20,c=30").unwrap();
        let picked = map.select(&["c", "a"]).unwrap();
        assert_eq!(picked.entries()[0].name, "c");
        assert_eq!(picked.entries()[1].name, "a");
        assert!(map.select(&["z"]).is_err());
    }

    #[test]
    fn test_code_to_unit_range() {
        assert_eq!(code_to_unit(0.0), -1.0);
        assert!((code_to_unit(255.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_serde_is_an_ordered_list() {
        let map = ClassMap::parse("b=20,a=10").unwrap();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"[{"name":"b","code":20},{"name":"a","code":10}]"#);
        let back: ClassMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
