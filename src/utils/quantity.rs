// Copyright 2025 The Karmada Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Parsing of Kubernetes resource quantities (`500m`, `16Gi`, `1e3`).

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

const BINARY_SUFFIXES: [(&str, f64); 6] = [
    ("Ki", 1024.0),
    ("Mi", 1_048_576.0),
    ("Gi", 1_073_741_824.0),
    ("Ti", 1_099_511_627_776.0),
    ("Pi", 1_125_899_906_842_624.0),
    ("Ei", 1_152_921_504_606_846_976.0),
];

const DECIMAL_SUFFIXES: [(&str, f64); 9] = [
    ("n", 1e-9),
    ("u", 1e-6),
    ("m", 1e-3),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
];

/// Parses a quantity string into its numeric value in base units.
///
/// Returns `None` for malformed input; callers treat such values as absent.
pub fn parse(raw: &str) -> Option<f64> {
    parse_number(raw.trim()).filter(|n| n.is_finite())
}

fn parse_number(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }

    for (suffix, factor) in BINARY_SUFFIXES {
        if let Some(number) = raw.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|n| n * factor);
        }
    }

    // "1e3" is an exponent, not an exa suffix, so try the plain float first.
    if let Ok(n) = raw.parse::<f64>() {
        return Some(n);
    }

    for (suffix, factor) in DECIMAL_SUFFIXES {
        if let Some(number) = raw.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|n| n * factor);
        }
    }

    None
}

/// Value of `name` in a resource list, 0 when missing or malformed.
pub fn value_of(resources: Option<&BTreeMap<String, Quantity>>, name: &str) -> f64 {
    resources
        .and_then(|r| r.get(name))
        .and_then(|q| parse(&q.0))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(value: Option<f64>, expected: f64) -> bool {
        value.is_some_and(|v| (v - expected).abs() < 1e-9)
    }

    #[test]
    fn test_parse_cpu() {
        assert_eq!(parse("2"), Some(2.0));
        assert_eq!(parse("0.25"), Some(0.25));
        assert!(approx(parse("500m"), 0.5));
        assert!(approx(parse("250000u"), 0.25));
    }

    #[test]
    fn test_parse_memory() {
        assert_eq!(parse("1Ki"), Some(1024.0));
        assert_eq!(parse("16Gi"), Some(17_179_869_184.0));
        assert_eq!(parse("128M"), Some(128e6));
        assert_eq!(parse("1e3"), Some(1000.0));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("lots"), None);
        assert_eq!(parse("Gi"), None);
    }

    #[test]
    fn test_parse_rejects_non_finite() {
        assert_eq!(parse("NaN"), None);
        assert_eq!(parse("inf"), None);
        assert_eq!(parse("-infinity"), None);
        assert_eq!(parse("NaNGi"), None);
        assert_eq!(parse("1e400"), None);
    }

    #[test]
    fn test_value_of() {
        let mut resources = BTreeMap::new();
        resources.insert("cpu".to_string(), Quantity("4".to_string()));
        assert_eq!(value_of(Some(&resources), "cpu"), 4.0);
        assert_eq!(value_of(Some(&resources), "memory"), 0.0);
        assert_eq!(value_of(None, "cpu"), 0.0);
    }
}
