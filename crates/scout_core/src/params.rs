use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::Status;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("invalid {field}: {value}")]
    Invalid { field: &'static str, value: String },
    #[error("no export directory selected")]
    NoExportDir,
}

impl ParamError {
    pub fn status(&self) -> Status {
        match self {
            ParamError::Invalid { .. } => Status::ParamError,
            ParamError::NoExportDir => Status::NoExportDir,
        }
    }
}

/// Fallback values used when a start request leaves a field empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeDefaults {
    pub keyword: String,
    pub price: f64,
    pub pinned: f64,
    pub reviews: u64,
}

impl Default for ScrapeDefaults {
    fn default() -> Self {
        Self {
            keyword: "手机壳".to_string(),
            price: 50.0,
            pinned: 1000.0,
            reviews: 100,
        }
    }
}

/// Start request exactly as the shell sent it.
///
/// Thresholds may arrive as JSON numbers or as the text of an input box.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawScrapeParams {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub pinned: Option<Value>,
    #[serde(default)]
    pub reviews: Option<Value>,
    #[serde(default, rename = "exportDir", alias = "export_dir")]
    pub export_dir: Option<String>,
}

/// Validated parameters for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeParams {
    pub keyword: String,
    pub price_threshold: f64,
    pub pinned_threshold: f64,
    pub reviews_threshold: u64,
    pub export_dir: PathBuf,
}

impl RawScrapeParams {
    /// Coerces the raw request into typed parameters.
    ///
    /// `fallback_dir` is the directory remembered from an earlier pick; it is
    /// used when the request itself names none.
    pub fn normalize(
        &self,
        defaults: &ScrapeDefaults,
        fallback_dir: Option<&Path>,
    ) -> Result<ScrapeParams, ParamError> {
        let keyword = self
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(defaults.keyword.as_str())
            .to_string();
        let price_threshold = coerce_f64("price", self.price.as_ref())?.unwrap_or(defaults.price);
        let pinned_threshold =
            coerce_f64("pinned", self.pinned.as_ref())?.unwrap_or(defaults.pinned);
        let reviews_threshold =
            coerce_u64("reviews", self.reviews.as_ref())?.unwrap_or(defaults.reviews);

        let export_dir = self
            .export_dir
            .as_deref()
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| fallback_dir.map(Path::to_path_buf))
            .ok_or(ParamError::NoExportDir)?;

        Ok(ScrapeParams {
            keyword,
            price_threshold,
            pinned_threshold,
            reviews_threshold,
            export_dir,
        })
    }
}

fn coerce_f64(field: &'static str, value: Option<&Value>) -> Result<Option<f64>, ParamError> {
    let invalid = |value: &Value| ParamError::Invalid {
        field,
        value: value.to_string(),
    };
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid(&Value::Number(n.clone()))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| invalid(&Value::String(s.clone()))),
        Some(other) => Err(invalid(other)),
    }
}

fn coerce_u64(field: &'static str, value: Option<&Value>) -> Result<Option<u64>, ParamError> {
    let invalid = |value: &Value| ParamError::Invalid {
        field,
        value: value.to_string(),
    };
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                return Ok(Some(v));
            }
            // Fractional counts are truncated; negative ones are rejected.
            match n.as_f64() {
                Some(v) if v.is_finite() && v >= 0.0 => Ok(Some(v.trunc() as u64)),
                _ => Err(invalid(&Value::Number(n.clone()))),
            }
        }
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| invalid(&Value::String(s.clone()))),
        Some(other) => Err(invalid(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawScrapeParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn numbers_and_numeric_strings_are_accepted() {
        let params = raw(json!({
            "keyword": "  shoes ",
            "price": 50,
            "pinned": "200.5",
            "reviews": "30",
            "exportDir": "/out"
        }))
        .normalize(&ScrapeDefaults::default(), None)
        .unwrap();

        assert_eq!(params.keyword, "shoes");
        assert_eq!(params.price_threshold, 50.0);
        assert_eq!(params.pinned_threshold, 200.5);
        assert_eq!(params.reviews_threshold, 30);
        assert_eq!(params.export_dir, PathBuf::from("/out"));
    }

    #[test]
    fn empty_fields_fall_back_to_defaults() {
        let defaults = ScrapeDefaults::default();
        let params = raw(json!({ "keyword": "   ", "price": "", "pinned": null }))
            .normalize(&defaults, Some(Path::new("/remembered")))
            .unwrap();

        assert_eq!(params.keyword, defaults.keyword);
        assert_eq!(params.price_threshold, defaults.price);
        assert_eq!(params.pinned_threshold, defaults.pinned);
        assert_eq!(params.reviews_threshold, defaults.reviews);
        assert_eq!(params.export_dir, PathBuf::from("/remembered"));
    }

    #[test]
    fn uncoercible_threshold_is_a_param_error() {
        let err = raw(json!({ "price": "cheap", "exportDir": "/out" }))
            .normalize(&ScrapeDefaults::default(), None)
            .unwrap_err();
        assert_eq!(err.status(), Status::ParamError);

        let err = raw(json!({ "reviews": -3, "exportDir": "/out" }))
            .normalize(&ScrapeDefaults::default(), None)
            .unwrap_err();
        assert!(matches!(err, ParamError::Invalid { field: "reviews", .. }));
    }

    #[test]
    fn missing_export_dir_is_reported() {
        let err = raw(json!({ "keyword": "shoes" }))
            .normalize(&ScrapeDefaults::default(), None)
            .unwrap_err();
        assert_eq!(err, ParamError::NoExportDir);
        assert_eq!(err.status(), Status::NoExportDir);
    }
}
