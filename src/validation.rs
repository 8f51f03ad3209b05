/// Request validation glue
///
/// DTOs carry `validator` derive rules; this converts their failures into
/// the API's per-field error shape.
use crate::error::{ApiError, FieldError};
use validator::Validate;

/// Validate a request body, mapping failures to field-level errors
pub fn validate_request<T: Validate>(req: &T) -> Result<(), ApiError> {
    req.validate().map_err(|errors| {
        let mut fields = Vec::new();
        for (field, failures) in errors.field_errors() {
            for failure in failures {
                fields.push(FieldError {
                    field: field.to_string(),
                    message: failure
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "invalid value".to_string()),
                });
            }
        }
        ApiError::ValidationDetails(fields)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "too short"))]
        name: String,
        #[validate(range(min = 8, max = 12, message = "out of range"))]
        grade: i64,
    }

    #[test]
    fn collects_field_errors() {
        let sample = Sample {
            name: "ab".to_string(),
            grade: 7,
        };
        let err = validate_request(&sample).unwrap_err();
        match err {
            ApiError::ValidationDetails(fields) => {
                assert_eq!(fields.len(), 2);
                assert!(fields.iter().any(|f| f.field == "name"));
                assert!(fields.iter().any(|f| f.field == "grade"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn valid_request_passes() {
        let sample = Sample {
            name: "abc".to_string(),
            grade: 10,
        };
        assert!(validate_request(&sample).is_ok());
    }
}
