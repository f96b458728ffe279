use super::settings::Settings;
use crate::core::errors::ApiError;

const SUPPORTED_UNITS: [&str; 3] = ["metric", "imperial", "standard"];

pub fn validate_settings(settings: &Settings) -> Result<(), ApiError> {
    let rag = &settings.rag;
    if rag.chunk_size == 0 {
        return Err(invalid("rag.chunk_size", "must be greater than 0"));
    }
    if rag.chunk_overlap >= rag.chunk_size {
        return Err(invalid("rag.chunk_overlap", "must be smaller than rag.chunk_size"));
    }
    if rag.top_k == 0 {
        return Err(invalid("rag.top_k", "must be greater than 0"));
    }
    if rag.collection.trim().is_empty() {
        return Err(invalid("rag.collection", "must not be empty"));
    }

    if !SUPPORTED_UNITS.contains(&settings.weather.units.as_str()) {
        return Err(invalid(
            "weather.units",
            &format!("must be one of {}", SUPPORTED_UNITS.join(", ")),
        ));
    }

    if !(0.0..=2.0).contains(&settings.openai.temperature) {
        return Err(invalid("openai.temperature", "must be between 0 and 2"));
    }

    if settings.app.graph_step_limit == 0 {
        return Err(invalid("app.graph_step_limit", "must be greater than 0"));
    }

    Ok(())
}

fn invalid(field: &str, reason: &str) -> ApiError {
    ApiError::BadRequest(format!("Invalid config value for {}: {}", field, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut settings = Settings::default();
        settings.rag.chunk_overlap = settings.rag.chunk_size;
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("rag.chunk_overlap"));
    }

    #[test]
    fn unknown_units_are_rejected() {
        let mut settings = Settings::default();
        settings.weather.units = "kelvin".to_string();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let mut settings = Settings::default();
        settings.rag.top_k = 0;
        assert!(validate_settings(&settings).is_err());
    }
}
