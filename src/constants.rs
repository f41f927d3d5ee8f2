//! Shared constants for the co2stream service

/// Column and payload field names as they appear in the dataset and in
/// inbound prediction requests.
pub mod fields {
    pub const ENGINE_SIZE: &str = "Engine Size(L)";
    pub const CYLINDERS: &str = "Cylinders";
    pub const FUEL_CONSUMPTION_COMB: &str = "Fuel Consumption Comb (L/100 km)";
    pub const HORSEPOWER: &str = "Horsepower";
    pub const WEIGHT: &str = "Weight (kg)";
    pub const YEAR: &str = "Year";

    /// Ground-truth emissions column
    pub const TARGET: &str = "CO2 Emissions(g/km)";

    /// Feature columns in model order. Cache keys follow this order too.
    pub const FEATURES: [&str; 6] = [
        ENGINE_SIZE,
        CYLINDERS,
        FUEL_CONSUMPTION_COMB,
        HORSEPOWER,
        WEIGHT,
        YEAR,
    ];
}

/// Persisted artifact file names
pub mod artifacts {
    pub const MODEL_FILE: &str = "trained_model.bin";
    pub const SCALER_FILE: &str = "trained_scaler.bin";
}

/// Dataset-average emission used whenever a genuine prediction is unavailable (g/km)
pub const DEFAULT_FALLBACK_PREDICTION: f64 = 200.0;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "CO2STREAM";
