pub const APP_DIR_NAME: &str = "FaceSecure";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_LEDGER_FILE: &str = "attendance.csv";
pub const DEFAULT_MODEL_FILE: &str = "trained_model.json";

/// At most one committed event per identity inside this rolling window,
/// measured from the previous event's instant.
pub const ELIGIBILITY_WINDOW_HOURS: i64 = 24;

/// Predictions at or above this distance are treated as Unknown.
pub const MATCH_DISTANCE_LIMIT: f64 = 100.0;

pub const SAMPLES_PER_ENROLLMENT: usize = 5;
pub const SAMPLE_INTERVAL_MS: u64 = 500;

/// ~30 fps.
pub const TICK_INTERVAL_MS: u64 = 30;

pub const LEDGER_HEADER: &str = "Name,Date,Time";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

pub const UNKNOWN_NAME: &str = "Unknown";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
