pub const GEFS_PLUMES_BASE_URL: &str = "https://www.emc.ncep.noaa.gov/users/meg/gefs_plumes";
pub const GEFS_FILE_PREFIX: &str = "GEFS";
pub const TEMPERATURE_FILE_SUFFIX: &str = "2mt";
pub const PRECIPITATION_FILE_SUFFIX: &str = "qpf3h";
pub const RUN_STAMP_FORMAT: &str = "%Y%m%d%H";

pub const MODEL_UPDATE_HOURS: [u32; 4] = [0, 6, 12, 18];
pub const MODEL_UPDATE_INTERVAL_HOURS: i64 = 6;

pub const CSV_TIMESTAMP_COLUMN: &str = "date";
pub const DERIVED_DATETIME_COLUMN: &str = "datetime";
pub const CSV_DATE_FORMAT: &str = "%m-%d-%Y";
pub const HEADER_DATE_FORMAT: &str = "%a %Y/%m/%d, %H:%M";
pub const AXIS_TICK_DATE_FORMAT: &str = "%a %m/%d; %H:%M";

// Two run/metadata columns lead the table, date + derived datetime trail it.
pub const LEADING_METADATA_COLUMNS: usize = 2;
pub const TRAILING_METADATA_COLUMNS: usize = 2;
pub const MIN_TABLE_COLUMNS: usize = LEADING_METADATA_COLUMNS + TRAILING_METADATA_COLUMNS + 1;

// Lower bounds in inches per 3 hours.
pub const TRACE_THRESHOLD_IN: f64 = 0.01;
pub const LIGHT_THRESHOLD_IN: f64 = 0.05;
pub const MODERATE_THRESHOLD_IN: f64 = 0.10;
pub const HEAVY_THRESHOLD_IN: f64 = 0.30;
pub const VERY_HEAVY_THRESHOLD_IN: f64 = 1.00;

pub const TEMPERATURE_PERCENTILES: [f64; 4] = [0.10, 0.25, 0.75, 0.90];

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_TIMEZONE: &str = "US/Eastern";
pub const DEFAULT_FORECAST_DAYS: u32 = 10;
pub const DEFAULT_PLOT_WIDTH: u32 = 1200;
pub const DEFAULT_PLOT_HEIGHT: u32 = 1900;
pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";
pub const PLOT_FONT_FAMILY: &str = "sans-serif";

pub const AIRPORT_CODE_MIN_LEN: usize = 3;
pub const AIRPORT_CODE_MAX_LEN: usize = 4;

pub const DATA_UNAVAILABLE_TEXT: &str = "Data Unavailable";
pub const PLOT_ERROR_TEXT: &str = "Error generating plot";
pub const HEADER_UNAVAILABLE_TEXT: &str = "Header Info Unavailable";

pub const RUN_HEADER_TEMPERATURE: &str = "X-GEFS-TEMPERATURE-RUN";
pub const RUN_HEADER_PRECIPITATION: &str = "X-GEFS-PRECIPITATION-RUN";
