//! Application constants

/// Default GCS bucket for framed photos
pub const DEFAULT_BUCKET_NAME: &str = "photo-frame-bucket";

/// Default Gemini model used for the verdict
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro-latest";

/// Object prefix for every published photo
pub const STORAGE_PREFIX: &str = "framed_photos";

/// Interior margin of the frame artwork reserved for the photo, in pixels
pub const DEFAULT_FRAME_PADDING: u32 = 50;

/// Directory holding `yes.png` and `no.png`
pub const DEFAULT_FRAMES_DIR: &str = "frames";

/// JPEG quality for published photos
pub const OUTPUT_QUALITY: u8 = 85;

/// Maximum upload size for photos (20 MB)
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 20 * 1024 * 1024;

pub const DEFAULT_PORT: u16 = 8080;

/// Multipart field carrying the photo
pub const PHOTO_FIELD: &str = "photo";

/// Accepted upload filename extensions (matched case-insensitively)
pub const ALLOWED_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];
