pub const MODEL_NAME: &str = "shape_predictor_68_face_landmarks.dat";
pub const COMPRESSED_MODEL_NAME: &str = "shape_predictor_68_face_landmarks.dat.bz2";

/// Mirrors are tried in order; the first is a private Idiap mirror kept to
/// spare dlib.net bandwidth.
pub const MODEL_MIRRORS: &[&str] = &[
    "http://beatubulatest.lab.idiap.ch/private/wheels/gitlab/shape_predictor_68_face_landmarks.dat.bz2",
    "http://dlib.net/files/shape_predictor_68_face_landmarks.dat.bz2",
];

/// Overrides the platform model directory when set.
pub const MODEL_DIR_ENV: &str = "FACEMARK_MODEL_DIR";

/// Directory name under the platform data/cache directory.
pub const APP_DIR_NAME: &str = "Facemark";

/// The frontal face detector exposes no confidence, so every detection
/// gets this value.
pub const PLACEHOLDER_SCORE: f64 = 100.0;

/// Pyramid upsampling passed to the external detector.
pub const DETECTION_UPSCALE: u32 = 1;

pub const LANDMARK_COUNT: usize = 68;
