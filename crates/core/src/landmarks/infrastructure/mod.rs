#[cfg(feature = "dlib")]
pub mod dlib_landmark_predictor;
pub mod landmark_extractor;
