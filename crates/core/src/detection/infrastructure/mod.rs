#[cfg(feature = "dlib")]
pub mod dlib_face_detector;
pub mod face_detector_adapter;
