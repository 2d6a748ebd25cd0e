//! Face detection and 68-point facial landmark extraction.
//!
//! Detection and shape prediction are delegated to an external library
//! (dlib, behind the `dlib` feature) through the [`FaceDetector`] and
//! [`LandmarkPredictor`] traits. This crate adapts image layouts and box
//! formats, picks the largest face and provisions the predictor model.
//!
//! [`FaceDetector`]: detection::domain::face_detector::FaceDetector
//! [`LandmarkPredictor`]: landmarks::domain::landmark_predictor::LandmarkPredictor

pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod frame;
    pub mod image_layout;
}

pub mod detection {
    pub mod domain {
        pub mod detections;
        pub mod face_detector;
    }
    pub mod infrastructure;
}

pub mod landmarks {
    pub mod domain {
        pub mod landmark_predictor;
        pub mod landmarks;
    }
    pub mod infrastructure;
}

pub mod model {
    pub mod downloader;
    pub mod model_provisioner;
}
