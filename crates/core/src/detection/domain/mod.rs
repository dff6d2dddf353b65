pub mod detected_face;
pub mod face_analyzer;
pub mod face_detector;
pub mod face_embedder;
