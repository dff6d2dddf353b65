pub mod recognize_faces_use_case;
pub mod refresh_gallery_use_case;
