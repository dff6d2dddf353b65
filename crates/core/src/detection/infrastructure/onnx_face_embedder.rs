/// 128-dimensional face embedding network using ONNX Runtime.
///
/// Each face box is cropped from the frame, resampled to the model's square
/// input, normalized, and run through the network. Outputs are
/// L2-normalized so Euclidean distances stay on a comparable scale.
use std::path::Path;

use crate::detection::domain::face_embedder::FaceEmbedder;
use crate::detection::infrastructure::onnx_session::{declared_input_size, open_session};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::embedding::Embedding;
use crate::shared::frame::Frame;

const DEFAULT_INPUT_SIZE: u32 = 160;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 128.0;

pub struct OnnxFaceEmbedder {
    session: ort::session::Session,
    input_size: u32,
}

impl OnnxFaceEmbedder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = open_session(model_path)?;
        let input_size = declared_input_size(&session).unwrap_or(DEFAULT_INPUT_SIZE);
        log::debug!("Loaded face embedder with input size {input_size}");
        Ok(Self {
            session,
            input_size,
        })
    }

    fn embed_one(
        &mut self,
        frame: &Frame,
        face: &BoundingBox,
    ) -> Result<Embedding, Box<dyn std::error::Error>> {
        let tensor = preprocess(frame, face, self.input_size);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;

        let mut values = embedding_slice.to_vec();
        l2_normalize(&mut values);
        Ok(Embedding::from_f32(&values)?)
    }
}

impl FaceEmbedder for OnnxFaceEmbedder {
    fn embed(
        &mut self,
        frame: &Frame,
        boxes: &[BoundingBox],
    ) -> Result<Vec<Embedding>, Box<dyn std::error::Error>> {
        boxes.iter().map(|b| self.embed_one(frame, b)).collect()
    }
}

/// Crop `face` from `frame` and resample it to `size` x `size`, NCHW.
///
/// Sampling is nearest-neighbor at pixel centers; samples outside the frame
/// take the nearest edge pixel.
fn preprocess(frame: &Frame, face: &BoundingBox, size: u32) -> ndarray::Array4<f32> {
    let out = size as usize;
    let crop_w = face.width().max(1) as f64;
    let crop_h = face.height().max(1) as f64;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, out, out));

    for y in 0..out {
        let src_y = face.top as i64 + ((y as f64 + 0.5) * crop_h / out as f64) as i64;
        for x in 0..out {
            let src_x = face.left as i64 + ((x as f64 + 0.5) * crop_w / out as f64) as i64;
            let rgb = frame.pixel_clamped(src_x, src_y);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (rgb[c] as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }

    tensor
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
