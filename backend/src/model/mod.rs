pub mod classifier;
pub mod preprocess;
pub mod provisioner;

/// Fixed input shape the artifact was trained with.
pub const MODEL_INPUT_SIZE: (u32, u32) = (128, 128);
